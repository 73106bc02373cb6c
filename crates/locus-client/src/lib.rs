//! Locus client library
//!
//! Wires the core building blocks and the provider adapters into
//! [`VenueResolver`], the entry point for classifying coordinates.

pub mod resolver;
pub mod router;
pub mod telemetry;

pub use resolver::{VenueResolver, VenueResolverBuilder};
pub use router::ProviderRouter;
pub use telemetry::{init_tracing, TelemetryGuard};
