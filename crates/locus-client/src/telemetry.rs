//! Tracing setup for Locus processes
//!
//! Structured logs always go to stdout through `tracing-subscriber`. When an
//! OTLP endpoint is given, spans are also exported over HTTP.

use locus_core::VenueClassification;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tracing::{warn, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,locus=debug";
const SERVICE_NAME: &str = "locus";

/// Flushes exported spans when dropped.
#[must_use = "dropping the guard shuts down span export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                warn!("Failed to shut down span exporter: {}", e);
            }
        }
    }
}

fn build_tracer_provider(
    endpoint: &str,
) -> Result<SdkTracerProvider, Box<dyn std::error::Error + Send + Sync>> {
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    Ok(provider)
}

/// Installs the global subscriber. `RUST_LOG` overrides [`DEFAULT_FILTER`].
pub fn init_tracing(
    otel_endpoint: Option<&str>,
) -> Result<TelemetryGuard, Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let provider = otel_endpoint.map(build_tracer_provider).transpose()?;
    let otel_layer = provider.as_ref().map(|provider| {
        let tracer: SdkTracer = provider.tracer(SERVICE_NAME);
        tracing_opentelemetry::layer().with_tracer(tracer)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(otel_layer)
        .try_init()?;

    Ok(TelemetryGuard { provider })
}

pub fn set_venue_attributes(span: &Span, venue: &VenueClassification) {
    span.set_attribute("locus.venue.type", venue.venue_type.as_str());
    span.set_attribute("locus.venue.energy", venue.energy);
    span.set_attribute("locus.venue.provider", venue.provider.as_str());
}
