mod provider;
mod rate_gate;

pub use provider::PlaceProvider;
#[cfg(any(test, feature = "test-mocks"))]
pub use provider::MockPlaceProvider;
pub use rate_gate::TokenGate;
