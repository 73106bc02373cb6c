use async_trait::async_trait;

use crate::types::Provider;

/// Admission check in front of every outbound provider call.
#[async_trait]
pub trait TokenGate: Send + Sync {
    /// Returns `false` when the call must be skipped. Never blocks for a token.
    async fn try_acquire(&self, provider: Provider) -> bool;
}
