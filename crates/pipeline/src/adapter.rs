//! Generation collaborator contract.
//!
//! The surrounding application supplies the actual providers (text and
//! image models); the orchestrator only needs this single-item "produce an
//! artifact" capability. `atelier-backend` ships the HTTP implementation.

use async_trait::async_trait;

use atelier_core::batch::GenerationContext;
use atelier_core::version::VersionPayload;

/// Errors a generation provider can surface for one work item.
///
/// All variants are expected and recoverable from the orchestrator's point
/// of view: they are collected into the batch's error list and the loop
/// moves on.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The provider failed (model error, upstream outage).
    #[error("Provider error: {0}")]
    Provider(String),

    /// The prompt or context was rejected before generation started.
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    /// The request never completed (network, DNS, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The bounded per-item time limit expired.
    #[error("Generation timed out after {0}s")]
    TimedOut(u64),
}

/// Single-item generation capability.
#[async_trait]
pub trait GenerationAdapter<P: VersionPayload>: Send + Sync {
    /// Produce one artifact payload for the given context.
    async fn generate(&self, context: &GenerationContext) -> Result<P, GenerationError>;
}
