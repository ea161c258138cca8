//! HTTP generation adapter.
//!
//! Submits one work item's context to the backend's generation endpoint and
//! returns the produced artifact payload. Batch semantics (sequencing,
//! pacing, error aggregation) stay in `atelier-pipeline`; this adapter only
//! knows how to produce a single artifact.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use atelier_core::batch::GenerationContext;
use atelier_core::version::VersionPayload;
use atelier_pipeline::{GenerationAdapter, GenerationError};

use crate::client::{ApiClient, ApiError};

/// [`GenerationAdapter`] over the backend's generation endpoint.
pub struct HttpGenerationAdapter {
    api: ApiClient,
}

impl HttpGenerationAdapter {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn map_error(err: ApiError) -> GenerationError {
        match err {
            ApiError::Request(e) => GenerationError::Transport(e.to_string()),
            // The backend rejects unusable prompts/contexts before the
            // provider is invoked.
            ApiError::Api {
                status: 400 | 422,
                body,
            } => GenerationError::InvalidPrompt(body),
            ApiError::Api { status, body } => {
                GenerationError::Provider(format!("status {status}: {body}"))
            }
        }
    }
}

#[async_trait]
impl<P> GenerationAdapter<P> for HttpGenerationAdapter
where
    P: VersionPayload + DeserializeOwned,
{
    async fn generate(&self, context: &GenerationContext) -> Result<P, GenerationError> {
        let url = self
            .api
            .url(&format!("generation/{}", context.operation.as_str()));
        tracing::debug!(
            parent_id = context.parent_id,
            operation = context.operation.as_str(),
            "Submitting generation request",
        );

        let response = self
            .api
            .http()
            .post(url)
            .json(context)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        ApiClient::parse_json(response).await.map_err(Self::map_error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
