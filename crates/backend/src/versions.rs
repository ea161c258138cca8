//! HTTP persistence gateway for version records.
//!
//! One gateway instance per version resource; the three axes the product
//! exposes map onto three REST collections sharing the same shape:
//! `character-data-versions`, `character-image-versions`, and
//! `moodboard-item-versions`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use atelier_core::types::DbId;
use atelier_core::version::{SourceKind, Version, VersionPayload};
use atelier_store::{GatewayError, PersistenceGateway, SoftDeleteOutcome};

use crate::client::{ApiClient, ApiError};

/// [`PersistenceGateway`] over the backend's version REST collections.
pub struct HttpVersionGateway {
    api: ApiClient,
    entity: &'static str,
    resource: &'static str,
}

impl HttpVersionGateway {
    /// * `entity`   - entity kind used in error reporting, e.g.
    ///   `"moodboard_item"`.
    /// * `resource` - REST collection segment, e.g.
    ///   `"moodboard-item-versions"`.
    pub fn new(api: ApiClient, entity: &'static str, resource: &'static str) -> Self {
        Self {
            api,
            entity,
            resource,
        }
    }

    fn map_error(&self, err: ApiError, id: DbId) -> GatewayError {
        match err {
            ApiError::Request(e) => GatewayError::Transport(e.to_string()),
            ApiError::Api { status: 404, .. } => GatewayError::NotFound {
                entity: self.entity,
                id,
            },
            ApiError::Api { status, body } => {
                GatewayError::Rejected(format!("status {status}: {body}"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateVersionBody<'a, P> {
    parent_id: DbId,
    version_name: &'a str,
    source_kind: SourceKind,
    set_active: bool,
    payload: &'a P,
}

#[derive(Serialize)]
struct ActivateBody {
    parent_id: DbId,
}

#[derive(Serialize)]
struct RenameBody<'a> {
    version_name: &'a str,
}

#[derive(Deserialize)]
#[serde(bound = "P: DeserializeOwned")]
struct SoftDeleteResponse<P> {
    new_active: Option<Version<P>>,
}

// ---------------------------------------------------------------------------
// Gateway implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl<P> PersistenceGateway<P> for HttpVersionGateway
where
    P: VersionPayload + Serialize + DeserializeOwned,
{
    async fn list(&self, parent_id: DbId) -> Result<Vec<Version<P>>, GatewayError> {
        let response = self
            .api
            .http()
            .get(self.api.url(self.resource))
            .query(&[("parent_id", parent_id)])
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        ApiClient::parse_json(response)
            .await
            .map_err(|e| self.map_error(e, parent_id))
    }

    async fn create(
        &self,
        parent_id: DbId,
        payload: P,
        name: &str,
        source_kind: SourceKind,
        set_active: bool,
    ) -> Result<Version<P>, GatewayError> {
        let body = CreateVersionBody {
            parent_id,
            version_name: name,
            source_kind,
            set_active,
            payload: &payload,
        };
        let response = self
            .api
            .http()
            .post(self.api.url(self.resource))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        ApiClient::parse_json(response)
            .await
            .map_err(|e| self.map_error(e, parent_id))
    }

    async fn activate(
        &self,
        parent_id: DbId,
        version_id: DbId,
    ) -> Result<Version<P>, GatewayError> {
        let response = self
            .api
            .http()
            .post(self.api.url(&format!("{}/{}/activate", self.resource, version_id)))
            .json(&ActivateBody { parent_id })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        ApiClient::parse_json(response)
            .await
            .map_err(|e| self.map_error(e, version_id))
    }

    async fn rename(&self, version_id: DbId, name: &str) -> Result<Version<P>, GatewayError> {
        let response = self
            .api
            .http()
            .patch(self.api.url(&format!("{}/{}", self.resource, version_id)))
            .json(&RenameBody { version_name: name })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        ApiClient::parse_json(response)
            .await
            .map_err(|e| self.map_error(e, version_id))
    }

    async fn soft_delete(&self, version_id: DbId) -> Result<SoftDeleteOutcome<P>, GatewayError> {
        let response = self
            .api
            .http()
            .delete(self.api.url(&format!("{}/{}", self.resource, version_id)))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let parsed: SoftDeleteResponse<P> = ApiClient::parse_json(response)
            .await
            .map_err(|e| self.map_error(e, version_id))?;
        Ok(SoftDeleteOutcome {
            new_active: parsed.new_active,
        })
    }

    async fn restore(&self, version_id: DbId) -> Result<Version<P>, GatewayError> {
        let response = self
            .api
            .http()
            .post(self.api.url(&format!("{}/{}/restore", self.resource, version_id)))
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        ApiClient::parse_json(response)
            .await
            .map_err(|e| self.map_error(e, version_id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn gateway() -> HttpVersionGateway {
        HttpVersionGateway::new(
            ApiClient::new("https://studio.example/api".to_string()),
            "moodboard_item",
            "moodboard-item-versions",
        )
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = gateway().map_error(
            ApiError::Api {
                status: 404,
                body: String::new(),
            },
            7,
        );
        assert_matches!(
            err,
            GatewayError::NotFound {
                entity: "moodboard_item",
                id: 7,
            }
        );
    }

    #[test]
    fn other_statuses_map_to_rejected() {
        let err = gateway().map_error(
            ApiError::Api {
                status: 409,
                body: "version already active".to_string(),
            },
            7,
        );
        assert_matches!(err, GatewayError::Rejected(msg) if msg.contains("409"));
    }
}
