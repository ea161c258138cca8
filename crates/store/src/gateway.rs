//! Persistence collaborator contract.
//!
//! The backend owns the wire format and the authoritative state; the store
//! only requires these operations. `atelier-backend` implements the trait
//! over HTTP, [`crate::memory::InMemoryGateway`] implements it in-process.

use async_trait::async_trait;

use atelier_core::types::DbId;
use atelier_core::version::{SourceKind, Version, VersionPayload};

/// Result of a soft delete, as reported by the backend.
#[derive(Debug, Clone)]
pub struct SoftDeleteOutcome<P> {
    /// The version that is active after the delete: the promoted
    /// replacement when the deleted version was active, otherwise the
    /// unchanged current active. `None` when the parent is left without
    /// non-deleted versions.
    pub new_active: Option<Version<P>>,
}

/// Errors surfaced by a persistence gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The referenced row does not exist (or is in the wrong state for the
    /// operation, e.g. restoring a live version).
    #[error("{entity} not found: id {id}")]
    NotFound { entity: &'static str, id: DbId },

    /// The request never completed (network, DNS, TLS, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered but refused the operation.
    #[error("Backend rejected the request: {0}")]
    Rejected(String),
}

/// CRUD over version records for one entity kind.
///
/// `list` returns **all** rows for the parent, including soft-deleted ones;
/// the store derives the live and trash views from the full set. Version
/// numbers are assigned by the gateway: max across all rows for the parent
/// (deleted included) plus one, so numbers are never reused.
#[async_trait]
pub trait PersistenceGateway<P: VersionPayload>: Send + Sync {
    async fn list(&self, parent_id: DbId) -> Result<Vec<Version<P>>, GatewayError>;

    async fn create(
        &self,
        parent_id: DbId,
        payload: P,
        name: &str,
        source_kind: SourceKind,
        set_active: bool,
    ) -> Result<Version<P>, GatewayError>;

    async fn activate(&self, parent_id: DbId, version_id: DbId)
        -> Result<Version<P>, GatewayError>;

    async fn rename(&self, version_id: DbId, name: &str) -> Result<Version<P>, GatewayError>;

    /// Soft-delete a version. When the deleted version was active, the
    /// gateway promotes the lowest-numbered remaining version and reports it
    /// in the outcome.
    async fn soft_delete(&self, version_id: DbId) -> Result<SoftDeleteOutcome<P>, GatewayError>;

    /// Clear the delete marker. The restored version comes back inactive.
    async fn restore(&self, version_id: DbId) -> Result<Version<P>, GatewayError>;
}
