//! First-load convenience policy.
//!
//! An empty parent silently receives a version named "Original" on first
//! load so the editor always has something to display. This is a decision
//! of the calling flow, not of [`VersionStore`] itself, which is why it
//! lives here as a free function rather than inside the store.

use atelier_core::error::CoreError;
use atelier_core::version::{SourceKind, Version, VersionPayload};

use crate::store::VersionStore;

/// Name given to the automatically created first version.
pub const ORIGINAL_VERSION_NAME: &str = "Original";

/// Ensure the parent has at least one version.
///
/// Creates an active version named "Original" from `payload` when the
/// parent has none. Deleted versions do not count, so a fully-trashed
/// parent is reseeded. Returns the version the parent displays afterwards.
pub async fn ensure_original_version<P: VersionPayload>(
    store: &VersionStore<P>,
    payload: P,
) -> Result<Version<P>, CoreError> {
    if let Some(active) = store.active().await {
        return Ok(active);
    }
    store
        .create(
            payload,
            Some(ORIGINAL_VERSION_NAME),
            SourceKind::ManualUpload,
            true,
        )
        .await
}
