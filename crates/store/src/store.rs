//! Generic per-parent version store.
//!
//! One [`VersionStore`] instance manages the version collection of a single
//! parent entity. It applies every mutation optimistically to its cached
//! collection from the gateway's response, enforces the exactly-one-active
//! invariant after each call returns, and publishes a
//! [`StudioEvent`] for every completed mutation. [`VersionStore::refresh`]
//! is the authoritative reload: whenever local state and the backend
//! disagree, the reload wins.

use std::sync::Arc;

use tokio::sync::RwLock;
use validator::Validate;

use atelier_core::error::CoreError;
use atelier_core::resolver;
use atelier_core::types::DbId;
use atelier_core::version::{
    auto_version_name, map_validation, require_version_name, resolve_version_name,
    RenameVersionRequest, SaveVersionRequest, SourceKind, Version, VersionPayload,
};
use atelier_events::{EventBus, StudioEvent};

use crate::gateway::{GatewayError, PersistenceGateway};

/// Version collection of one parent entity, with invariant enforcement.
pub struct VersionStore<P: VersionPayload> {
    entity: &'static str,
    parent_id: DbId,
    gateway: Arc<dyn PersistenceGateway<P>>,
    bus: Arc<EventBus>,
    versions: RwLock<Vec<Version<P>>>,
}

impl<P: VersionPayload> VersionStore<P> {
    /// Create a store for one parent. The cache starts empty; call
    /// [`refresh`](Self::refresh) (or go through
    /// [`crate::registry::StoreRegistry`], which does) before reading.
    pub fn new(
        entity: &'static str,
        parent_id: DbId,
        gateway: Arc<dyn PersistenceGateway<P>>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            entity,
            parent_id,
            gateway,
            bus,
            versions: RwLock::new(Vec::new()),
        }
    }

    pub fn parent_id(&self) -> DbId {
        self.parent_id
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    // ── Read views ───────────────────────────────────────────────────

    /// Non-deleted versions, ordered by `version_number` ascending.
    pub async fn versions(&self) -> Vec<Version<P>> {
        let versions = self.versions.read().await;
        versions
            .iter()
            .filter(|v| !v.is_deleted())
            .cloned()
            .collect()
    }

    /// Soft-deleted versions, ordered by `version_number` ascending.
    pub async fn trash(&self) -> Vec<Version<P>> {
        let versions = self.versions.read().await;
        versions.iter().filter(|v| v.is_deleted()).cloned().collect()
    }

    /// The version currently displayed for this parent, per the resolution
    /// rule in [`atelier_core::resolver`].
    pub async fn active(&self) -> Option<Version<P>> {
        let versions = self.versions.read().await;
        resolver::resolve(&versions).cloned()
    }

    // ── Reconciliation ───────────────────────────────────────────────

    /// Authoritative reload: replace the cached collection wholesale with
    /// the backend's current state.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let mut rows = self
            .gateway
            .list(self.parent_id)
            .await
            .map_err(|e| self.map_gateway(e))?;
        rows.sort_by_key(|v| v.version_number);
        *self.versions.write().await = rows;
        Ok(())
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a new version.
    ///
    /// The gateway assigns the next version number (max existing including
    /// deleted, plus one). A missing or empty name fails validation unless
    /// the source is [`SourceKind::Generated`], which is auto-named. With
    /// `set_active` the previous active version is cleared; callers never
    /// observe two actives.
    pub async fn create(
        &self,
        payload: P,
        name: Option<&str>,
        source_kind: SourceKind,
        set_active: bool,
    ) -> Result<Version<P>, CoreError> {
        let name = resolve_version_name(name, source_kind)?;
        let created = self
            .gateway
            .create(self.parent_id, payload, &name, source_kind, set_active)
            .await
            .map_err(|e| self.map_gateway(e))?;

        {
            let mut versions = self.versions.write().await;
            if created.is_active {
                for v in versions.iter_mut() {
                    v.is_active = false;
                }
            }
            versions.push(created.clone());
            versions.sort_by_key(|v| v.version_number);
        }

        tracing::info!(
            entity = self.entity,
            parent_id = self.parent_id,
            version_id = created.id,
            version_number = created.version_number,
            set_active,
            "Version created",
        );
        self.bus.publish(StudioEvent::VersionCreated {
            entity: self.entity,
            parent_id: self.parent_id,
            version_id: created.id,
            is_active: created.is_active,
        });
        Ok(created)
    }

    /// Explicit "Save New Version" flow: name required, provenance manual.
    pub async fn save_version(
        &self,
        payload: P,
        request: &SaveVersionRequest,
    ) -> Result<Version<P>, CoreError> {
        request.validate().map_err(map_validation)?;
        self.create(
            payload,
            Some(&request.version_name),
            SourceKind::ManualUpload,
            request.set_active,
        )
        .await
    }

    /// Generation flow: auto-named from the style, activated immediately so
    /// the UI switches to the fresh artifact.
    pub async fn record_generated(
        &self,
        payload: P,
        style_name: Option<&str>,
    ) -> Result<Version<P>, CoreError> {
        let name = auto_version_name(chrono::Utc::now(), style_name);
        self.create(payload, Some(&name), SourceKind::Generated, true)
            .await
    }

    /// Make a version the active one.
    ///
    /// No-op success when it already is. Fails with `NotFound` when the id
    /// is unknown or soft-deleted; a deleted version must be restored before
    /// it can be activated.
    pub async fn activate(&self, version_id: DbId) -> Result<Version<P>, CoreError> {
        {
            let versions = self.versions.read().await;
            let current = versions
                .iter()
                .find(|v| v.id == version_id && !v.is_deleted())
                .ok_or(CoreError::NotFound {
                    entity: self.entity,
                    id: version_id,
                })?;
            if current.is_active {
                return Ok(current.clone());
            }
        }

        let mut activated = self
            .gateway
            .activate(self.parent_id, version_id)
            .await
            .map_err(|e| self.map_gateway(e))?;
        activated.is_active = true;

        {
            let mut versions = self.versions.write().await;
            for v in versions.iter_mut() {
                v.is_active = v.id == version_id;
            }
            if let Some(slot) = versions.iter_mut().find(|v| v.id == version_id) {
                *slot = activated.clone();
            }
        }

        tracing::info!(
            entity = self.entity,
            parent_id = self.parent_id,
            version_id,
            "Version activated",
        );
        self.bus.publish(StudioEvent::VersionActivated {
            entity: self.entity,
            parent_id: self.parent_id,
            version_id,
        });
        Ok(activated)
    }

    /// Rename a version. Any number of renames is allowed.
    pub async fn rename(
        &self,
        version_id: DbId,
        request: &RenameVersionRequest,
    ) -> Result<Version<P>, CoreError> {
        request.validate().map_err(map_validation)?;
        let name = require_version_name(&request.version_name)?;
        {
            let versions = self.versions.read().await;
            versions
                .iter()
                .find(|v| v.id == version_id && !v.is_deleted())
                .ok_or(CoreError::NotFound {
                    entity: self.entity,
                    id: version_id,
                })?;
        }

        let renamed = self
            .gateway
            .rename(version_id, &name)
            .await
            .map_err(|e| self.map_gateway(e))?;

        {
            let mut versions = self.versions.write().await;
            if let Some(slot) = versions.iter_mut().find(|v| v.id == version_id) {
                slot.version_name = renamed.version_name.clone();
            }
        }

        self.bus.publish(StudioEvent::VersionRenamed {
            entity: self.entity,
            parent_id: self.parent_id,
            version_id,
        });
        Ok(renamed)
    }

    /// Soft-delete a version and report the remaining active one.
    ///
    /// Returns the version that is active after the delete so the UI can
    /// switch the displayed artifact immediately, or `None` when the parent
    /// is left without versions. Idempotent for an already-deleted id.
    ///
    /// The gateway promotes the replacement in the same transaction as the
    /// delete; should it fail to, the store promotes the resolver fallback
    /// itself and reconciles with an explicit activate call.
    pub async fn soft_delete(&self, version_id: DbId) -> Result<Option<Version<P>>, CoreError> {
        {
            let versions = self.versions.read().await;
            let row = versions
                .iter()
                .find(|v| v.id == version_id)
                .ok_or(CoreError::NotFound {
                    entity: self.entity,
                    id: version_id,
                })?;
            if row.is_deleted() {
                return Ok(resolver::resolve(&versions).cloned());
            }
        }

        let outcome = self
            .gateway
            .soft_delete(version_id)
            .await
            .map_err(|e| self.map_gateway(e))?;

        {
            let mut versions = self.versions.write().await;
            if let Some(row) = versions.iter_mut().find(|v| v.id == version_id) {
                row.deleted_at = Some(chrono::Utc::now());
                row.is_active = false;
            }
            let new_active_id = outcome.new_active.as_ref().map(|v| v.id);
            for v in versions.iter_mut() {
                v.is_active = Some(v.id) == new_active_id;
            }
        }

        let remaining = match outcome.new_active {
            Some(active) => Some(active),
            None => self.promote_fallback().await?,
        };

        tracing::info!(
            entity = self.entity,
            parent_id = self.parent_id,
            version_id,
            new_active_id = remaining.as_ref().map(|v| v.id),
            "Version soft-deleted",
        );
        self.bus.publish(StudioEvent::VersionDeleted {
            entity: self.entity,
            parent_id: self.parent_id,
            version_id,
            new_active_id: remaining.as_ref().map(|v| v.id),
        });
        Ok(remaining)
    }

    /// Bring a version back from the trash. Restoring never reactivates;
    /// the caller decides separately whether to activate it.
    pub async fn restore(&self, version_id: DbId) -> Result<Version<P>, CoreError> {
        {
            let versions = self.versions.read().await;
            let row = versions
                .iter()
                .find(|v| v.id == version_id)
                .ok_or(CoreError::NotFound {
                    entity: self.entity,
                    id: version_id,
                })?;
            if !row.is_deleted() {
                return Ok(row.clone());
            }
        }

        let mut restored = self
            .gateway
            .restore(version_id)
            .await
            .map_err(|e| self.map_gateway(e))?;
        restored.deleted_at = None;
        restored.is_active = false;

        {
            let mut versions = self.versions.write().await;
            if let Some(slot) = versions.iter_mut().find(|v| v.id == version_id) {
                *slot = restored.clone();
            }
        }

        self.bus.publish(StudioEvent::VersionRestored {
            entity: self.entity,
            parent_id: self.parent_id,
            version_id,
        });
        Ok(restored)
    }

    /// Copy an existing version's payload into a new, inactive version.
    pub async fn duplicate(
        &self,
        version_id: DbId,
        new_name: &str,
    ) -> Result<Version<P>, CoreError> {
        let payload = {
            let versions = self.versions.read().await;
            versions
                .iter()
                .find(|v| v.id == version_id && !v.is_deleted())
                .map(|v| v.payload.clone())
                .ok_or(CoreError::NotFound {
                    entity: self.entity,
                    id: version_id,
                })?
        };
        self.create(payload, Some(new_name), SourceKind::Duplicate, false)
            .await
    }

    // ── Invariant enforcement ────────────────────────────────────────

    /// Promote the resolver fallback when non-deleted versions remain but
    /// none is active, reconciling the backend with an activate call.
    async fn promote_fallback(&self) -> Result<Option<Version<P>>, CoreError> {
        let fallback_id = {
            let versions = self.versions.read().await;
            if resolver::active_count(&versions) > 0 {
                return Ok(resolver::resolve(&versions).cloned());
            }
            resolver::fallback_active(&versions).map(|v| v.id)
        };
        let Some(fallback_id) = fallback_id else {
            return Ok(None);
        };

        tracing::warn!(
            entity = self.entity,
            parent_id = self.parent_id,
            version_id = fallback_id,
            "Backend reported no active version after delete; promoting fallback",
        );
        let promoted = self.activate(fallback_id).await?;
        Ok(Some(promoted))
    }

    fn map_gateway(&self, err: GatewayError) -> CoreError {
        match err {
            GatewayError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            GatewayError::Transport(msg) | GatewayError::Rejected(msg) => {
                CoreError::Persistence(msg)
            }
        }
    }
}
