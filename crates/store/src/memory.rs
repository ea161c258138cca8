//! In-memory persistence gateway.
//!
//! Backs unit and integration tests and the offline preview mode. Mirrors
//! the backend's semantics: gateway-assigned ids, never-reused version
//! numbers (deleted rows keep theirs), and transactional active-flag
//! promotion on delete.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use atelier_core::types::DbId;
use atelier_core::version::{SourceKind, Version, VersionPayload};

use crate::gateway::{GatewayError, PersistenceGateway, SoftDeleteOutcome};

struct MemoryState<P> {
    next_id: DbId,
    rows: Vec<Version<P>>,
}

/// Process-local [`PersistenceGateway`] over a plain row vector.
///
/// A single gateway instance can hold rows for any number of parents, the
/// same way one backend table does.
pub struct InMemoryGateway<P> {
    entity: &'static str,
    state: Mutex<MemoryState<P>>,
}

impl<P: VersionPayload> InMemoryGateway<P> {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            state: Mutex::new(MemoryState {
                next_id: 1,
                rows: Vec::new(),
            }),
        }
    }

    fn next_version_number(rows: &[Version<P>], parent_id: DbId) -> i32 {
        rows.iter()
            .filter(|v| v.parent_id == parent_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    fn not_found(&self, id: DbId) -> GatewayError {
        GatewayError::NotFound {
            entity: self.entity,
            id,
        }
    }
}

#[async_trait]
impl<P: VersionPayload> PersistenceGateway<P> for InMemoryGateway<P> {
    async fn list(&self, parent_id: DbId) -> Result<Vec<Version<P>>, GatewayError> {
        let state = self.state.lock().expect("memory gateway lock poisoned");
        let mut rows: Vec<Version<P>> = state
            .rows
            .iter()
            .filter(|v| v.parent_id == parent_id)
            .cloned()
            .collect();
        rows.sort_by_key(|v| v.version_number);
        Ok(rows)
    }

    async fn create(
        &self,
        parent_id: DbId,
        payload: P,
        name: &str,
        source_kind: SourceKind,
        set_active: bool,
    ) -> Result<Version<P>, GatewayError> {
        let mut state = self.state.lock().expect("memory gateway lock poisoned");
        let id = state.next_id;
        state.next_id += 1;
        let version_number = Self::next_version_number(&state.rows, parent_id);

        if set_active {
            for row in state.rows.iter_mut().filter(|v| v.parent_id == parent_id) {
                row.is_active = false;
            }
        }

        let version = Version {
            id,
            parent_id,
            version_number,
            version_name: name.to_string(),
            payload,
            source_kind,
            is_active: set_active,
            deleted_at: None,
            created_at: Utc::now(),
        };
        state.rows.push(version.clone());
        Ok(version)
    }

    async fn activate(
        &self,
        parent_id: DbId,
        version_id: DbId,
    ) -> Result<Version<P>, GatewayError> {
        let mut state = self.state.lock().expect("memory gateway lock poisoned");
        let exists = state
            .rows
            .iter()
            .any(|v| v.id == version_id && v.parent_id == parent_id && !v.is_deleted());
        if !exists {
            return Err(self.not_found(version_id));
        }

        let mut activated = None;
        for row in state.rows.iter_mut().filter(|v| v.parent_id == parent_id) {
            row.is_active = row.id == version_id;
            if row.is_active {
                activated = Some(row.clone());
            }
        }
        activated.ok_or_else(|| self.not_found(version_id))
    }

    async fn rename(&self, version_id: DbId, name: &str) -> Result<Version<P>, GatewayError> {
        let mut state = self.state.lock().expect("memory gateway lock poisoned");
        let row = state
            .rows
            .iter_mut()
            .find(|v| v.id == version_id && !v.is_deleted())
            .ok_or_else(|| self.not_found(version_id))?;
        row.version_name = name.to_string();
        Ok(row.clone())
    }

    async fn soft_delete(&self, version_id: DbId) -> Result<SoftDeleteOutcome<P>, GatewayError> {
        let mut state = self.state.lock().expect("memory gateway lock poisoned");
        let (parent_id, was_active) = {
            let row = state
                .rows
                .iter_mut()
                .find(|v| v.id == version_id && !v.is_deleted())
                .ok_or_else(|| self.not_found(version_id))?;
            row.deleted_at = Some(Utc::now());
            let was_active = row.is_active;
            row.is_active = false;
            (row.parent_id, was_active)
        };

        if was_active {
            // Promote the lowest-numbered survivor, as the backend does in
            // the same transaction as the delete.
            let promote_id = state
                .rows
                .iter()
                .filter(|v| v.parent_id == parent_id && !v.is_deleted())
                .min_by_key(|v| v.version_number)
                .map(|v| v.id);
            if let Some(id) = promote_id {
                for row in state.rows.iter_mut() {
                    if row.id == id {
                        row.is_active = true;
                    }
                }
            }
        }

        let new_active = state
            .rows
            .iter()
            .find(|v| v.parent_id == parent_id && v.is_active && !v.is_deleted())
            .cloned();
        Ok(SoftDeleteOutcome { new_active })
    }

    async fn restore(&self, version_id: DbId) -> Result<Version<P>, GatewayError> {
        let mut state = self.state.lock().expect("memory gateway lock poisoned");
        let row = state
            .rows
            .iter_mut()
            .find(|v| v.id == version_id && v.is_deleted())
            .ok_or_else(|| self.not_found(version_id))?;
        row.deleted_at = None;
        row.is_active = false;
        Ok(row.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
