//! Version entity model, payload types, and request DTOs.
//!
//! A [`Version`] is one immutable generation or save attempt belonging to a
//! parent entity (character, moodboard item). The model is generic over the
//! payload so the three version axes the product exposes (character data,
//! character image, moodboard frame) share one implementation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Source kind
// ---------------------------------------------------------------------------

/// Provenance of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Produced by a generation run.
    Generated,
    /// Saved explicitly by the user (manual save or file upload).
    ManualUpload,
    /// Imported from an external URL.
    UrlImport,
    /// Copied from an existing version.
    Duplicate,
}

impl SourceKind {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Generated => "Generated",
            Self::ManualUpload => "Manual",
            Self::UrlImport => "URL import",
            Self::Duplicate => "Duplicate",
        }
    }
}

// ---------------------------------------------------------------------------
// Version entity
// ---------------------------------------------------------------------------

/// Marker bound for version payloads.
pub trait VersionPayload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> VersionPayload for T {}

/// One generation/save attempt belonging to a parent entity.
///
/// `version_number` is strictly increasing within a parent and never reused:
/// soft-deleted rows keep their number, so the backend assigns
/// `max(existing, including deleted) + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version<P> {
    pub id: DbId,
    pub parent_id: DbId,
    pub version_number: i32,
    pub version_name: String,
    pub payload: P,
    pub source_kind: SourceKind,
    pub is_active: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl<P> Version<P> {
    /// Whether this version has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Concrete payloads
// ---------------------------------------------------------------------------

/// Full character-trait snapshot for a character data version.
///
/// The trait taxonomy is owned by the form layer; this core treats it as an
/// opaque document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub traits: serde_json::Value,
}

/// A generated or uploaded character image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAsset {
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub generation_metadata: Option<serde_json::Value>,
}

/// One cell of a moodboard beat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodboardFrame {
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub prompt: Option<String>,
    pub generation_metadata: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Request body for the explicit "Save New Version" flow.
///
/// The name is required here; generation flows auto-name instead.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveVersionRequest {
    #[validate(length(min = 1, message = "Version name is required"))]
    pub version_name: String,
    pub set_active: bool,
}

/// Request body for renaming a version.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenameVersionRequest {
    #[validate(length(min = 1, message = "Version name is required"))]
    pub version_name: String,
}

/// Map validator output onto the core error taxonomy.
pub fn map_validation(err: validator::ValidationErrors) -> CoreError {
    CoreError::Validation(err.to_string())
}

// ---------------------------------------------------------------------------
// Name policy
// ---------------------------------------------------------------------------

/// Build the automatic name for a generated version.
///
/// Uses the style name when the flow supplies one, otherwise a plain
/// generation timestamp.
pub fn auto_version_name(created_at: Timestamp, style_name: Option<&str>) -> String {
    let stamp = created_at.format("%Y-%m-%d %H:%M");
    match style_name.map(str::trim).filter(|s| !s.is_empty()) {
        Some(style) => format!("{style} {stamp}"),
        None => format!("Generated {stamp}"),
    }
}

/// Validate and normalize a user-supplied version name.
///
/// Rejects names that are empty after trimming; the validator derive on the
/// request DTOs only catches the zero-length case.
pub fn require_version_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Version name is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Resolve the name for a new version under the source-kind policy.
///
/// An empty name is only acceptable for generated versions, which are
/// auto-named; every other flow must supply one.
pub fn resolve_version_name(
    name: Option<&str>,
    source_kind: SourceKind,
) -> Result<String, CoreError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => Ok(n.to_string()),
        None if source_kind == SourceKind::Generated => {
            Ok(auto_version_name(Utc::now(), None))
        }
        None => Err(CoreError::Validation(
            "Version name is required".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
