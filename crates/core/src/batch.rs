//! Batch work-item, progress, and outcome types.
//!
//! A batch is ephemeral: it exists only for the duration of one
//! orchestration run and is never persisted. The orchestrator itself lives
//! in `atelier-pipeline`; this module holds the shapes it exchanges with the
//! UI plus the pre-flight validation of the work list.

use serde::{Deserialize, Serialize};

use crate::credits::OperationKind;
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Work items
// ---------------------------------------------------------------------------

/// Everything the generation adapter needs to produce one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationContext {
    /// The entity the produced version will belong to.
    pub parent_id: DbId,
    /// Billable operation kind; uniform across one batch.
    pub operation: OperationKind,
    /// Style name used for auto-naming the resulting version.
    pub style_name: Option<String>,
    /// Style/art parameters forwarded verbatim to the provider.
    pub style_params: serde_json::Value,
    /// Reference image for image-to-image generation consistency.
    pub reference_image_id: Option<DbId>,
}

/// One entry of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Display label, also the key under which errors are reported.
    pub label: String,
    pub context: GenerationContext,
}

// ---------------------------------------------------------------------------
// Progress and outcome
// ---------------------------------------------------------------------------

/// Snapshot emitted before each item starts, so a slow item is visibly in
/// progress rather than silently stalled.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub current_index: usize,
    pub total_count: usize,
    pub current_label: String,
}

/// Final tally of one orchestration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub succeeded_count: usize,
    pub failed_count: usize,
    /// One entry per failed item, formatted as `"{label}: {error}"`.
    pub errors: Vec<String>,
    /// Whether the run stopped early on a cancellation request. Items not
    /// attempted count as neither succeeded nor failed.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Pre-flight validation
// ---------------------------------------------------------------------------

/// Validate a work list before any worker call is issued.
///
/// An inconsistent list is a programming error and aborts the whole run, as
/// opposed to per-item failures which are collected during the loop.
/// Returns the batch's single operation kind.
pub fn validate_work_items(items: &[WorkItem]) -> Result<OperationKind, CoreError> {
    let Some(first) = items.first() else {
        return Err(CoreError::Validation(
            "Batch must contain at least one work item".to_string(),
        ));
    };

    for item in items {
        if item.label.trim().is_empty() {
            return Err(CoreError::Validation(
                "Every work item must carry a display label".to_string(),
            ));
        }
    }

    let kind = first.context.operation;
    if items.iter().any(|i| i.context.operation != kind) {
        return Err(CoreError::Validation(
            "All work items in a batch must share one operation kind".to_string(),
        ));
    }

    Ok(kind)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
