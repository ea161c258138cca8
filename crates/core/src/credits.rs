//! Credit cost table and admission arithmetic.
//!
//! Pure pre-flight logic: the fixed per-kind unit costs, batch cost
//! estimation, and the shortfall message shown when the user cannot afford
//! an operation. The stateful ledger that caches the backend balance lives
//! in `atelier-pipeline`; the backend remains authoritative for the real
//! balance, everything here is advisory UX.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Unit costs
// ---------------------------------------------------------------------------

/// Credits charged per generated key action.
pub const KEY_ACTION_GENERATION_UNIT_COST: i64 = 2;
/// Credits charged per generated prompt.
pub const PROMPT_GENERATION_UNIT_COST: i64 = 1;
/// Credits charged per generated image.
pub const IMAGE_GENERATION_UNIT_COST: i64 = 5;

// ---------------------------------------------------------------------------
// Operation kinds
// ---------------------------------------------------------------------------

/// The billable operation kinds recognized by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    KeyActionGeneration,
    PromptGeneration,
    ImageGeneration,
}

impl OperationKind {
    /// Fixed unit cost of one item of this kind.
    pub fn unit_cost(self) -> i64 {
        match self {
            Self::KeyActionGeneration => KEY_ACTION_GENERATION_UNIT_COST,
            Self::PromptGeneration => PROMPT_GENERATION_UNIT_COST,
            Self::ImageGeneration => IMAGE_GENERATION_UNIT_COST,
        }
    }

    /// Stable identifier used in URLs and event payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyActionGeneration => "key_action_generation",
            Self::PromptGeneration => "prompt_generation",
            Self::ImageGeneration => "image_generation",
        }
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::KeyActionGeneration => "Key action generation",
            Self::PromptGeneration => "Prompt generation",
            Self::ImageGeneration => "Image generation",
        }
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Estimated cost of a batch, with the courtesy post-run projection shown in
/// the confirm dialog.
#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub kind: OperationKind,
    pub item_count: u32,
    pub total_cost: i64,
}

/// Total cost of `item_count` items of the given kind.
pub fn estimate_cost(kind: OperationKind, item_count: u32) -> i64 {
    kind.unit_cost() * i64::from(item_count)
}

/// Build a [`CostEstimate`] for a batch.
pub fn estimate(kind: OperationKind, item_count: u32) -> CostEstimate {
    CostEstimate {
        kind,
        item_count,
        total_cost: estimate_cost(kind, item_count),
    }
}

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// Whether a balance covers a cost. An exactly-sufficient balance is enough.
pub fn can_afford(cost: i64, available: i64) -> bool {
    available >= cost
}

/// Human message for an unaffordable operation, naming both the required and
/// the available amounts. Returns `None` when the operation is affordable.
pub fn shortfall_message(cost: i64, available: i64) -> Option<String> {
    if can_afford(cost, available) {
        None
    } else {
        Some(format!(
            "Insufficient credits: the operation requires {cost} credits but only {available} are available"
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
