use crate::types::DbId;

/// Error taxonomy shared across the workspace.
///
/// `Generation` and `Persistence` are deliberately distinct: the first means
/// the artifact was never produced, the second means it was produced but not
/// durably recorded. The UI treats them differently (regenerate vs. retry
/// saving), so nothing in this workspace is allowed to collapse them.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient credits: the operation requires {required} credits but only {available} are available")]
    CreditShortfall { required: i64, available: i64 },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Artifact produced but not saved: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What the user should do about a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryHint {
    /// Retrying will not help (bad input, missing entity, shortfall).
    NoRetry,
    /// The artifact was never produced; run the generation again.
    Regenerate,
    /// The artifact exists but was not recorded; retry the save only.
    RetrySave,
}

impl CoreError {
    /// Map an error to the retry action the UI should offer.
    pub fn retry_hint(&self) -> RetryHint {
        match self {
            Self::Generation(_) => RetryHint::Regenerate,
            Self::Persistence(_) => RetryHint::RetrySave,
            _ => RetryHint::NoRetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_failure_hints_regenerate() {
        let err = CoreError::Generation("provider rejected the prompt".to_string());
        assert_eq!(err.retry_hint(), RetryHint::Regenerate);
    }

    #[test]
    fn persistence_failure_hints_retry_save() {
        let err = CoreError::Persistence("backend returned 503".to_string());
        assert_eq!(err.retry_hint(), RetryHint::RetrySave);
    }

    #[test]
    fn validation_failure_hints_no_retry() {
        let err = CoreError::Validation("name required".to_string());
        assert_eq!(err.retry_hint(), RetryHint::NoRetry);
    }

    #[test]
    fn shortfall_message_names_both_amounts() {
        let err = CoreError::CreditShortfall {
            required: 20,
            available: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("20"));
        assert!(msg.contains("3"));
    }
}
