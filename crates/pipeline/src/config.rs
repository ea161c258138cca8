//! Batch orchestration settings.
//!
//! Passed in explicitly at construction time; persisting user preferences
//! to disk is the host application's concern, not the orchestrator's.

use std::time::Duration;

use atelier_core::error::CoreError;

/// Default pause between consecutive work items.
pub const DEFAULT_INTER_ITEM_DELAY: Duration = Duration::from_millis(500);

/// Default bound on a single generation call.
pub const DEFAULT_PER_ITEM_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for one orchestrator instance.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Pause between items (never after the last). Part of the contract
    /// with the upstream provider's rate limiting, so it must be non-zero.
    pub inter_item_delay: Duration,
    /// Bound on a single generation call. Expiry is treated exactly like a
    /// worker failure. `None` disables the bound, at the price of a hung
    /// call stalling the batch indefinitely.
    pub per_item_timeout: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_item_delay: DEFAULT_INTER_ITEM_DELAY,
            per_item_timeout: Some(DEFAULT_PER_ITEM_TIMEOUT),
        }
    }
}

impl BatchConfig {
    /// Reject configurations that would break the pacing contract.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.inter_item_delay.is_zero() {
            return Err(CoreError::Validation(
                "inter_item_delay must be non-zero".to_string(),
            ));
        }
        if matches!(self.per_item_timeout, Some(t) if t.is_zero()) {
            return Err(CoreError::Validation(
                "per_item_timeout must be non-zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_delay_rejected() {
        let config = BatchConfig {
            inter_item_delay: Duration::ZERO,
            ..BatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = BatchConfig {
            per_item_timeout: Some(Duration::ZERO),
            ..BatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabled_timeout_is_valid() {
        let config = BatchConfig {
            per_item_timeout: None,
            ..BatchConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
