//! Client-side credit admission control.
//!
//! The ledger caches the backend balance and answers "can this operation
//! proceed" before any network call is issued. It is advisory UX, not a
//! security boundary: the backend stays authoritative, deducts only on
//! server-confirmed successes, and the client never predicts the
//! post-operation balance beyond a courtesy display.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use atelier_core::credits::{self, CostEstimate, OperationKind};
use atelier_core::error::CoreError;

/// Backend balance lookup.
#[async_trait]
pub trait CreditBalanceProvider: Send + Sync {
    async fn balance(&self) -> Result<i64, CoreError>;
}

/// Cached credit balance plus the admission checks derived from it.
///
/// The cache is read-only during a batch run and refreshed after every run
/// completes, successful or not.
pub struct CreditLedger {
    provider: Arc<dyn CreditBalanceProvider>,
    balance: RwLock<Option<i64>>,
}

impl CreditLedger {
    /// Create a ledger with no cached balance. Call
    /// [`refresh`](Self::refresh) before the first admission check.
    pub fn new(provider: Arc<dyn CreditBalanceProvider>) -> Self {
        Self {
            provider,
            balance: RwLock::new(None),
        }
    }

    /// Pull the current balance from the backend and cache it.
    pub async fn refresh(&self) -> Result<i64, CoreError> {
        let balance = self.provider.balance().await?;
        *self.balance.write().expect("credit balance lock poisoned") = Some(balance);
        Ok(balance)
    }

    /// Last balance seen from the backend, if any.
    pub fn cached_balance(&self) -> Option<i64> {
        *self.balance.read().expect("credit balance lock poisoned")
    }

    /// Cost estimate for a batch of the given kind.
    pub fn estimate(&self, kind: OperationKind, item_count: u32) -> CostEstimate {
        credits::estimate(kind, item_count)
    }

    /// Courtesy projection of the balance after a successful run. Display
    /// only; the backend remains the source of truth.
    pub fn projected_balance(&self, cost: i64) -> Option<i64> {
        self.cached_balance().map(|b| b - cost)
    }

    /// Whether the cached balance covers the cost. An unknown balance is
    /// not admitted; refresh first.
    pub fn can_afford(&self, cost: i64) -> bool {
        credits::can_afford(cost, self.cached_balance().unwrap_or(0))
    }

    /// Human message for an unaffordable operation, naming the required and
    /// available amounts. `None` when the operation is affordable.
    pub fn explain_shortfall(&self, cost: i64) -> Option<String> {
        credits::shortfall_message(cost, self.cached_balance().unwrap_or(0))
    }

    /// Structured admission check used by the orchestrator's pre-flight.
    pub fn check_admission(&self, cost: i64) -> Result<(), CoreError> {
        let available = self.cached_balance().unwrap_or(0);
        if credits::can_afford(cost, available) {
            Ok(())
        } else {
            Err(CoreError::CreditShortfall {
                required: cost,
                available,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
