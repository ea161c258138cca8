//! Batch generation orchestration.
//!
//! [`orchestrator::BatchOrchestrator`] runs a generation adapter call for
//! each item in an ordered work list, strictly sequentially, collecting
//! per-item failures instead of aborting, pacing items with a fixed delay,
//! and persisting every produced artifact immediately through
//! `atelier-store`. [`ledger::CreditLedger`] gates the run with advisory
//! credit admission before the first worker call.

pub mod adapter;
pub mod config;
pub mod ledger;
pub mod orchestrator;

pub use adapter::{GenerationAdapter, GenerationError};
pub use config::BatchConfig;
pub use ledger::{CreditBalanceProvider, CreditLedger};
pub use orchestrator::BatchOrchestrator;
