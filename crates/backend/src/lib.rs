//! HTTP implementations of the Atelier collaborator contracts.
//!
//! Wraps the production REST backend with [`reqwest`]: version CRUD for the
//! store, single-item generation for the orchestrator, and the credit
//! balance lookup for the ledger. The backend owns the wire format; this
//! crate only mirrors it.

pub mod client;
pub mod credits;
pub mod generation;
pub mod versions;

pub use client::{ApiClient, ApiError};
pub use credits::HttpCreditProvider;
pub use generation::HttpGenerationAdapter;
pub use versions::HttpVersionGateway;
