//! Domain types and pure logic for the Atelier version-lifecycle core.
//!
//! Everything in this crate is I/O-free: the version model, the
//! active-version resolution rules, the credit cost table, and the batch
//! work-item types. Stateful services built on top of these live in
//! `atelier-store` and `atelier-pipeline`.

pub mod batch;
pub mod credits;
pub mod error;
pub mod resolver;
pub mod types;
pub mod version;
