//! In-process event bus for the Atelier core.
//!
//! The UI subscribes to state changes instead of owning them: every
//! completed store mutation and every batch transition is published here as
//! a typed [`bus::StudioEvent`].

pub mod bus;

pub use bus::{EventBus, StudioEvent};
