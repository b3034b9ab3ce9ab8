//! State management with actor pattern
//!
//! StateManager owns the PlaceStore and processes messages via channels,
//! providing shared async access to persistent journey state.

mod manager;
mod messages;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
