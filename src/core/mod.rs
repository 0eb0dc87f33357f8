//! Process-wide runtime state for serve mode.

mod state;

pub use state::*;
