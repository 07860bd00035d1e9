pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;

pub use runtime::{TurnInput, TurnOutcome};
pub use state::Assistant;
