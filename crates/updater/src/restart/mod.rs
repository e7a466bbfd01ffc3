//! Restart module — lifecycle state machine and the orchestrator driving it.

pub mod orchestrator;
pub mod sequence;

pub use orchestrator::Restarter;
pub use sequence::{RestartSequence, RestartState, RestartStep, TransitionError};
