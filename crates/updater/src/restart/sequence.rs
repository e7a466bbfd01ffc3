//! Sequence — the kill → pull → rm → up state machine for one service.
//!
//! ```text
//! Idle → Killing → Pulling → Removing → Starting → Done
//!          └─────────┴──────────┴──────────┴──────→ Failed
//! ```
//!
//! `Done` and `Failed` are terminal. A fresh dispatch builds a new sequence.

use std::fmt;

use thiserror::Error;

use crate::compose::CommandError;

/// One lifecycle operation applied to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartStep {
    Kill,
    Pull,
    Remove,
    Start,
}

impl RestartStep {
    /// Compose subcommand for this step.
    pub fn subcommand(self) -> &'static str {
        match self {
            RestartStep::Kill => "kill",
            RestartStep::Pull => "pull",
            RestartStep::Remove => "rm",
            RestartStep::Start => "up",
        }
    }

    /// Arguments after the subcommand, scoped to `service`.
    pub fn args(self, service: &str) -> Vec<String> {
        match self {
            RestartStep::Kill | RestartStep::Pull => vec![service.to_string()],
            RestartStep::Remove => vec!["-f".to_string(), service.to_string()],
            RestartStep::Start => vec!["-d".to_string(), service.to_string()],
        }
    }

    pub fn next(self) -> Option<RestartStep> {
        match self {
            RestartStep::Kill => Some(RestartStep::Pull),
            RestartStep::Pull => Some(RestartStep::Remove),
            RestartStep::Remove => Some(RestartStep::Start),
            RestartStep::Start => None,
        }
    }

    /// Human phrase used in failure logs, e.g. "pull the latest image for".
    pub fn failure_phrase(self) -> &'static str {
        match self {
            RestartStep::Kill => "kill container",
            RestartStep::Pull => "pull the latest image for",
            RestartStep::Remove => "remove container",
            RestartStep::Start => "start container",
        }
    }
}

impl fmt::Display for RestartStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartState {
    Idle,
    Killing,
    Pulling,
    Removing,
    Starting,
    Done,
    Failed { step: RestartStep, reason: String },
}

impl RestartState {
    fn running(step: RestartStep) -> Self {
        match step {
            RestartStep::Kill => RestartState::Killing,
            RestartStep::Pull => RestartState::Pulling,
            RestartStep::Remove => RestartState::Removing,
            RestartStep::Start => RestartState::Starting,
        }
    }

    /// The step in flight, if any.
    pub fn active_step(&self) -> Option<RestartStep> {
        match self {
            RestartState::Killing => Some(RestartStep::Kill),
            RestartState::Pulling => Some(RestartStep::Pull),
            RestartState::Removing => Some(RestartStep::Remove),
            RestartState::Starting => Some(RestartStep::Start),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RestartState::Done | RestartState::Failed { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("sequence already started (state: {0:?})")]
    AlreadyStarted(RestartState),
    #[error("no step in flight (state: {0:?})")]
    NotRunning(RestartState),
}

/// State machine for one dispatch. Never moves backwards.
#[derive(Debug, Clone)]
pub struct RestartSequence {
    service: String,
    state: RestartState,
}

impl RestartSequence {
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into(), state: RestartState::Idle }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn state(&self) -> &RestartState {
        &self.state
    }

    /// `Idle → Killing`. Returns the first step to run.
    pub fn begin(&mut self) -> Result<RestartStep, TransitionError> {
        if self.state != RestartState::Idle {
            return Err(TransitionError::AlreadyStarted(self.state.clone()));
        }
        self.state = RestartState::running(RestartStep::Kill);
        Ok(RestartStep::Kill)
    }

    /// Record the outcome of the step in flight.
    ///
    /// Returns the next step to run, or `None` once the sequence is terminal.
    pub fn complete(
        &mut self,
        result: Result<(), &CommandError>,
    ) -> Result<Option<RestartStep>, TransitionError> {
        let step = self
            .state
            .active_step()
            .ok_or_else(|| TransitionError::NotRunning(self.state.clone()))?;

        match result {
            Err(e) => {
                self.state = RestartState::Failed { step, reason: e.to_string() };
                Ok(None)
            }
            Ok(()) => match step.next() {
                Some(next) => {
                    self.state = RestartState::running(next);
                    Ok(Some(next))
                }
                None => {
                    self.state = RestartState::Done;
                    Ok(None)
                }
            },
        }
    }
}
