//! Orchestrator — drives a [`RestartSequence`] through the compose executor.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::sequence::{RestartSequence, RestartState};
use crate::compose::ComposeOps;

/// Applies kill → pull → rm → up to a compose service.
///
/// Outcomes are terminal: they are logged here and handed back only so the
/// caller can record them. Nothing is retried or rolled back.
#[derive(Clone)]
pub struct Restarter {
    compose: Arc<dyn ComposeOps>,
}

impl Restarter {
    pub fn new(compose: Arc<dyn ComposeOps>) -> Self {
        Self { compose }
    }

    pub async fn restart(&self, service: &str) -> RestartState {
        let mut sequence = RestartSequence::new(service);
        let mut step = match sequence.begin() {
            Ok(step) => step,
            Err(e) => {
                error!(container = %service, "Restart sequence could not start: {}", e);
                return sequence.state().clone();
            }
        };

        loop {
            debug!(container = %service, step = %step, "Running restart step");
            let result = self.compose.run(step.subcommand(), step.args(service)).await;
            if let Err(e) = &result {
                error!("Failed to {} {}: {}", step.failure_phrase(), service, e);
            }

            match sequence.complete(result.as_ref().map(|_| ())) {
                Ok(Some(next)) => step = next,
                Ok(None) => break,
                Err(e) => {
                    error!(container = %service, "Restart sequence out of order: {}", e);
                    break;
                }
            }
        }

        if *sequence.state() == RestartState::Done {
            info!("Container {} has been updated and restarted successfully.", sequence.service());
        }
        sequence.state().clone()
    }
}
