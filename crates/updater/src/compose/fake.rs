//! Fake — recording test double for the compose tool.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::executor::{CommandError, ComposeOps};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub subcommand: String,
    pub args: Vec<String>,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Invocation>,
    failing: Vec<(String, String)>,
}

/// Records every `run` and fails the subcommands it was told to fail.
#[derive(Default)]
pub struct FakeCompose {
    inner: Mutex<Inner>,
}

impl FakeCompose {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every future `subcommand` exit non-zero with `output`.
    pub fn fail_on(&self, subcommand: &str, output: &str) {
        self.state().failing.push((subcommand.to_string(), output.to_string()));
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.state().calls.clone()
    }

    /// Just the subcommands, in call order.
    pub fn subcommands(&self) -> Vec<String> {
        self.state().calls.iter().map(|c| c.subcommand.clone()).collect()
    }
}

impl ComposeOps for FakeCompose {
    fn run<'a>(
        &'a self,
        subcommand: &'a str,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state();
            state.calls.push(Invocation { subcommand: subcommand.to_string(), args });
            match state.failing.iter().find(|(sub, _)| sub == subcommand) {
                Some((_, output)) => Err(CommandError::Failed {
                    command: format!("docker compose {}", subcommand),
                    status: exit_status(1),
                    output: output.clone(),
                }),
                None => Ok(()),
            }
        })
    }
}

#[cfg(unix)]
fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    // Wait status layout: exit code lives in the second byte.
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code as u32)
}
