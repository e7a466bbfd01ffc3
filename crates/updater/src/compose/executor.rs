//! Executor — runs `docker compose` subcommands against the configured file.

use std::future::Future;
use std::pin::Pin;
use std::process::{ExitStatus, Output};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("command '{command}' could not be started: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command '{command}' failed with output: {output}, {status}")]
    Failed {
        command: String,
        status: ExitStatus,
        output: String,
    },
}

impl CommandError {
    /// Captured stdout/stderr of a failed run; empty for launch failures.
    pub fn output(&self) -> &str {
        match self {
            CommandError::Launch { .. } => "",
            CommandError::Failed { output, .. } => output,
        }
    }
}

/// Async interface over the compose tool.
///
/// Object-safe so the orchestrator can hold an `Arc<dyn ComposeOps>` and tests
/// can substitute [`super::fake::FakeCompose`].
pub trait ComposeOps: Send + Sync {
    /// Run `<subcommand> <args..>` against the compose file.
    fn run<'a>(
        &'a self,
        subcommand: &'a str,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>>;
}

/// Where every compose invocation is aimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeTarget {
    pub compose_file: String,
    /// `DOCKER_HOST` for the child process; `None` inherits the environment.
    pub docker_host: Option<String>,
}

impl ComposeTarget {
    pub fn new(compose_file: impl Into<String>, docker_host: Option<String>) -> Self {
        Self { compose_file: compose_file.into(), docker_host }
    }

    /// Full CLI argument vector: `compose -f <file> <subcommand> <args..>`.
    pub fn command_args(&self, subcommand: &str, args: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(4 + args.len());
        full.push("compose".to_string());
        full.push("-f".to_string());
        full.push(self.compose_file.clone());
        full.push(subcommand.to_string());
        full.extend(args.iter().cloned());
        full
    }
}

/// Live executor backed by the Docker CLI.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    program: String,
    target: ComposeTarget,
}

impl ComposeCli {
    pub fn new(target: ComposeTarget) -> Self {
        Self::with_program("docker", target)
    }

    /// Use a different executable in place of `docker`.
    pub fn with_program(program: impl Into<String>, target: ComposeTarget) -> Self {
        Self { program: program.into(), target }
    }

    async fn execute(&self, subcommand: &str, args: Vec<String>) -> Result<(), CommandError> {
        let command = format!("docker compose {}", subcommand);
        let argv = self.target.command_args(subcommand, &args);
        debug!(program = %self.program, args = ?argv, "Running compose command");

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&argv).stdin(std::process::Stdio::null());
        if let Some(host) = &self.target.docker_host {
            cmd.env("DOCKER_HOST", host);
        }

        let output = cmd.output().await.map_err(|source| CommandError::Launch {
            command: command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(CommandError::Failed {
                command,
                status: output.status,
                output: combined_output(&output),
            });
        }

        info!("Command '{}' succeeded", command);
        Ok(())
    }
}

impl ComposeOps for ComposeCli {
    fn run<'a>(
        &'a self,
        subcommand: &'a str,
        args: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send + 'a>> {
        Box::pin(self.execute(subcommand, args))
    }
}

/// Stdout followed by stderr, lossily decoded and trimmed.
fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    match (stdout.trim(), stderr.trim()) {
        ("", err) => err.to_string(),
        (out, "") => out.to_string(),
        (out, err) => format!("{}\n{}", out, err),
    }
}
