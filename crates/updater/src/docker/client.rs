//! Docker client — core struct, constructor, error types.
//!
//! Domain methods live in sibling modules (`container`, `event`, `login`)
//! which add `impl DockerClient` blocks.

use bollard::Docker;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Registry login failed: {0}")]
    LoginFailed(String),
    #[error("Stream closed")]
    StreamClosed,
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

impl DockerError {
    /// True when the daemon reported that the container no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DockerError::ContainerNotFound(_)
                | DockerError::BollardError(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404,
                    ..
                })
        )
    }
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    /// The bollard Docker client.  `pub(super)` so that domain modules
    /// in sibling files can call bollard APIs directly.
    pub(super) client: Docker,
    /// The Docker socket path this client is connected to.
    pub(super) socket_path: String,
}

impl DockerClient {
    pub fn new(socket_path: &str) -> Result<Self, DockerError> {
        let connection = if socket_path.is_empty() {
            Docker::connect_with_defaults()
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        } else if socket_path.starts_with("tcp://") {
            Docker::connect_with_http(socket_path, 120, &bollard::API_DEFAULT_VERSION)
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        } else {
            let clean_path = socket_path.trim_start_matches("unix://");
            Docker::connect_with_socket(clean_path, 120, &bollard::API_DEFAULT_VERSION)
                .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?
        };

        Ok(DockerClient {
            client: connection,
            socket_path: socket_path.to_string(),
        })
    }

    /// Value for `DOCKER_HOST` so that CLI invocations reach the same daemon,
    /// or `None` when the client uses the system default.
    pub fn docker_host(&self) -> Option<String> {
        docker_host_for(&self.socket_path)
    }

    /// Build a `tokio::process::Command` for the Docker CLI that targets
    /// the same daemon this client is connected to.
    pub(super) fn docker_cli_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("docker");
        if let Some(host) = self.docker_host() {
            cmd.env("DOCKER_HOST", host);
        }
        cmd
    }
}

/// Normalise a configured socket path into a `DOCKER_HOST` value.
pub fn docker_host_for(socket_path: &str) -> Option<String> {
    if socket_path.is_empty() {
        return None;
    }
    if socket_path.starts_with("unix://") || socket_path.starts_with("tcp://") {
        Some(socket_path.to_string())
    } else {
        Some(format!("unix://{}", socket_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_host_default_socket() {
        assert_eq!(docker_host_for(""), None);
    }

    #[test]
    fn test_docker_host_bare_path_gets_unix_scheme() {
        assert_eq!(
            docker_host_for("/var/run/docker.sock").as_deref(),
            Some("unix:///var/run/docker.sock")
        );
    }

    #[test]
    fn test_docker_host_keeps_explicit_scheme() {
        assert_eq!(
            docker_host_for("tcp://10.0.0.5:2375").as_deref(),
            Some("tcp://10.0.0.5:2375")
        );
    }

    #[test]
    fn test_is_not_found_for_mapped_error() {
        assert!(DockerError::ContainerNotFound("abc".to_string()).is_not_found());
    }

    #[test]
    fn test_is_not_found_for_raw_404() {
        let err = DockerError::BollardError(bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container".to_string(),
        });
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = DockerError::BollardError(bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "boom".to_string(),
        });
        assert!(!err.is_not_found());
        assert!(!DockerError::StreamClosed.is_not_found());
    }
}
