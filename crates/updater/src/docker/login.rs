//! Login domain — registry authentication through the Docker CLI.
//!
//! The credential store belongs to the CLI, so `docker compose pull` picks up
//! the login without the daemon client ever holding the secret.

use super::client::{DockerClient, DockerError};

impl DockerClient {
    /// Run `docker login <server> -u <username> --password-stdin`, writing the
    /// password to the child's stdin.
    pub async fn registry_login(
        &self,
        server: &str,
        username: &str,
        password: &str,
    ) -> Result<(), DockerError> {
        use tokio::io::AsyncWriteExt;

        if username.is_empty() || password.is_empty() {
            return Err(DockerError::LoginFailed(
                "registry username or password is not set".to_string(),
            ));
        }

        let mut child = self
            .docker_cli_command()
            .args(["login", server, "-u", username, "--password-stdin"])
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| DockerError::LoginFailed(format!("Failed to run docker CLI: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(password.as_bytes()).await.map_err(|e| {
                DockerError::LoginFailed(format!("Failed to send password: {}", e))
            })?;
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(|e| {
            DockerError::LoginFailed(format!("Failed to wait for docker CLI: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DockerError::LoginFailed(format!(
                "docker login {} failed: {}",
                server,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
