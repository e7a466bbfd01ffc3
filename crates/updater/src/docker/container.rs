//! Container domain — inspection.

use super::client::{DockerClient, DockerError};
use super::inventory::ContainerInfo;

use bollard::models::ContainerInspectResponse;

impl DockerClient {
    /// Inspect a container by ID or name.
    ///
    /// A 404 from the daemon maps to [`DockerError::ContainerNotFound`] so
    /// callers can tell a vanished container apart from a real failure.
    pub async fn inspect_container(&self, id: &str) -> Result<ContainerInfo, DockerError> {
        let details: ContainerInspectResponse = self
            .client
            .inspect_container(id, None)
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError { status_code: 404, .. } => {
                    DockerError::ContainerNotFound(id.to_string())
                }
                other => DockerError::BollardError(other),
            })?;
        Ok(ContainerInfo::from(details))
    }
}
