//! Live — implements `DockerOps` for the real Bollard-backed `DockerClient`.

use std::pin::Pin;

use crate::client::docker::{DockerOps, EventStream};
use crate::docker::client::{DockerClient, DockerError};
use crate::docker::event::EventFilter;
use crate::docker::inventory::ContainerInfo;

impl DockerOps for DockerClient {
    fn inspect_container<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ContainerInfo, DockerError>> + Send + 'a>> {
        Box::pin(self.inspect_container(id))
    }

    fn stream_events(&self, filter: EventFilter) -> EventStream<'_> {
        Box::pin(self.stream_events(filter))
    }

    fn registry_login<'a>(
        &'a self,
        server: &'a str,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<(), DockerError>> + Send + 'a>> {
        Box::pin(self.registry_login(server, username, password))
    }
}
