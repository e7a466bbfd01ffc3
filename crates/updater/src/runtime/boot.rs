//! Boot — logging init, config load, Docker connection, registry login,
//! watcher construction.

use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::client::DockerOps;
use crate::compose::{ComposeCli, ComposeOps, ComposeTarget};
use crate::conf::{RegistryConfig, UpdaterConfig};
use crate::docker::client::{DockerClient, DockerError};
use crate::restart::Restarter;
use crate::watch::EventWatcher;

/// Initialise the tracing / logging subsystem.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "updater=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load config, connect to Docker, log in to the registry and build the
/// watcher. Any failure here is fatal.
pub async fn boot() -> Result<(EventWatcher, UpdaterConfig), Box<dyn std::error::Error>> {
    info!("Starting updater v{}", env!("CARGO_PKG_VERSION"));

    let config = UpdaterConfig::load()?;
    config.validate()?;
    info!(
        compose_file = %config.compose_file_path,
        image = %config.image_to_watch,
        on_stream_end = ?config.on_stream_end,
        "Loaded configuration"
    );

    info!(
        "Connecting to Docker daemon at: {}",
        if config.docker_socket.is_empty() {
            "default socket"
        } else {
            &config.docker_socket
        }
    );

    let docker_client = DockerClient::new(&config.docker_socket).map_err(|e| {
        error!("Failed to connect to Docker: {}", e);
        e
    })?;
    let docker_host = docker_client.docker_host();
    let docker: Arc<dyn DockerOps> = Arc::new(docker_client);

    login(docker.as_ref(), &config.registry).await.map_err(|e| {
        error!("Error logging in to {}: {}", config.registry.server, e);
        e
    })?;

    let compose = ComposeCli::new(ComposeTarget::new(config.compose_file_path.clone(), docker_host));
    let watcher = build_watcher(docker, Arc::new(compose), &config);

    Ok((watcher, config))
}

/// One-time registry login so that `docker compose pull` is authorised.
pub async fn login(docker: &dyn DockerOps, registry: &RegistryConfig) -> Result<(), DockerError> {
    docker
        .registry_login(&registry.server, &registry.username, &registry.password)
        .await?;
    info!("Logged in to {} as {}", registry.server, registry.username);
    Ok(())
}

/// Wire the watcher from its collaborators.
pub fn build_watcher(
    docker: Arc<dyn DockerOps>,
    compose: Arc<dyn ComposeOps>,
    config: &UpdaterConfig,
) -> EventWatcher {
    EventWatcher::new(docker, Restarter::new(compose), config.image_to_watch.clone())
        .with_stream_end_policy(config.on_stream_end, config.resubscribe_backoff())
}
