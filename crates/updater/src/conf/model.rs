//! Model — UpdaterConfig and related structs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::watch::StreamEndPolicy;

pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_IMAGE: &str = "ghcr.io/awbclan/awgores:latest";
pub const DEFAULT_REGISTRY: &str = "ghcr.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub compose_file_path: String,
    pub image_to_watch: String,
    pub docker_socket: String,
    pub on_stream_end: StreamEndPolicy,
    pub resubscribe_backoff_secs: u64,
    // Tables last so the struct serializes to valid TOML.
    pub registry: RegistryConfig,
}

/// Credentials for the one-time `docker login` at startup.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub server: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            compose_file_path: DEFAULT_COMPOSE_FILE.to_string(),
            image_to_watch: DEFAULT_IMAGE.to_string(),
            docker_socket: "".to_string(),
            on_stream_end: StreamEndPolicy::Exit,
            resubscribe_backoff_secs: 5,
            registry: RegistryConfig::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_REGISTRY.to_string(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl UpdaterConfig {
    /// Validate configuration values. Credentials are required because the
    /// pull step needs registry access.
    pub fn validate(&self) -> Result<(), String> {
        if self.compose_file_path.trim().is_empty() {
            return Err("compose_file_path must not be empty".to_string());
        }
        if self.image_to_watch.trim().is_empty() {
            return Err("image_to_watch must not be empty".to_string());
        }
        if self.resubscribe_backoff_secs == 0 {
            return Err("resubscribe_backoff_secs must be > 0".to_string());
        }
        self.registry.validate()
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.trim().is_empty() {
            return Err("registry.server must not be empty".to_string());
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err("GHCR_USERNAME or GHCR_PASSWORD is not set".to_string());
        }
        Ok(())
    }
}
