//! Load — config loading from `.env`, file, and environment variables.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use super::model::UpdaterConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/updater/updater.toml";

impl UpdaterConfig {
    /// Load configuration.
    /// Priority: Environment Variables > Config File > Defaults
    ///
    /// A `.env` file in the working directory is folded into the process
    /// environment first, without overriding variables that are already set.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {
                tracing::info!("No .env file found, proceeding with system environment variables")
            }
            Err(e) => return Err(e.into()),
        }

        let config_path = std::env::var("UPDATER_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: UpdaterConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Override fields with whatever `lookup` returns. A variable that is set,
    /// even to an empty string, wins over the file value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("COMPOSE_FILE_PATH") {
            self.compose_file_path = path;
        }
        if let Some(image) = lookup("IMAGE_TO_WATCH") {
            self.image_to_watch = image;
        }
        if let Some(socket) = lookup("DOCKER_SOCKET") {
            self.docker_socket = socket;
        }
        if let Some(server) = lookup("REGISTRY_SERVER") {
            self.registry.server = server;
        }
        if let Some(username) = lookup("GHCR_USERNAME") {
            self.registry.username = username;
        }
        if let Some(password) = lookup("GHCR_PASSWORD") {
            self.registry.password = password;
        }
        if let Some(policy) = lookup("UPDATER_ON_STREAM_END") {
            self.on_stream_end = policy.parse()?;
        }
        if let Some(backoff) = lookup("UPDATER_RESUBSCRIBE_BACKOFF_SECS") {
            self.resubscribe_backoff_secs = backoff
                .trim()
                .parse()
                .map_err(|e| format!("UPDATER_RESUBSCRIBE_BACKOFF_SECS '{}': {}", backoff, e))?;
        }
        Ok(())
    }

    pub fn resubscribe_backoff(&self) -> Duration {
        Duration::from_secs(self.resubscribe_backoff_secs)
    }
}
