/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use shelf_server_client::{default_timeout, ServerConfig};
use shelf_sync::SyncConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShelfConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_sync")]
    pub sync: SyncSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub url: String,

    /// Bearer token (`SHELF_SERVER__TOKEN`); when unset, the token file
    /// written by `login` is used
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// Per-request timeout; build-dependent default when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncSettings {
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_periodic_interval_secs")]
    pub periodic_interval_secs: u64,

    #[serde(default = "default_backoff_retries")]
    pub backoff_retries: u32,

    #[serde(default = "default_backoff_min_secs")]
    pub backoff_min_secs: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl ShelfConfig {
    /// Load configuration from file and environment
    ///
    /// `path` defaults to `config.toml` in the working directory; a missing
    /// default file is fine, a missing explicit one is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("config.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with SHELF_)
        settings = settings.add_source(
            config::Environment::with_prefix("SHELF")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.url.is_empty() {
            return Err(CliError::Config(
                "Server URL is required (set SHELF_SERVER__URL)".to_string(),
            ));
        }

        if self.server.timeout_secs == Some(0) || self.sync.request_timeout_secs == 0 {
            return Err(CliError::Config("Timeouts must be positive".to_string()));
        }

        if self.sync.periodic_interval_secs == 0 {
            return Err(CliError::Config(
                "Periodic sync interval must be positive".to_string(),
            ));
        }

        if self.sync.backoff_min_secs > self.sync.backoff_max_secs {
            return Err(CliError::Config(format!(
                "backoff_min_secs ({}) exceeds backoff_max_secs ({})",
                self.sync.backoff_min_secs, self.sync.backoff_max_secs
            )));
        }

        Ok(())
    }

    /// Server client settings. A configured token wins over `stored_token`
    /// read from the token file.
    pub fn server_config(&self, stored_token: Option<String>) -> ServerConfig {
        let timeout = self
            .server
            .timeout_secs
            .map_or_else(default_timeout, Duration::from_secs);

        ServerConfig {
            token: self.server.token.clone().or(stored_token),
            ..ServerConfig::new(self.server.url.clone()).timeout(timeout)
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            request_timeout: Duration::from_secs(self.sync.request_timeout_secs),
            periodic_interval: Duration::from_secs(self.sync.periodic_interval_secs),
            backoff_retries: self.sync.backoff_retries,
            backoff_min: Duration::from_secs(self.sync.backoff_min_secs),
            backoff_max: Duration::from_secs(self.sync.backoff_max_secs),
        }
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        url: String::new(),
        token: None,
        token_file: default_token_file(),
        timeout_secs: None,
    }
}

fn default_token_file() -> PathBuf {
    PathBuf::from("./data/token")
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
        downloads_dir: default_downloads_dir(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/shelf.db".to_string()
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./data/downloads")
}

fn default_sync() -> SyncSettings {
    let defaults = SyncConfig::default();
    SyncSettings {
        request_timeout_secs: defaults.request_timeout.as_secs(),
        periodic_interval_secs: defaults.periodic_interval.as_secs(),
        backoff_retries: defaults.backoff_retries,
        backoff_min_secs: defaults.backoff_min.as_secs(),
        backoff_max_secs: defaults.backoff_max.as_secs(),
    }
}

fn default_request_timeout_secs() -> u64 {
    default_sync().request_timeout_secs
}

fn default_periodic_interval_secs() -> u64 {
    default_sync().periodic_interval_secs
}

fn default_backoff_retries() -> u32 {
    default_sync().backoff_retries
}

fn default_backoff_min_secs() -> u64 {
    default_sync().backoff_min_secs
}

fn default_backoff_max_secs() -> u64 {
    default_sync().backoff_max_secs
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            sync: default_sync(),
        }
    }
}
