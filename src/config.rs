use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the quote server listens on.
    pub port: u16,
    /// Path of the SQLite database holding stored quotes.
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8080,
            db_path: PathBuf::from("cotacao.db"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: "https://economia.awesomeapi.com.br".to_string(),
        }
    }
}

/// Time budgets for every external call in the pipeline, in milliseconds.
///
/// These are deliberately configuration and not constants: the upstream API
/// has been measured answering in ~4.3 s, so the often-quoted 200 ms budget
/// would fail nearly every request against the real endpoint.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Outer budget for the whole /cotacao handler.
    pub request_ms: u64,
    /// Budget for the upstream API call.
    pub fetch_ms: u64,
    /// Budget for the database insert.
    pub persist_ms: u64,
    /// End-to-end budget for the client request.
    pub client_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            request_ms: 6000,
            fetch_ms: 5000,
            persist_ms: 300,
            client_ms: 8000,
        }
    }
}

impl TimeoutsConfig {
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn persist(&self) -> Duration {
        Duration::from_millis(self.persist_ms)
    }

    pub fn client(&self) -> Duration {
        Duration::from_millis(self.client_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the quote server.
    pub server_url: String,
    /// File the fetched quote is written to, overwritten each run.
    pub output_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: "http://localhost:8080".to_string(),
            output_path: PathBuf::from("cotacao.txt"),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub timeouts: TimeoutsConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            debug!("No config file found, using defaults");
            Ok(AppConfig::default())
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "cotacao")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
