//! Configuration loading and management.
//!
//! ## Lookup order
//! 1. Explicit `--config` path
//! 2. `./.task-board/config.yaml`
//! 3. `~/.task-board/config.yaml`
//! 4. Built-in defaults
//!
//! ## Environment Variables
//! Applied on top of whichever file was loaded:
//! - `TASK_BOARD_DB_PATH` - Database path
//! - `TASK_BOARD_HOST` - Bind address for the API server
//! - `TASK_BOARD_PORT` - Port for the API server
//! - `TASK_BOARD_API_URL` - Task collection URL used by the client

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const CONFIG_DIR: &str = ".task-board";
const CONFIG_FILE: &str = "config.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,
}

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".task-board/tasks.db")
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    3500
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// URL of the task collection.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Quiet interval before a search change reloads the list.
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl ClientConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn default_api_url() -> String {
    "http://localhost:3500/api/tasks".to_string()
}

fn default_search_debounce_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Resolve configuration: explicit file, then project and user files, then env overrides.
    ///
    /// An explicit path that fails to load is an error; the default locations are optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_from_default_locations(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_DIR).join(CONFIG_FILE));
        }
        paths
    }

    fn load_from_default_locations() -> Self {
        for path in Self::default_locations() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded config");
                    return config;
                }
                Err(e) => warn!(path = %path.display(), "Ignoring unreadable config: {:#}", e),
            }
        }
        Self::default()
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup("TASK_BOARD_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(host) = lookup("TASK_BOARD_HOST") {
            match host.parse() {
                Ok(host) => self.server.host = host,
                Err(_) => warn!(value = %host, "Ignoring invalid TASK_BOARD_HOST"),
            }
        }

        if let Some(port) = lookup("TASK_BOARD_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid TASK_BOARD_PORT"),
            }
        }

        if let Some(url) = lookup("TASK_BOARD_API_URL") {
            self.client.api_url = url;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
