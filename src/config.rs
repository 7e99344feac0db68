//! Daemon configuration.
//!
//! Layered sources, strongest last to weakest first: built-in defaults, a
//! TOML file (explicit `--config` path or the first hit in the standard
//! search locations), then `SWITCHBOARD_*` environment variables. The merged
//! result is validated before anything runs.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    pub daemon: DaemonSettings,
    pub app: AppSettings,
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
}

/// Bridge listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Address the WebSocket bridge listens on.
    pub listen_addr: String,

    /// Outbound host-command queue size per bridge connection.
    pub queue_size: usize,
}

/// The chat application whose tabs the daemon routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Domain the application is served from (subdomains included).
    pub domain: String,

    /// URL that opens an empty conversation.
    pub new_conversation_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn, or error.
    pub level: String,

    /// Log file path; file logging is off when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Rotation size threshold in MB.
    pub max_file_size_mb: u64,

    /// Rotated files kept before the oldest is deleted.
    pub max_files: u32,

    /// Emit JSON lines instead of human-readable output.
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base data directory.
    pub data_dir: String,

    /// Persona store file name, relative to the data directory.
    pub store_file: String,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            queue_size: 64,
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            domain: "claude.ai".to_string(),
            new_conversation_url: "https://claude.ai/new".to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.persona-switchboard".to_string(),
            store_file: "store.json".to_string(),
        }
    }
}

impl SwitchboardConfig {
    /// Resolve the effective configuration from file, environment, and
    /// defaults, then validate it.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::locate_file(config_path)? {
            Some(path) => {
                debug!(path = %path.display(), "Reading configuration file");
                let text = fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
                toml::from_str(&text)
                    .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?
            }
            None => Self::default(),
        };

        config.overlay_env();
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// An explicit path must exist; otherwise the first existing candidate
    /// in the search order wins, and no file at all means defaults.
    fn locate_file(explicit: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(raw) = explicit {
            let path = PathBuf::from(expand_path(raw));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )))
            };
        }

        let candidates = [
            Some(PathBuf::from("persona-switchboard.toml")),
            dirs::config_dir().map(|d| d.join("persona-switchboard").join("config.toml")),
            dirs::home_dir().map(|d| d.join(".persona-switchboard").join("config.toml")),
            Some(PathBuf::from("/etc/persona-switchboard/config.toml")),
        ];
        Ok(candidates
            .into_iter()
            .flatten()
            .find(|candidate| candidate.exists()))
    }

    /// `SWITCHBOARD_*` variables override whatever the file said.
    fn overlay_env(&mut self) {
        if let Some(v) = env_var("SWITCHBOARD_LISTEN_ADDR") {
            self.daemon.listen_addr = v;
        }
        if let Some(n) = env_var("SWITCHBOARD_QUEUE_SIZE").and_then(|v| v.parse().ok()) {
            self.daemon.queue_size = n;
        }
        if let Some(v) = env_var("SWITCHBOARD_APP_DOMAIN") {
            self.app.domain = v;
        }
        if let Some(v) = env_var("SWITCHBOARD_NEW_CONVERSATION_URL") {
            self.app.new_conversation_url = v;
        }
        if let Some(v) = env_var("SWITCHBOARD_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_var("SWITCHBOARD_LOG_FILE") {
            self.logging.file = Some(v);
        }
        if let Some(v) = env_var("SWITCHBOARD_LOG_JSON") {
            self.logging.json_format = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Some(v) = env_var("SWITCHBOARD_DATA_DIR") {
            self.storage.data_dir = v;
        }
        if let Some(v) = env_var("SWITCHBOARD_STORE_FILE") {
            self.storage.store_file = v;
        }
    }

    fn expand_paths(&mut self) {
        self.storage.data_dir = expand_path(&self.storage.data_dir);
        if let Some(file) = self.logging.file.take() {
            self.logging.file = Some(expand_path(&file));
        }
    }

    fn validate(&self) -> Result<()> {
        if self.daemon.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::Config(format!(
                "Invalid listen address '{}'. Expected host:port, e.g. 127.0.0.1:8787",
                self.daemon.listen_addr
            )));
        }
        if self.daemon.queue_size == 0 {
            return Err(Error::Config("queue_size must be greater than zero".to_string()));
        }

        if self.app.domain.is_empty() || self.app.domain.contains('/') {
            return Err(Error::Config(format!(
                "Invalid application domain '{}'. Expected a bare host name, e.g. claude.ai",
                self.app.domain
            )));
        }
        let url = Url::parse(&self.app.new_conversation_url).map_err(|e| {
            Error::Config(format!(
                "Invalid new_conversation_url '{}': {}",
                self.app.new_conversation_url, e
            ))
        })?;
        let in_domain = url.host_str().map_or(false, |host| {
            host == self.app.domain || host.ends_with(&format!(".{}", self.app.domain))
        });
        if !in_domain {
            return Err(Error::Config(format!(
                "new_conversation_url '{}' is not within the application domain '{}'",
                self.app.new_conversation_url, self.app.domain
            )));
        }

        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                LEVELS.join(", ")
            )));
        }

        if self.storage.store_file.is_empty() {
            return Err(Error::Config("store_file cannot be empty".to_string()));
        }

        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.store_file)
    }
}

fn env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Expand `~` and `$VAR` in a path, leaving it untouched on failure.
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|expanded| expanded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Write the commented default configuration (`config init`).
pub fn init_config(path: Option<&str>, force: bool) -> Result<()> {
    let target = match path {
        Some(p) => PathBuf::from(expand_path(p)),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".persona-switchboard")
            .join("config.toml"),
    };

    if target.exists() && !force {
        return Err(Error::Config(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            target.display()
        )));
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
    }
    fs::write(&target, default_config_toml())
        .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

    println!("Configuration file created: {}", target.display());
    Ok(())
}

fn default_config_toml() -> &'static str {
    r#"# Persona Switchboard Configuration
# https://github.com/persona-switchboard/persona-switchboard

[daemon]
# Address the WebSocket bridge listens on (the browser shim connects here)
listen_addr = "127.0.0.1:8787"

# Outbound host-command queue size per bridge connection
queue_size = 64

[app]
# Domain the chat application is served from
domain = "claude.ai"

# URL that opens an empty conversation
new_conversation_url = "https://claude.ai/new"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.persona-switchboard/logs/switchboard.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[storage]
# Base data directory
data_dir = "~/.persona-switchboard"

# Persona store file name, relative to the data directory
store_file = "store.json"
"#
}
