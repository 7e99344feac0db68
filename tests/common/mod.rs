//! Common test utilities and fixtures
//!
//! This module provides shared test infrastructure

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Isolated environment for one test: a data directory with a store file
/// path and an optional config file.
pub struct TestEnvironment {
    pub root: TempDir,
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub store_path: PathBuf,
}

impl TestEnvironment {
    /// Create a new test environment with a default configuration file
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory");
        let root_path = root.path();

        let data_dir = root_path.join("data");
        let config_path = root_path.join("config.toml");
        fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        let store_path = data_dir.join("store.json");

        let config = format!(
            r#"
[daemon]
listen_addr = "127.0.0.1:0"
queue_size = 16

[app]
domain = "claude.ai"
new_conversation_url = "https://claude.ai/new"

[logging]
level = "debug"

[storage]
data_dir = "{}"
store_file = "store.json"
"#,
            data_dir.display()
        );
        fs::write(&config_path, config).expect("Failed to write config");

        Self {
            root,
            config_path,
            data_dir,
            store_path,
        }
    }

    /// Replace the config file contents
    pub fn write_config(&self, content: &str) {
        fs::write(&self.config_path, content).expect("Failed to write config");
    }

    pub fn config_path_str(&self) -> &str {
        self.config_path.to_str().unwrap()
    }
}
