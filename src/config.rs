//! Client configuration and on-disk locations.
//!
//! Storage locations:
//! - Linux: ~/.config/echotune/config.json, ~/.local/share/echotune/session.json
//! - Windows: %APPDATA%\echotune\
//! - MacOS: ~/Library/Application Support/echotune/

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine {0} directory")]
    NoDir(&'static str),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_optimizer_iterations() -> u32 {
    20
}

fn default_settings_debounce_ms() -> u64 {
    50
}

fn default_resize_debounce_ms() -> u64 {
    100
}

fn default_example_hover_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pause between automation iterations.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_optimizer_iterations")]
    pub optimizer_iterations: u32,
    #[serde(default = "default_settings_debounce_ms")]
    pub settings_debounce_ms: u64,
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,
    #[serde(default = "default_example_hover_delay_ms")]
    pub example_hover_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_ms: default_request_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            optimizer_iterations: default_optimizer_iterations(),
            settings_debounce_ms: default_settings_debounce_ms(),
            resize_debounce_ms: default_resize_debounce_ms(),
            example_hover_delay_ms: default_example_hover_delay_ms(),
        }
    }
}

impl ClientConfig {
    /// Read `path` if it exists; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File config (if any) with environment overrides on top.
    pub fn load_with_env(paths: &AppPaths) -> Result<Self, ConfigError> {
        let mut cfg = Self::load(&paths.config_file())?;
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    /// Apply `ECHOTUNE_*` overrides. Unparsable numbers are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        // ECHOTUNE_API_BASE=http://host:port
        if let Some(v) = var("ECHOTUNE_API_BASE") {
            let v = v.trim();
            if !v.is_empty() {
                self.api_base = v.to_string();
            }
        }

        // ECHOTUNE_TIMEOUT_MS=30000
        if let Some(n) = var("ECHOTUNE_TIMEOUT_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.request_timeout_ms = n.max(1);
        }

        // ECHOTUNE_POLL_MS=500
        if let Some(n) = var("ECHOTUNE_POLL_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.poll_interval_ms = n;
        }

        // ECHOTUNE_OPTIMIZER_ITERATIONS=20
        if let Some(n) = var("ECHOTUNE_OPTIMIZER_ITERATIONS").and_then(|v| v.trim().parse::<u32>().ok())
        {
            self.optimizer_iterations = n.max(1);
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoDir("config"))?
            .join("echotune");
        let data_dir = dirs::data_dir()
            .ok_or(ConfigError::NoDir("data"))?
            .join("echotune");
        Ok(Self {
            config_dir,
            data_dir,
        })
    }

    /// Rooted at an explicit directory; used by tests.
    pub fn at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn ensure_data_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| ConfigError::Io {
            path: self.data_dir.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: ClientConfig = serde_json::from_str(r#"{"poll_interval_ms": 250}"#).unwrap();
        assert_eq!(cfg.poll_interval_ms, 250);
        assert_eq!(cfg.api_base, "http://127.0.0.1:8000");
        assert_eq!(cfg.optimizer_iterations, 20);
    }

    #[test]
    fn env_overrides_apply_and_bad_numbers_are_ignored() {
        let mut cfg = ClientConfig::default();
        cfg.apply_env(|k| match k {
            "ECHOTUNE_API_BASE" => Some("http://10.0.0.2:9000".to_string()),
            "ECHOTUNE_POLL_MS" => Some("100".to_string()),
            "ECHOTUNE_TIMEOUT_MS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(cfg.api_base, "http://10.0.0.2:9000");
        assert_eq!(cfg.poll_interval_ms, 100);
        assert_eq!(cfg.request_timeout_ms, 30_000);
    }

    #[test]
    fn missing_file_is_default_and_bad_file_is_an_error() {
        let root = std::env::temp_dir().join(format!("echotune-cfg-{}", std::process::id()));
        let paths = AppPaths::at(&root);
        assert_eq!(ClientConfig::load(&paths.config_file()).unwrap(), ClientConfig::default());

        fs::create_dir_all(paths.config_dir()).unwrap();
        fs::write(paths.config_file(), "{ not json").unwrap();
        assert!(matches!(
            ClientConfig::load(&paths.config_file()),
            Err(ConfigError::Parse { .. })
        ));
        let _ = fs::remove_dir_all(&root);
    }
}
