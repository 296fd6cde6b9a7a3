//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (`BIND`, `PORT`, `DB`, `DB_LABEL`, `IMAGE_DIR`), and
//! finally command-line flags applied by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_PORT: u16 = 3024;

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind: String,
    /// TCP port.
    pub port: u16,
    /// Book collection file.
    pub db: PathBuf,
    /// Label list file.
    pub db_label: PathBuf,
    /// Directory uploaded cover images are written to.
    pub image_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            db: PathBuf::from("./db.json"),
            db_label: PathBuf::from("./db_label.json"),
            image_dir: PathBuf::from("./image"),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(bind) = var("BIND") {
            self.bind = bind;
        }
        if let Some(port) = var("PORT") {
            self.port = parse_port(&port)?;
        }
        if let Some(db) = var("DB") {
            self.db = PathBuf::from(db);
        }
        if let Some(db_label) = var("DB_LABEL") {
            self.db_label = PathBuf::from(db_label);
        }
        if let Some(image_dir) = var("IMAGE_DIR") {
            self.image_dir = PathBuf::from(image_dir);
        }
        Ok(())
    }

    /// `bind:port` string for the listener.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

pub fn parse_port(value: &str) -> ConfigResult<u16> {
    value.trim().parse().map_err(|_| ConfigError::InvalidPort {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3024);
        assert_eq!(config.addr(), "0.0.0.0:3024");
        assert_eq!(config.db, PathBuf::from("./db.json"));
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> =
            [("PORT", "8080"), ("DB", "/tmp/books.json")].into_iter().collect();
        let mut config = ServerConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.db, PathBuf::from("/tmp/books.json"));
        assert_eq!(config.db_label, PathBuf::from("./db_label.json"));
    }

    #[test]
    fn invalid_port_rejected() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_vars(|k| (k == "PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort { .. }));
    }

    #[test]
    fn partial_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bookshelf.toml");
        std::fs::write(&path, "port = 4000\nimage_dir = \"/var/covers\"\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.image_dir, PathBuf::from("/var/covers"));
        assert_eq!(config.bind, "0.0.0.0");
    }

    #[test]
    fn config_roundtrip_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bookshelf.toml");
        let config = ServerConfig {
            port: 9000,
            ..Default::default()
        };
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(ServerConfig::load(&path).unwrap(), config);
    }
}
