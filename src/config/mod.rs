//! Application settings: optional YAML file merged with PKB_* env vars.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub google: GoogleSettings,
    /// Where the OAuth token is persisted
    pub token_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            google: GoogleSettings::default(),
            token_path: default_token_path(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Google OAuth client credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
}

impl GoogleSettings {
    /// True when both client id and secret are present.
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("pkb/token.json"))
        .unwrap_or_else(|| PathBuf::from("token.json"))
}

impl Settings {
    /// Load settings from the first config file found, then merge env vars.
    ///
    /// A missing config file is not an error; defaults plus environment
    /// variables are enough to run.
    pub fn load() -> Result<Self> {
        let mut settings = match Self::find_config_file() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.merge_env();
        Ok(settings)
    }

    /// Load settings from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("parse settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Merge with environment variables (PKB_* prefix).
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("PKB_SERVER_ADDR") {
            if !val.is_empty() {
                self.server.addr = val;
            }
        }
        if let Ok(val) = std::env::var("PKB_GOOGLE_CLIENT_ID") {
            if !val.is_empty() {
                self.google.client_id = val;
            }
        }
        if let Ok(val) = std::env::var("PKB_GOOGLE_CLIENT_SECRET") {
            if !val.is_empty() {
                self.google.client_secret = val;
            }
        }
        if let Ok(val) = std::env::var("PKB_TOKEN_PATH") {
            if !val.is_empty() {
                self.token_path = PathBuf::from(val);
            }
        }
    }

    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PKB_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let candidates = [
            Some(PathBuf::from("pkb.yml")),
            dirs::config_dir().map(|p| p.join("pkb/config.yml")),
        ];
        candidates.into_iter().flatten().find(|p| p.exists())
    }
}
