//! TOML configuration loaded from the XDG config directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use notevec_embed::ProviderConfig;
use serde::Deserialize;

const APP_PREFIX: &str = "notevec";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "notevec.db";

/// User configuration.
///
/// Loaded from `$XDG_CONFIG_HOME/notevec/config.toml`; a missing file yields
/// the defaults below. `COHERE_API_KEY` in the environment takes precedence
/// over the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cohere_api_key: String,
    pub notes_dir: Option<PathBuf>,
    pub embed_model: String,
    pub rerank_model: String,
    pub embed_dim: usize,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cohere_api_key: String::new(),
            notes_dir: None,
            embed_model: "embed-v4.0".to_string(),
            rerank_model: "rerank-v3.5".to_string(),
            embed_dim: 1024,
            request_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let dir = xdg::BaseDirectories::with_prefix(APP_PREFIX)
            .get_config_home()
            .context("could not determine XDG config home directory")?;
        Ok(dir.join(CONFIG_FILE))
    }

    /// Path of the SQLite index, under the XDG data directory.
    pub fn db_path() -> Result<PathBuf> {
        let dir = xdg::BaseDirectories::with_prefix(APP_PREFIX)
            .get_data_home()
            .context("could not determine XDG data home directory")?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create data directory {}", dir.display()))?;
        Ok(dir.join(DB_FILE))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .with_context(|| format!("failed to parse config {}", path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read config {}", path.display()))
            }
        }
    }

    /// Resolve the API key, preferring the environment over the file.
    pub fn api_key(&self) -> Result<String> {
        if let Ok(key) = std::env::var("COHERE_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        if !self.cohere_api_key.is_empty() {
            return Ok(self.cohere_api_key.clone());
        }
        anyhow::bail!(
            "no Cohere API key configured; set COHERE_API_KEY or add cohere_api_key to {}",
            Self::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "the config file".to_string())
        )
    }

    /// The configured notes directory, required for every command.
    pub fn notes_dir(&self) -> Result<&Path> {
        self.notes_dir.as_deref().with_context(|| {
            format!(
                "notes_dir is not configured; add it to {} or pass --notes-dir",
                Self::config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".to_string())
            )
        })
    }

    pub fn provider_config(&self) -> Result<ProviderConfig> {
        Ok(ProviderConfig::new(self.api_key()?)
            .with_embed_model(self.embed_model.clone())
            .with_rerank_model(self.rerank_model.clone())
            .with_embed_dim(self.embed_dim)
            .with_timeout(Duration::from_secs(self.request_timeout_secs)))
    }
}
