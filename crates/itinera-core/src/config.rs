// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use itinera_codec::MAX_LINK_LEN;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.json";

/// A session token accepted by [`crate::auth::StaticAuth`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticUser {
    pub token: String,
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page that share links point at.
    pub share_base_url: String,
    pub max_link_len: usize,
    /// Multi-city search endpoint.
    pub provider_url: String,
    pub provider_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub currency: String,
    /// Where saved itineraries live. Defaults to `<config root>/itineraries`.
    pub store_dir: Option<PathBuf>,
    pub users: Vec<StaticUser>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            share_base_url: "http://localhost:8080/".to_string(),
            max_link_len: MAX_LINK_LEN,
            provider_url: "https://api.tequila.kiwi.com/v2/flights_multi".to_string(),
            provider_api_key: None,
            request_timeout_secs: 30,
            currency: "EUR".to_string(),
            store_dir: None,
            users: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        crate::get_config_root().join(CONFIG_FILE_NAME)
    }

    /// Loads the config at `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn store_root(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| crate::get_config_root().join("itineraries"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
