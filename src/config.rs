//! Application Configuration
//!
//! JSON settings file with environment overrides for the values that differ
//! per deployment (endpoint, token, user).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::commands::DEFAULT_PAGE_SIZE;
use crate::domain::{DomainError, DomainResult};

pub const ENV_API_URL: &str = "SAFETY_API_URL";
pub const ENV_API_TOKEN: &str = "SAFETY_API_TOKEN";
pub const ENV_USER_ID: &str = "SAFETY_USER_ID";

const DB_FILE_NAME: &str = "safety_templates.db";
const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the template service; empty means not configured
    pub api_base_url: String,
    pub api_token: Option<String>,
    /// Owner id sent with every create and used to list templates
    pub user_id: String,
    /// Display name recorded as the template author
    pub created_by: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    /// Holds the local database and the log directory
    pub data_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_token: None,
            user_id: String::new(),
            created_by: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
            data_dir: PathBuf::from("."),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read the config file (defaults when missing), then apply env overrides
    pub fn load(path: &Path) -> DomainResult<Self> {
        let mut config = if path.exists() {
            let text = fs::read_to_string(path).map_err(|e| {
                DomainError::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&text).map_err(|e| {
                DomainError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            tracing::debug!(path = %path.display(), "config file missing, using defaults");
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override fields from `lookup`; blank values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = value(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(token) = value(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(user_id) = value(ENV_USER_ID) {
            self.user_id = user_id;
        }
    }

    pub fn save(&self, path: &Path) -> DomainResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DomainError::Config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .map_err(|e| DomainError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join(LOG_DIR_NAME)
    }
}
