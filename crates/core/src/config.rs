//! Config file parsing for `~/.config/notegen/config.toml`.
//!
//! `load_config` never fails: a missing or unreadable file yields defaults.
//! Use `load_config_from` when the caller names a file explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::template::TitleTemplate;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub datetime: DateTimeSettings,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub creation: CreationConfig,
    #[serde(default)]
    pub templates: Vec<TitleTemplate>,
}

/// Default date and time formats supplied by the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeSettings {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_date_format() -> String {
    "YYYY-MM-DD".to_string()
}
fn default_time_format() -> String {
    "HH:mm".to_string()
}

impl Default for DateTimeSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            time_format: default_time_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub root: Option<PathBuf>,
    #[serde(default = "default_note_extension")]
    pub note_extension: String,
}

fn default_note_extension() -> String {
    "md".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: None,
            note_extension: default_note_extension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreationConfig {
    /// Upper bound on `Name 1`, `Name 2`, ... attempts when a filename is taken.
    #[serde(default = "default_max_collision_attempts")]
    pub max_collision_attempts: u32,
}

fn default_max_collision_attempts() -> u32 {
    100
}

impl Default for CreationConfig {
    fn default() -> Self {
        Self {
            max_collision_attempts: default_max_collision_attempts(),
        }
    }
}

impl AppConfig {
    /// Find a template by name, case-insensitively.
    pub fn template(&self, name: &str) -> Result<&TitleTemplate, ConfigError> {
        self.templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownTemplate(name.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("notegen");
        p.push("config.toml");
        p
    })
}

/// Load config from the default path (`~/.config/notegen/config.toml`).
pub fn load_config() -> AppConfig {
    let config_path = match config_path() {
        Some(p) => p,
        None => return AppConfig::default(),
    };
    if !config_path.exists() {
        return AppConfig::default();
    }

    match load_config_from(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Ignoring config at {}: {}", config_path.display(), e);
            AppConfig::default()
        }
    }
}

/// Load config from an explicit path.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<AppConfig>(&content)?)
}
