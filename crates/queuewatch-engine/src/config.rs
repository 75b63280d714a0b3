use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use queuewatch_core::EngineConfig;


pub const CONFIG_FILE: &str = "queuewatch.toml";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    /// Top-level array holding the listed items.
    #[serde(default = "default_items_field")]
    pub items_field: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Extra request headers, e.g. `Authorization`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_items_field() -> String {
    "tickets".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub player: String,
    pub player_args: Vec<String>,
    pub sound_base_url: String,
    pub desktop_notifications: bool,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            player: "mpv".to_string(),
            player_args: vec!["--no-video".to_string(), "--really-quiet".to_string()],
            sound_base_url: "https://sounds.queuewatch.invalid".to_string(),
            desktop_notifications: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub path: String,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: "~/.config/queuewatch/preferences.toml".to_string(),
        }
    }
}

impl Config {
    pub fn default_for_url(url: &str) -> Self {
        Self {
            source: SourceConfig {
                url: url.to_string(),
                items_field: default_items_field(),
                id_field: default_id_field(),
                headers: BTreeMap::new(),
            },
            engine: EngineConfig::default(),
            alerts: AlertsConfig::default(),
            preferences: PreferencesConfig::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {CONFIG_FILE}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.source.url.trim().is_empty() {
            anyhow::bail!("source.url must not be empty");
        }
        self.engine.validate().context("invalid [engine] section")?;
        Ok(())
    }

    pub fn preferences_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.preferences.path).to_string())
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}
