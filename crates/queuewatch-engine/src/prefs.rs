use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sounds::DEFAULT_SOUND;

/// Operator choices that outlive a single run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub sound: String,
    pub muted: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sound: DEFAULT_SOUND.to_string(),
            muted: false,
        }
    }
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Preferences>;
    fn save(&self, prefs: &Preferences) -> Result<()>;
}

/// TOML file store. A missing file reads as defaults.
#[derive(Clone, Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let s = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        toml::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let s = toml::to_string_pretty(prefs).context("serialize preferences")?;
        std::fs::write(&self.path, s).with_context(|| format!("write {}", self.path.display()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        Ok(self.inner.lock().unwrap().clone())
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        *self.inner.lock().unwrap() = prefs.clone();
        Ok(())
    }
}
