// Local configuration for Folio.
//
// Global config: `~/.folio/config.toml`

use std::path::{Path, PathBuf};

use folio_common::types::DEFAULT_GENRE;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::DEFAULT_MAX_DEPTH;
use crate::layout::{LayoutError, PaneLayout};
use crate::secrets::{ensure_owner_only_dir, ensure_owner_only_file};
use crate::store::chapters::DEFAULT_KEY_PREFIX;

/// Root directory for Folio state: `~/.folio/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".folio"))
}

/// Path to the config file: `~/.folio/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FolioConfig {
    /// Genre preselected for new projects.
    pub genre: String,
    pub generation: GenerationConfig,
    pub history: HistoryConfig,
    pub layout: LayoutConfig,
    pub storage: StorageConfig,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            genre: DEFAULT_GENRE.to_string(),
            generation: GenerationConfig::default(),
            history: HistoryConfig::default(),
            layout: LayoutConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl FolioConfig {
    /// Load from `~/.folio/config.toml`. Defaults when there is no home
    /// directory or no file; unreadable or invalid files are errors.
    pub fn load() -> Result<Self, ConfigError> {
        match global_config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load_from(path) {
            Err(ConfigError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            result => result,
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            ensure_owner_only_dir(parent)
                .map_err(|error| ConfigError::Io(std::io::Error::other(error.to_string())))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        ensure_owner_only_file(path)
            .map_err(|error| ConfigError::Io(std::io::Error::other(error.to_string())))
    }
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// API keys are stored in the OS keychain or `FOLIO_API_KEY`, not here.
    pub endpoint: String,
    /// Model for drafting, ideas and outlines.
    pub text_model: String,
    /// Model for analysis and suggested edits.
    pub fast_model: String,
    pub image_model: String,
    /// Let the provider ground chapter drafts with web search.
    pub grounding: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/".into(),
            text_model: "gemini-2.5-pro".into(),
            fast_model: "gemini-2.5-flash".into(),
            image_model: "imagen-4.0-generate-001".into(),
            grounding: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HistoryConfig {
    /// Undo snapshots kept per chapter (0 = unbounded).
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    /// Initial pane widths in percent.
    pub panes: Vec<f64>,
    pub min_widths_px: Vec<f64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let layout = PaneLayout::three_pane();
        Self { panes: layout.widths().to_vec(), min_widths_px: layout.min_widths_px().to_vec() }
    }
}

impl LayoutConfig {
    pub fn to_layout(&self) -> Result<PaneLayout, LayoutError> {
        PaneLayout::new(self.panes.clone(), self.min_widths_px.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file; `~/.folio/folio.db` when unset.
    pub db_path: Option<PathBuf>,
    /// Namespace for durable chapter records.
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { db_path: None, key_prefix: DEFAULT_KEY_PREFIX.to_string() }
    }
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(|| global_dir().map(|d| d.join("folio.db")))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
