//! Configuration for the editor and the transcription service

use crate::error::{Result, SubtitleError};
use crate::history::DEFAULT_HISTORY_LIMIT;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};
use tracing::debug;

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the Gemini model
pub const MODEL_ENV: &str = "SUBEDIT_MODEL";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubEditConfig {
    pub gemini: GeminiConfig,
    pub editor: EditorConfig,
}

/// Settings for the Gemini API client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; usually supplied through `GEMINI_API_KEY`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model name, e.g. "gemini-2.5-flash"
    pub model: String,

    /// API base URL without the version path
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Number of entries sent per translation request
    pub translation_batch_size: usize,

    /// Largest audio payload sent inline with a request
    pub max_inline_bytes: usize,
}

/// How the cut time is chosen when splitting an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SplitTiming {
    /// Cut time proportional to the character offset of the split
    Proportional,
    /// Cut at the middle of the entry
    Midpoint,
}

/// Editing behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of snapshots kept for undo/redo
    pub history_limit: usize,

    /// Push or trim neighbouring entries when a time edit overlaps them
    pub cascade_timing: bool,

    pub split_timing: SplitTiming,

    /// Inserted between texts when entries are merged
    pub merge_separator: String,

    /// Length of a newly inserted entry, in milliseconds
    pub default_duration_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.2,
            timeout_secs: 300,
            translation_batch_size: 100,
            max_inline_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            cascade_timing: true,
            split_timing: SplitTiming::Proportional,
            merge_separator: " ".to_string(),
            default_duration_ms: 2_000,
        }
    }
}

impl GeminiConfig {
    /// Set the API key
    pub fn with_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the model
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    /// Set the base URL
    pub fn with_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the translation batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.translation_batch_size = size;
        self
    }
}

impl EditorConfig {
    /// Set the history limit
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Enable or disable cascading time adjustment
    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade_timing = cascade;
        self
    }

    pub fn with_split_timing(mut self, timing: SplitTiming) -> Self {
        self.split_timing = timing;
        self
    }
}

impl SubEditConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gemini(mut self, gemini: GeminiConfig) -> Self {
        self.gemini = gemini;
        self
    }

    pub fn with_editor(mut self, editor: EditorConfig) -> Self {
        self.editor = editor;
        self
    }

    /// Location of the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "", "subedit").ok_or_else(|| {
            SubtitleError::Configuration("Failed to get XDG directories".to_string())
        })?;
        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Load the configuration file if present, then apply environment overrides
    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path).await?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub async fn load_from<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("No configuration file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&raw).map_err(|e| {
            SubtitleError::Configuration(format!("Invalid configuration in {:?}: {}", path, e))
        })
    }

    /// Write the configuration to `path`, creating parent directories
    pub async fn save_to<P: Into<PathBuf>>(&self, path: P) -> Result<()> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(self)?).await?;
        debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Write the configuration to the default location
    pub async fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path).await?;
        Ok(path)
    }

    /// Override fields from `GEMINI_API_KEY` and `SUBEDIT_MODEL`
    pub fn apply_env(&mut self) {
        if let Some(key) = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = std::env::var(MODEL_ENV).ok().filter(|m| !m.trim().is_empty()) {
            self.gemini.model = model;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_defaults() {
        let config = SubEditConfig::default();

        assert!(config.gemini.api_key.is_none());
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.translation_batch_size, 100);
        assert_eq!(config.editor.history_limit, 50);
        assert!(config.editor.cascade_timing);
        assert_eq!(config.editor.split_timing, SplitTiming::Proportional);
        assert_eq!(config.editor.merge_separator, " ");
    }

    #[test]
    fn test_builders() {
        let config = SubEditConfig::new()
            .with_gemini(GeminiConfig::default().with_api_key("k").with_model("m"))
            .with_editor(EditorConfig::default().with_history_limit(5).with_cascade(false));

        assert_eq!(config.gemini.api_key.as_deref(), Some("k"));
        assert_eq!(config.gemini.model, "m");
        assert_eq!(config.editor.history_limit, 5);
        assert!(!config.editor.cascade_timing);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SubEditConfig =
            serde_json::from_str(r#"{"editor":{"split_timing":"midpoint"}}"#).unwrap();
        assert_eq!(config.editor.split_timing, SplitTiming::Midpoint);
        assert_eq!(config.editor.history_limit, 50);
        assert_eq!(config.gemini.timeout_secs, 300);
    }

    #[test]
    fn test_split_timing_from_str() {
        assert_eq!("midpoint".parse::<SplitTiming>(), Ok(SplitTiming::Midpoint));
        assert_eq!(SplitTiming::Proportional.to_string(), "proportional");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = SubEditConfig::new()
            .with_editor(EditorConfig::default().with_split_timing(SplitTiming::Midpoint));
        config.save_to(&path).await.unwrap();

        let loaded = SubEditConfig::load_from(&path).await.unwrap();
        assert_eq!(loaded.editor.split_timing, SplitTiming::Midpoint);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SubEditConfig::load_from(dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(loaded.editor.history_limit, 50);
    }

    #[tokio::test]
    async fn test_invalid_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{ nope").await.unwrap();

        let err = SubEditConfig::load_from(&path).await.unwrap_err();
        assert!(matches!(err, SubtitleError::Configuration(_)));
    }
}
