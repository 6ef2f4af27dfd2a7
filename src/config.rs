//! Configuration management for the presenter

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::presentation::{Timing, DEFAULT_TEXT_SCALE};
use crate::worship::DEFAULT_LINES_PER_SECTION;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Which presentation to open and how to show it
    #[serde(default)]
    pub presentation: PresentationConfig,

    /// Debounce and transition timings
    #[serde(default)]
    pub timing: TimingConfig,

    /// Worship mode settings
    #[serde(default)]
    pub worship: WorshipConfig,

    /// Remote control settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Presentation document opened on start
    pub document_path: Option<PathBuf>,

    /// Library folder that `assets://` references resolve against
    pub library_root: Option<String>,

    /// Projector text scale in percent
    #[serde(default = "default_text_scale")]
    pub text_scale: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Projector update debounce window (ms)
    #[serde(default = "default_projector_debounce")]
    pub projector_debounce_ms: u64,

    /// Blackout interval when a single-slide stack repeats (ms)
    #[serde(default = "default_reload_settle")]
    pub reload_settle_ms: u64,

    /// Background video crossfade duration (ms)
    #[serde(default = "default_crossfade")]
    pub crossfade_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorshipConfig {
    /// Longest section shown before it is split into parts
    #[serde(default = "default_lines_per_section")]
    pub lines_per_section: usize,

    /// Song library file (songs.json)
    pub songs_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Publish state summaries to remote observers
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Accept JSON remote commands on stdin, one per line
    #[serde(default = "default_true")]
    pub stdin_commands: bool,
}

// Default value functions
fn default_text_scale() -> u32 {
    DEFAULT_TEXT_SCALE
}

fn default_projector_debounce() -> u64 {
    50
}

fn default_reload_settle() -> u64 {
    50
}

fn default_crossfade() -> u64 {
    3000
}

fn default_lines_per_section() -> usize {
    DEFAULT_LINES_PER_SECTION
}

fn default_true() -> bool {
    true
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            document_path: None,
            library_root: None,
            text_scale: default_text_scale(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            projector_debounce_ms: default_projector_debounce(),
            reload_settle_ms: default_reload_settle(),
            crossfade_ms: default_crossfade(),
        }
    }
}

impl Default for WorshipConfig {
    fn default() -> Self {
        Self {
            lines_per_section: default_lines_per_section(),
            songs_path: None,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stdin_commands: true,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Load configuration from `config_path`, writing defaults if it does not exist
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path.to_path_buf());
            Ok(config)
        } else {
            let config = Config {
                config_path: Some(config_path.to_path_buf()),
                ..Config::default()
            };
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "dongle-control", "presenter")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Controller timings as durations
    pub fn timing(&self) -> Timing {
        Timing {
            projector_debounce: Duration::from_millis(self.timing.projector_debounce_ms),
            reload_settle: Duration::from_millis(self.timing.reload_settle_ms),
            crossfade: Duration::from_millis(self.timing.crossfade_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.presentation.text_scale, 100);
        assert_eq!(config.worship.lines_per_section, 4);
        assert!(config.remote.enabled);
        assert_eq!(config.timing(), Timing::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[timing]\nprojector_debounce_ms = 20\n\n[worship]\nlines_per_section = 2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.timing().projector_debounce, Duration::from_millis(20));
        assert_eq!(config.timing().crossfade, Duration::from_millis(3000));
        assert_eq!(config.worship.lines_per_section, 2);
        assert!(config.presentation.document_path.is_none());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[timing\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
