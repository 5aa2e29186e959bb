//! Configuration management for the widgets
//!
//! Settings come from built-in defaults, an optional `camwidget.toml`, and
//! `CAMWIDGET__SECTION__KEY` environment variables, in that order.

use crate::errors::CameraError;
use crate::types::{ResolutionSelection, DEFAULT_SELECTION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment prefix for overrides, e.g. `CAMWIDGET__STREAM__DEVICE_INDEX=1`
pub const ENV_PREFIX: &str = "CAMWIDGET";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub stream: StreamConfig,
    pub snapshot: SnapshotConfig,
    pub multiplier: MultiplierConfig,
}

/// Camera panel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Index of the capture device to open
    pub device_index: u32,
    /// Toggle state when the panel loads
    pub start_enabled: bool,
    /// Selector value when the panel loads ("default" or "WxH")
    pub initial_resolution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Where downloaded snapshots are written
    pub output_directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierConfig {
    pub enabled: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig {
                device_index: 0,
                start_enabled: false,
                initial_resolution: DEFAULT_SELECTION.to_string(),
            },
            snapshot: SnapshotConfig {
                output_directory: "./snapshots".to_string(),
            },
            multiplier: MultiplierConfig { enabled: true },
        }
    }
}

impl WidgetConfig {
    /// Load configuration from a TOML file, defaults if it is missing
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: WidgetConfig = toml::from_str(&contents).map_err(|e| {
            CameraError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Defaults, then the optional file at `path`, then environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let to_config_error = |e: config::ConfigError| CameraError::ConfigError(e.to_string());

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(to_config_error)?)
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(to_config_error)?;

        let config: WidgetConfig = settings.try_deserialize().map_err(to_config_error)?;
        config.validate().map_err(CameraError::ConfigError)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CameraError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CameraError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("camwidget.toml")
    }

    /// Load from the default location, falling back to defaults on error
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        self.stream
            .initial_resolution
            .parse::<ResolutionSelection>()
            .map_err(|e| e.to_string())?;

        if self.snapshot.output_directory.trim().is_empty() {
            return Err("Snapshot output directory must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WidgetConfig::default();
        assert_eq!(config.stream.device_index, 0);
        assert!(!config.stream.start_enabled);
        assert_eq!(config.stream.initial_resolution, "default");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = WidgetConfig::default();
        bad.stream.initial_resolution = "huge".to_string();
        assert!(bad.validate().is_err());

        let mut bad = WidgetConfig::default();
        bad.snapshot.output_directory = "  ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("camwidget.toml");

        let mut config = WidgetConfig::default();
        config.stream.device_index = 2;
        config.stream.initial_resolution = "1280x720".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = WidgetConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_toml_format() {
        let toml_string = toml::to_string_pretty(&WidgetConfig::default()).unwrap();
        assert!(toml_string.contains("[stream]"));
        assert!(toml_string.contains("[snapshot]"));
        assert!(toml_string.contains("[multiplier]"));
        assert!(toml_string.contains("initial_resolution"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let loaded = WidgetConfig::load_from_file("nonexistent_camwidget.toml").unwrap();
        assert_eq!(loaded, WidgetConfig::default());
    }

    #[test]
    fn test_layered_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camwidget.toml");
        fs::write(
            &path,
            "[stream]\ndevice_index = 3\nstart_enabled = true\ninitial_resolution = \"640x480\"\n",
        )
        .unwrap();

        let config = WidgetConfig::load_layered(&path).unwrap();
        assert_eq!(config.stream.device_index, 3);
        assert!(config.stream.start_enabled);
        assert_eq!(config.stream.initial_resolution, "640x480");
        // Untouched sections keep their defaults.
        assert_eq!(config.snapshot.output_directory, "./snapshots");
    }

    #[test]
    fn test_layered_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = WidgetConfig::load_layered(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, WidgetConfig::default());
    }
}
