//! TOML configuration file loading
//!
//! Supports `~/.config/hark/config.toml` (platform config dir) as a persistent
//! config source. All fields are optional; command-line values are overlaid
//! with [`ConfigFile::merge`] before the final [`Config`] is assembled.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{ACCESS_KEY_ENV, Config, IntentConfig, WakeConfig};
use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Engine credential (prefer the `HARK_ACCESS_KEY` env var)
    pub access_key: Option<String>,

    /// Wake phrase model file
    pub keyword_path: Option<PathBuf>,

    /// Intent context file
    pub context_path: Option<PathBuf>,

    /// Wake engine section
    #[serde(default)]
    pub wake: WakeFileConfig,

    /// Intent engine section
    #[serde(default)]
    pub intent: IntentFileConfig,
}

/// Wake engine section
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WakeFileConfig {
    /// Engine parameter file
    pub model_path: Option<PathBuf>,

    /// Engine shared library
    pub library_path: Option<PathBuf>,

    /// Detection sensitivity in [0, 1]
    pub sensitivity: Option<f32>,
}

/// Intent engine section
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntentFileConfig {
    /// Engine parameter file
    pub model_path: Option<PathBuf>,

    /// Engine shared library
    pub library_path: Option<PathBuf>,

    /// Inference sensitivity in [0, 1]
    pub sensitivity: Option<f32>,

    /// Trailing silence that ends a command, in seconds
    pub endpoint_duration_sec: Option<f32>,

    /// Wait for trailing silence before finalizing
    pub require_endpoint: Option<bool>,
}

impl ConfigFile {
    /// Parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid TOML
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Overlay `other` on top of `self`; values set in `other` win
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            access_key: other.access_key.or(self.access_key),
            keyword_path: other.keyword_path.or(self.keyword_path),
            context_path: other.context_path.or(self.context_path),
            wake: WakeFileConfig {
                model_path: other.wake.model_path.or(self.wake.model_path),
                library_path: other.wake.library_path.or(self.wake.library_path),
                sensitivity: other.wake.sensitivity.or(self.wake.sensitivity),
            },
            intent: IntentFileConfig {
                model_path: other.intent.model_path.or(self.intent.model_path),
                library_path: other.intent.library_path.or(self.intent.library_path),
                sensitivity: other.intent.sensitivity.or(self.intent.sensitivity),
                endpoint_duration_sec: other
                    .intent
                    .endpoint_duration_sec
                    .or(self.intent.endpoint_duration_sec),
                require_endpoint: other
                    .intent
                    .require_endpoint
                    .or(self.intent.require_endpoint),
            },
        }
    }

    /// Assemble a [`Config`], filling unset tuning with defaults
    ///
    /// The access key falls back to the `HARK_ACCESS_KEY` environment variable.
    /// Range and file checks happen later, in [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the access key, keyword path or context
    /// path is missing
    pub fn into_config(self) -> Result<Config> {
        let access_key = self
            .access_key
            .or_else(|| std::env::var(ACCESS_KEY_ENV).ok())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no access key provided (set `access_key` or {ACCESS_KEY_ENV})"
                ))
            })?;
        let keyword_path = self
            .keyword_path
            .ok_or_else(|| Error::Config("no keyword_path provided".to_string()))?;
        let context_path = self
            .context_path
            .ok_or_else(|| Error::Config("no context_path provided".to_string()))?;

        let wake_defaults = WakeConfig::default();
        let intent_defaults = IntentConfig::default();

        let mut config = Config::new(access_key, keyword_path, context_path);
        config.wake = WakeConfig {
            model_path: self.wake.model_path,
            library_path: self.wake.library_path,
            sensitivity: self.wake.sensitivity.unwrap_or(wake_defaults.sensitivity),
        };
        config.intent = IntentConfig {
            model_path: self.intent.model_path,
            library_path: self.intent.library_path,
            sensitivity: self
                .intent
                .sensitivity
                .unwrap_or(intent_defaults.sensitivity),
            endpoint_duration_sec: self
                .intent
                .endpoint_duration_sec
                .unwrap_or(intent_defaults.endpoint_duration_sec),
            require_endpoint: self
                .intent
                .require_endpoint
                .unwrap_or(intent_defaults.require_endpoint),
        };

        Ok(config)
    }
}

/// Load the TOML config file
///
/// An explicit `path` must exist and parse. Without one, the standard path is
/// tried and `ConfigFile::default()` is returned if it is absent or broken.
///
/// # Errors
///
/// Returns error only when an explicit path cannot be loaded
pub fn load_config_file(path: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = path {
        return ConfigFile::from_path(path);
    }

    let Some(path) = config_file_path() else {
        return Ok(ConfigFile::default());
    };

    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    match ConfigFile::from_path(&path) {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            Ok(ConfigFile::default())
        }
    }
}

/// Return the config file path: `<config dir>/hark/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("hark").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
access_key = "from-file"
keyword_path = "picovoice_linux.ppn"
context_path = "coffee_maker_linux.rhn"

[wake]
sensitivity = 0.6

[intent]
endpoint_duration_sec = 1.5
require_endpoint = false
"#;

    #[test]
    fn parses_sample() {
        let file: ConfigFile = toml::from_str(SAMPLE).unwrap();
        assert_eq!(file.access_key.as_deref(), Some("from-file"));
        assert_eq!(file.wake.sensitivity, Some(0.6));
        assert_eq!(file.intent.require_endpoint, Some(false));
        assert!(file.intent.model_path.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: std::result::Result<ConfigFile, _> = toml::from_str("sensitivity = 0.5");
        assert!(result.is_err());
    }

    #[test]
    fn merge_prefers_overrides() {
        let base: ConfigFile = toml::from_str(SAMPLE).unwrap();
        let overrides = ConfigFile {
            keyword_path: Some(PathBuf::from("other.ppn")),
            intent: IntentFileConfig {
                sensitivity: Some(0.9),
                ..IntentFileConfig::default()
            },
            ..ConfigFile::default()
        };

        let merged = base.merge(overrides);
        assert_eq!(merged.keyword_path, Some(PathBuf::from("other.ppn")));
        assert_eq!(merged.access_key.as_deref(), Some("from-file"));
        assert_eq!(merged.intent.sensitivity, Some(0.9));
        assert_eq!(merged.intent.endpoint_duration_sec, Some(1.5));
    }

    #[test]
    fn into_config_applies_defaults() {
        let file: ConfigFile = toml::from_str(SAMPLE).unwrap();
        let config = file.into_config().unwrap();

        assert_eq!(config.keyword_path, PathBuf::from("picovoice_linux.ppn"));
        assert!((config.wake.sensitivity - 0.6).abs() < f32::EPSILON);
        assert!((config.intent.sensitivity - 0.5).abs() < f32::EPSILON);
        assert!((config.intent.endpoint_duration_sec - 1.5).abs() < f32::EPSILON);
        assert!(!config.intent.require_endpoint);
    }

    #[test]
    fn into_config_requires_paths() {
        let file = ConfigFile {
            access_key: Some("key".to_string()),
            keyword_path: Some(PathBuf::from("a.ppn")),
            ..ConfigFile::default()
        };
        let err = file.into_config().unwrap_err();
        assert!(err.to_string().contains("context_path"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_file(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn explicit_path_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let file = load_config_file(Some(&path)).unwrap();
        assert_eq!(file.context_path, Some(PathBuf::from("coffee_maker_linux.rhn")));
    }
}
