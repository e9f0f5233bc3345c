//! Configuration for the wake phrase + intent cascade
//!
//! A [`Config`] is built once, validated when the orchestrator initializes,
//! and never mutated afterwards. It can be assembled in code or loaded from
//! a TOML file (see [`file`]).

pub mod file;

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::engine::{IntentParams, WakeParams};
use crate::{Error, Result};

/// Default sensitivity for both engines
pub const DEFAULT_SENSITIVITY: f32 = 0.5;

/// Default trailing silence that ends a command, in seconds
pub const DEFAULT_ENDPOINT_DURATION_SEC: f32 = 1.0;

/// Accepted sensitivity range
pub const SENSITIVITY_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Accepted endpoint duration range, in seconds
pub const ENDPOINT_DURATION_RANGE: RangeInclusive<f32> = 0.5..=5.0;

/// Environment variable consulted for the access key
pub const ACCESS_KEY_ENV: &str = "HARK_ACCESS_KEY";

/// Cascade configuration
#[derive(Debug)]
pub struct Config {
    /// Credential passed to both engines
    pub access_key: SecretString,

    /// Wake phrase model file
    pub keyword_path: PathBuf,

    /// Intent context (grammar) file
    pub context_path: PathBuf,

    /// Wake engine tuning
    pub wake: WakeConfig,

    /// Intent engine tuning
    pub intent: IntentConfig,
}

/// Wake engine parameters
#[derive(Debug, Clone, PartialEq)]
pub struct WakeConfig {
    /// Engine parameter file (engine default when unset)
    pub model_path: Option<PathBuf>,

    /// Engine shared library (engine default when unset)
    pub library_path: Option<PathBuf>,

    /// Higher values miss less at the cost of more false alarms
    pub sensitivity: f32,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            library_path: None,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

/// Intent engine parameters
#[derive(Debug, Clone, PartialEq)]
pub struct IntentConfig {
    /// Engine parameter file (engine default when unset)
    pub model_path: Option<PathBuf>,

    /// Engine shared library (engine default when unset)
    pub library_path: Option<PathBuf>,

    /// Higher values miss less at the cost of more wrong inferences
    pub sensitivity: f32,

    /// Trailing silence that marks the end of a command, in seconds
    pub endpoint_duration_sec: f32,

    /// Wait for trailing silence before finalizing
    ///
    /// Disable only with overlapping background speech; the engine then
    /// finalizes even when it cannot detect an endpoint.
    pub require_endpoint: bool,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            library_path: None,
            sensitivity: DEFAULT_SENSITIVITY,
            endpoint_duration_sec: DEFAULT_ENDPOINT_DURATION_SEC,
            require_endpoint: true,
        }
    }
}

impl Config {
    /// Create a configuration with default engine tuning
    pub fn new(
        access_key: impl Into<String>,
        keyword_path: impl Into<PathBuf>,
        context_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            access_key: SecretString::from(access_key.into()),
            keyword_path: keyword_path.into(),
            context_path: context_path.into(),
            wake: WakeConfig::default(),
            intent: IntentConfig::default(),
        }
    }

    /// Set the wake engine parameter file
    #[must_use]
    pub fn with_wake_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wake.model_path = Some(path.into());
        self
    }

    /// Set the wake engine shared library
    #[must_use]
    pub fn with_wake_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.wake.library_path = Some(path.into());
        self
    }

    /// Set the wake engine sensitivity
    #[must_use]
    pub fn with_wake_sensitivity(mut self, sensitivity: f32) -> Self {
        self.wake.sensitivity = sensitivity;
        self
    }

    /// Set the intent engine parameter file
    #[must_use]
    pub fn with_intent_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.intent.model_path = Some(path.into());
        self
    }

    /// Set the intent engine shared library
    #[must_use]
    pub fn with_intent_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.intent.library_path = Some(path.into());
        self
    }

    /// Set the intent engine sensitivity
    #[must_use]
    pub fn with_intent_sensitivity(mut self, sensitivity: f32) -> Self {
        self.intent.sensitivity = sensitivity;
        self
    }

    /// Set the endpoint duration in seconds
    #[must_use]
    pub fn with_endpoint_duration_sec(mut self, seconds: f32) -> Self {
        self.intent.endpoint_duration_sec = seconds;
        self
    }

    /// Set whether the intent engine waits for trailing silence
    #[must_use]
    pub fn with_require_endpoint(mut self, require: bool) -> Self {
        self.intent.require_endpoint = require;
        self
    }

    /// Check every parameter
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending parameter
    pub fn validate(&self) -> Result<()> {
        if self.access_key.expose_secret().trim().is_empty() {
            return Err(Error::Config("access key must be a non-empty string".to_string()));
        }

        require_file("keyword", Some(&self.keyword_path))?;
        require_file("context", Some(&self.context_path))?;
        require_file("wake model", self.wake.model_path.as_deref())?;
        require_file("wake library", self.wake.library_path.as_deref())?;
        require_file("intent model", self.intent.model_path.as_deref())?;
        require_file("intent library", self.intent.library_path.as_deref())?;

        require_in_range("wake sensitivity", self.wake.sensitivity, &SENSITIVITY_RANGE)?;
        require_in_range(
            "intent sensitivity",
            self.intent.sensitivity,
            &SENSITIVITY_RANGE,
        )?;
        require_in_range(
            "endpoint duration",
            self.intent.endpoint_duration_sec,
            &ENDPOINT_DURATION_RANGE,
        )?;

        Ok(())
    }

    /// Parameters for the wake engine factory
    #[must_use]
    pub fn wake_params(&self) -> WakeParams<'_> {
        WakeParams {
            access_key: self.access_key.expose_secret(),
            keyword_path: &self.keyword_path,
            model_path: self.wake.model_path.as_deref(),
            library_path: self.wake.library_path.as_deref(),
            sensitivity: self.wake.sensitivity,
        }
    }

    /// Parameters for the intent engine factory
    #[must_use]
    pub fn intent_params(&self) -> IntentParams<'_> {
        IntentParams {
            access_key: self.access_key.expose_secret(),
            context_path: &self.context_path,
            model_path: self.intent.model_path.as_deref(),
            library_path: self.intent.library_path.as_deref(),
            sensitivity: self.intent.sensitivity,
            endpoint_duration_sec: self.intent.endpoint_duration_sec,
            require_endpoint: self.intent.require_endpoint,
        }
    }
}

fn require_file(what: &str, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    if path.as_os_str().is_empty() {
        return Err(Error::Config(format!("no {what} file was provided")));
    }
    if !path.is_file() {
        return Err(Error::Config(format!(
            "{what} file could not be found at {}",
            path.display()
        )));
    }
    Ok(())
}

fn require_in_range(what: &str, value: f32, range: &RangeInclusive<f32>) -> Result<()> {
    // `contains` is false for NaN
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{what} should be within [{}, {}], got {value}",
            range.start(),
            range.end()
        )))
    }
}
