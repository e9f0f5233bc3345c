//! Engine adapter interfaces
//!
//! The orchestrator drives two opaque streaming classifiers through these
//! traits: a wake phrase spotter ([`WakeEngine`]) and an intent engine
//! ([`IntentEngine`]). Each comes with a factory that declares the audio
//! format the engine consumes before anything is allocated, so format
//! mismatches are caught without touching engine resources.
//!
//! The `native` feature provides adapters over the Porcupine and Rhino
//! engines (see [`native`]).

#[cfg(feature = "native")]
pub mod native;

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::Inference;

/// Which of the two engines an error or value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Wake phrase spotter
    Wake,
    /// Intent inference engine
    Intent,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wake => write!(f, "wake"),
            Self::Intent => write!(f, "intent"),
        }
    }
}

/// Failure category reported by an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineStatus {
    /// Allocation failed
    OutOfMemory,
    /// Model, context or library file could not be read
    Io,
    /// Parameter rejected by the engine
    InvalidArgument,
    /// Iteration ended inside the engine
    StopIteration,
    /// Unknown key in engine resources
    Key,
    /// Engine called in the wrong state
    InvalidState,
    /// Unexpected engine failure
    Runtime,
    /// Access key could not be activated
    Activation,
    /// Access key has no activations left
    ActivationLimit,
    /// Too many activation attempts
    ActivationThrottled,
    /// Access key was rejected
    ActivationRefused,
    /// Anything the adapter could not classify
    Other,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OutOfMemory => "out of memory",
            Self::Io => "io error",
            Self::InvalidArgument => "invalid argument",
            Self::StopIteration => "stop iteration",
            Self::Key => "key error",
            Self::InvalidState => "invalid state",
            Self::Runtime => "runtime error",
            Self::Activation => "activation error",
            Self::ActivationLimit => "activation limit reached",
            Self::ActivationThrottled => "activation throttled",
            Self::ActivationRefused => "activation refused",
            Self::Other => "engine error",
        };
        f.write_str(s)
    }
}

/// Error surfaced by an engine adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct EngineError {
    /// Failure category
    pub status: EngineStatus,
    /// Engine-provided detail
    pub message: String,
}

impl EngineError {
    /// Create an engine error
    pub fn new(status: EngineStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Result type for engine adapter calls
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Audio shape an engine consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second
    pub sample_rate: u32,
    /// Samples per frame
    pub frame_length: usize,
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} samples @ {} Hz", self.frame_length, self.sample_rate)
    }
}

/// Parameters handed to a [`WakeEngineFactory`]
#[derive(Debug, Clone, Copy)]
pub struct WakeParams<'a> {
    /// Credential for the engine
    pub access_key: &'a str,
    /// Wake phrase model file
    pub keyword_path: &'a Path,
    /// Engine parameter file, engine default when `None`
    pub model_path: Option<&'a Path>,
    /// Engine shared library, engine default when `None`
    pub library_path: Option<&'a Path>,
    /// Detection sensitivity in [0, 1]
    pub sensitivity: f32,
}

/// Parameters handed to an [`IntentEngineFactory`]
#[derive(Debug, Clone, Copy)]
pub struct IntentParams<'a> {
    /// Credential for the engine
    pub access_key: &'a str,
    /// Context (grammar) file
    pub context_path: &'a Path,
    /// Engine parameter file, engine default when `None`
    pub model_path: Option<&'a Path>,
    /// Engine shared library, engine default when `None`
    pub library_path: Option<&'a Path>,
    /// Inference sensitivity in [0, 1]
    pub sensitivity: f32,
    /// Trailing silence that ends a command, in seconds
    pub endpoint_duration_sec: f32,
    /// Require trailing silence before finalizing
    pub require_endpoint: bool,
}

/// Streaming wake phrase spotter
pub trait WakeEngine: Send {
    /// Process one frame, returning the index of the matched phrase
    ///
    /// # Errors
    ///
    /// Returns the engine's failure
    fn process(&mut self, frame: &[i16]) -> EngineResult<Option<usize>>;

    /// Engine version string
    fn version(&self) -> String;

    /// Release engine resources; further calls are no-ops
    ///
    /// # Errors
    ///
    /// Returns the engine's failure
    fn delete(&mut self) -> EngineResult<()>;
}

/// Streaming intent inference engine
pub trait IntentEngine: Send {
    /// Process one frame, returning `true` once the command is finalized
    ///
    /// # Errors
    ///
    /// Returns the engine's failure
    fn process(&mut self, frame: &[i16]) -> EngineResult<bool>;

    /// Inference for the command just finalized by [`IntentEngine::process`]
    ///
    /// # Errors
    ///
    /// Returns the engine's failure, including when nothing was finalized
    fn inference(&mut self) -> EngineResult<Inference>;

    /// Drop any partially processed command
    ///
    /// # Errors
    ///
    /// Returns the engine's failure
    fn reset(&mut self) -> EngineResult<()>;

    /// Human-readable description of the intents and slots the context supports
    fn context_info(&self) -> String;

    /// Engine version string
    fn version(&self) -> String;

    /// Release engine resources; further calls are no-ops
    ///
    /// # Errors
    ///
    /// Returns the engine's failure
    fn delete(&mut self) -> EngineResult<()>;
}

/// Creates [`WakeEngine`] instances
pub trait WakeEngineFactory: Send {
    /// Audio format the created engine consumes
    fn audio_format(&self) -> AudioFormat;

    /// Create an engine
    ///
    /// # Errors
    ///
    /// Returns the engine's construction failure
    fn create(&self, params: &WakeParams<'_>) -> EngineResult<Box<dyn WakeEngine>>;
}

/// Creates [`IntentEngine`] instances
pub trait IntentEngineFactory: Send {
    /// Audio format the created engine consumes
    fn audio_format(&self) -> AudioFormat;

    /// Create an engine
    ///
    /// # Errors
    ///
    /// Returns the engine's construction failure
    fn create(&self, params: &IntentParams<'_>) -> EngineResult<Box<dyn IntentEngine>>;
}
