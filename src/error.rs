//! Error types for hark

use thiserror::Error;

use crate::engine::{EngineError, EngineKind, EngineStatus};

/// Result type alias for hark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hark
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing or out-of-range parameter, engine format
    /// mismatch, missing callback or engine)
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not permitted in the current lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid argument passed to an operation (e.g. wrong frame length)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by one of the engines
    #[error("{engine} engine failed to {operation}: {source}")]
    Engine {
        /// Engine that failed
        engine: EngineKind,
        /// Operation that was being performed
        operation: &'static str,
        /// Error surfaced by the engine adapter
        #[source]
        source: EngineError,
    },

    /// Audio input error (device or file)
    #[error("audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Machine-checkable classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Config`]
    Config,
    /// See [`Error::InvalidState`]
    InvalidState,
    /// See [`Error::InvalidArgument`]
    InvalidArgument,
    /// Engine failure with the engine's own status
    Engine(EngineStatus),
    /// See [`Error::Audio`]
    Audio,
    /// IO or file parsing failure
    Io,
}

impl Error {
    /// Wrap an engine adapter failure with the engine and operation that produced it
    #[must_use]
    pub const fn engine(engine: EngineKind, operation: &'static str, source: EngineError) -> Self {
        Self::Engine {
            engine,
            operation,
            source,
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Engine { source, .. } => ErrorKind::Engine(source.status),
            Self::Audio(_) => ErrorKind::Audio,
            Self::Io(_) | Self::Toml(_) => ErrorKind::Io,
        }
    }

    /// The engine this error originated from, if any
    #[must_use]
    pub const fn failed_engine(&self) -> Option<EngineKind> {
        match self {
            Self::Engine { engine, .. } => Some(*engine),
            _ => None,
        }
    }
}
