//! Wake phrase + intent cascade
//!
//! The [`Orchestrator`] owns one wake engine and one intent engine and feeds
//! each audio frame to exactly one of them:
//!
//! ```text
//!            wake match                      inference finalized
//!   ┌──────┐ ──────────────► ┌───────────┐ ─────────────────────┐
//!   │ Idle │                 │ Listening │                      │
//!   └──────┘ ◄────────────── └───────────┘ ◄────────────────────┘
//!      ▲        on_wake()                     on_inference(..)
//!      └─ init() / reset()
//! ```
//!
//! Callbacks run synchronously inside [`Orchestrator::process`], after the
//! mode has already changed. `process` borrows the orchestrator mutably, so a
//! callback cannot feed frames back into the same instance; queue them and
//! call `process` again once it returns.

use std::fmt;

use serde::Serialize;

use crate::config::Config;
use crate::engine::{
    AudioFormat, EngineKind, IntentEngine, IntentEngineFactory, WakeEngine, WakeEngineFactory,
};
use crate::{Error, Inference, Result};

/// Callback invoked when the wake phrase is detected
pub type WakeCallback = Box<dyn FnMut() + Send>;

/// Callback invoked with the inference for a finished command
pub type InferenceCallback = Box<dyn FnMut(Inference) + Send>;

/// Which engine receives the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Spotting the wake phrase
    #[default]
    Idle,
    /// Inferring the intent of a command
    Listening,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Listening => write!(f, "listening"),
        }
    }
}

/// Read-only values captured at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    /// Samples per frame accepted by [`Orchestrator::process`]
    pub frame_length: usize,
    /// Required sample rate in Hz
    pub sample_rate: u32,
    /// Wake engine version
    pub wake_version: String,
    /// Intent engine version
    pub intent_version: String,
    /// Combined version string
    pub version: String,
    /// Intents and slots understood by the loaded context
    pub context_info: String,
}

struct Session {
    wake: Box<dyn WakeEngine>,
    intent: Box<dyn IntentEngine>,
    on_wake: WakeCallback,
    on_inference: InferenceCallback,
    info: EngineInfo,
}

enum Lifecycle {
    Uninitialized,
    Ready(Box<Session>),
    Deleted,
}

/// Collects the collaborators of an [`Orchestrator`]
pub struct OrchestratorBuilder {
    config: Config,
    wake_factory: Option<Box<dyn WakeEngineFactory>>,
    intent_factory: Option<Box<dyn IntentEngineFactory>>,
    on_wake: Option<WakeCallback>,
    on_inference: Option<InferenceCallback>,
}

impl OrchestratorBuilder {
    /// Engine factory for wake phrase spotting
    #[must_use]
    pub fn wake_engine(mut self, factory: impl WakeEngineFactory + 'static) -> Self {
        self.wake_factory = Some(Box::new(factory));
        self
    }

    /// Engine factory for intent inference
    #[must_use]
    pub fn intent_engine(mut self, factory: impl IntentEngineFactory + 'static) -> Self {
        self.intent_factory = Some(Box::new(factory));
        self
    }

    /// Callback for wake phrase detection
    #[must_use]
    pub fn on_wake(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_wake = Some(Box::new(callback));
        self
    }

    /// Callback for finished inferences
    #[must_use]
    pub fn on_inference(mut self, callback: impl FnMut(Inference) + Send + 'static) -> Self {
        self.on_inference = Some(Box::new(callback));
        self
    }

    /// Audio format declared by the wake engine factory
    ///
    /// Lets callers open an input at the right rate before initializing.
    #[must_use]
    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.wake_factory.as_ref().map(|f| f.audio_format())
    }

    /// Build an uninitialized orchestrator
    ///
    /// Nothing is validated until [`Orchestrator::init`].
    #[must_use]
    pub fn build(self) -> Orchestrator {
        Orchestrator {
            config: self.config,
            wake_factory: self.wake_factory,
            intent_factory: self.intent_factory,
            on_wake: self.on_wake,
            on_inference: self.on_inference,
            mode: Mode::Idle,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    /// Build and initialize
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::init`]
    pub fn init(self) -> Result<Orchestrator> {
        let mut orchestrator = self.build();
        orchestrator.init()?;
        Ok(orchestrator)
    }
}

/// Drives a wake engine and an intent engine over one audio stream
///
/// Lifecycle: built uninitialized, [`init`](Self::init) once, any number of
/// [`process`](Self::process) calls, then [`delete`](Self::delete) (or drop).
/// A deleted orchestrator cannot be initialized again.
pub struct Orchestrator {
    config: Config,
    wake_factory: Option<Box<dyn WakeEngineFactory>>,
    intent_factory: Option<Box<dyn IntentEngineFactory>>,
    on_wake: Option<WakeCallback>,
    on_inference: Option<InferenceCallback>,
    mode: Mode,
    lifecycle: Lifecycle,
}

impl Orchestrator {
    /// Start building an orchestrator for `config`
    #[must_use]
    pub fn builder(config: Config) -> OrchestratorBuilder {
        OrchestratorBuilder {
            config,
            wake_factory: None,
            intent_factory: None,
            on_wake: None,
            on_inference: None,
        }
    }

    /// Validate configuration and create both engines
    ///
    /// The wake engine is created first; if the intent engine then fails to
    /// create, the wake engine is released before returning.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if already initialized or deleted
    /// - [`Error::Config`] for a missing callback or engine, invalid
    ///   configuration, or engines that disagree on the audio format
    /// - [`Error::Engine`] if either engine fails to create
    pub fn init(&mut self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Ready(_) => {
                return Err(Error::InvalidState("already initialized".to_string()));
            }
            Lifecycle::Deleted => {
                return Err(Error::InvalidState(
                    "cannot initialize after delete".to_string(),
                ));
            }
        }

        if self.on_wake.is_none() {
            return Err(Error::Config("no wake callback provided".to_string()));
        }
        if self.on_inference.is_none() {
            return Err(Error::Config("no inference callback provided".to_string()));
        }
        let (Some(wake_factory), Some(intent_factory)) =
            (self.wake_factory.as_ref(), self.intent_factory.as_ref())
        else {
            return Err(Error::Config(
                "both a wake engine and an intent engine are required".to_string(),
            ));
        };

        self.config.validate()?;

        let format = matching_format(wake_factory.audio_format(), intent_factory.audio_format())?;

        let mut wake = wake_factory
            .create(&self.config.wake_params())
            .map_err(|e| Error::engine(EngineKind::Wake, "initialize", e))?;

        let intent = match intent_factory.create(&self.config.intent_params()) {
            Ok(intent) => intent,
            Err(e) => {
                if let Err(release) = wake.delete() {
                    tracing::warn!(error = %release, "failed to release wake engine");
                }
                return Err(Error::engine(EngineKind::Intent, "initialize", e));
            }
        };

        let wake_version = wake.version();
        let intent_version = intent.version();
        let info = EngineInfo {
            frame_length: format.frame_length,
            sample_rate: format.sample_rate,
            version: format!(
                "{} (wake v{wake_version}) (intent v{intent_version})",
                env!("CARGO_PKG_VERSION")
            ),
            wake_version,
            intent_version,
            context_info: intent.context_info(),
        };

        // Presence checked above
        let (Some(on_wake), Some(on_inference)) = (self.on_wake.take(), self.on_inference.take())
        else {
            return Err(Error::Config("callbacks missing".to_string()));
        };

        tracing::info!(
            frame_length = info.frame_length,
            sample_rate = info.sample_rate,
            version = %info.version,
            "orchestrator initialized"
        );

        self.mode = Mode::Idle;
        self.lifecycle = Lifecycle::Ready(Box::new(Session {
            wake,
            intent,
            on_wake,
            on_inference,
            info,
        }));
        Ok(())
    }

    /// Feed one frame to the engine selected by the current mode
    ///
    /// While idle the frame goes to the wake engine; a match switches to
    /// listening and runs the wake callback. While listening it goes to the
    /// intent engine; once the command is finalized the mode returns to idle
    /// and the inference callback receives the result. The frame that
    /// triggered the wake phrase is not passed to the intent engine.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if not initialized or already deleted
    /// - [`Error::InvalidArgument`] if `frame` is not exactly
    ///   [`frame_length`](Self::frame_length) samples
    /// - [`Error::Engine`] if the engine fails
    pub fn process(&mut self, frame: &[i16]) -> Result<()> {
        let session = ready(&mut self.lifecycle)?;

        if frame.len() != session.info.frame_length {
            return Err(Error::InvalidArgument(format!(
                "frame has {} samples, expected {}",
                frame.len(),
                session.info.frame_length
            )));
        }

        match self.mode {
            Mode::Idle => {
                let matched = session
                    .wake
                    .process(frame)
                    .map_err(|e| Error::engine(EngineKind::Wake, "process", e))?;

                // Only one wake phrase is loaded
                if matched == Some(0) {
                    self.mode = Mode::Listening;
                    tracing::debug!("wake phrase detected");
                    (session.on_wake)();
                }
            }
            Mode::Listening => {
                let finalized = session
                    .intent
                    .process(frame)
                    .map_err(|e| Error::engine(EngineKind::Intent, "process", e))?;

                if finalized {
                    self.mode = Mode::Idle;
                    let inference = session
                        .intent
                        .inference()
                        .map_err(|e| Error::engine(EngineKind::Intent, "get inference", e))?;
                    tracing::debug!(
                        understood = inference.is_understood,
                        intent = ?inference.intent,
                        "inference finalized"
                    );
                    (session.on_inference)(inference);
                }
            }
        }

        Ok(())
    }

    /// Abandon any command in progress and return to wake phrase spotting
    ///
    /// Call before processing a new, unrelated stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if not initialized, or the intent
    /// engine's failure
    pub fn reset(&mut self) -> Result<()> {
        let session = ready(&mut self.lifecycle)?;
        self.mode = Mode::Idle;
        session
            .intent
            .reset()
            .map_err(|e| Error::engine(EngineKind::Intent, "reset", e))
    }

    /// Release both engines
    ///
    /// Both releases are always attempted; the first failure is returned.
    /// Deleting twice, or deleting an orchestrator that was never
    /// initialized, is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] if either engine fails to release
    pub fn delete(&mut self) -> Result<()> {
        let previous = std::mem::replace(&mut self.lifecycle, Lifecycle::Deleted);
        self.mode = Mode::Idle;

        let Lifecycle::Ready(mut session) = previous else {
            return Ok(());
        };

        let wake = session
            .wake
            .delete()
            .map_err(|e| Error::engine(EngineKind::Wake, "release", e));
        let intent = session
            .intent
            .delete()
            .map_err(|e| Error::engine(EngineKind::Intent, "release", e));

        if let (Err(first), Err(second)) = (&wake, &intent) {
            tracing::warn!(first = %first, second = %second, "both engines failed to release");
        }

        tracing::debug!("orchestrator deleted");
        wake.and(intent)
    }

    /// Current mode
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether [`init`](Self::init) succeeded and [`delete`](Self::delete)
    /// has not been called
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Ready(_))
    }

    /// Engine details, available while initialized
    #[must_use]
    pub fn info(&self) -> Option<&EngineInfo> {
        match &self.lifecycle {
            Lifecycle::Ready(session) => Some(&session.info),
            _ => None,
        }
    }

    /// Samples per frame, available while initialized
    #[must_use]
    pub fn frame_length(&self) -> Option<usize> {
        self.info().map(|info| info.frame_length)
    }

    /// Sample rate in Hz, available while initialized
    #[must_use]
    pub fn sample_rate(&self) -> Option<u32> {
        self.info().map(|info| info.sample_rate)
    }

    /// Combined version, available while initialized
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.info().map(|info| info.version.as_str())
    }

    /// Context description, available while initialized
    #[must_use]
    pub fn context_info(&self) -> Option<&str> {
        self.info().map(|info| info.context_info.as_str())
    }

    /// The configuration this orchestrator was built with
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

fn ready(lifecycle: &mut Lifecycle) -> Result<&mut Session> {
    match lifecycle {
        Lifecycle::Ready(session) => Ok(session),
        Lifecycle::Uninitialized => Err(Error::InvalidState("not initialized".to_string())),
        Lifecycle::Deleted => Err(Error::InvalidState("already deleted".to_string())),
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.is_initialized()
            && let Err(e) = self.delete()
        {
            tracing::warn!(error = %e, "failed to release engines on drop");
        }
    }
}

impl fmt::Display for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info() {
            Some(info) => write!(
                f,
                "hark {} {{wake {}, intent {}}}",
                env!("CARGO_PKG_VERSION"),
                info.wake_version,
                info.intent_version
            ),
            None => write!(f, "hark {} (not initialized)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("mode", &self.mode)
            .field("initialized", &self.is_initialized())
            .field("info", &self.info())
            .finish_non_exhaustive()
    }
}

fn matching_format(wake: AudioFormat, intent: AudioFormat) -> Result<AudioFormat> {
    if wake.sample_rate != intent.sample_rate {
        return Err(Error::Config(format!(
            "wake engine sample rate ({}) differs from intent engine sample rate ({})",
            wake.sample_rate, intent.sample_rate
        )));
    }
    if wake.frame_length != intent.frame_length {
        return Err(Error::Config(format!(
            "wake engine frame length ({}) differs from intent engine frame length ({})",
            wake.frame_length, intent.frame_length
        )));
    }
    Ok(wake)
}
