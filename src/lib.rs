//! hark - Wake phrase + intent cascade for offline voice commands
//!
//! This library drives two streaming speech engines over one audio stream:
//! - A wake phrase spotter that runs on every frame while idle
//! - An intent engine that takes over after the phrase and turns the
//!   following command into an intent with slots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Frame sources                      │
//! │        WAV file  │  Microphone  │  caller frames     │
//! └────────────────────┬────────────────────────────────┘
//!                      │  (VoiceManager worker, optional)
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Orchestrator                        │
//! │   Idle ──wake──► Listening ──finalized──► Idle       │
//! └──────────┬─────────────────────────┬────────────────┘
//!            │                         │
//! ┌──────────▼──────────┐   ┌──────────▼──────────┐
//! │     WakeEngine      │   │    IntentEngine     │
//! │  (Porcupine, fake)  │   │    (Rhino, fake)    │
//! └─────────────────────┘   └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "native")]
//! # fn main() -> hark::Result<()> {
//! use hark::engine::native::{PorcupineFactory, RhinoFactory};
//! use hark::{Config, Orchestrator};
//!
//! let config = Config::new("access-key", "picovoice.ppn", "coffee_maker.rhn");
//! let mut orchestrator = Orchestrator::builder(config)
//!     .wake_engine(PorcupineFactory)
//!     .intent_engine(RhinoFactory)
//!     .on_wake(|| println!("[wake word]"))
//!     .on_inference(|inference| println!("{inference}"))
//!     .init()?;
//!
//! let frame = vec![0i16; orchestrator.frame_length().unwrap_or_default()];
//! orchestrator.process(&frame)?;
//! orchestrator.delete()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "native"))]
//! # fn main() {}
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod inference;
pub mod manager;
pub mod orchestrator;
pub mod voice;

pub use config::Config;
pub use engine::{
    AudioFormat, EngineError, EngineKind, EngineResult, EngineStatus, IntentEngine,
    IntentEngineFactory, WakeEngine, WakeEngineFactory,
};
pub use error::{Error, ErrorKind, Result};
pub use inference::Inference;
pub use manager::VoiceManager;
pub use orchestrator::{EngineInfo, Mode, Orchestrator, OrchestratorBuilder};
