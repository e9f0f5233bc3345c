//! Porcupine (wake word) and Rhino (speech-to-intent) engine adapters
//!
//! Both engines consume 16 kHz mono frames of 512 samples. The factories
//! declare that format up front and check it against the created instance.

use std::collections::HashMap;

use porcupine::{Porcupine, PorcupineBuilder};
use rhino::{Rhino, RhinoBuilder};

use super::{
    AudioFormat, EngineError, EngineResult, EngineStatus, IntentEngine, IntentEngineFactory,
    IntentParams, WakeEngine, WakeEngineFactory, WakeParams,
};
use crate::Inference;

/// Sample rate both native engines are built for
pub const NATIVE_SAMPLE_RATE: u32 = 16000;

/// Frame length both native engines are built for
pub const NATIVE_FRAME_LENGTH: usize = 512;

const NATIVE_FORMAT: AudioFormat = AudioFormat {
    sample_rate: NATIVE_SAMPLE_RATE,
    frame_length: NATIVE_FRAME_LENGTH,
};

/// Map a native binding error onto [`EngineError`]
///
/// The bindings expose their status only through `Debug`, which names the
/// underlying `pv_status_t` (e.g. `LibraryError(ACTIVATION_ERROR)`).
fn native_error(err: &(impl std::fmt::Debug + std::fmt::Display)) -> EngineError {
    let debug = format!("{err:?}");
    EngineError::new(status_from_debug(&debug), err.to_string())
}

fn status_from_debug(debug: &str) -> EngineStatus {
    const TABLE: &[(&str, EngineStatus)] = &[
        ("OUT_OF_MEMORY", EngineStatus::OutOfMemory),
        ("IO_ERROR", EngineStatus::Io),
        ("INVALID_ARGUMENT", EngineStatus::InvalidArgument),
        ("ArgumentError", EngineStatus::InvalidArgument),
        ("FrameLengthError", EngineStatus::InvalidArgument),
        ("STOP_ITERATION", EngineStatus::StopIteration),
        ("KEY_ERROR", EngineStatus::Key),
        ("INVALID_STATE", EngineStatus::InvalidState),
        ("RUNTIME_ERROR", EngineStatus::Runtime),
        ("ACTIVATION_LIMIT_REACHED", EngineStatus::ActivationLimit),
        ("ACTIVATION_THROTTLED", EngineStatus::ActivationThrottled),
        ("ACTIVATION_REFUSED", EngineStatus::ActivationRefused),
        ("ACTIVATION_ERROR", EngineStatus::Activation),
        ("LibraryLoadError", EngineStatus::Io),
    ];

    TABLE
        .iter()
        .find(|(needle, _)| debug.contains(needle))
        .map_or(EngineStatus::Other, |(_, status)| *status)
}

fn check_format(sample_rate: u32, frame_length: u32) -> EngineResult<()> {
    let actual = AudioFormat {
        sample_rate,
        frame_length: frame_length as usize,
    };
    if actual == NATIVE_FORMAT {
        Ok(())
    } else {
        Err(EngineError::new(
            EngineStatus::InvalidArgument,
            format!("engine reports {actual}, expected {NATIVE_FORMAT}"),
        ))
    }
}

/// Creates Porcupine wake word engines
#[derive(Debug, Default, Clone, Copy)]
pub struct PorcupineFactory;

impl WakeEngineFactory for PorcupineFactory {
    fn audio_format(&self) -> AudioFormat {
        NATIVE_FORMAT
    }

    fn create(&self, params: &WakeParams<'_>) -> EngineResult<Box<dyn WakeEngine>> {
        let mut builder =
            PorcupineBuilder::new_with_keyword_paths(params.access_key, &[params.keyword_path]);
        builder.sensitivities(&[params.sensitivity]);
        if let Some(model_path) = params.model_path {
            builder.model_path(model_path);
        }
        if let Some(library_path) = params.library_path {
            builder.library_path(library_path);
        }

        let porcupine = builder.init().map_err(|e| native_error(&e))?;
        check_format(porcupine.sample_rate(), porcupine.frame_length())?;

        tracing::debug!(version = %porcupine.version(), "porcupine engine created");

        Ok(Box::new(PorcupineEngine {
            version: porcupine.version().to_string(),
            inner: Some(porcupine),
        }))
    }
}

/// Porcupine wake word adapter
pub struct PorcupineEngine {
    inner: Option<Porcupine>,
    version: String,
}

impl WakeEngine for PorcupineEngine {
    fn process(&mut self, frame: &[i16]) -> EngineResult<Option<usize>> {
        let porcupine = self.inner.as_mut().ok_or_else(released)?;
        let index = porcupine.process(frame).map_err(|e| native_error(&e))?;

        // Negative index means no match
        Ok(usize::try_from(index).ok())
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn delete(&mut self) -> EngineResult<()> {
        // Dropping the handle releases the native instance
        drop(self.inner.take());
        Ok(())
    }
}

/// Creates Rhino speech-to-intent engines
#[derive(Debug, Default, Clone, Copy)]
pub struct RhinoFactory;

impl IntentEngineFactory for RhinoFactory {
    fn audio_format(&self) -> AudioFormat {
        NATIVE_FORMAT
    }

    fn create(&self, params: &IntentParams<'_>) -> EngineResult<Box<dyn IntentEngine>> {
        let mut builder = RhinoBuilder::new(params.access_key, params.context_path);
        builder
            .sensitivity(params.sensitivity)
            .endpoint_duration_sec(params.endpoint_duration_sec)
            .require_endpoint(params.require_endpoint);
        if let Some(model_path) = params.model_path {
            builder.model_path(model_path);
        }
        if let Some(library_path) = params.library_path {
            builder.library_path(library_path);
        }

        let rhino = builder.init().map_err(|e| native_error(&e))?;
        check_format(rhino.sample_rate(), rhino.frame_length())?;

        tracing::debug!(version = %rhino.version(), "rhino engine created");

        Ok(Box::new(RhinoEngine {
            version: rhino.version(),
            context_info: rhino.context_info(),
            inner: Some(rhino),
        }))
    }
}

/// Rhino speech-to-intent adapter
pub struct RhinoEngine {
    inner: Option<Rhino>,
    version: String,
    context_info: String,
}

impl IntentEngine for RhinoEngine {
    fn process(&mut self, frame: &[i16]) -> EngineResult<bool> {
        let rhino = self.inner.as_mut().ok_or_else(released)?;
        rhino.process(frame).map_err(|e| native_error(&e))
    }

    fn inference(&mut self) -> EngineResult<Inference> {
        let rhino = self.inner.as_mut().ok_or_else(released)?;
        let inference = rhino.get_inference().map_err(|e| native_error(&e))?;

        if !inference.is_understood {
            return Ok(Inference::not_understood());
        }

        let slots: HashMap<String, String> = inference.slots.into_iter().collect();
        Ok(Inference {
            is_understood: true,
            intent: inference.intent,
            slots,
        })
    }

    fn reset(&mut self) -> EngineResult<()> {
        let rhino = self.inner.as_mut().ok_or_else(released)?;
        rhino.reset().map_err(|e| native_error(&e))
    }

    fn context_info(&self) -> String {
        self.context_info.clone()
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn delete(&mut self) -> EngineResult<()> {
        drop(self.inner.take());
        Ok(())
    }
}

fn released() -> EngineError {
    EngineError::new(EngineStatus::InvalidState, "engine has been released")
}
