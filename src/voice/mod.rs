//! Audio input for the cascade
//!
//! Sources deliver exact-length mono i16 frames at the engine sample rate.
//! Nothing here resamples or downmixes; input that does not already match
//! the engine format is rejected.

mod capture;
mod wav;

use std::sync::atomic::AtomicBool;

pub use capture::{AudioDeviceInfo, Microphone, MicrophoneSource, list_input_devices};
pub use wav::{WavFrameReader, samples_to_wav};

use crate::Result;

/// Yields audio frames for [`Orchestrator::process`](crate::Orchestrator::process)
pub trait FrameSource: Send {
    /// Fill `frame` completely with the next samples
    ///
    /// Returns `false` once the source is exhausted or `stop` is set. A
    /// trailing partial frame is discarded. Blocking sources must give up
    /// promptly after `stop` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`](crate::Error::Audio) if the underlying stream fails
    fn read_frame(&mut self, frame: &mut [i16], stop: &AtomicBool) -> Result<bool>;
}
