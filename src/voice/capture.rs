//! Audio capture from microphone

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use super::FrameSource;
use crate::{Error, Result};

/// Seconds of audio kept while the reader falls behind
const MAX_BUFFERED_SECS: usize = 10;

/// How often a blocked reader checks for new samples
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type SampleBuffer = Arc<Mutex<VecDeque<i16>>>;

/// Input device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    /// Device name
    pub name: String,
    /// Whether this is the host's default input
    pub is_default: bool,
}

/// Owns the capture stream of one input device
///
/// The stream stays on the thread that opened it; frames are read through
/// a [`MicrophoneSource`], which can move to another thread.
pub struct Microphone {
    device: Device,
    config: StreamConfig,
    buffer: SampleBuffer,
    stream: Option<Stream>,
}

impl Microphone {
    /// Open an input device that records mono at `sample_rate`
    ///
    /// Uses the default input when `device_name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns error if the device is missing or cannot record mono at
    /// `sample_rate`
    pub fn open(device_name: Option<&str>, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| Error::Audio(e.to_string()))?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| Error::Audio(format!("input device not found: {name}")))?,
            None => host
                .default_input_device()
                .ok_or_else(|| Error::Audio("no input device available".to_string()))?,
        };

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(sample_rate)
                    && c.max_sample_rate() >= SampleRate(sample_rate)
            })
            .ok_or_else(|| {
                Error::Audio(format!("device cannot record mono audio at {sample_rate} Hz"))
            })?;

        let config = supported_config
            .with_sample_rate(SampleRate(sample_rate))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate,
            channels = config.channels,
            "microphone opened"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            stream: None,
        })
    }

    /// Start capturing audio
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let capacity = self.config.sample_rate.0 as usize * MAX_BUFFERED_SECS;

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(data.iter().map(|&s| to_i16(s)));
                        let overflow = buf.len().saturating_sub(capacity);
                        if overflow > 0 {
                            buf.drain(..overflow);
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Check if currently capturing
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Frame reader over the captured samples
    #[must_use]
    pub fn source(&self) -> MicrophoneSource {
        MicrophoneSource {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Frames captured by a [`Microphone`]
#[derive(Clone)]
pub struct MicrophoneSource {
    buffer: SampleBuffer,
}

impl FrameSource for MicrophoneSource {
    fn read_frame(&mut self, frame: &mut [i16], stop: &AtomicBool) -> Result<bool> {
        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(false);
            }

            {
                let mut buf = self
                    .buffer
                    .lock()
                    .map_err(|_| Error::Audio("capture buffer poisoned".to_string()))?;
                let len = frame.len();
                if buf.len() >= len {
                    for (slot, sample) in frame.iter_mut().zip(buf.drain(..len)) {
                        *slot = sample;
                    }
                    return Ok(true);
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Convert f32 [-1.0, 1.0] to i16
#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample * 32767.0).clamp(-32768.0, 32767.0) as i16
}

/// List available input devices
///
/// # Errors
///
/// Returns error if the audio host cannot enumerate devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter_map(|device| {
            let name = device.name().ok()?;
            let is_default = default_name.as_deref() == Some(name.as_str());
            Some(AudioDeviceInfo { name, is_default })
        })
        .collect();

    Ok(devices)
}
