//! WAV file input

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use super::FrameSource;
use crate::{Error, Result};

/// Reads frames from a mono 16-bit PCM WAV stream
pub struct WavFrameReader<R: Read = BufReader<File>> {
    reader: hound::WavReader<R>,
    frames_read: u64,
}

impl WavFrameReader {
    /// Open a WAV file that must be sampled at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the file cannot be parsed or its format
    /// does not match
    pub fn open(path: &Path, sample_rate: u32) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .map_err(|e| Error::Audio(format!("{}: {e}", path.display())))?;
        let source = Self::from_wav(reader, sample_rate)?;
        tracing::debug!(
            path = %path.display(),
            sample_rate,
            samples = source.reader.len(),
            "opened wav input"
        );
        Ok(source)
    }
}

impl<R: Read> WavFrameReader<R> {
    /// Read WAV data from any byte stream
    ///
    /// # Errors
    ///
    /// Returns [`Error::Audio`] if the data cannot be parsed or its format
    /// does not match
    pub fn new(reader: R, sample_rate: u32) -> Result<Self> {
        let reader = hound::WavReader::new(reader).map_err(|e| Error::Audio(e.to_string()))?;
        Self::from_wav(reader, sample_rate)
    }

    fn from_wav(reader: hound::WavReader<R>, sample_rate: u32) -> Result<Self> {
        let spec = reader.spec();

        if spec.channels != 1 {
            return Err(Error::Audio(format!(
                "expected mono audio, got {} channels",
                spec.channels
            )));
        }
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(Error::Audio(format!(
                "expected 16-bit integer samples, got {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }
        if spec.sample_rate != sample_rate {
            return Err(Error::Audio(format!(
                "expected {sample_rate} Hz audio, got {} Hz",
                spec.sample_rate
            )));
        }

        Ok(Self {
            reader,
            frames_read: 0,
        })
    }

    /// Full frames delivered so far
    #[must_use]
    pub const fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl<R: Read + Send> FrameSource for WavFrameReader<R> {
    fn read_frame(&mut self, frame: &mut [i16], _stop: &AtomicBool) -> Result<bool> {
        let mut samples = self.reader.samples::<i16>();

        for slot in frame.iter_mut() {
            match samples.next() {
                Some(sample) => *slot = sample.map_err(|e| Error::Audio(e.to_string()))?,
                None => return Ok(false),
            }
        }

        self.frames_read += 1;
        Ok(true)
    }
}

/// Encode mono i16 samples as WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn trailing_partial_frame_is_dropped() {
        let samples: Vec<i16> = (0..10).collect();
        let bytes = samples_to_wav(&samples, 16000).unwrap();
        let mut reader = WavFrameReader::new(Cursor::new(bytes), 16000).unwrap();
        let stop = AtomicBool::new(false);

        let mut frame = [0i16; 4];
        assert!(reader.read_frame(&mut frame, &stop).unwrap());
        assert_eq!(frame, [0, 1, 2, 3]);
        assert!(reader.read_frame(&mut frame, &stop).unwrap());
        assert_eq!(frame, [4, 5, 6, 7]);
        assert!(!reader.read_frame(&mut frame, &stop).unwrap());
        assert_eq!(reader.frames_read(), 2);
    }

    #[test]
    fn wrong_sample_rate_is_rejected() {
        let bytes = samples_to_wav(&[0; 16], 8000).unwrap();
        let result = WavFrameReader::new(Cursor::new(bytes), 16000);
        assert!(matches!(result, Err(Error::Audio(ref msg)) if msg.contains("8000 Hz")));
    }
}
