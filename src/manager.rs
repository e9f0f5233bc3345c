//! Background runner that feeds a [`FrameSource`] through an orchestrator
//!
//! The orchestrator is initialized on the calling thread so configuration
//! and engine errors surface from [`VoiceManager::start`]. Frames are then
//! read and processed on a single worker thread; the wake and inference
//! callbacks run there too.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
use crate::voice::FrameSource;
use crate::{Error, Result};

/// Callback for errors raised while the worker runs
pub type ErrorCallback = Box<dyn FnMut(Error) + Send>;

/// Runs an orchestrator over a frame source on a worker thread
///
/// A manager runs once: after [`stop`](Self::stop) or [`wait`](Self::wait)
/// the orchestrator has been deleted and a new manager is needed.
pub struct VoiceManager {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Orchestrator>>,
}

impl VoiceManager {
    /// Initialize the orchestrator and start processing `source`
    ///
    /// Processing errors are logged and the loop continues.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's initialization error, or
    /// [`Error::Io`] if the worker thread cannot be spawned
    pub fn start(builder: OrchestratorBuilder, source: impl FrameSource + 'static) -> Result<Self> {
        Self::spawn(builder, source, None)
    }

    /// Like [`start`](Self::start), but errors go to `on_error`
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start)
    pub fn start_with_error_handler(
        builder: OrchestratorBuilder,
        source: impl FrameSource + 'static,
        on_error: impl FnMut(Error) + Send + 'static,
    ) -> Result<Self> {
        Self::spawn(builder, source, Some(Box::new(on_error)))
    }

    fn spawn(
        builder: OrchestratorBuilder,
        mut source: impl FrameSource + 'static,
        mut on_error: Option<ErrorCallback>,
    ) -> Result<Self> {
        let mut orchestrator = builder.init()?;
        let frame_length = orchestrator
            .frame_length()
            .ok_or_else(|| Error::InvalidState("orchestrator not initialized".to_string()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let worker = std::thread::Builder::new()
            .name("hark-worker".to_string())
            .spawn(move || {
                let mut report = |error: Error| {
                    if let Some(callback) = on_error.as_mut() {
                        callback(error);
                    } else {
                        tracing::warn!(error = %error, "frame processing failed");
                    }
                };

                let mut frame = vec![0i16; frame_length];
                let mut frames: u64 = 0;

                while !flag.load(Ordering::Relaxed) {
                    match source.read_frame(&mut frame, &flag) {
                        Ok(true) => {
                            frames += 1;
                            if let Err(e) = orchestrator.process(&frame) {
                                report(e);
                            }
                        }
                        Ok(false) => break,
                        Err(e) => {
                            report(e);
                            break;
                        }
                    }
                }

                tracing::debug!(frames, "voice manager worker finished");
                orchestrator
            })?;

        tracing::info!(frame_length, "voice manager started");

        Ok(Self {
            stop,
            worker: Some(worker),
        })
    }

    /// Whether the worker is still processing frames
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Signal the worker, wait for it, and delete the orchestrator
    ///
    /// Stopping an already stopped manager is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the orchestrator's release error, or
    /// [`Error::InvalidState`] if the worker panicked
    pub fn stop(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        self.finish()
    }

    /// Wait for the source to run out, then delete the orchestrator
    ///
    /// # Errors
    ///
    /// See [`stop`](Self::stop)
    pub fn wait(&mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let mut orchestrator = worker
            .join()
            .map_err(|_| Error::InvalidState("voice manager worker panicked".to_string()))?;
        orchestrator.delete()?;

        tracing::info!("voice manager stopped");
        Ok(())
    }
}

impl Drop for VoiceManager {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "failed to stop voice manager");
        }
    }
}
