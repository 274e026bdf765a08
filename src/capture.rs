//! Frame acquisition
//!
//! A [FrameSource] owns a producer thread that keeps grabbing frames from a [Grabber], so the
//! frame retrieved by the consumer is always the most recent one. Several consecutive frames are
//! then averaged to suppress sensor noise.

use std::{
    convert::TryFrom,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::JoinHandle,
    time::Duration,
};

use thiserror::Error;

use crate::{
    image::{RawImage, RawImageError},
    models,
};

mod stills;
pub use stills::Stills;

#[cfg(feature = "opencv")]
mod stream;
#[cfg(feature = "opencv")]
pub use stream::Stream;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frame: {0}")]
    RawImage(#[from] RawImageError),
    #[error("grabber is not open")]
    NotOpen,
    #[error("could not open {0}")]
    OpenFailed(String),
    #[error("no frame available")]
    NoFrame,
    #[error("frame size changed from {expected:?} to {actual:?}")]
    SizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("grabber not supported: {0}")]
    NotSupported(&'static str),
    #[cfg(feature = "opencv")]
    #[error("opencv error: {0}")]
    OpenCv(#[from] opencv::Error),
}

/// Low-level frame grabber, split like a capture device into grab and retrieve steps
pub trait Grabber: Send {
    fn open(&mut self) -> Result<(), CaptureError>;

    fn is_open(&self) -> bool;

    /// Acquire the next frame, without decoding it
    fn grab(&mut self) -> Result<(), CaptureError>;

    /// Decode the last grabbed frame
    fn retrieve(&mut self) -> Result<RawImage, CaptureError>;

    fn release(&mut self);
}

/// Build the grabber described by the configuration, not opened yet
pub fn from_config(config: &models::Grabber) -> Result<Box<dyn Grabber>, CaptureError> {
    let grabber: Box<dyn Grabber>;
    match config {
        models::Grabber::Stills(stills) => {
            grabber = Box::new(Stills::new(stills));
        }
        #[cfg(feature = "opencv")]
        models::Grabber::Stream(stream) => {
            grabber = Box::new(Stream::new(stream));
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(CaptureError::NotSupported(other.into()));
        }
    }

    Ok(grabber)
}

/// Running per-channel sum of same-sized frames
#[derive(Debug, Default)]
pub struct FrameAverager {
    sums: Vec<u32>,
    size: Option<(u32, u32)>,
    count: u32,
}

impl FrameAverager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn add(&mut self, frame: &RawImage) -> Result<(), CaptureError> {
        let actual = (frame.width(), frame.height());
        match self.size {
            None => {
                self.size = Some(actual);
                self.sums = vec![0; frame.data().len()];
            }
            Some(expected) if expected != actual => {
                return Err(CaptureError::SizeMismatch { expected, actual });
            }
            Some(_) => {}
        }

        for (sum, &value) in self.sums.iter_mut().zip(frame.data()) {
            *sum += value as u32;
        }

        self.count += 1;
        Ok(())
    }

    /// Rounded per-channel mean of all frames added so far
    pub fn mean(&self) -> Option<RawImage> {
        let (width, height) = self.size?;
        let half = self.count / 2;
        let data = self
            .sums
            .iter()
            .map(|&sum| ((sum + half) / self.count) as u8)
            .collect();

        RawImage::try_from((data, width, height)).ok()
    }
}

/// Longest time a dropped [FrameSource] waits for its producer to stop
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn lock(grabber: &Mutex<Box<dyn Grabber>>) -> MutexGuard<'_, Box<dyn Grabber>> {
    grabber.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Settings of the producer loop
#[derive(Debug, Clone, Copy)]
struct Backoff {
    retry_delay: Duration,
    max_retry_delay: Duration,
    reopen_after: u32,
}

impl Backoff {
    /// Delay after the given number of consecutive failures
    fn delay(&self, failures: u32) -> Duration {
        self.retry_delay
            .checked_mul(failures)
            .unwrap_or(self.max_retry_delay)
            .min(self.max_retry_delay)
    }
}

fn produce(grabber: Arc<Mutex<Box<dyn Grabber>>>, running: Arc<AtomicBool>, backoff: Backoff) {
    let mut failures = 0u32;

    while running.load(Ordering::Acquire) {
        let result = lock(&grabber).grab();

        match result {
            Ok(()) => {
                if failures > 0 {
                    info!(failures, "frame acquisition recovered");
                }

                failures = 0;
                // Let the consumer in between two grabs
                std::thread::yield_now();
            }
            Err(error) => {
                failures += 1;
                warn!(error = %error, failures, "frame acquisition failed");

                if failures % backoff.reopen_after == 0 {
                    let mut grabber = lock(&grabber);
                    grabber.release();
                    match grabber.open() {
                        Ok(()) => info!("grabber reopened"),
                        Err(error) => warn!(error = %error, "reopening grabber failed"),
                    }
                }

                std::thread::sleep(backoff.delay(failures));
            }
        }
    }

    debug!("capture producer stopped");
}

/// Handle to an open grabber and its producer thread
pub struct FrameSource {
    grabber: Arc<Mutex<Box<dyn Grabber>>>,
    running: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    /// Disconnected once the producer thread has returned
    stopped: Receiver<()>,
}

impl FrameSource {
    /// Open the grabber and start grabbing frames
    #[instrument(skip(grabber, config))]
    pub fn open(
        mut grabber: Box<dyn Grabber>,
        config: &models::Capture,
    ) -> Result<Self, CaptureError> {
        grabber.open()?;

        let grabber = Arc::new(Mutex::new(grabber));
        let running = Arc::new(AtomicBool::new(true));
        let backoff = Backoff {
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_retry_delay: Duration::from_millis(config.max_retry_delay_ms),
            reopen_after: config.reopen_after.max(1),
        };

        let (stopped_tx, stopped) = mpsc::channel();
        let producer = std::thread::Builder::new().name("capture".to_owned()).spawn({
            let grabber = grabber.clone();
            let running = running.clone();
            move || {
                let _stopped = stopped_tx;
                produce(grabber, running, backoff)
            }
        })?;

        Ok(Self {
            grabber,
            running,
            producer: Some(producer),
            stopped,
        })
    }

    pub fn is_open(&self) -> bool {
        lock(&self.grabber).is_open()
    }

    /// Average the latest frame and the `frame_count - 1` frames following it
    pub fn read_latest_averaged(&self, frame_count: u32) -> Result<RawImage, CaptureError> {
        let mut averager = FrameAverager::new();

        let latest = {
            let mut grabber = lock(&self.grabber);
            match grabber.retrieve() {
                Ok(frame) => frame,
                Err(CaptureError::NoFrame) => {
                    grabber.grab()?;
                    grabber.retrieve()?
                }
                Err(error) => return Err(error),
            }
        };
        averager.add(&latest)?;

        while averager.count() < frame_count {
            let frame = {
                let mut grabber = lock(&self.grabber);
                grabber.grab()?;
                grabber.retrieve()?
            };

            averager.add(&frame)?;
        }

        averager.mean().ok_or(CaptureError::NoFrame)
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);

        let producer = match self.producer.take() {
            Some(producer) => producer,
            None => return,
        };

        match self.stopped.recv_timeout(SHUTDOWN_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if producer.join().is_err() {
                    error!("capture producer panicked");
                }

                lock(&self.grabber).release();
            }
            Err(RecvTimeoutError::Timeout) => {
                // The grabber is still locked by the stuck grab, leave both behind
                warn!(
                    timeout = ?SHUTDOWN_TIMEOUT,
                    "capture producer did not stop, detaching it"
                );
            }
        }
    }
}
