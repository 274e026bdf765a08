//! Live capture through an OpenCV video backend

use std::convert::TryFrom;

use opencv::{
    core::{Mat, Vector, CV_8UC3},
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::{CaptureError, Grabber};
use crate::{image::RawImage, models};

pub struct Stream {
    uri: String,
    backend: models::Backend,
    open_timeout_ms: u32,
    read_timeout_ms: u32,
    capture: Option<VideoCapture>,
    frame: Mat,
}

impl Stream {
    pub fn new(config: &models::Stream) -> Self {
        Self {
            uri: config.uri.clone(),
            backend: config.backend,
            open_timeout_ms: config.open_timeout_ms,
            read_timeout_ms: config.read_timeout_ms,
            capture: None,
            frame: Mat::default(),
        }
    }

    fn api_preference(&self) -> i32 {
        match self.backend {
            models::Backend::Any => videoio::CAP_ANY,
            models::Backend::Ffmpeg => videoio::CAP_FFMPEG,
            models::Backend::Gstreamer => videoio::CAP_GSTREAMER,
        }
    }

    /// Backend timeouts, so a stalled stream fails the grab instead of blocking it
    fn params(&self) -> Vector<i32> {
        Vector::from_slice(&[
            videoio::CAP_PROP_OPEN_TIMEOUT_MSEC,
            self.open_timeout_ms as i32,
            videoio::CAP_PROP_READ_TIMEOUT_MSEC,
            self.read_timeout_ms as i32,
        ])
    }
}

impl Grabber for Stream {
    fn open(&mut self) -> Result<(), CaptureError> {
        let capture =
            VideoCapture::from_file_with_params(&self.uri, self.api_preference(), &self.params())?;
        if !capture.is_opened()? {
            return Err(CaptureError::OpenFailed(self.uri.clone()));
        }

        info!(uri = %self.uri, backend = ?self.backend, "opened video stream");
        self.capture = Some(capture);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.capture
            .as_ref()
            .map_or(false, |capture| capture.is_opened().unwrap_or(false))
    }

    fn grab(&mut self) -> Result<(), CaptureError> {
        let capture = self.capture.as_mut().ok_or(CaptureError::NotOpen)?;
        if capture.grab()? {
            Ok(())
        } else {
            Err(CaptureError::NoFrame)
        }
    }

    fn retrieve(&mut self) -> Result<RawImage, CaptureError> {
        let capture = self.capture.as_mut().ok_or(CaptureError::NotOpen)?;
        if !capture.retrieve(&mut self.frame, 0)? || self.frame.empty() {
            return Err(CaptureError::NoFrame);
        }

        if self.frame.typ() != CV_8UC3 {
            return Err(CaptureError::NotSupported("non-BGR frame"));
        }

        // Decoded frames may be ROI views, copy to a continuous buffer first
        let frame = if self.frame.is_continuous() {
            self.frame.data_bytes()?.to_vec()
        } else {
            self.frame.try_clone()?.data_bytes()?.to_vec()
        };

        Ok(RawImage::try_from((
            frame,
            self.frame.cols() as u32,
            self.frame.rows() as u32,
        ))?)
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(error) = capture.release() {
                warn!(error = %error, "releasing video stream failed");
            }
        }
    }
}
