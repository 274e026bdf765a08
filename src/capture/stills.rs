//! Replay of recorded panel shots

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use super::{CaptureError, Grabber};
use crate::{image::RawImage, models};

/// Cycles through still images at a fixed frame interval
pub struct Stills {
    paths: Vec<PathBuf>,
    interval: Duration,
    frames: Vec<RawImage>,
    /// Index of the last grabbed frame
    current: Option<usize>,
    last_grab: Option<Instant>,
}

impl Stills {
    pub fn new(config: &models::Stills) -> Self {
        Self {
            paths: config.paths.clone(),
            interval: Duration::from_millis(config.interval_ms),
            frames: Vec::new(),
            current: None,
            last_grab: None,
        }
    }
}

impl Grabber for Stills {
    fn open(&mut self) -> Result<(), CaptureError> {
        let frames = self
            .paths
            .iter()
            .map(|path| {
                debug!(path = %path.display(), "loading still");
                RawImage::open(path)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if frames.is_empty() {
            return Err(CaptureError::NoFrame);
        }

        self.frames = frames;
        self.current = None;
        self.last_grab = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.frames.is_empty()
    }

    fn grab(&mut self) -> Result<(), CaptureError> {
        if self.frames.is_empty() {
            return Err(CaptureError::NotOpen);
        }

        // Pace frames like a camera would
        if let Some(last_grab) = self.last_grab {
            let elapsed = last_grab.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        self.last_grab = Some(Instant::now());

        self.current = Some(self.current.map_or(0, |i| (i + 1) % self.frames.len()));
        Ok(())
    }

    fn retrieve(&mut self) -> Result<RawImage, CaptureError> {
        self.current
            .and_then(|i| self.frames.get(i))
            .cloned()
            .ok_or(CaptureError::NoFrame)
    }

    fn release(&mut self) {
        self.frames.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Color;

    #[test]
    fn cycles_through_stills() {
        let dir = std::env::temp_dir().join(format!("panelvis-stills-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut paths = Vec::new();
        for (i, &level) in [10u8, 20, 30].iter().enumerate() {
            let path = dir.join(format!("{}.png", i));
            RawImage::filled(4, 4, Color::new(level, level, level))
                .to_rgb_image()
                .save(&path)
                .unwrap();
            paths.push(path);
        }

        let mut stills = Stills::new(&models::Stills {
            paths,
            interval_ms: 0,
        });
        assert!(matches!(stills.grab(), Err(CaptureError::NotOpen)));

        stills.open().unwrap();
        assert!(stills.is_open());
        assert!(matches!(stills.retrieve(), Err(CaptureError::NoFrame)));

        let mut levels = Vec::new();
        for _ in 0..4 {
            stills.grab().unwrap();
            levels.push(stills.retrieve().unwrap().color_at(0, 0).unwrap().red);
        }
        assert_eq!(levels, vec![10, 20, 30, 10]);

        stills.release();
        assert!(!stills.is_open());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_still_fails_to_open() {
        let mut stills = Stills::new(&models::Stills {
            paths: vec![PathBuf::from("/nonexistent/panel.png")],
            interval_ms: 0,
        });

        assert!(matches!(stills.open(), Err(CaptureError::RawImage(_))));
    }
}
