//! Periodic capture and decode loop

use std::{
    future::Future,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::time::{Interval, MissedTickBehavior};

use crate::{
    capture::FrameSource,
    methods::Method,
    models, overlay,
    pipeline::{Pipeline, Report},
    status::StatusIndicator,
};

/// Cycle timer that skips ticks missed by a slow cycle instead of bursting to catch up
pub fn cycle_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Write the diagnostic overlay of a report, if enabled and the panel was found
pub fn write_overlay(path: Option<&Path>, pipeline: &Pipeline, report: &Report) {
    let (path, normalized) = match (path, &report.normalized) {
        (Some(path), Some(normalized)) => (path, normalized),
        _ => return,
    };

    let image = overlay::draw(normalized.image(), &report.features, pipeline.catalog());
    if let Err(error) = overlay::save(&image, path) {
        warn!(error = %error, path = %path.display(), "could not write overlay");
    }
}

pub struct Daemon {
    source: FrameSource,
    pipeline: Pipeline,
    method: Box<dyn Method>,
    status: Box<dyn StatusIndicator>,
    period: Duration,
    frame_count: u32,
    overlay: Option<PathBuf>,
}

impl Daemon {
    pub fn new(
        source: FrameSource,
        pipeline: Pipeline,
        method: Box<dyn Method>,
        status: Box<dyn StatusIndicator>,
        config: &models::Config,
    ) -> Self {
        Self {
            source,
            pipeline,
            method,
            status,
            period: Duration::from_millis(config.period_ms),
            frame_count: config.capture.frame_count,
            overlay: config.overlay.path.clone(),
        }
    }

    /// One capture and decode cycle
    fn cycle(&mut self) -> Option<Report> {
        let frame = match self.source.read_latest_averaged(self.frame_count) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(error = %error, "no frame this cycle");
                return None;
            }
        };

        let report = self.pipeline.process(&frame);
        write_overlay(self.overlay.as_deref(), &self.pipeline, &report);
        Some(report)
    }

    async fn tick(&mut self) {
        let report = tokio::task::block_in_place(|| self.cycle());
        let readable = report.as_ref().map_or(false, Report::readable);

        if let Err(error) = self.status.set_readable(readable) {
            warn!(error = %error, "could not update status");
        }

        if let Some(report) = report {
            if let Err(error) = self.method.write(&report.state).await {
                warn!(error = %error, "sending panel state failed");
            }
        }
    }

    /// Decode every period until `shutdown` completes
    ///
    /// `shutdown` is polled for the whole run, so a request made during a cycle is seen as soon
    /// as that cycle ends.
    pub async fn run<F: Future>(mut self, shutdown: F) {
        tokio::pin!(shutdown);

        let mut interval = cycle_interval(self.period);
        info!(period_ms = self.period.as_millis() as u64, "started decoding");

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                _ = interval.tick() => self.tick().await,
            }
        }

        info!(open = self.source.is_open(), "stopping");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::{
        capture::{CaptureError, Grabber},
        catalog::Feature,
        image::{RawImage, Rotation},
        markers::{DetectError, Marker, MarkerDetector},
        methods::WriteResult,
        panel::{Fan, PanelState},
        status::StatusError,
        test_utils::*,
    };

    /// Grabber repeating one frame
    struct Replay(RawImage);

    impl Grabber for Replay {
        fn open(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }

        fn is_open(&self) -> bool {
            true
        }

        fn grab(&mut self) -> Result<(), CaptureError> {
            std::thread::sleep(Duration::from_millis(1));
            Ok(())
        }

        fn retrieve(&mut self) -> Result<RawImage, CaptureError> {
            Ok(self.0.clone())
        }

        fn release(&mut self) {}
    }

    /// Detector requesting shutdown from inside the first cycle
    struct ShutdownDuringDetect {
        markers: Vec<Marker>,
        shutdown: Mutex<Option<oneshot::Sender<()>>>,
    }

    impl MarkerDetector for ShutdownDuringDetect {
        fn detect(&self, _image: &RawImage) -> Result<Vec<Marker>, DetectError> {
            if let Some(shutdown) = self.shutdown.lock().unwrap().take() {
                let _ = shutdown.send(());
                // Keep the cycle busy after the request
                std::thread::sleep(Duration::from_millis(50));
            }

            Ok(self.markers.clone())
        }
    }

    #[derive(Default, Clone)]
    struct Recorder {
        states: Arc<Mutex<Vec<PanelState>>>,
        readable: Arc<Mutex<Vec<bool>>>,
    }

    #[async_trait]
    impl Method for Recorder {
        async fn write(&mut self, state: &PanelState) -> WriteResult {
            self.states.lock().unwrap().push(*state);
            Ok(())
        }
    }

    impl StatusIndicator for Recorder {
        fn set_readable(&mut self, readable: bool) -> Result<(), StatusError> {
            self.readable.lock().unwrap().push(readable);
            Ok(())
        }
    }

    fn config(period_ms: u64) -> models::Config {
        models::Config {
            period_ms,
            capture: models::Capture {
                frame_count: 2,
                ..Default::default()
            },
            calibration: models::Calibration {
                rotation: Rotation::None,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missed_ticks_are_delayed() {
        let interval = cycle_interval(Duration::from_millis(10));
        assert_eq!(interval.missed_tick_behavior(), MissedTickBehavior::Delay);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_requested_during_a_cycle_stops_the_loop() {
        let mut frame = canonical_frame();
        paint(&mut frame, Feature::FanAuto, LED_ON);

        let config = config(10);
        let (shutdown_tx, shutdown) = oneshot::channel();
        let detector = ShutdownDuringDetect {
            markers: canonical_markers(),
            shutdown: Mutex::new(Some(shutdown_tx)),
        };

        let source = FrameSource::open(Box::new(Replay(frame)), &config.capture).unwrap();
        let recorder = Recorder::default();
        let daemon = Daemon::new(
            source,
            Pipeline::new(Box::new(detector), config.calibration.clone()),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
            &config,
        );

        let stopped = tokio::time::timeout(Duration::from_secs(5), daemon.run(shutdown)).await;
        assert!(stopped.is_ok());

        // The cycle that saw the request still completes
        let states = recorder.states.lock().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].fan, Fan::Auto);
        assert_eq!(*recorder.readable.lock().unwrap(), vec![true]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unreadable_cycles_report_not_readable() {
        let config = config(5);
        let source =
            FrameSource::open(Box::new(Replay(canonical_frame())), &config.capture).unwrap();
        let recorder = Recorder::default();
        let daemon = Daemon::new(
            source,
            Pipeline::new(Box::new(CountingDetector::new(vec![])), config.calibration.clone()),
            Box::new(recorder.clone()),
            Box::new(recorder.clone()),
            &config,
        );

        daemon.run(tokio::time::sleep(Duration::from_millis(60))).await;

        // Without markers the panel is never read, but the state is still sent
        let readable = recorder.readable.lock().unwrap();
        assert!(!readable.is_empty());
        assert!(readable.iter().all(|&readable| !readable));
        assert_eq!(recorder.states.lock().unwrap().len(), readable.len());
    }
}
