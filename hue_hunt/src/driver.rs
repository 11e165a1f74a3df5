// THEORY:
// The driver turns the single-frame `DetectionPipeline` into a live loop over a
// video source. It is an explicit state machine:
//
//   Idle --start--> Starting --first real frame--> Streaming
//                      |                               |
//                      +--denied/unavailable--> Error <-+ (device failure)
//                                                 |
//   any --stop--> Stopped       Error/Stopped --start--> Starting (retry)
//
// One cycle reads the current frame, samples and aggregates it, redraws the
// overlay and, if a dominant detection exists, emits a `ColorObserved` event
// (plus `ChallengeCompleted` when it matches the active challenge). Cycles run
// strictly one after another on the caller's task, so nothing in a cycle is
// ever touched concurrently.
//
// Pacing follows the host's refresh rate with a `tokio::time::interval`. A slow
// cycle skips the ticks it missed instead of bursting to catch up.
//
// Cancellation is cooperative: a `watch` flag is checked before each cycle is
// scheduled, never in the middle of one. The stream is released on every way
// out: stop, error, end of stream, cancellation and drop.

use crate::config::{ConfigError, DetectionConfig};
use crate::core_modules::color_model::{BucketName, RgbColor};
use crate::core_modules::frame::Frame;
use crate::pipeline::{DetectionPipeline, Report};
use crate::session::Session;
use crate::sources::{CaptureError, CaptureRequest, FrameStream, VideoSource};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / DEFAULT_FRAME_RATE_HZ as u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// No video source attached yet.
    Idle,
    /// Access granted, waiting for the first real frame.
    Starting,
    Streaming,
    /// Acquisition or the stream failed. `start` retries.
    Error(CaptureError),
    Stopped,
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Starting | LoopState::Streaming)
    }
}

/// What the loop reports to the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionEvent {
    ColorObserved { display_color: RgbColor, bucket: BucketName },
    ChallengeCompleted { bucket: BucketName },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("detection loop is already running")]
    AlreadyRunning,
    #[error("detection loop is not streaming")]
    NotStreaming,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Everything one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub frame: Frame,
    pub report: Report,
    pub events: Vec<DetectionEvent>,
}

/// Why `run` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    Cancelled,
    EndOfStream,
    /// The stream failed after it had started.
    CaptureFailed(CaptureError),
    /// Acquisition failed; no cycle ran.
    NotStarted(CaptureError),
}

pub struct DetectionLoop<S: VideoSource> {
    source: S,
    stream: Option<S::Stream>,
    pipeline: DetectionPipeline,
    request: CaptureRequest,
    frame_interval: Duration,
    state: LoopState,
    events: Option<mpsc::UnboundedSender<DetectionEvent>>,
}

impl<S: VideoSource> DetectionLoop<S> {
    /// A zero `frame_interval` is raised to one nanosecond.
    pub fn new(source: S, pipeline: DetectionPipeline, frame_interval: Duration) -> Self {
        Self {
            source,
            stream: None,
            pipeline,
            request: CaptureRequest::default(),
            frame_interval: frame_interval.max(Duration::from_nanos(1)),
            state: LoopState::Idle,
            events: None,
        }
    }

    pub fn from_config(source: S, config: &DetectionConfig) -> Result<Self, ConfigError> {
        let pipeline = DetectionPipeline::from_config(config)?;
        Ok(Self::new(source, pipeline, config.frame_interval()))
    }

    pub fn with_request(mut self, request: CaptureRequest) -> Self {
        self.request = request;
        self
    }

    /// Forwards every emitted event to `sender` as well as to the session.
    pub fn with_event_sender(mut self, sender: mpsc::UnboundedSender<DetectionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn pipeline(&self) -> &DetectionPipeline {
        &self.pipeline
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Requests the video source. Valid from `Idle`, `Error` and `Stopped`.
    pub fn start(&mut self) -> Result<(), DriverError> {
        if self.state.is_running() {
            return Err(DriverError::AlreadyRunning);
        }
        self.transition(LoopState::Starting);
        match self.source.acquire(&self.request) {
            Ok(stream) => {
                info!(
                    width = self.request.ideal_width,
                    height = self.request.ideal_height,
                    facing = ?self.request.facing,
                    "video source acquired"
                );
                self.stream = Some(stream);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "video source acquisition failed");
                self.transition(LoopState::Error(err.clone()));
                Err(err.into())
            }
        }
    }

    /// Runs exactly one detection cycle.
    ///
    /// Returns `Ok(None)` when the source has no more frames; the loop is then
    /// stopped.
    pub fn run_cycle(&mut self, challenge: Option<BucketName>) -> Result<Option<CycleOutcome>, DriverError> {
        if !self.state.is_running() {
            return Err(DriverError::NotStreaming);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(DriverError::NotStreaming);
        };

        let frame = match stream.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("video source ended");
                self.stop();
                return Ok(None);
            }
            Err(err) => {
                warn!(error = %err, "video stream failed");
                self.release_stream();
                self.transition(LoopState::Error(err.clone()));
                return Err(err.into());
            }
        };

        if self.state == LoopState::Starting && !frame.is_empty() {
            self.transition(LoopState::Streaming);
        }

        let report = self.pipeline.generate_report(&frame);
        let mut events = Vec::new();
        if let Some(dominant) = report.dominant() {
            events.push(DetectionEvent::ColorObserved {
                display_color: dominant.display_color,
                bucket: dominant.bucket,
            });
            if challenge == Some(dominant.bucket) {
                events.push(DetectionEvent::ChallengeCompleted {
                    bucket: dominant.bucket,
                });
            }
        }

        debug!(
            detections = report.detections().len(),
            dominant = ?report.dominant().map(|d| d.bucket),
            events = events.len(),
            "cycle complete"
        );

        if let Some(sender) = &self.events {
            for event in &events {
                // A host that dropped its receiver just stops listening.
                let _ = sender.send(*event);
            }
        }

        Ok(Some(CycleOutcome { frame, report, events }))
    }

    /// Drives cycles at the frame interval until cancelled, the stream ends,
    /// or capture fails. Starts the source first if needed.
    ///
    /// Setting the watch value to `true`, or dropping its sender, cancels.
    pub async fn run(&mut self, mut session: Session, mut cancel: watch::Receiver<bool>) -> (Session, LoopExit) {
        if !self.state.is_running() {
            if let Err(err) = self.start() {
                let cause = match err {
                    DriverError::Capture(cause) => cause,
                    other => CaptureError::DeviceUnavailable(other.to_string()),
                };
                return (session, LoopExit::NotStarted(cause));
            }
        }

        let mut ticker = time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *cancel.borrow() {
                self.stop();
                return (session, LoopExit::Cancelled);
            }
            tokio::select! {
                biased;
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        self.stop();
                        return (session, LoopExit::Cancelled);
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let challenge = session.active_challenge();
            match self.run_cycle(challenge) {
                Ok(Some(outcome)) => {
                    let now = time::Instant::now().into_std();
                    for event in &outcome.events {
                        session.handle_event(event, now);
                    }
                }
                Ok(None) => return (session, LoopExit::EndOfStream),
                Err(DriverError::Capture(err)) => return (session, LoopExit::CaptureFailed(err)),
                Err(_) => return (session, LoopExit::Cancelled),
            }
        }
    }

    /// Closes the loop and releases the source. Safe to call in any state.
    pub fn stop(&mut self) {
        self.release_stream();
        if self.state != LoopState::Stopped {
            self.transition(LoopState::Stopped);
        }
    }

    fn release_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            info!("video source released");
        }
    }

    fn transition(&mut self, next: LoopState) {
        info!(from = ?self.state, to = ?next, "detection loop state change");
        self.state = next;
    }
}

impl<S: VideoSource> Drop for DetectionLoop<S> {
    fn drop(&mut self) {
        self.release_stream();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::PixelFormat;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::sources::scripted::ScriptedSource;
    use std::sync::atomic::Ordering;

    fn driver(source: ScriptedSource) -> DetectionLoop<ScriptedSource> {
        DetectionLoop::new(source, DetectionPipeline::default(), DEFAULT_FRAME_INTERVAL)
    }

    fn blue() -> Frame {
        Frame::solid(320, 240, Pixel::opaque(0, 0, 255))
    }

    #[test]
    fn starts_idle_and_rejects_cycles() {
        let mut detection = driver(ScriptedSource::new(vec![blue()]));
        assert_eq!(detection.state(), &LoopState::Idle);
        assert_eq!(detection.run_cycle(None).unwrap_err(), DriverError::NotStreaming);
    }

    #[test]
    fn first_real_frame_enters_streaming() {
        let frames = vec![Frame::empty(PixelFormat::Rgba8), blue()];
        let mut detection = driver(ScriptedSource::new(frames));
        detection.start().unwrap();
        assert_eq!(detection.state(), &LoopState::Starting);
        assert_eq!(detection.start().unwrap_err(), DriverError::AlreadyRunning);

        let warmup = detection.run_cycle(None).unwrap().unwrap();
        assert_eq!(warmup.report, Report::NoDetection);
        assert!(warmup.events.is_empty());
        assert_eq!(detection.state(), &LoopState::Starting);

        let outcome = detection.run_cycle(None).unwrap().unwrap();
        assert_eq!(detection.state(), &LoopState::Streaming);
        assert_eq!(
            outcome.events,
            vec![DetectionEvent::ColorObserved {
                display_color: RgbColor::new(0x00, 0x66, 0xFF),
                bucket: BucketName::Blue,
            }]
        );
    }

    #[test]
    fn challenge_event_only_for_matching_target() {
        let mut detection = driver(ScriptedSource::new(vec![blue(), blue()]));
        detection.start().unwrap();

        let miss = detection.run_cycle(Some(BucketName::Green)).unwrap().unwrap();
        assert_eq!(miss.events.len(), 1);

        let hit = detection.run_cycle(Some(BucketName::Blue)).unwrap().unwrap();
        assert_eq!(
            hit.events[1],
            DetectionEvent::ChallengeCompleted {
                bucket: BucketName::Blue
            }
        );
    }

    #[test]
    fn denial_enters_error_and_retry_recovers() {
        let mut detection = driver(ScriptedSource::new(vec![blue()]).deny_permission(1));
        assert_eq!(
            detection.start().unwrap_err(),
            DriverError::Capture(CaptureError::PermissionDenied)
        );
        assert_eq!(detection.state(), &LoopState::Error(CaptureError::PermissionDenied));

        detection.start().unwrap();
        assert!(detection.run_cycle(None).unwrap().is_some());
        assert_eq!(detection.state(), &LoopState::Streaming);
    }

    #[test]
    fn end_of_stream_stops_and_releases() {
        let source = ScriptedSource::new(vec![blue()]);
        let releases = source.release_counter();
        let mut detection = driver(source);
        detection.start().unwrap();
        assert!(detection.run_cycle(None).unwrap().is_some());
        assert!(detection.run_cycle(None).unwrap().is_none());
        assert_eq!(detection.state(), &LoopState::Stopped);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stream_failure_releases_and_reports() {
        let source = ScriptedSource::new(vec![blue()]).looping().fail_after(2);
        let releases = source.release_counter();
        let mut detection = driver(source);
        detection.start().unwrap();
        detection.run_cycle(None).unwrap();
        detection.run_cycle(None).unwrap();
        assert!(matches!(
            detection.run_cycle(None),
            Err(DriverError::Capture(CaptureError::DeviceUnavailable(_)))
        ));
        assert!(matches!(detection.state(), LoopState::Error(_)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_loop_can_start_again() {
        let source = ScriptedSource::new(vec![blue()]);
        let releases = source.release_counter();
        let mut detection = driver(source);
        detection.start().unwrap();
        detection.stop();
        assert_eq!(detection.state(), &LoopState::Stopped);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(detection.run_cycle(None).unwrap_err(), DriverError::NotStreaming);

        detection.start().unwrap();
        assert_eq!(detection.state(), &LoopState::Starting);
        assert!(detection.run_cycle(None).unwrap().is_some());
        assert_eq!(detection.state(), &LoopState::Streaming);
        assert_eq!(detection.source().acquisitions(), 2);
    }

    #[test]
    fn zero_interval_is_raised() {
        let detection = DetectionLoop::new(ScriptedSource::new(Vec::new()), DetectionPipeline::default(), Duration::ZERO);
        assert_eq!(detection.frame_interval(), Duration::from_nanos(1));
    }

    #[test]
    fn drop_releases_the_stream() {
        let source = ScriptedSource::new(vec![blue()]);
        let releases = source.release_counter();
        {
            let mut detection = driver(source);
            detection.start().unwrap();
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_are_forwarded() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let mut detection = driver(ScriptedSource::new(vec![blue()])).with_event_sender(sender);
        detection.start().unwrap();
        detection.run_cycle(Some(BucketName::Blue)).unwrap();
        assert!(matches!(
            receiver.try_recv(),
            Ok(DetectionEvent::ColorObserved { .. })
        ));
        assert!(matches!(
            receiver.try_recv(),
            Ok(DetectionEvent::ChallengeCompleted { .. })
        ));
        assert!(receiver.try_recv().is_err());
    }
}
