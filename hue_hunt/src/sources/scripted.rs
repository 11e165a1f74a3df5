use crate::core_modules::frame::Frame;
use crate::sources::{CaptureError, CaptureRequest, FrameStream, VideoSource};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An in-memory source that plays back a fixed list of frames.
///
/// It can be told to refuse permission a number of times before succeeding,
/// which is how retry paths are exercised without a device.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    frames: Vec<Frame>,
    denials_left: usize,
    unavailable: Option<String>,
    looping: bool,
    failure_after: Option<usize>,
    acquisitions: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    last_request: Option<CaptureRequest>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }

    /// Refuses the next `times` acquisitions with `PermissionDenied`.
    pub fn deny_permission(mut self, times: usize) -> Self {
        self.denials_left = times;
        self
    }

    /// Every acquisition fails with `DeviceUnavailable`.
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    /// Restarts from the first frame instead of ending.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// The stream fails with `DeviceUnavailable` after `frames` frames.
    pub fn fail_after(mut self, frames: usize) -> Self {
        self.failure_after = Some(frames);
        self
    }

    /// Shared counter of `release` calls across every stream of this source.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CaptureRequest> {
        self.last_request
    }
}

impl VideoSource for ScriptedSource {
    type Stream = ScriptedStream;

    fn acquire(&mut self, request: &CaptureRequest) -> Result<Self::Stream, CaptureError> {
        self.last_request = Some(*request);
        if self.denials_left > 0 {
            self.denials_left -= 1;
            return Err(CaptureError::PermissionDenied);
        }
        if let Some(reason) = &self.unavailable {
            return Err(CaptureError::DeviceUnavailable(reason.clone()));
        }
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedStream {
            frames: self.frames.iter().cloned().collect(),
            replay: self.looping.then(|| self.frames.clone()),
            failure_after: self.failure_after,
            delivered: 0,
            released: false,
            releases: Arc::clone(&self.releases),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedStream {
    frames: VecDeque<Frame>,
    replay: Option<Vec<Frame>>,
    failure_after: Option<usize>,
    delivered: usize,
    released: bool,
    releases: Arc<AtomicUsize>,
}

impl FrameStream for ScriptedStream {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released {
            return Err(CaptureError::DeviceUnavailable("stream released".to_string()));
        }
        if self.failure_after == Some(self.delivered) {
            return Err(CaptureError::DeviceUnavailable("device disconnected".to_string()));
        }
        if self.frames.is_empty() {
            if let Some(replay) = &self.replay {
                self.frames.extend(replay.iter().cloned());
            }
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.delivered += 1;
        }
        Ok(frame)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}
