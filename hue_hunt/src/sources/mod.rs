// THEORY:
// A video source is split in two: the `VideoSource` is the device you ask for
// access, and the `FrameStream` it returns is the exclusively owned, open
// handle. Acquisition is where permission and availability failures surface;
// once a stream exists it only has to hand out frames and release itself.
//
// `next_frame` distinguishes three outcomes:
// - `Ok(Some(frame))`: a frame, possibly 0x0 while the device warms up
// - `Ok(None)`: the source is finished (end of a file sequence)
// - `Err(_)`: the device failed mid-stream
//
// `release` must be idempotent. The driver calls it on every exit path and
// again from `Drop`.

pub mod image_sequence;
pub mod scripted;

#[cfg(feature = "camera")]
pub mod camera;

use crate::core_modules::frame::Frame;
use thiserror::Error;

pub const PREFERRED_WIDTH: u32 = 640;
pub const PREFERRED_HEIGHT: u32 = 480;

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    /// Rear camera, pointed at the world.
    #[default]
    Environment,
    /// Front camera, pointed at the user.
    User,
}

/// What the loop asks a source for. Sizes are hints, not requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub facing: Facing,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            ideal_width: PREFERRED_WIDTH,
            ideal_height: PREFERRED_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("could not decode frame: {0}")]
    InvalidFrame(String),
}

pub trait VideoSource {
    type Stream: FrameStream;

    /// Requests access and opens a stream. Resolution is best effort.
    fn acquire(&mut self, request: &CaptureRequest) -> Result<Self::Stream, CaptureError>;
}

pub trait FrameStream {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError>;

    fn release(&mut self);
}
