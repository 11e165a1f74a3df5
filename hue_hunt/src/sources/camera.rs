use crate::core_modules::frame::{Frame, PixelFormat};
use crate::sources::{CaptureError, CaptureRequest, FrameStream, VideoSource};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use tracing::{info, warn};

const PREFERRED_FPS: u32 = 30;

/// A local capture device opened through `nokhwa`.
///
/// Desktop backends do not report which way a camera faces, so the device is
/// chosen by index and `CaptureRequest::facing` is not consulted.
#[derive(Debug, Clone, Copy)]
pub struct CameraSource {
    device_id: u32,
}

impl CameraSource {
    pub fn new(device_id: u32) -> Self {
        Self { device_id }
    }
}

impl Default for CameraSource {
    fn default() -> Self {
        Self::new(0)
    }
}

fn classify(err: nokhwa::NokhwaError) -> CaptureError {
    let message = err.to_string();
    if message.to_ascii_lowercase().contains("permission") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceUnavailable(message)
    }
}

impl VideoSource for CameraSource {
    type Stream = CameraStream;

    fn acquire(&mut self, request: &CaptureRequest) -> Result<Self::Stream, CaptureError> {
        let wanted = CameraFormat::new(
            Resolution::new(request.ideal_width, request.ideal_height),
            FrameFormat::MJPEG,
            PREFERRED_FPS,
        );
        // `Closest` falls back to whatever the device offers nearest the hint.
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));
        let mut camera = Camera::new(CameraIndex::Index(self.device_id), requested).map_err(classify)?;
        camera.open_stream().map_err(classify)?;

        let granted = camera.resolution();
        info!(
            device = self.device_id,
            width = granted.width(),
            height = granted.height(),
            "camera stream opened"
        );
        Ok(CameraStream {
            camera: Some(camera),
        })
    }
}

pub struct CameraStream {
    camera: Option<Camera>,
}

impl FrameStream for CameraStream {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let Some(camera) = self.camera.as_mut() else {
            return Ok(None);
        };
        let buffer = camera.frame().map_err(classify)?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|err| CaptureError::InvalidFrame(err.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        let frame = Frame::new(decoded.into_raw(), width, height, PixelFormat::Rgb8)
            .map_err(|err| CaptureError::InvalidFrame(err.to_string()))?;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(err) = camera.stop_stream() {
                warn!(error = %err, "camera did not stop cleanly");
            }
        }
    }
}
