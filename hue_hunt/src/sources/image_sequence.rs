use crate::core_modules::frame::Frame;
use crate::sources::{CaptureError, CaptureRequest, FrameStream, VideoSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "webp"];

/// Plays a directory of still images as a video, in file name order.
///
/// Images are decoded lazily, one per `next_frame`, so a long sequence never
/// sits in memory at once.
#[derive(Debug, Clone)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
}

impl ImageSequenceSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, CaptureError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .map_err(|err| CaptureError::DeviceUnavailable(format!("{}: {err}", dir.display())))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        paths.sort();

        debug!(dir = %dir.display(), images = paths.len(), "image sequence indexed");
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

impl VideoSource for ImageSequenceSource {
    type Stream = ImageSequenceStream;

    // Stills have a fixed size; the resolution hint is ignored.
    fn acquire(&mut self, _request: &CaptureRequest) -> Result<Self::Stream, CaptureError> {
        if self.paths.is_empty() {
            return Err(CaptureError::DeviceUnavailable("image sequence is empty".to_string()));
        }
        Ok(ImageSequenceStream {
            remaining: self.paths.clone().into_iter(),
            released: false,
        })
    }
}

#[derive(Debug)]
pub struct ImageSequenceStream {
    remaining: std::vec::IntoIter<PathBuf>,
    released: bool,
}

impl FrameStream for ImageSequenceStream {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if self.released {
            return Ok(None);
        }
        let Some(path) = self.remaining.next() else {
            return Ok(None);
        };
        let image = image::open(&path).map_err(|err| CaptureError::InvalidFrame(format!("{}: {err}", path.display())))?;
        Ok(Some(Frame::from_rgba_image(image.to_rgba8())))
    }

    fn release(&mut self) {
        self.released = true;
    }
}
