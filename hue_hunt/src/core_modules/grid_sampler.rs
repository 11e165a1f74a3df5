// THEORY:
// The `GridSampler` is the bridge between a raw frame and per-bucket evidence.
// Instead of visiting every pixel it reads a sparse grid: `x` and `y` step by
// `stride` from 0, so a 640x480 frame at stride 8 costs 80 * 60 = 4800 reads.
// The stride is the one performance knob of the detector; a smaller stride
// raises fidelity at proportional cost.
//
// Each grid point is converted to HSV once and tested against every bucket.
// A point may land in several buckets (the YELLOW and GREEN hue ranges
// overlap), and each bucket's candidate list is built independently of the
// others.
//
// Output order matches palette order, one `BucketCandidates` per bucket, even
// when a bucket has no matches or the frame is empty.

use crate::core_modules::color_model::{BucketName, Palette};
use crate::core_modules::detection::GridPoint;
use crate::core_modules::frame::Frame;

/// Default sampling step, in pixels, along both axes.
pub const DEFAULT_STRIDE: u32 = 8;

/// The sampled points of a frame that fell inside one bucket's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketCandidates {
    pub bucket: BucketName,
    pub points: Vec<GridPoint>,
}

impl BucketCandidates {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSampler {
    stride: u32,
}

impl GridSampler {
    /// A stride of 0 is clamped to 1.
    pub fn new(stride: u32) -> Self {
        Self { stride: stride.max(1) }
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Collects, for every bucket in `palette`, the grid points whose HSV lies
    /// inside that bucket's range.
    pub fn sample(&self, frame: &Frame, palette: &Palette) -> Vec<BucketCandidates> {
        let mut candidates: Vec<BucketCandidates> = palette
            .iter()
            .map(|bucket| BucketCandidates {
                bucket: bucket.name,
                points: Vec::new(),
            })
            .collect();

        if frame.is_empty() {
            return candidates;
        }

        let step = self.stride as usize;
        for y in (0..frame.height()).step_by(step) {
            for x in (0..frame.width()).step_by(step) {
                let Some(pixel) = frame.pixel(x, y) else {
                    continue;
                };
                let hsv = pixel.hsv();
                for (bucket, found) in palette.iter().zip(candidates.iter_mut()) {
                    if bucket.matches(&hsv) {
                        found.points.push(GridPoint::new(x, y));
                    }
                }
            }
        }

        candidates
    }
}

impl Default for GridSampler {
    fn default() -> Self {
        Self::new(DEFAULT_STRIDE)
    }
}
