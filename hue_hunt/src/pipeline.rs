// THEORY:
// The `pipeline` module is the top-level, per-frame API of the detector. It
// chains the layers into one call:
//
//   frame -> GridSampler (per bucket) -> region_aggregator (boxes + dominant)
//         -> Overlay (cleared and redrawn) -> Report
//
// A `Report` covers exactly one frame. The pipeline keeps no detection state
// between frames; the only thing it holds on to is the most recent overlay, so
// a host can draw it after the call returns.

use crate::config::{ConfigError, DetectionConfig};
use crate::core_modules::color_model::Palette;
use crate::core_modules::frame::Frame;
use crate::core_modules::grid_sampler::{DEFAULT_STRIDE, GridSampler};
use crate::core_modules::overlay::Overlay;
use crate::core_modules::region_aggregator::{self, AggregationThresholds, FrameDetections};
use tracing::trace;

// Re-export key data structures for the public API.
pub use crate::core_modules::color_model::{BucketName, RgbColor};
pub use crate::core_modules::detection::{BoundingBox, Detection};

/// Configuration for the DetectionPipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub sample_stride: u32,
    pub thresholds: AggregationThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_stride: DEFAULT_STRIDE,
            thresholds: AggregationThresholds::default(),
        }
    }
}

/// The primary output of the pipeline for a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    NoDetection,
    ColorsDetected(FrameDetections),
}

impl Report {
    pub fn detections(&self) -> &[Detection] {
        match self {
            Report::NoDetection => &[],
            Report::ColorsDetected(found) => found.detections(),
        }
    }

    pub fn dominant(&self) -> Option<&Detection> {
        match self {
            Report::NoDetection => None,
            Report::ColorsDetected(found) => found.dominant(),
        }
    }
}

impl From<FrameDetections> for Report {
    fn from(found: FrameDetections) -> Self {
        if found.is_empty() {
            Report::NoDetection
        } else {
            Report::ColorsDetected(found)
        }
    }
}

/// Sampler, aggregator and overlay wired together for one palette.
pub struct DetectionPipeline {
    palette: Palette,
    sampler: GridSampler,
    thresholds: AggregationThresholds,
    overlay: Overlay,
}

impl DetectionPipeline {
    pub fn new(palette: Palette, config: PipelineConfig) -> Self {
        Self {
            palette,
            sampler: GridSampler::new(config.sample_stride),
            thresholds: config.thresholds,
            overlay: Overlay::default(),
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.palette()?, config.pipeline_config()))
    }

    /// Samples, aggregates and redraws the overlay for one frame.
    pub fn generate_report(&mut self, frame: &Frame) -> Report {
        let candidates = self.sampler.sample(frame, &self.palette);
        let found = region_aggregator::aggregate(&candidates, &self.palette, &self.thresholds);

        self.overlay.clear(frame.width(), frame.height());
        self.overlay.draw_detections(found.detections());

        trace!(
            width = frame.width(),
            height = frame.height(),
            detections = found.len(),
            dominant = ?found.dominant().map(|d| d.bucket),
            "frame analysed"
        );

        Report::from(found)
    }

    pub fn color_detected(&mut self, frame: &Frame) -> bool {
        self.generate_report(frame).dominant().is_some()
    }

    pub fn last_overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn sampler(&self) -> &GridSampler {
        &self.sampler
    }
}

impl Default for DetectionPipeline {
    fn default() -> Self {
        Self::new(Palette::standard(), PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use image::{Rgba, RgbaImage};

    #[test]
    fn solid_green_frame_is_one_full_frame_detection() {
        let mut pipeline = DetectionPipeline::default();
        let frame = Frame::solid(640, 480, Pixel::opaque(0, 255, 0));
        let report = pipeline.generate_report(&frame);

        assert_eq!(report.detections().len(), 1);
        let green = report.dominant().unwrap();
        assert_eq!(green.bucket, BucketName::Green);
        // Last sampled column and row are 632 and 472.
        assert_eq!(
            green.bounding_box,
            BoundingBox {
                x: 0,
                y: 0,
                width: 632,
                height: 472,
            }
        );
        assert_eq!(green.sample_count, 80 * 60);
        assert_eq!(green, &report.detections()[0]);
    }

    #[test]
    fn larger_region_wins_dominance() {
        let mut image = RgbaImage::from_pixel(640, 480, Rgba([0, 0, 0, 255]));
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            if x < 100 && y < 100 {
                *pixel = Rgba([255, 0, 255, 255]);
            } else if x >= 300 && y >= 200 {
                *pixel = Rgba([0, 0, 255, 255]);
            }
        }
        let mut pipeline = DetectionPipeline::default();
        let report = pipeline.generate_report(&Frame::from_rgba_image(image));

        let buckets: Vec<BucketName> = report.detections().iter().map(|d| d.bucket).collect();
        assert_eq!(buckets, vec![BucketName::Pink, BucketName::Blue]);
        assert_eq!(report.dominant().unwrap().bucket, BucketName::Blue);
    }

    #[test]
    fn sparse_matches_report_nothing() {
        // A 24x24 yellow patch covers only 3x3 = 9 grid points.
        let mut image = RgbaImage::from_pixel(320, 240, Rgba([20, 20, 20, 255]));
        for y in 0..24 {
            for x in 0..24 {
                image.put_pixel(x, y, Rgba([255, 255, 0, 255]));
            }
        }
        let mut pipeline = DetectionPipeline::default();
        let report = pipeline.generate_report(&Frame::from_rgba_image(image));
        assert_eq!(report, Report::NoDetection);
        assert!(report.dominant().is_none());
        assert!(pipeline.last_overlay().is_blank());
    }

    #[test]
    fn overlay_is_redrawn_every_frame() {
        let mut pipeline = DetectionPipeline::default();
        assert!(pipeline.color_detected(&Frame::solid(320, 240, Pixel::opaque(255, 255, 255))));
        assert_eq!(pipeline.last_overlay().commands().len(), 3);

        assert!(!pipeline.color_detected(&Frame::solid(320, 240, Pixel::opaque(0, 0, 0))));
        assert!(pipeline.last_overlay().is_blank());
        assert_eq!(pipeline.last_overlay().width(), 320);
    }

    #[test]
    fn empty_frame_is_a_no_op() {
        let mut pipeline = DetectionPipeline::default();
        let report = pipeline.generate_report(&Frame::empty(crate::core_modules::frame::PixelFormat::Rgba8));
        assert_eq!(report, Report::NoDetection);
    }

    #[test]
    fn builds_from_config() {
        let config = DetectionConfig {
            sample_stride: 4,
            ..DetectionConfig::default()
        };
        let pipeline = DetectionPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.sampler().stride(), 4);
        assert_eq!(pipeline.palette().len(), 5);
    }
}
