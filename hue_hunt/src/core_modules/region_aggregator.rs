// THEORY:
// The region aggregator is the spatial grouping layer. It reduces each bucket's
// sampled points to one axis-aligned bounding box and then picks the frame's
// dominant detection.
//
// Algorithm:
// 1.  **Count gate**: a bucket needs strictly more than `min_samples` matched
//     points to be considered at all.
// 2.  **Box**: min/max over the points gives the box. There is no connected
//     component analysis, so matches in two far corners of the frame produce
//     one box covering both. The thresholds below were tuned for this
//     single-box approximation.
// 3.  **Size gate**: width and height must both be strictly greater than
//     `min_box_size` pixels.
// 4.  **Dominance**: the qualifying detection with the largest `width * height`
//     wins. Ties keep the earlier bucket in palette order.
//
// The aggregator is stateless. It has no memory of previous frames.

use crate::core_modules::color_model::Palette;
use crate::core_modules::detection::{BoundingBox, Detection};
use crate::core_modules::grid_sampler::BucketCandidates;

pub const DEFAULT_MIN_SAMPLES: usize = 15;
pub const DEFAULT_MIN_BOX_SIZE: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationThresholds {
    /// A bucket must have more than this many matched samples.
    pub min_samples: usize,
    /// Box width and height must both exceed this many pixels.
    pub min_box_size: u32,
}

impl Default for AggregationThresholds {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
        }
    }
}

/// All qualifying detections of one frame, in palette order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDetections {
    detections: Vec<Detection>,
    dominant: Option<usize>,
}

impl FrameDetections {
    pub fn new(detections: Vec<Detection>) -> Self {
        let dominant = select_dominant(&detections);
        Self { detections, dominant }
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn dominant(&self) -> Option<&Detection> {
        self.dominant.map(|index| &self.detections[index])
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }
}

/// Index of the largest-area detection; the first one wins a tie.
pub fn select_dominant(detections: &[Detection]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (index, detection) in detections.iter().enumerate() {
        let area = detection.area();
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((index, area)),
        }
    }
    best.map(|(index, _)| index)
}

/// Turns per-bucket candidates into detections.
///
/// `candidates` must be in the same order as `palette`, as produced by
/// [`GridSampler::sample`](crate::core_modules::grid_sampler::GridSampler::sample).
pub fn aggregate(
    candidates: &[BucketCandidates],
    palette: &Palette,
    thresholds: &AggregationThresholds,
) -> FrameDetections {
    let detections = palette
        .iter()
        .zip(candidates)
        .filter(|(_, found)| found.len() > thresholds.min_samples)
        .filter_map(|(bucket, found)| {
            let bounding_box = BoundingBox::spanning(&found.points)?;
            let large_enough =
                bounding_box.width > thresholds.min_box_size && bounding_box.height > thresholds.min_box_size;
            large_enough.then(|| Detection {
                bucket: bucket.name,
                bounding_box,
                box_color: bucket.box_color,
                display_color: bucket.display_color,
                sample_count: found.len(),
            })
        })
        .collect();

    FrameDetections::new(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_model::{BucketName, RgbColor};
    use crate::core_modules::detection::GridPoint;

    fn block(bucket: BucketName, origin: (u32, u32), columns: u32, rows: u32, stride: u32) -> BucketCandidates {
        let mut points = Vec::new();
        for row in 0..rows {
            for column in 0..columns {
                points.push(GridPoint::new(origin.0 + column * stride, origin.1 + row * stride));
            }
        }
        BucketCandidates { bucket, points }
    }

    fn empty(bucket: BucketName) -> BucketCandidates {
        BucketCandidates {
            bucket,
            points: Vec::new(),
        }
    }

    fn candidates_with(found: Vec<BucketCandidates>) -> Vec<BucketCandidates> {
        BucketName::ALL
            .into_iter()
            .map(|name| {
                found
                    .iter()
                    .find(|c| c.bucket == name)
                    .cloned()
                    .unwrap_or_else(|| empty(name))
            })
            .collect()
    }

    fn detection(bucket: BucketName, width: u32, height: u32) -> Detection {
        Detection {
            bucket,
            bounding_box: BoundingBox {
                x: 0,
                y: 0,
                width,
                height,
            },
            box_color: RgbColor::WHITE,
            display_color: RgbColor::WHITE,
            sample_count: 20,
        }
    }

    #[test]
    fn too_few_samples_yield_nothing() {
        // 15 samples spread wide: exactly at the count gate, which is exclusive.
        let sparse = BucketCandidates {
            bucket: BucketName::Green,
            points: (0..15).map(|i| GridPoint::new(i * 40, i * 40)).collect(),
        };
        let result = aggregate(
            &candidates_with(vec![sparse]),
            &Palette::standard(),
            &AggregationThresholds::default(),
        );
        assert!(result.is_empty());
        assert!(result.dominant().is_none());
    }

    #[test]
    fn small_boxes_are_rejected() {
        // 5x5 grid at stride 8 spans 32x32; 4x4 spans only 24x24.
        let thresholds = AggregationThresholds::default();
        let palette = Palette::standard();

        let narrow = block(BucketName::Blue, (0, 0), 4, 10, 8);
        assert!(aggregate(&candidates_with(vec![narrow]), &palette, &thresholds).is_empty());

        let wide_enough = block(BucketName::Blue, (0, 0), 5, 5, 8);
        let result = aggregate(&candidates_with(vec![wide_enough]), &palette, &thresholds);
        assert_eq!(result.len(), 1);
        let blue = result.dominant().unwrap();
        assert_eq!(blue.bucket, BucketName::Blue);
        assert_eq!(blue.display_color, RgbColor::new(0x00, 0x66, 0xFF));
        assert_eq!(blue.sample_count, 25);
        assert_eq!((blue.bounding_box.width, blue.bounding_box.height), (32, 32));
    }

    #[test]
    fn box_of_exactly_min_size_is_rejected() {
        let thresholds = AggregationThresholds {
            min_samples: 15,
            min_box_size: 32,
        };
        let square = block(BucketName::Pink, (0, 0), 5, 5, 8);
        assert!(aggregate(&candidates_with(vec![square]), &Palette::standard(), &thresholds).is_empty());
    }

    #[test]
    fn larger_area_dominates() {
        let small = block(BucketName::Pink, (0, 0), 6, 6, 8);
        let large = block(BucketName::Yellow, (200, 200), 10, 10, 8);
        let result = aggregate(
            &candidates_with(vec![small, large]),
            &Palette::standard(),
            &AggregationThresholds::default(),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result.detections()[0].bucket, BucketName::Pink);
        assert_eq!(result.dominant().unwrap().bucket, BucketName::Yellow);
    }

    #[test]
    fn disjoint_matches_merge_into_one_box() {
        let mut corners = block(BucketName::Green, (0, 0), 3, 3, 8);
        corners.points.extend(block(BucketName::Green, (600, 440), 3, 3, 8).points);
        let result = aggregate(
            &candidates_with(vec![corners]),
            &Palette::standard(),
            &AggregationThresholds::default(),
        );
        let green = result.dominant().unwrap();
        assert_eq!(
            green.bounding_box,
            BoundingBox {
                x: 0,
                y: 0,
                width: 616,
                height: 456,
            }
        );
    }

    #[test]
    fn ties_keep_palette_order() {
        let detections = vec![
            detection(BucketName::Green, 40, 40),
            detection(BucketName::Blue, 40, 40),
            detection(BucketName::White, 20, 80),
        ];
        assert_eq!(select_dominant(&detections), Some(0));
        assert_eq!(select_dominant(&[]), None);
    }
}
