// THEORY:
// A `Detection` is the spatial summary of one color bucket in one frame: the
// axis-aligned box spanning every sampled point that matched the bucket. It is
// a snapshot with no identity; nothing links the GREEN detection of frame N to
// the GREEN detection of frame N+1.
//
// Coordinates are frame pixels. Box width and height are `max - min` over the
// sampled points, so a box that spans grid points 0 and 632 has width 632.

use crate::core_modules::color_model::{BucketName, RgbColor};
use serde::Serialize;

/// A sampled grid coordinate, in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GridPoint {
    pub x: u32,
    pub y: u32,
}

impl GridPoint {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// The smallest box spanning all points, or `None` for an empty slice.
    pub fn spanning(points: &[GridPoint]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in &points[1..] {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn max_x(&self) -> u32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> u32 {
        self.y + self.height
    }
}

/// One bucket's qualifying region in a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub bucket: BucketName,
    pub bounding_box: BoundingBox,
    pub box_color: RgbColor,
    pub display_color: RgbColor,
    /// Number of sampled points that matched the bucket.
    pub sample_count: usize,
}

impl Detection {
    pub fn area(&self) -> u64 {
        self.bounding_box.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_all_points() {
        let points = [GridPoint::new(40, 16), GridPoint::new(8, 64), GridPoint::new(24, 8)];
        let bbox = BoundingBox::spanning(&points).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x: 8,
                y: 8,
                width: 32,
                height: 56,
            }
        );
        assert_eq!(bbox.area(), 32 * 56);
        assert_eq!((bbox.max_x(), bbox.max_y()), (40, 64));
    }

    #[test]
    fn single_point_has_no_extent() {
        let bbox = BoundingBox::spanning(&[GridPoint::new(5, 7)]).unwrap();
        assert_eq!((bbox.width, bbox.height, bbox.area()), (0, 0, 0));
        assert_eq!(BoundingBox::spanning(&[]), None);
    }
}
