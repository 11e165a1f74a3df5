// THEORY:
// The color model is the static table the whole detector is measured against.
// Each `ColorBucket` pairs one name from a closed set with an inclusive HSV
// acceptance range and the two colors used to present it (the overlay box
// color and the display color reported to the host).
//
// The table is ordered. Every later stage walks buckets in declared order, and
// that order is the tie-break when two detections have the same area.
//
// Hue ranges never wrap: a bucket spans `lower.h..=upper.h` on the 0..=179
// scale, and a palette whose lower bound exceeds its upper bound on any axis is
// rejected when the palette is built.

use crate::core_modules::pixel::pixel::Hsv;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of color classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BucketName {
    Pink,
    Green,
    Yellow,
    Blue,
    White,
}

impl BucketName {
    pub const ALL: [BucketName; 5] = [
        BucketName::Pink,
        BucketName::Green,
        BucketName::Yellow,
        BucketName::Blue,
        BucketName::White,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            BucketName::Pink => "PINK",
            BucketName::Green => "GREEN",
            BucketName::Yellow => "YELLOW",
            BucketName::Blue => "BLUE",
            BucketName::White => "WHITE",
        }
    }

    /// Light buckets get dark label text on their own box color.
    pub const fn prefers_dark_text(&self) -> bool {
        matches!(self, BucketName::White | BucketName::Yellow)
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown color bucket `{0}`")]
pub struct UnknownBucket(pub String);

impl FromStr for BucketName {
    type Err = UnknownBucket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BucketName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownBucket(s.to_string()))
    }
}

/// An opaque sRGB color, written as `#RRGGBB` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a #RRGGBB color")]
pub struct InvalidHexColor(pub String);

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0x00, 0x00, 0x00);
    pub const WHITE: RgbColor = RgbColor::new(0xFF, 0xFF, 0xFF);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn from_hex(hex: &str) -> Result<Self, InvalidHexColor> {
        let invalid = || InvalidHexColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    pub fn to_rgba(&self) -> image::Rgba<u8> {
        image::Rgba([self.red, self.green, self.blue, u8::MAX])
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for RgbColor {
    type Error = InvalidHexColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RgbColor::from_hex(&value)
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}

/// Inclusive HSV acceptance range, `[h, s, v]` on the 0..=179 / 0..=255 scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: &Hsv) -> bool {
        let within = |value: f32, axis: usize| {
            value >= self.lower[axis] as f32 && value <= self.upper[axis] as f32
        };
        within(hsv.hue, 0) && within(hsv.saturation, 1) && within(hsv.value, 2)
    }

    /// True when `lower <= upper` on every axis.
    pub fn is_ordered(&self) -> bool {
        self.lower.iter().zip(self.upper.iter()).all(|(lo, hi)| lo <= hi)
    }
}

/// A named color classification with its acceptance range and presentation colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorBucket {
    pub name: BucketName,
    #[serde(flatten)]
    pub range: HsvRange,
    pub box_color: RgbColor,
    pub display_color: RgbColor,
}

impl ColorBucket {
    pub const fn new(name: BucketName, range: HsvRange, box_color: RgbColor, display_color: RgbColor) -> Self {
        Self {
            name,
            range,
            box_color,
            display_color,
        }
    }

    pub fn matches(&self, hsv: &Hsv) -> bool {
        self.range.contains(hsv)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("palette has no buckets")]
    Empty,
    #[error("bucket {0} is declared more than once")]
    DuplicateBucket(BucketName),
    #[error("bucket {bucket} has lower bound {lower:?} above upper bound {upper:?}")]
    InvertedRange {
        bucket: BucketName,
        lower: [u8; 3],
        upper: [u8; 3],
    },
}

const fn standard_bucket(name: BucketName, lower: [u8; 3], upper: [u8; 3], color: RgbColor) -> ColorBucket {
    ColorBucket::new(name, HsvRange::new(lower, upper), color, color)
}

/// The five default buckets, in tie-break order.
pub const STANDARD_BUCKETS: [ColorBucket; 5] = [
    standard_bucket(BucketName::Pink, [140, 40, 40], [165, 255, 255], RgbColor::new(0xFF, 0x00, 0xFF)),
    standard_bucket(BucketName::Green, [35, 40, 40], [85, 255, 255], RgbColor::new(0x00, 0xFF, 0x00)),
    standard_bucket(BucketName::Yellow, [15, 40, 40], [40, 255, 255], RgbColor::new(0xFF, 0xFF, 0x00)),
    standard_bucket(BucketName::Blue, [100, 40, 40], [130, 255, 255], RgbColor::new(0x00, 0x66, 0xFF)),
    standard_bucket(BucketName::White, [0, 0, 200], [179, 40, 255], RgbColor::new(0xFF, 0xFF, 0xFF)),
];

/// An ordered, validated set of color buckets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    buckets: Vec<ColorBucket>,
}

impl Palette {
    pub fn new(buckets: Vec<ColorBucket>) -> Result<Self, PaletteError> {
        if buckets.is_empty() {
            return Err(PaletteError::Empty);
        }
        for (i, bucket) in buckets.iter().enumerate() {
            if !bucket.range.is_ordered() {
                return Err(PaletteError::InvertedRange {
                    bucket: bucket.name,
                    lower: bucket.range.lower,
                    upper: bucket.range.upper,
                });
            }
            if buckets[..i].iter().any(|earlier| earlier.name == bucket.name) {
                return Err(PaletteError::DuplicateBucket(bucket.name));
            }
        }
        Ok(Self { buckets })
    }

    pub fn standard() -> Self {
        Self {
            buckets: STANDARD_BUCKETS.to_vec(),
        }
    }

    pub fn buckets(&self) -> &[ColorBucket] {
        &self.buckets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColorBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, name: BucketName) -> Option<&ColorBucket> {
        self.buckets.iter().find(|bucket| bucket.name == name)
    }

    pub fn names(&self) -> Vec<BucketName> {
        self.buckets.iter().map(|bucket| bucket.name).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::rgb_to_hsv;

    fn classify(palette: &Palette, rgb: (u8, u8, u8)) -> Vec<BucketName> {
        let hsv = rgb_to_hsv(rgb.0, rgb.1, rgb.2);
        palette.iter().filter(|b| b.matches(&hsv)).map(|b| b.name).collect()
    }

    #[test]
    fn standard_palette_classifies_pure_colors() {
        let palette = Palette::standard();
        assert_eq!(classify(&palette, (255, 0, 255)), vec![BucketName::Pink]);
        assert_eq!(classify(&palette, (0, 255, 0)), vec![BucketName::Green]);
        assert_eq!(classify(&palette, (255, 255, 0)), vec![BucketName::Yellow]);
        assert_eq!(classify(&palette, (0, 0, 255)), vec![BucketName::Blue]);
        assert_eq!(classify(&palette, (255, 255, 255)), vec![BucketName::White]);
        assert!(classify(&palette, (255, 0, 0)).is_empty());
        assert!(classify(&palette, (10, 10, 10)).is_empty());
    }

    #[test]
    fn standard_palette_keeps_declared_order() {
        assert_eq!(Palette::standard().names(), BucketName::ALL.to_vec());
    }

    #[test]
    fn rejects_inverted_and_duplicate_buckets() {
        let inverted = ColorBucket::new(
            BucketName::Pink,
            HsvRange::new([165, 40, 40], [140, 255, 255]),
            RgbColor::WHITE,
            RgbColor::WHITE,
        );
        assert!(matches!(
            Palette::new(vec![inverted]),
            Err(PaletteError::InvertedRange { bucket: BucketName::Pink, .. })
        ));

        let twice = vec![STANDARD_BUCKETS[1].clone(), STANDARD_BUCKETS[1].clone()];
        assert_eq!(Palette::new(twice), Err(PaletteError::DuplicateBucket(BucketName::Green)));
        assert_eq!(Palette::new(Vec::new()), Err(PaletteError::Empty));
    }

    #[test]
    fn hex_colors_parse_and_print() {
        assert_eq!(RgbColor::from_hex("#0066FF"), Ok(RgbColor::new(0, 0x66, 0xFF)));
        assert_eq!(RgbColor::from_hex("#0066ff").map(|c| c.to_hex()), Ok("#0066FF".to_string()));
        assert!(RgbColor::from_hex("0066FF").is_err());
        assert!(RgbColor::from_hex("#00GGFF").is_err());
        assert!(RgbColor::from_hex("#FFF").is_err());
    }

    #[test]
    fn bucket_names_round_trip_through_text() {
        for name in BucketName::ALL {
            assert_eq!(name.to_string().parse::<BucketName>(), Ok(name));
        }
        assert_eq!("yellow".parse::<BucketName>(), Ok(BucketName::Yellow));
        assert!("RED".parse::<BucketName>().is_err());
        assert!(BucketName::White.prefers_dark_text());
        assert!(!BucketName::Blue.prefers_dark_text());
    }
}
