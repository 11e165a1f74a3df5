// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the detector. It is a
// "dumb" data container for a single RGBA sample plus the one heuristic the
// color buckets need: the HSV triple, computed from this pixel alone with no
// knowledge of neighbors in space or time.
//
// HSV here is expressed in the 8-bit-friendly ranges the bucket bounds use:
// - hue:        [0, 179]  (fraction of a full turn, scaled by 179)
// - saturation: [0, 255]
// - value:      [0, 255]
//
// Values stay `f32` and are never rounded. Bucket thresholds compare the raw
// floats against integer bounds, so a hue of 139.6 is outside a [140, 165]
// range.
//
// Key principles:
// 1) Single-pixel scope (1D): nothing here reads neighbors or history.
// 2) Deterministic: `rgb_to_hsv` is a pure function of its three inputs.

pub mod pixel {
    pub type Channel = u8;
    pub type Hue = f32;
    pub type Saturation = f32;
    pub type Value = f32;

    /// Multiplier applied to the hue fraction of a full turn.
    pub const HUE_SCALE: f32 = 179.0;
    /// Multiplier applied to the saturation and value fractions.
    pub const CHANNEL_SCALE: f32 = 255.0;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    /// Hue, saturation and value of a pixel in bucket-threshold units.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Hsv {
        pub hue: Hue,
        pub saturation: Saturation,
        pub value: Value,
    }

    impl Pixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        pub const fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, u8::MAX)
        }

        /// Reads a pixel from a 3-byte (RGB) or 4-byte (RGBA) slice.
        /// Any other length yields `None`.
        pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
            match *bytes {
                [red, green, blue] => Some(Self::opaque(red, green, blue)),
                [red, green, blue, alpha] => Some(Self::new(red, green, blue, alpha)),
                _ => None,
            }
        }

        /// HSV triple in bucket-threshold units.
        pub fn hsv(&self) -> Hsv {
            rgb_to_hsv(self.red, self.green, self.blue)
        }
    }

    /// Converts an RGB triple to HSV with hue in [0, 179] and saturation and
    /// value in [0, 255].
    ///
    /// The hue sector is chosen from whichever channel holds the maximum,
    /// checking red first, then green, then blue.
    pub fn rgb_to_hsv(red: Channel, green: Channel, blue: Channel) -> Hsv {
        let red_normalized = red as f32 / CHANNEL_SCALE;
        let green_normalized = green as f32 / CHANNEL_SCALE;
        let blue_normalized = blue as f32 / CHANNEL_SCALE;

        let maximum_channel = red_normalized.max(green_normalized.max(blue_normalized));
        let minimum_channel = red_normalized.min(green_normalized.min(blue_normalized));
        let chroma = maximum_channel - minimum_channel;

        let saturation = if maximum_channel == 0.0 {
            0.0
        } else {
            chroma / maximum_channel
        };

        let hue_fraction = if chroma == 0.0 {
            0.0
        } else if maximum_channel == red_normalized {
            let wrap = if green_normalized < blue_normalized { 6.0 } else { 0.0 };
            ((green_normalized - blue_normalized) / chroma + wrap) / 6.0
        } else if maximum_channel == green_normalized {
            ((blue_normalized - red_normalized) / chroma + 2.0) / 6.0
        } else {
            ((red_normalized - green_normalized) / chroma + 4.0) / 6.0
        };

        Hsv {
            hue: hue_fraction * HUE_SCALE,
            saturation: saturation * CHANNEL_SCALE,
            value: maximum_channel * CHANNEL_SCALE,
        }
    }
}
