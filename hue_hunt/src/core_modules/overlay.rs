// THEORY:
// The overlay is the presentation of one frame's detections: a transparent
// layer the size of the frame with a stroked box per detection and a filled
// label tag above each box. It is rebuilt from scratch every frame; nothing
// drawn for frame N survives into frame N+1.
//
// The overlay is kept as an ordered display list (`DrawCommand`s) so hosts
// that own their own canvas can replay it, and it can be rasterized onto an
// `RgbaImage` with `imageproc` for hosts that just want pixels.
//
// Label geometry, relative to a box at (x, y):
// - tag:  (x, y - 26), height 26, width = text width + 12, filled box color
// - text: origin (x + 6, y - 8) on the baseline
// - text color: dark for WHITE and YELLOW, light for everything else
//
// Label text uses a built-in 5x7 bitmap face scaled by 2, so every glyph
// advances 12 pixels.

use crate::core_modules::color_model::{BucketName, RgbColor};
use crate::core_modules::detection::Detection;
use image::RgbaImage;
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

pub const STROKE_WIDTH: u32 = 3;
pub const LABEL_HEIGHT: u32 = 26;
pub const LABEL_PADDING: i32 = 6;
pub const LABEL_BASELINE_OFFSET: i32 = 8;

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const GLYPH_SCALE: u32 = 2;
const GLYPH_ADVANCE: u32 = (GLYPH_COLUMNS + 1) * GLYPH_SCALE;

// Rows top to bottom, bit 4 is the leftmost column.
const GLYPHS: [[u8; 7]; 26] = [
    [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // A
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E], // B
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E], // C
    [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E], // D
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F], // E
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10], // F
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F], // G
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // H
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // I
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // J
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // K
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F], // L
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11], // M
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11], // N
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // O
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // P
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D], // Q
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11], // R
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E], // S
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // T
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // U
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04], // V
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A], // W
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11], // X
    [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04], // Y
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F], // Z
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: RgbColor,
        line_width: u32,
    },
    FillRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        color: RgbColor,
    },
    Text {
        x: i32,
        baseline: i32,
        text: String,
        color: RgbColor,
    },
}

/// Width in pixels of `text` set in the label face.
pub fn measure_text(text: &str) -> u32 {
    let glyphs = text.chars().count() as u32;
    (glyphs * GLYPH_ADVANCE).saturating_sub(GLYPH_SCALE)
}

pub fn label_text_color(bucket: BucketName) -> RgbColor {
    if bucket.prefers_dark_text() {
        RgbColor::BLACK
    } else {
        RgbColor::WHITE
    }
}

/// A per-frame display list sized to the frame it annotates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl Overlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Drops every command and resizes to the next frame.
    pub fn clear(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.clear();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_blank(&self) -> bool {
        self.commands.is_empty()
    }

    /// Appends a box and a label tag for every detection.
    pub fn draw_detections(&mut self, detections: &[Detection]) {
        for detection in detections {
            self.draw_detection(detection);
        }
    }

    fn draw_detection(&mut self, detection: &Detection) {
        let bbox = detection.bounding_box;
        let x = bbox.x as i32;
        let y = bbox.y as i32;
        let name = detection.bucket.as_str();

        self.commands.push(DrawCommand::StrokeRect {
            x,
            y,
            width: bbox.width,
            height: bbox.height,
            color: detection.box_color,
            line_width: STROKE_WIDTH,
        });
        self.commands.push(DrawCommand::FillRect {
            x,
            y: y - LABEL_HEIGHT as i32,
            width: measure_text(name) + 2 * LABEL_PADDING as u32,
            height: LABEL_HEIGHT,
            color: detection.box_color,
        });
        self.commands.push(DrawCommand::Text {
            x: x + LABEL_PADDING,
            baseline: y - LABEL_BASELINE_OFFSET,
            text: name.to_string(),
            color: label_text_color(detection.bucket),
        });
    }

    /// Renders the display list onto a fully transparent image.
    pub fn rasterize(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        for command in &self.commands {
            match command {
                DrawCommand::StrokeRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                    line_width,
                } => stroke_rect(&mut canvas, *x, *y, *width, *height, *color, *line_width),
                DrawCommand::FillRect {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    if *width > 0 && *height > 0 {
                        let rect = Rect::at(*x, *y).of_size(*width, *height);
                        draw_filled_rect_mut(&mut canvas, rect, color.to_rgba());
                    }
                }
                DrawCommand::Text {
                    x,
                    baseline,
                    text,
                    color,
                } => draw_text(&mut canvas, *x, *baseline, text, *color),
            }
        }
        canvas
    }
}

// The stroke straddles the path, half inside and half outside.
fn stroke_rect(canvas: &mut RgbaImage, x: i32, y: i32, width: u32, height: u32, color: RgbColor, line_width: u32) {
    let half = (line_width / 2) as i32;
    for ring in 0..line_width as i32 {
        let outset = half - ring;
        let ring_width = width as i64 + 2 * outset as i64;
        let ring_height = height as i64 + 2 * outset as i64;
        if ring_width <= 0 || ring_height <= 0 {
            continue;
        }
        let rect = Rect::at(x - outset, y - outset).of_size(ring_width as u32, ring_height as u32);
        draw_hollow_rect_mut(canvas, rect, color.to_rgba());
    }
}

fn draw_text(canvas: &mut RgbaImage, x: i32, baseline: i32, text: &str, color: RgbColor) {
    let top = baseline - (GLYPH_ROWS * GLYPH_SCALE) as i32;
    for (index, character) in text.chars().enumerate() {
        let Some(glyph) = glyph_for(character) else {
            continue;
        };
        let origin_x = x + (index as u32 * GLYPH_ADVANCE) as i32;
        for (row, bits) in glyph.iter().enumerate() {
            for column in 0..GLYPH_COLUMNS {
                if bits & (0x10 >> column) == 0 {
                    continue;
                }
                let cell = Rect::at(
                    origin_x + (column * GLYPH_SCALE) as i32,
                    top + (row as u32 * GLYPH_SCALE) as i32,
                )
                .of_size(GLYPH_SCALE, GLYPH_SCALE);
                draw_filled_rect_mut(canvas, cell, color.to_rgba());
            }
        }
    }
}

fn glyph_for(character: char) -> Option<&'static [u8; 7]> {
    let upper = character.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| &GLYPHS[(upper as u8 - b'A') as usize])
}
