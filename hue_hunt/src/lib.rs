// THEORY:
// This file is the main entry point for the `hue_hunt` library crate.
//
// The per-frame detector lives in `core_modules` and is driven through
// `pipeline::DetectionPipeline`. Around it sit the pieces a live application
// needs: `sources` for acquiring frames, `driver` for the paced, cancellable
// detection loop, and `session` for the state the loop feeds (color history
// with debounce, the challenge game, the score). `config` ties every tunable
// to one TOML file.
//
// Application state is plain data. The loop takes a `Session` by value and
// hands it back when it exits; nothing is shared behind globals.

pub mod config;
pub mod core_modules;
pub mod driver;
pub mod pipeline;
pub mod session;
pub mod sources;

pub use config::{ConfigError, DetectionConfig};
pub use core_modules::color_model::{BucketName, ColorBucket, HsvRange, Palette, RgbColor};
pub use core_modules::frame::{Frame, FrameError, PixelFormat};
pub use driver::{CycleOutcome, DetectionEvent, DetectionLoop, DriverError, LoopExit, LoopState};
pub use pipeline::{DetectionPipeline, PipelineConfig, Report};
pub use session::Session;
pub use sources::{CaptureError, CaptureRequest, Facing, FrameStream, VideoSource};
