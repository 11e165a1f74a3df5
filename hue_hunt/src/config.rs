use crate::core_modules::color_model::{ColorBucket, Palette, PaletteError, STANDARD_BUCKETS};
use crate::core_modules::grid_sampler::DEFAULT_STRIDE;
use crate::core_modules::region_aggregator::{AggregationThresholds, DEFAULT_MIN_BOX_SIZE, DEFAULT_MIN_SAMPLES};
use crate::driver::DEFAULT_FRAME_RATE_HZ;
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Above this rate one frame interval truncates to zero nanoseconds.
pub const MAX_FRAME_RATE_HZ: u32 = 1_000_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("sample_stride must be at least 1")]
    ZeroStride,
    #[error("frame_rate_hz must be at least 1")]
    ZeroFrameRate,
    #[error("frame_rate_hz {0} exceeds {MAX_FRAME_RATE_HZ}")]
    FrameRateTooHigh(u32),
    #[error(transparent)]
    Palette(#[from] PaletteError),
}

/// Every tunable of the detector and the game layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub log_level: String,
    /// Sampling step in pixels along both axes.
    pub sample_stride: u32,
    /// A bucket needs more than this many matched samples.
    pub min_samples: usize,
    /// Box width and height must both exceed this many pixels.
    pub min_box_size: u32,
    /// Host display refresh rate that paces the detection loop.
    pub frame_rate_hz: u32,
    pub debounce_window_ms: u64,
    /// Points awarded per completed challenge.
    pub challenge_points: u32,
    pub gamification_enabled: bool,
    pub buckets: Vec<ColorBucket>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            sample_stride: DEFAULT_STRIDE,
            min_samples: DEFAULT_MIN_SAMPLES,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            debounce_window_ms: 2000,
            challenge_points: 10,
            gamification_enabled: true,
            buckets: STANDARD_BUCKETS.to_vec(),
        }
    }
}

impl DetectionConfig {
    /// Loads and validates a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: DetectionConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_stride == 0 {
            return Err(ConfigError::ZeroStride);
        }
        if self.frame_rate_hz == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.frame_rate_hz > MAX_FRAME_RATE_HZ {
            return Err(ConfigError::FrameRateTooHigh(self.frame_rate_hz));
        }
        self.palette()?;
        Ok(())
    }

    pub fn palette(&self) -> Result<Palette, ConfigError> {
        Ok(Palette::new(self.buckets.clone())?)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sample_stride: self.sample_stride,
            thresholds: AggregationThresholds {
                min_samples: self.min_samples,
                min_box_size: self.min_box_size,
            },
        }
    }

    /// Never zero, even for a config that skipped `validate`.
    pub fn frame_interval(&self) -> Duration {
        (Duration::from_secs(1) / self.frame_rate_hz.max(1)).max(Duration::from_nanos(1))
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}
