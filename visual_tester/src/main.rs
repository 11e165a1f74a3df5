use anyhow::{Context, Result};
use clap::Parser;
use hue_hunt::sources::image_sequence::ImageSequenceSource;
use hue_hunt::{DetectionConfig, DetectionLoop, LoopState, Session, VideoSource};
use image::imageops;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs the color detector over a directory of frames and writes annotated copies.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory of input frames (png, jpg, bmp, webp), read in name order.
    input_dir: PathBuf,
    /// Directory the annotated frames are written to.
    output_dir: PathBuf,
    /// Detector configuration; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read from this local camera instead of `input_dir`.
    #[cfg(feature = "camera")]
    #[arg(long)]
    camera: Option<u32>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u32>,
}

fn main() -> Result<()> {
    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DetectionConfig::from_file(path).with_context(|| format!("loading {}", path.display()))?,
        None => DetectionConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    fs::create_dir_all(&args.output_dir).with_context(|| format!("creating {}", args.output_dir.display()))?;

    // --- 2. Source Selection ---
    #[cfg(feature = "camera")]
    {
        if let Some(device_id) = args.camera {
            let source = hue_hunt::sources::camera::CameraSource::new(device_id);
            return annotate(source, &config, &args.output_dir, args.max_frames);
        }
    }

    let source = ImageSequenceSource::from_dir(&args.input_dir)?;
    info!(frames = source.len(), input = %args.input_dir.display(), "loaded image sequence");
    annotate(source, &config, &args.output_dir, args.max_frames)
}

fn annotate<S: VideoSource>(
    source: S,
    config: &DetectionConfig,
    output_dir: &Path,
    max_frames: Option<u32>,
) -> Result<()> {
    // --- 3. Loop Initialization ---
    let mut detection = DetectionLoop::from_config(source, config)?;
    let mut session = Session::from_config(config)?;
    detection.start()?;

    // --- 4. Main Processing Loop ---
    // The session clock advances one frame interval per frame instead of
    // following the wall clock, so stills debounce as if played live.
    let started = Instant::now();
    let mut index: u32 = 0;
    while max_frames.is_none_or(|limit| index < limit) {
        let outcome = match detection.run_cycle(session.active_challenge()) {
            Ok(Some(outcome)) => outcome,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, frame = index, "stopping early");
                break;
            }
        };

        let now = started + detection.frame_interval() * index;
        for event in &outcome.events {
            session.handle_event(event, now);
        }

        // --- 5. Visualization ---
        let mut composite = outcome.frame.to_rgba_image();
        let overlay = detection.pipeline().last_overlay().rasterize();
        imageops::overlay(&mut composite, &overlay, 0, 0);

        let output_path = output_dir.join(format!("frame_{index:05}.png"));
        composite
            .save(&output_path)
            .with_context(|| format!("writing {}", output_path.display()))?;

        info!(
            frame = index,
            detections = outcome.report.detections().len(),
            dominant = ?outcome.report.dominant().map(|d| d.bucket),
            "frame written"
        );
        index += 1;
    }

    if let LoopState::Error(err) = detection.state() {
        warn!(error = %err, "capture ended with an error");
    }
    detection.stop();

    // --- 6. Session Summary ---
    println!("{}", serde_json::to_string_pretty(&session.summary())?);
    info!(
        frames = index,
        score = session.score(),
        output = %output_dir.display(),
        "processing complete"
    );

    Ok(())
}
