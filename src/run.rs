use std::time::Instant;

use tracing::{info, warn};

use crate::data::timeline::{LoadReport, Timeline, load_timeline};
use crate::encode::animation::GifSequenceEncoder;
use crate::encode::quantize::{PalettedFrame, Quantized};
use crate::foundation::config::RunConfig;
use crate::foundation::error::{TrackError, TrackResult};
use crate::pipeline::executor::BoundedExecutor;
use crate::pipeline::frames::render_frames;
use crate::pipeline::progress::LogProgress;
use crate::render::frame::{FrameRenderer, TrajectoryRenderer};
use crate::render::summary::{Summary, write_summary};
use crate::render::svg::SvgRasterizer;

/// What a completed run produced.
#[derive(Clone, Debug)]
pub struct RunOutcome {
    pub report: LoadReport,
    /// Frames in the animation, 0 when it was disabled or the range was empty.
    pub frames_written: usize,
    pub summary: Summary,
}

/// Load the input, then write the static plot, the optional animation and the summary image.
///
/// Stages run in that order; the first failing stage aborts the run with its error.
#[tracing::instrument(skip(cfg), fields(input = %cfg.input.display()))]
pub fn run(cfg: &RunConfig) -> TrackResult<RunOutcome> {
    cfg.validate()?;

    let (timeline, report) = timed(cfg.profile, "load", || {
        load_timeline(&cfg.input, &cfg.decode, &cfg.plot.bounds)
    })?;
    if timeline.is_empty() {
        return Err(TrackError::validation(format!(
            "no valid rows in '{}' ({} read, {} malformed, {} rejected)",
            cfg.input.display(),
            report.rows_read,
            report.malformed,
            report.rejected
        )));
    }

    let raster = SvgRasterizer::with_system_fonts();
    if raster.font_faces() == 0 {
        warn!("no system fonts found; plot labels will not be drawn");
    } else {
        tracing::debug!(faces = raster.font_faces(), "loaded system fonts");
    }
    let renderer = TrajectoryRenderer::new(&cfg.plot, raster.clone());

    timed(cfg.profile, "static plot", || {
        renderer.write_static_plot(&timeline, &cfg.static_out)
    })?;

    let frames_written = if cfg.animate {
        let quantized = Quantized::new(renderer, cfg.plot.gif.palette_size);
        timed(cfg.profile, "animation", || {
            write_animation(cfg, &timeline, &quantized)
        })?
    } else {
        0
    };

    let summary = timed(cfg.profile, "summary", || {
        write_summary(
            timeline.target(cfg.plot.summary.slot),
            &cfg.plot.summary,
            cfg.plot.canvas,
            &raster,
            &cfg.summary_out,
        )
    })?;

    Ok(RunOutcome {
        report,
        frames_written,
        summary,
    })
}

/// Render `cfg.frames` with `renderer` under the configured concurrency and write the GIF.
///
/// Returns the number of frames written. Nothing is written if any frame fails.
pub fn write_animation<R>(cfg: &RunConfig, timeline: &Timeline, renderer: &R) -> TrackResult<usize>
where
    R: FrameRenderer<Output = PalettedFrame>,
{
    if cfg.frames.is_empty() {
        warn!(
            beg = cfg.frames.beg,
            end = cfg.frames.end,
            "empty frame range; skipping animation"
        );
        return Ok(0);
    }

    let executor = BoundedExecutor::new(cfg.concurrency)?;
    let progress = LogProgress::new(cfg.progress_every);
    info!(
        frames = cfg.frames.len_frames(),
        workers = executor.workers(),
        "rendering animation"
    );
    let frames = render_frames(timeline, cfg.frames, renderer, &executor, &progress)?;

    GifSequenceEncoder::new(cfg.plot.gif.delay_cs).write_animation(&frames, &cfg.animation_out)?;
    Ok(frames.len())
}

fn timed<T>(enabled: bool, stage: &str, f: impl FnOnce() -> TrackResult<T>) -> TrackResult<T> {
    if !enabled {
        return f();
    }
    let started = Instant::now();
    let out = f();
    info!(
        stage,
        ok = out.is_ok(),
        "stage took {:.3}s",
        started.elapsed().as_secs_f64()
    );
    out
}
