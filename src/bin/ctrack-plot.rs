use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Plot C-Track trajectory logs.
#[derive(Parser, Debug)]
#[command(name = "ctrack-plot", version)]
struct Cli {
    /// Input trajectory log (`;`-delimited, `#` comments).
    input: PathBuf,

    /// Also render the frame range as an animated GIF.
    #[arg(long)]
    gif: bool,

    /// Log wall-clock timing of each stage.
    #[arg(long)]
    prof: bool,

    /// First sample of the animation window.
    #[arg(long, default_value_t = 450)]
    beg: usize,

    /// End (exclusive) of the animation window.
    #[arg(long, default_value_t = 1600)]
    end: usize,

    /// Maximum concurrent frame renders (0 = twice the available parallelism).
    #[arg(long, default_value_t = 0)]
    conc: usize,

    /// Static plot output path.
    #[arg(short = 'o', long = "out", default_value = "out.png")]
    out: PathBuf,

    /// Animated GIF output path.
    #[arg(long, default_value = "out.gif")]
    anim_out: PathBuf,

    /// Summary image output path.
    #[arg(long, default_value = "resolution.png")]
    summary_out: PathBuf,

    /// JSON file overriding plot settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Decimal separator used by the input, rewritten to `.` before parsing.
    #[arg(long, default_value_t = ',')]
    decimal_separator: char,

    /// Log animation progress every N frames.
    #[arg(long, default_value_t = 1)]
    progress_every: usize,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = build_config(cli)?;
    let outcome = ctrack_plot::run(&cfg)
        .with_context(|| format!("plot '{}'", cfg.input.display()))?;

    tracing::info!(
        rows = outcome.report.accepted,
        frames = outcome.frames_written,
        entries = outcome.summary.entries,
        "done"
    );
    Ok(())
}

/// usvg warns once per text element when no font matches; `run` reports missing fonts once instead.
const DEFAULT_FILTER: &str = "info,usvg=error";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_config(cli: Cli) -> anyhow::Result<ctrack_plot::RunConfig> {
    let mut cfg = ctrack_plot::RunConfig::new(cli.input);
    cfg.animate = cli.gif;
    cfg.profile = cli.prof;
    cfg.frames = ctrack_plot::FrameRange::new(cli.beg, cli.end)?;
    if cli.conc > 0 {
        cfg.concurrency = cli.conc;
    }
    cfg.static_out = cli.out;
    cfg.animation_out = cli.anim_out;
    cfg.summary_out = cli.summary_out;
    cfg.progress_every = cli.progress_every;
    cfg.decode.decimal_separator = u8::try_from(cli.decimal_separator)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| {
            format!(
                "decimal separator must be a single ASCII character (got {:?})",
                cli.decimal_separator
            )
        })?;
    if let Some(path) = cli.settings {
        cfg.plot = ctrack_plot::PlotSettings::from_json_path(&path)?;
    }
    cfg.validate()?;
    Ok(cfg)
}
