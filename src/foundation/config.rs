use std::path::{Path, PathBuf};

use crate::foundation::core::{Axis, AxisRange, Canvas, FrameRange, TARGET_SLOTS};
use crate::foundation::error::{TrackError, TrackResult};

/// Acceptance volume for input rows. A row is kept only if every target lies inside it.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Bounds {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl Bounds {
    pub fn range(&self, axis: Axis) -> AxisRange {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-800.0, 800.0),
            y: AxisRange::new(-800.0, 800.0),
            z: AxisRange::new(2400.0, 5000.0),
        }
    }
}

/// Fixed axis ranges of the projection tiles. Frames share them so an animation is comparable.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotView {
    pub x: AxisRange,
    pub y: AxisRange,
    pub z: AxisRange,
}

impl PlotView {
    pub fn range(&self, axis: Axis) -> AxisRange {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

impl Default for PlotView {
    fn default() -> Self {
        Self {
            x: AxisRange::new(-650.0, 650.0),
            y: AxisRange::new(-650.0, 650.0),
            z: AxisRange::new(2510.0, 2565.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SummaryOptions {
    /// Target slot (0-based) whose series is summarized.
    pub slot: usize,
    /// Number of leading samples the statistics are computed over.
    pub prefix: usize,
    /// Histogram bin count per axis.
    pub bins: usize,
    /// Histogram half-width around the first sample's coordinate.
    pub half_width: f64,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            slot: 0,
            prefix: 50,
            bins: 100,
            half_width: 2.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GifOptions {
    /// Colors per frame palette, in `2..=256`.
    pub palette_size: usize,
    /// Per-frame display delay in hundredths of a second.
    pub delay_cs: u16,
}

impl Default for GifOptions {
    fn default() -> Self {
        Self {
            palette_size: 256,
            delay_cs: 0,
        }
    }
}

/// Largest view offset, in multiples of its span, whose tick positions stay distinct in `f64`.
const MAX_VIEW_OFFSET_PER_SPAN: f64 = 1e9;

/// Plot settings that can be overridden from a JSON file.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotSettings {
    pub bounds: Bounds,
    pub view: PlotView,
    pub canvas: Canvas,
    pub summary: SummaryOptions,
    pub gif: GifOptions,
}

impl PlotSettings {
    pub fn from_json_path(path: &Path) -> TrackResult<Self> {
        use anyhow::Context as _;

        let f = std::fs::File::open(path)
            .with_context(|| format!("open settings '{}'", path.display()))?;
        let settings: PlotSettings = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse settings JSON '{}'", path.display()))?;
        Ok(settings)
    }

    pub fn validate(&self) -> TrackResult<()> {
        for axis in Axis::ALL {
            self.bounds
                .range(axis)
                .validate(&format!("bounds.{axis}"))?;
            let view = self.view.range(axis);
            view.validate(&format!("view.{axis}"))?;
            if view.min.abs().max(view.max.abs()) / view.span() > MAX_VIEW_OFFSET_PER_SPAN {
                return Err(TrackError::validation(format!(
                    "view.{axis} span is too narrow for its offset to be plotted (got [{}, {}])",
                    view.min, view.max
                )));
            }
        }
        if self.canvas.width < 64 || self.canvas.height < 64 {
            return Err(TrackError::validation("canvas must be at least 64x64 pixels"));
        }
        if self.summary.slot >= TARGET_SLOTS {
            return Err(TrackError::validation(format!(
                "summary.slot must be < {TARGET_SLOTS}"
            )));
        }
        if self.summary.prefix == 0 || self.summary.bins == 0 {
            return Err(TrackError::validation(
                "summary.prefix and summary.bins must be >= 1",
            ));
        }
        if !(self.summary.half_width.is_finite() && self.summary.half_width > 0.0) {
            return Err(TrackError::validation(
                "summary.half_width must be finite and > 0",
            ));
        }
        if !(2..=256).contains(&self.gif.palette_size) {
            return Err(TrackError::validation(
                "gif.palette_size must be within 2..=256",
            ));
        }
        Ok(())
    }
}

/// Byte-level settings of the delimited input format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    pub delimiter: u8,
    pub comment: u8,
    /// Locale decimal separator rewritten to `.` before numeric parsing.
    pub decimal_separator: u8,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            comment: b'#',
            decimal_separator: b',',
        }
    }
}

impl DecodeOptions {
    pub fn validate(&self) -> TrackResult<()> {
        if self.decimal_separator == self.delimiter {
            return Err(TrackError::validation(
                "decimal separator must differ from the field delimiter",
            ));
        }
        if self.decimal_separator == self.comment {
            return Err(TrackError::validation(
                "decimal separator must differ from the comment prefix",
            ));
        }
        if self.comment == self.delimiter {
            return Err(TrackError::validation(
                "comment prefix must differ from the field delimiter",
            ));
        }
        Ok(())
    }
}

/// Immutable run configuration, built once at startup and passed by reference.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub input: PathBuf,
    /// Render the animated GIF.
    pub animate: bool,
    /// Log wall-clock time of each stage.
    pub profile: bool,
    pub frames: FrameRange,
    /// Maximum number of concurrently executing frame renders.
    pub concurrency: usize,
    pub static_out: PathBuf,
    pub animation_out: PathBuf,
    pub summary_out: PathBuf,
    /// Log progress every N rendered frames.
    pub progress_every: usize,
    pub decode: DecodeOptions,
    pub plot: PlotSettings,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            animate: false,
            profile: false,
            frames: FrameRange::default(),
            concurrency: default_concurrency(),
            static_out: PathBuf::from("out.png"),
            animation_out: PathBuf::from("out.gif"),
            summary_out: PathBuf::from("resolution.png"),
            progress_every: 1,
            decode: DecodeOptions::default(),
            plot: PlotSettings::default(),
        }
    }

    pub fn validate(&self) -> TrackResult<()> {
        if self.concurrency == 0 {
            return Err(TrackError::validation("concurrency must be >= 1"));
        }
        if self.progress_every == 0 {
            return Err(TrackError::validation("progress interval must be >= 1"));
        }
        FrameRange::new(self.frames.beg, self.frames.end)?;
        self.decode.validate()?;
        self.plot.validate()
    }
}

/// Twice the available hardware parallelism.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RunConfig::new("in.csv");
        cfg.validate().unwrap();
        assert_eq!(cfg.frames, FrameRange { beg: 450, end: 1600 });
        assert_eq!(cfg.static_out, PathBuf::from("out.png"));
        assert!(cfg.concurrency >= 2);
        assert_eq!(cfg.plot.gif.palette_size, 256);
        assert_eq!(cfg.plot.summary.prefix, 50);
    }

    #[test]
    fn settings_json_overrides_only_given_fields() {
        let json = r#"{ "view": { "z": { "min": 2000.0, "max": 3000.0 } }, "gif": { "delay_cs": 4 } }"#;
        let s: PlotSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.view.z, AxisRange::new(2000.0, 3000.0));
        assert_eq!(s.view.x, PlotView::default().x);
        assert_eq!(s.gif.delay_cs, 4);
        assert_eq!(s.gif.palette_size, 256);
        assert_eq!(s.bounds, Bounds::default());
    }

    #[test]
    fn settings_json_rejects_unknown_fields() {
        let json = r#"{ "bogus": 1 }"#;
        assert!(serde_json::from_str::<PlotSettings>(json).is_err());
    }

    #[test]
    fn validate_catches_bad_values() {
        let mut cfg = RunConfig::new("in.csv");
        cfg.concurrency = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::new("in.csv");
        cfg.decode.decimal_separator = b';';
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::new("in.csv");
        cfg.plot.gif.palette_size = 300;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::new("in.csv");
        cfg.plot.summary.slot = 6;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn decimal_separator_cannot_be_the_comment_prefix() {
        let opts = DecodeOptions {
            decimal_separator: b'#',
            ..DecodeOptions::default()
        };
        let err = opts.validate().unwrap_err();
        assert!(matches!(err, TrackError::Validation(_)), "{err}");
    }

    #[test]
    fn view_far_from_origin_relative_to_its_span_is_rejected() {
        let mut s = PlotSettings::default();
        s.view.x = AxisRange::new(1e21, 1e21 + 262144.0);
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("view.x"), "{err}");

        s.view.x = AxisRange::new(1e6, 1e6 + 0.5);
        s.validate().unwrap();
    }
}
