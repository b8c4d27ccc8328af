use std::path::Path;

use plotters::prelude::*;

use crate::data::timeline::Sample;
use crate::foundation::config::SummaryOptions;
use crate::foundation::core::{Axis, Canvas, FrameRGBA};
use crate::foundation::error::{TrackError, TrackResult};
use crate::render::chart::svg_chart;
use crate::render::svg::SvgRasterizer;

/// Fixed-width bins over `[lo, hi)` with underflow and overflow counters.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub lo: f64,
    pub hi: f64,
    pub bins: Vec<u64>,
    pub underflow: u64,
    pub overflow: u64,
}

impl Histogram {
    pub fn new(bins: usize, lo: f64, hi: f64) -> TrackResult<Self> {
        if bins == 0 || !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(TrackError::validation(format!(
                "histogram needs >= 1 bin over a finite, non-empty range (got {bins} over [{lo}, {hi}))"
            )));
        }
        Ok(Self {
            lo,
            hi,
            bins: vec![0; bins],
            underflow: 0,
            overflow: 0,
        })
    }

    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.bins.len() as f64
    }

    pub fn fill(&mut self, v: f64) {
        if v < self.lo {
            self.underflow += 1;
        } else if v >= self.hi || v.is_nan() {
            self.overflow += 1;
        } else {
            let i = ((v - self.lo) / self.bin_width()) as usize;
            let last = self.bins.len() - 1;
            self.bins[i.min(last)] += 1;
        }
    }

    /// Entries in range, excluding underflow and overflow.
    pub fn in_range(&self) -> u64 {
        self.bins.iter().sum()
    }

    pub fn max_bin(&self) -> u64 {
        self.bins.iter().copied().max().unwrap_or(0)
    }
}

/// Running statistics of one coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisStats {
    pub entries: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator); 0 for fewer than two entries.
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
}

impl AxisStats {
    /// Welford's single-pass update, so constant input yields exactly zero spread.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut n = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            n += 1;
            let delta = v - mean;
            mean += delta / n as f64;
            m2 += delta * (v - mean);
            min = min.min(v);
            max = max.max(v);
        }
        if n == 0 {
            return Self::default();
        }
        let stddev = if n > 1 {
            (m2 / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        Self {
            entries: n,
            mean,
            stddev,
            min,
            max,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxisSummary {
    pub axis: Axis,
    pub stats: AxisStats,
    pub histogram: Histogram,
}

/// Resolution summary of one target over a fixed sample prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub entries: usize,
    pub axes: [AxisSummary; 3],
}

impl Summary {
    pub fn axis(&self, axis: Axis) -> &AxisSummary {
        &self.axes[axis as usize]
    }

    /// Text panel contents, one entry per line. `minmax` is the histogram binning range.
    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![format!("entries  = {}", self.entries)];
        for a in &self.axes {
            let l = a.axis.label();
            let s = a.stats;
            out.push(String::new());
            out.push(format!("{l}-mean   = {}", s.mean));
            out.push(format!("{l}-stddev = {}", s.stddev));
            out.push(format!(
                "{l}-minmax = [{}; {}]",
                a.histogram.lo, a.histogram.hi
            ));
        }
        out
    }
}

/// Histogram and statistics over the first `opts.prefix` samples.
pub fn summarize(samples: &[Sample], opts: &SummaryOptions) -> TrackResult<Summary> {
    if samples.len() < opts.prefix || opts.prefix == 0 {
        return Err(TrackError::InsufficientData {
            required: opts.prefix.max(1),
            available: samples.len(),
        });
    }
    let prefix = &samples[..opts.prefix];
    let first = prefix[0].position;

    let mut axes = Vec::with_capacity(3);
    for axis in Axis::ALL {
        let center = first.get(axis);
        let mut histogram =
            Histogram::new(opts.bins, center - opts.half_width, center + opts.half_width)?;
        for s in prefix {
            histogram.fill(s.position.get(axis));
        }
        let stats = AxisStats::from_values(prefix.iter().map(|s| s.position.get(axis)));
        axes.push(AxisSummary {
            axis,
            stats,
            histogram,
        });
    }
    let axes: [AxisSummary; 3] = axes
        .try_into()
        .map_err(|_| TrackError::validation("expected three axis summaries"))?;
    Ok(Summary {
        entries: prefix.len(),
        axes,
    })
}

fn axis_unit_label(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "X (cm)",
        Axis::Y => "Y (cm)",
        Axis::Z => "Z (cm)",
    }
}

/// Compose the summary image: three histogram tiles and a monospace statistics panel.
pub fn summary_scene(summary: &Summary, canvas: Canvas) -> TrackResult<String> {
    svg_chart(canvas, |root| {
        let tiles = root.split_evenly((2, 2));
        for (a, tile) in summary.axes.iter().zip(tiles.iter()) {
            let h = &a.histogram;
            let top = (h.max_bin().max(1) as f64) * 1.1;
            let mut chart = ChartBuilder::on(tile)
                .margin(10)
                .x_label_area_size(34)
                .y_label_area_size(44)
                .build_cartesian_2d(h.lo..h.hi, 0.0..top)?;
            chart
                .configure_mesh()
                .x_desc(axis_unit_label(a.axis))
                .x_labels(6)
                .y_labels(6)
                .label_style(("sans-serif", 10))
                .draw()?;

            let w = h.bin_width();
            chart.draw_series(h.bins.iter().enumerate().filter(|(_, c)| **c > 0).map(
                |(i, &count)| {
                    let x0 = h.lo + i as f64 * w;
                    Rectangle::new([(x0, 0.0), (x0 + w, count as f64)], BLACK.stroke_width(1))
                },
            ))?;
        }

        let panel = &tiles[3];
        let (_, height) = panel.dim_in_pixel();
        let size = (f64::from(height) / 22.0).clamp(8.0, 14.0);
        let style = ("monospace", size).into_font().color(&BLACK);
        for (i, line) in summary.lines().iter().enumerate() {
            // Non-breaking spaces keep the columns aligned once the SVG collapses whitespace.
            let text = line.replace(' ', "\u{a0}");
            let y = (3.0 * size + i as f64 * size * 1.25) as i32;
            panel.draw_text(&text, &style, (size as i32, y))?;
        }
        Ok(())
    })
}

pub fn render_summary(
    summary: &Summary,
    canvas: Canvas,
    raster: &SvgRasterizer,
) -> TrackResult<FrameRGBA> {
    raster.rasterize(&summary_scene(summary, canvas)?, canvas)
}

/// Summarize `samples` and write the summary image to `path`.
#[tracing::instrument(skip(samples, raster))]
pub fn write_summary(
    samples: &[Sample],
    opts: &SummaryOptions,
    canvas: Canvas,
    raster: &SvgRasterizer,
    path: &Path,
) -> TrackResult<Summary> {
    let summary = summarize(samples, opts)?;
    for a in &summary.axes {
        tracing::debug!(
            axis = %a.axis,
            mean = a.stats.mean,
            stddev = a.stats.stddev,
            underflow = a.histogram.underflow,
            overflow = a.histogram.overflow,
            "axis summary"
        );
    }
    render_summary(&summary, canvas, raster)?.save_png(path)?;
    tracing::info!("wrote {}", path.display());
    Ok(summary)
}
