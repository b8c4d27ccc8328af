use std::path::Path;

use plotters::prelude::*;

use crate::data::timeline::{Sample, Timeline};
use crate::foundation::config::{PlotSettings, PlotView};
use crate::foundation::core::{Axis, Canvas, FrameRGBA};
use crate::foundation::error::{TrackError, TrackResult};
use crate::render::chart::{span, svg_chart};
use crate::render::svg::SvgRasterizer;

const TRAIL_RADIUS_PX: u32 = 1;
const CURRENT_RADIUS_PX: u32 = 3;
const TITLE_SIZE: u32 = 12;
const LABEL_SIZE: u32 = 10;

/// Draw samples `[start, cutoff)` of a timeline; sample `cutoff - 1` is the current position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameRequest {
    pub start: usize,
    pub cutoff: usize,
}

impl FrameRequest {
    pub fn new(start: usize, cutoff: usize) -> Self {
        Self { start, cutoff }
    }

    /// The whole timeline, as drawn by the static plot.
    pub fn full(timeline: &Timeline) -> Self {
        Self {
            start: 0,
            cutoff: timeline.len(),
        }
    }

    pub fn validate(self, len: usize) -> TrackResult<()> {
        if self.cutoff == 0 {
            return Err(TrackError::render("frame cutoff must be >= 1"));
        }
        if self.cutoff > len {
            return Err(TrackError::render(format!(
                "frame cutoff {} exceeds timeline length {len}",
                self.cutoff
            )));
        }
        if self.start >= self.cutoff {
            return Err(TrackError::render(format!(
                "empty sample window [{}, {})",
                self.start, self.cutoff
            )));
        }
        Ok(())
    }
}

/// Renders one frame of a timeline.
///
/// Implementations must be reentrant: the frame pipeline calls `render` concurrently from several
/// worker threads with the same timeline.
pub trait FrameRenderer: Sync {
    type Output: Send;

    fn render(&self, timeline: &Timeline, req: FrameRequest) -> TrackResult<Self::Output>;
}

/// A 2D view of 3D positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Projection {
    pub horizontal: Axis,
    pub vertical: Axis,
}

impl Projection {
    pub const XY: Projection = Projection {
        horizontal: Axis::X,
        vertical: Axis::Y,
    };
    pub const ZY: Projection = Projection {
        horizontal: Axis::Z,
        vertical: Axis::Y,
    };
    pub const XZ: Projection = Projection {
        horizontal: Axis::X,
        vertical: Axis::Z,
    };

    /// Tile order of the projection panels.
    pub const PANELS: [Projection; 3] = [Projection::XY, Projection::ZY, Projection::XZ];
}

fn axis_title(axis: Axis) -> &'static str {
    match axis {
        Axis::X => "X-pos",
        Axis::Y => "Y-pos",
        Axis::Z => "Z-pos",
    }
}

/// Draws the X–Y, Z–Y and X–Z trajectories of all targets on fixed axes.
#[derive(Clone, Debug)]
pub struct TrajectoryRenderer {
    view: PlotView,
    canvas: Canvas,
    raster: SvgRasterizer,
}

impl TrajectoryRenderer {
    pub fn new(settings: &PlotSettings, raster: SvgRasterizer) -> Self {
        Self {
            view: settings.view,
            canvas: settings.canvas,
            raster,
        }
    }

    /// Build the SVG document of one frame.
    pub fn scene(&self, timeline: &Timeline, req: FrameRequest) -> TrackResult<String> {
        req.validate(timeline.len())?;
        let current = req.cutoff - 1;
        let time = timeline
            .time_at(current)
            .ok_or_else(|| TrackError::render("current sample missing"))?;
        let title = format!("Time = {time:8.4}s");
        let windows: Vec<&[Sample]> = timeline
            .targets()
            .map(|series| &series[req.start..req.cutoff])
            .collect();

        svg_chart(self.canvas, |root| {
            let tiles = root.split_evenly((2, 2));
            for (proj, tile) in Projection::PANELS.iter().zip(tiles.iter()) {
                let mut chart = ChartBuilder::on(tile)
                    .caption(&title, ("sans-serif", TITLE_SIZE))
                    .margin(6)
                    .x_label_area_size(34)
                    .y_label_area_size(52)
                    .build_cartesian_2d(
                        span(self.view.range(proj.horizontal)),
                        span(self.view.range(proj.vertical)),
                    )?;
                chart
                    .configure_mesh()
                    .x_desc(axis_title(proj.horizontal))
                    .y_desc(axis_title(proj.vertical))
                    .x_labels(6)
                    .y_labels(6)
                    .label_style(("sans-serif", LABEL_SIZE))
                    .draw()?;

                for window in &windows {
                    let (trail, _) = window.split_at(window.len() - 1);
                    chart.draw_series(
                        trail
                            .iter()
                            .filter_map(|s| self.project(*proj, s))
                            .map(|p| Circle::new(p, TRAIL_RADIUS_PX, BLACK.filled())),
                    )?;
                }
                chart.draw_series(
                    windows
                        .iter()
                        .filter_map(|w| w.last())
                        .filter_map(|s| self.project(*proj, s))
                        .map(|p| Circle::new(p, CURRENT_RADIUS_PX, RED.stroke_width(1))),
                )?;
            }
            Ok(())
        })
    }

    /// Plot coordinates of a sample, or `None` when it falls outside the fixed view.
    fn project(&self, proj: Projection, s: &Sample) -> Option<(f64, f64)> {
        let h = s.position.get(proj.horizontal);
        let v = s.position.get(proj.vertical);
        let inside = self.view.range(proj.horizontal).contains(h)
            && self.view.range(proj.vertical).contains(v);
        inside.then_some((h, v))
    }

    /// Render the whole timeline and write it as a PNG.
    #[tracing::instrument(skip(self, timeline))]
    pub fn write_static_plot(&self, timeline: &Timeline, path: &Path) -> TrackResult<FrameRGBA> {
        let frame = self.render(timeline, FrameRequest::full(timeline))?;
        frame.save_png(path)?;
        tracing::info!("wrote {}", path.display());
        Ok(frame)
    }
}

impl FrameRenderer for TrajectoryRenderer {
    type Output = FrameRGBA;

    fn render(&self, timeline: &Timeline, req: FrameRequest) -> TrackResult<FrameRGBA> {
        let svg = self.scene(timeline, req)?;
        self.raster.rasterize(&svg, self.canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::decode::{RawRow, RawTarget};
    use crate::foundation::core::Position;

    fn timeline(n: usize) -> Timeline {
        let mut tl = Timeline::new();
        for i in 0..n {
            let p = Position::new(i as f64 * 10.0, -(i as f64) * 10.0, 2520.0 + i as f64);
            tl.push_row(&RawRow {
                time: i as f64 * 0.01,
                targets: [RawTarget {
                    position: p,
                    detected: true,
                }; 6],
            });
        }
        tl
    }

    fn renderer() -> TrajectoryRenderer {
        let settings = PlotSettings {
            canvas: Canvas::square(200),
            ..PlotSettings::default()
        };
        TrajectoryRenderer::new(
            &settings,
            SvgRasterizer::with_fontdb(usvg::fontdb::Database::new()),
        )
    }

    #[test]
    fn rejects_invalid_cutoffs() {
        let tl = timeline(3);
        let r = renderer();
        for req in [
            FrameRequest::new(0, 0),
            FrameRequest::new(0, 4),
            FrameRequest::new(2, 2),
        ] {
            let err = r.render(&tl, req).unwrap_err();
            assert!(matches!(err, TrackError::Render(_)), "{req:?}: {err}");
        }
    }

    #[test]
    fn title_carries_current_timestamp() {
        let tl = timeline(5);
        let svg = renderer().scene(&tl, FrameRequest::new(0, 3)).unwrap();
        assert_eq!(svg.matches("Time =   0.0200s").count(), 3);
    }

    fn circles_with(svg: &str, color: &str) -> usize {
        svg.to_ascii_lowercase()
            .split('<')
            .filter(|tag| tag.starts_with("circle") && tag.contains(color))
            .count()
    }

    #[test]
    fn only_current_sample_is_emphasized() {
        let tl = timeline(4);
        let svg = renderer().scene(&tl, FrameRequest::new(1, 4)).unwrap();
        // One ring per target per projection, two trail dots behind each.
        assert_eq!(circles_with(&svg, "#ff0000"), 18);
        assert_eq!(circles_with(&svg, "#000000"), 36);
    }

    #[test]
    fn samples_outside_the_view_are_not_drawn() {
        let mut tl = timeline(2);
        tl.push_row(&RawRow {
            time: 0.02,
            targets: [RawTarget {
                position: Position::new(700.0, 0.0, 2520.0),
                detected: true,
            }; 6],
        });
        let svg = renderer().scene(&tl, FrameRequest::new(0, 3)).unwrap();
        // x = 700 lies outside the X view, so only the Z-Y tile shows the current rings.
        assert_eq!(circles_with(&svg, "#ff0000"), 6);
    }

    #[test]
    fn render_is_deterministic() {
        let tl = timeline(6);
        let r = renderer();
        let a = r.render(&tl, FrameRequest::new(0, 5)).unwrap();
        let b = r.render(&tl, FrameRequest::new(0, 5)).unwrap();
        let c = r.render(&tl, FrameRequest::new(0, 2)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.data, c.data);
        assert_eq!((a.width, a.height), (200, 200));
    }
}
