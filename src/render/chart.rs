use plotters::coord::Shift;
use plotters::prelude::*;

use crate::foundation::core::{AxisRange, Canvas};
use crate::foundation::error::{TrackError, TrackResult};

pub type PlotResult = Result<(), DrawingAreaErrorKind<std::io::Error>>;

/// Draw one chart document on a white canvas and return its SVG markup.
pub fn svg_chart<F>(canvas: Canvas, draw: F) -> TrackResult<String>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> PlotResult,
{
    let mut svg = String::with_capacity(64 * 1024);
    {
        let root = SVGBackend::with_string(&mut svg, (canvas.width, canvas.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(plot_error)?;
        draw(&root).map_err(plot_error)?;
        root.present().map_err(plot_error)?;
    }
    Ok(svg)
}

pub fn plot_error(err: DrawingAreaErrorKind<std::io::Error>) -> TrackError {
    TrackError::render(format!("plot: {err}"))
}

/// Plotting-area extent of a fixed axis.
pub fn span(range: AxisRange) -> std::ops::Range<f64> {
    range.min..range.max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::svg::SvgRasterizer;

    #[test]
    fn chart_document_has_canvas_size() {
        let svg = svg_chart(Canvas::square(120), |root| {
            root.draw(&Circle::new((60, 60), 10, BLACK.filled()))?;
            Ok(())
        })
        .unwrap();
        assert!(svg.contains(r#"width="120""#));
        assert!(svg.contains("<circle"));

        let raster = SvgRasterizer::with_fontdb(usvg::fontdb::Database::new());
        let frame = raster.rasterize(&svg, Canvas::square(120)).unwrap();
        assert_eq!(frame.pixel(60, 60), [0, 0, 0, 255]);
        assert_eq!(frame.pixel(5, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn drawing_failures_become_render_errors() {
        let err = svg_chart(Canvas::square(64), |_| {
            Err(DrawingAreaErrorKind::LayoutError)
        })
        .unwrap_err();
        assert!(matches!(err, TrackError::Render(_)));
    }
}
