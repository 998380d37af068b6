use std::path::Path;

use plotters::prelude::*;
use polars::prelude::*;

use super::{draw_err, padded_range, rendered, AXIS_FONT, CAPTION_FONT, CHART_SIZE, SERIES_BLUE};

pub struct ScatterSpec<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Marker opacity in `[0, 1]`.
    pub opacity: f64,
    /// Draw the `y = x` reference line (predicted-vs-actual charts).
    pub identity_line: bool,
}

pub fn draw_scatter(path: &Path, spec: &ScatterSpec, points: &[(f64, f64)]) -> PolarsResult<()> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let (x_range, y_range) = if spec.identity_line {
        // shared axes so the reference line sits on the diagonal
        let shared = padded_range(points.iter().flat_map(|&(x, y)| [x, y]));
        (shared.clone(), shared)
    } else {
        (
            padded_range(points.iter().map(|p| p.0)),
            padded_range(points.iter().map(|p| p.1)),
        )
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.clone(), y_range)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc(spec.x_label)
        .y_desc(spec.y_label)
        .axis_desc_style(AXIS_FONT)
        .draw()
        .map_err(draw_err)?;

    let style = SERIES_BLUE.mix(spec.opacity.clamp(0.0, 1.0)).filled();
    chart
        .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), 3, style)))
        .map_err(draw_err)?;

    if spec.identity_line {
        chart
            .draw_series(LineSeries::new(
                vec![(x_range.start, x_range.start), (x_range.end, x_range.end)],
                BLACK.mix(0.4).stroke_width(2),
            ))
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    rendered(path);
    Ok(())
}
