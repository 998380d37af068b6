use std::path::Path;

use plotters::prelude::*;
use polars::prelude::*;

use super::{draw_err, rendered, AXIS_FONT, CAPTION_FONT, CHART_SIZE, SERIES_BLUE};

/// Horizontal bar chart, largest value on top.
pub fn draw_horizontal_bars(
    path: &Path,
    title: &str,
    value_label: &str,
    items: &[(String, f64)],
) -> PolarsResult<()> {
    let mut sorted: Vec<&(String, f64)> = items.iter().collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));
    let n = sorted.len().max(1) as i32;
    let peak = sorted.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let x_end = if peak > 0.0 { peak * 1.1 } else { 1.0 };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(140)
        .build_cartesian_2d(0.0..x_end, (0..n).into_segmented())
        .map_err(draw_err)?;

    let name_of = |v: &SegmentValue<i32>| match v {
        SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => sorted
            .get(*i as usize)
            .map(|(name, _)| name.clone())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n as usize)
        .y_label_formatter(&name_of)
        .x_desc(value_label)
        .axis_desc_style(AXIS_FONT)
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(
            Histogram::horizontal(&chart)
                .style(SERIES_BLUE.filled())
                .margin(6)
                .data(sorted.iter().enumerate().map(|(i, (_, v))| (i as i32, *v))),
        )
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    rendered(path);
    Ok(())
}
