use std::path::Path;

use plotters::prelude::*;
use polars::prelude::*;

use super::{draw_err, padded_range, rendered, AXIS_FONT, CAPTION_FONT, CHART_SIZE, SERIES_BLUE};

/// One vertical box per `(label, values)` group, whiskers at 1.5 IQR.
pub fn draw_boxplots(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    groups: &[(String, Vec<f64>)],
) -> PolarsResult<()> {
    let labels: Vec<&str> = groups.iter().map(|(name, _)| name.as_str()).collect();
    let range = padded_range(groups.iter().flat_map(|(_, v)| v.iter().copied()));

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(labels[..].into_segmented(), range.start as f32..range.end as f32)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .axis_desc_style(AXIS_FONT)
        .x_label_formatter(&|v| match v {
            SegmentValue::Exact(s) | SegmentValue::CenterOf(s) => s.to_string(),
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(labels.iter().zip(groups).filter(|(_, (_, v))| !v.is_empty()).map(
            |(label, (_, values))| {
                Boxplot::new_vertical(SegmentValue::CenterOf(label), &Quartiles::new(values))
                    .width(40)
                    .whisker_width(0.5)
                    .style(SERIES_BLUE)
            },
        ))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    rendered(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_one_box_per_group() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("box.svg");
        let groups = vec![
            ("score1".to_string(), vec![0.0, 1.0, 2.0, 2.0, 3.0, 7.0]),
            ("score2".to_string(), vec![0.0, 0.0, 1.0, 1.0, 2.0]),
        ];
        draw_boxplots(&path, "Boxplot of Scores", "team", "score", &groups).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("score1"));
        assert!(svg.contains("score2"));
    }
}
