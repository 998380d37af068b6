use std::path::Path;

use ndarray::Array2;
use plotters::prelude::*;
use polars::prelude::*;

use super::{cool_warm, draw_err, rendered, CAPTION_FONT, CHART_SIZE};

/// Annotated square heatmap of a correlation matrix (`labels` name both axes).
pub fn draw_correlation_heatmap(
    path: &Path,
    title: &str,
    labels: &[&str],
    matrix: &Array2<f64>,
) -> PolarsResult<()> {
    let n = labels.len();
    if matrix.nrows() != n || matrix.ncols() != n {
        return Err(PolarsError::ShapeMismatch(
            format!("{} labels for a {:?} matrix", n, matrix.dim()).into(),
        ));
    }

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(110)
        .build_cartesian_2d(0i32..n as i32, n as i32..0i32)
        .map_err(draw_err)?;

    let (plot_w, plot_h) = chart.plotting_area().dim_in_pixel();
    let cell_w = plot_w as i32 / n.max(1) as i32;
    let cell_h = plot_h as i32 / n.max(1) as i32;

    let label_of = |v: &i32| labels.get(*v as usize).map(|s| s.to_string()).unwrap_or_default();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_offset(cell_w / 2)
        .y_label_offset(-cell_h / 2)
        .x_label_formatter(&label_of)
        .y_label_formatter(&label_of)
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(matrix.indexed_iter().map(|((i, j), &v)| {
            let (x, y) = (j as i32, i as i32);
            Rectangle::new([(x, y), (x + 1, y + 1)], cool_warm(v).filled())
        }))
        .map_err(draw_err)?;

    chart
        .draw_series(matrix.indexed_iter().map(|((i, j), &v)| {
            let text_color = if v.abs() > 0.6 { &WHITE } else { &BLACK };
            EmptyElement::at((j as i32, i as i32))
                + Text::new(
                    format!("{:.2}", v),
                    (cell_w / 2 - 14, cell_h / 2 - 7),
                    ("sans-serif", 14).into_font().color(text_color),
                )
        }))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    rendered(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn annotates_every_cell() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("corr.svg");
        let m = array![[1.0, -0.25], [-0.25, 1.0]];
        draw_correlation_heatmap(&path, "Correlation Matrix", &["spi1", "spi2"], &m).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert_eq!(svg.matches("-0.25").count(), 2);
    }

    #[test]
    fn label_count_must_match() {
        let tmp = tempfile::tempdir().unwrap();
        let m = array![[1.0]];
        let err = draw_correlation_heatmap(&tmp.path().join("x.svg"), "t", &["a", "b"], &m);
        assert!(err.is_err());
    }
}
