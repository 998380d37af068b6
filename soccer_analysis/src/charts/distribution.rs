use std::path::Path;

use plotters::prelude::*;
use polars::prelude::*;

use super::{draw_err, padded_range, rendered, AXIS_FONT, CAPTION_FONT, CHART_SIZE};
use crate::stats::gaussian_kde;

const KDE_POINTS: usize = 200;

/// One sample drawn as a translucent histogram with a KDE curve on top.
pub struct DistributionSeries<'a> {
    pub label: &'a str,
    pub values: &'a [f64],
    pub color: RGBColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub start: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

/// Equal-width bins over `range`; values on the upper edge land in the last bin.
pub fn histogram(values: &[f64], range: &std::ops::Range<f64>, bins: usize) -> Histogram {
    let bins = bins.max(1);
    let bin_width = (range.end - range.start) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        if v < range.start || v > range.end || bin_width <= 0.0 {
            continue;
        }
        let idx = (((v - range.start) / bin_width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram { start: range.start, bin_width, counts }
}

/// Overlaid histograms on a shared bin grid, each with a Gaussian KDE scaled to counts.
pub fn draw_distributions(
    path: &Path,
    title: &str,
    x_label: &str,
    series: &[DistributionSeries],
    bins: usize,
) -> PolarsResult<()> {
    let x_range = padded_range(series.iter().flat_map(|s| s.values.iter().copied()));
    let grid: Vec<f64> = (0..KDE_POINTS)
        .map(|i| x_range.start + (x_range.end - x_range.start) * i as f64 / (KDE_POINTS - 1) as f64)
        .collect();

    let mut layers = Vec::with_capacity(series.len());
    let mut y_max: f64 = 1.0;
    for s in series {
        let hist = histogram(s.values, &x_range, bins);
        let kde: Option<Vec<(f64, f64)>> = gaussian_kde(s.values, &grid)?.map(|density| {
            let scale = s.values.len() as f64 * hist.bin_width;
            grid.iter().zip(density).map(|(&x, d)| (x, d * scale)).collect()
        });
        y_max = hist.counts.iter().map(|&c| c as f64).fold(y_max, f64::max);
        if let Some(curve) = &kde {
            y_max = curve.iter().map(|p| p.1).fold(y_max, f64::max);
        }
        layers.push((s, hist, kde));
    }

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, CAPTION_FONT)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d(x_range.clone(), 0.0..y_max * 1.1)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Count")
        .axis_desc_style(AXIS_FONT)
        .draw()
        .map_err(draw_err)?;

    for (s, hist, kde) in &layers {
        let color = s.color;
        chart
            .draw_series(hist.counts.iter().enumerate().map(|(i, &count)| {
                let x0 = hist.start + i as f64 * hist.bin_width;
                Rectangle::new([(x0, 0.0), (x0 + hist.bin_width, count as f64)], color.mix(0.4).filled())
            }))
            .map_err(draw_err)?
            .label(s.label)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));

        if let Some(curve) = kde {
            chart
                .draw_series(LineSeries::new(curve.iter().copied(), color.stroke_width(2)))
                .map_err(draw_err)?;
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    rendered(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::{SERIES_BLUE, SERIES_ORANGE};

    #[test]
    fn histogram_counts_every_value_once() {
        let values = [0.0, 0.1, 0.5, 0.99, 1.0];
        let h = histogram(&values, &(0.0..1.0), 4);
        assert_eq!(h.counts, vec![2, 0, 1, 2]);
        assert_eq!(h.counts.iter().sum::<usize>(), values.len());
        assert!((h.bin_width - 0.25).abs() < 1e-12);
    }

    #[test]
    fn overlays_two_series_with_legend() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("dist.svg");
        let a = [1.2, 1.5, 0.8, 2.1, 1.9, 1.1];
        let b = [0.7, 0.9, 1.4, 1.0, 0.6];
        draw_distributions(
            &path,
            "Distribution of Projected Scores",
            "projected score",
            &[
                DistributionSeries { label: "Projected Score Team 1", values: &a, color: SERIES_BLUE },
                DistributionSeries { label: "Projected Score Team 2", values: &b, color: SERIES_ORANGE },
            ],
            20,
        )
        .unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Projected Score Team 2"));
    }
}
