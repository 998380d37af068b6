use std::path::PathBuf;

use polars::prelude::*;
use tracing::info;

use crate::charts::boxplot::draw_boxplots;
use crate::charts::distribution::{draw_distributions, DistributionSeries};
use crate::charts::hexbin::{draw_hexbin_joint, DEFAULT_GRIDSIZE};
use crate::charts::scatter::{draw_scatter, ScatterSpec};
use crate::charts::{ChartCanvas, SERIES_BLUE, SERIES_ORANGE};
use crate::helper_functions::{column_f64, column_str, column_values, ensure_columns, paired_values, to_long_form};
use crate::models::Dataset;

const SCORE_COLUMNS: [&str; 2] = ["score1", "score2"];

/// Joint-density, box and distribution charts over the match table. Holds no model state.
#[derive(Debug, Clone)]
pub struct InferenceAnalysis {
    df: DataFrame,
    canvas: ChartCanvas,
}

impl InferenceAnalysis {
    pub fn new(source: &impl Dataset, chart_dir: impl Into<PathBuf>) -> PolarsResult<Self> {
        Ok(Self { df: source.load()?, canvas: ChartCanvas::new(chart_dir)? })
    }

    pub fn data(&self) -> &DataFrame {
        &self.df
    }

    pub fn scatterplot_spi_ratings(&self) -> PolarsResult<PathBuf> {
        let points = paired_values(&self.df, "spi1", "spi2")?;
        let path = self.canvas.path_for("spi_ratings_scatter_alpha");
        let spec = ScatterSpec {
            title: "Scatterplot of SPI Ratings",
            x_label: "SPI Team 1",
            y_label: "SPI Team 2",
            opacity: 0.3,
            identity_line: false,
        };
        draw_scatter(&path, &spec, &points)?;
        Ok(path)
    }

    pub fn scatterplot_spi_ratings_hexbin(&self) -> PolarsResult<PathBuf> {
        self.hexbin_with_gridsize(DEFAULT_GRIDSIZE)
    }

    pub fn hexbin_with_gridsize(&self, gridsize: usize) -> PolarsResult<PathBuf> {
        let points = paired_values(&self.df, "spi1", "spi2")?;
        let path = self.canvas.path_for("spi_ratings_hexbin");
        draw_hexbin_joint(&path, "Hexbin Plot of SPI Ratings", "SPI Team 1", "SPI Team 2", &points, gridsize)?;
        Ok(path)
    }

    /// Long-form `(variable, value)` reshape of both score columns, one box per column.
    pub fn boxplot_scores(&self) -> PolarsResult<PathBuf> {
        let long = to_long_form(&self.df, &SCORE_COLUMNS)?;
        let variables = column_str(&long, "variable")?;
        let values = column_f64(&long, "value")?;

        let mut groups: Vec<(String, Vec<f64>)> = SCORE_COLUMNS.iter().map(|c| (c.to_string(), Vec::new())).collect();
        for (variable, value) in variables.into_iter().zip(values) {
            if let (Some(variable), Some(value)) = (variable, value) {
                if let Some((_, bucket)) = groups.iter_mut().find(|(name, _)| *name == variable) {
                    bucket.push(value);
                }
            }
        }
        info!(
            "Boxplot over {} scores",
            groups.iter().map(|(_, v)| v.len()).sum::<usize>()
        );

        let path = self.canvas.path_for("scores_boxplot");
        draw_boxplots(&path, "Boxplot of Scores", "variable", "value", &groups)?;
        Ok(path)
    }

    pub fn distribution_probabilities(&self) -> PolarsResult<PathBuf> {
        ensure_columns(&self.df, &["prob1", "prob2"])?;
        let prob1 = column_values(&self.df, "prob1")?;
        let prob2 = column_values(&self.df, "prob2")?;
        let path = self.canvas.path_for("probabilities_distribution");
        draw_distributions(
            &path,
            "Distribution of Probabilities",
            "probability",
            &[
                DistributionSeries { label: "prob1", values: &prob1, color: SERIES_BLUE },
                DistributionSeries { label: "prob2", values: &prob2, color: SERIES_ORANGE },
            ],
            20,
        )?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn matches() -> DataFrame {
        df![
            "spi1" => [40.0, 60.0, 55.2, 71.3, 48.9, 66.0],
            "spi2" => [50.0, 45.0, 62.1, 58.7, 39.5, 70.2],
            "prob1" => [0.35, 0.61, 0.42, 0.55, 0.58, 0.40],
            "prob2" => [0.40, 0.18, 0.33, 0.24, 0.20, 0.37],
            "score1" => [Some(1i64), Some(2), Some(0), None, Some(3), Some(1)],
            "score2" => [Some(2i64), Some(1), Some(0), None, Some(1), Some(1)]
        ]
        .unwrap()
    }

    #[test]
    fn every_chart_is_written() {
        let tmp = tempfile::tempdir().unwrap();
        let analysis = InferenceAnalysis::new(&matches(), tmp.path()).unwrap();
        let paths = vec![
            analysis.scatterplot_spi_ratings().unwrap(),
            analysis.scatterplot_spi_ratings_hexbin().unwrap(),
            analysis.boxplot_scores().unwrap(),
            analysis.distribution_probabilities().unwrap(),
        ];
        for path in paths {
            assert!(path.exists(), "{} missing", path.display());
            assert!(path.starts_with(tmp.path()));
        }
    }

    #[test]
    fn missing_score_columns_fail() {
        let tmp = tempfile::tempdir().unwrap();
        let df = df!["spi1" => [1.0], "spi2" => [2.0]].unwrap();
        let analysis = InferenceAnalysis::new(&df, tmp.path()).unwrap();
        assert!(matches!(analysis.boxplot_scores(), Err(PolarsError::ColumnNotFound(_))));
        assert!(analysis.distribution_probabilities().is_err());
    }
}
