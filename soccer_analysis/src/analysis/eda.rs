use std::path::PathBuf;

use ndarray::{s, Array2};
use polars::prelude::*;
use tracing::info;

use crate::analysis::features::{outcome_labels, RESULT_COLUMN};
use crate::charts::distribution::{draw_distributions, DistributionSeries};
use crate::charts::heatmap::draw_correlation_heatmap;
use crate::charts::scatter::{draw_scatter, ScatterSpec};
use crate::charts::{ChartCanvas, SERIES_BLUE, SERIES_ORANGE};
use crate::helper_functions::{column_f64, column_values, ensure_columns, frame_to_array, paired_values};
use crate::ml::linear::MultiTargetLinear;
use crate::ml::metrics::mean_squared_error_multi;
use crate::ml::split::train_test_indices;
use crate::models::{report_not_trained, Dataset};
use crate::stats::{correlation_matrix, describe_numeric};

pub const CORRELATION_COLUMNS: [&str; 6] = ["spi1", "spi2", "proj_score1", "proj_score2", "score1", "score2"];
const HISTOGRAM_BINS: usize = 20;

/// Predictors and targets of the match-score regression.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionColumns {
    pub features: Vec<String>,
    pub targets: Vec<String>,
}

impl Default for RegressionColumns {
    fn default() -> Self {
        Self {
            features: ["spi1", "spi2", "prob1", "prob2"].iter().map(|s| s.to_string()).collect(),
            targets: ["score1", "score2"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Exploratory charts over the match table plus a baseline score regression.
#[derive(Debug, Clone)]
pub struct SoccerAnalysis {
    df: DataFrame,
    canvas: ChartCanvas,
    columns: RegressionColumns,
    test_size: f64,
    random_state: u64,
    model: Option<MultiTargetLinear>,
}

impl SoccerAnalysis {
    pub fn new(source: &impl Dataset, chart_dir: impl Into<PathBuf>) -> PolarsResult<Self> {
        Ok(Self {
            df: source.load()?,
            canvas: ChartCanvas::new(chart_dir)?,
            columns: RegressionColumns::default(),
            test_size: 0.2,
            random_state: 42,
            model: None,
        })
    }

    pub fn with_regression_columns(mut self, columns: RegressionColumns) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_split(mut self, test_size: f64, random_state: u64) -> Self {
        self.test_size = test_size;
        self.random_state = random_state;
        self
    }

    pub fn data(&self) -> &DataFrame {
        &self.df
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn display_data_head(&self) -> DataFrame {
        self.df.head(Some(5))
    }

    pub fn numerical_descriptive_statistics(&self) -> PolarsResult<DataFrame> {
        describe_numeric(&self.df)
    }

    pub fn scatterplot_spi_ratings(&self) -> PolarsResult<PathBuf> {
        let points = paired_values(&self.df, "spi1", "spi2")?;
        let path = self.canvas.path_for("spi_ratings_scatter");
        let spec = ScatterSpec {
            title: "SPI Ratings Comparison",
            x_label: "spi1",
            y_label: "spi2",
            opacity: 1.0,
            identity_line: false,
        };
        draw_scatter(&path, &spec, &points)?;
        Ok(path)
    }

    pub fn histogram_projected_scores(&self) -> PolarsResult<PathBuf> {
        ensure_columns(&self.df, &["proj_score1", "proj_score2"])?;
        let team1 = column_values(&self.df, "proj_score1")?;
        let team2 = column_values(&self.df, "proj_score2")?;
        let path = self.canvas.path_for("projected_scores_histogram");
        draw_distributions(
            &path,
            "Distribution of Projected Scores",
            "projected score",
            &[
                DistributionSeries { label: "Projected Score Team 1", values: &team1, color: SERIES_BLUE },
                DistributionSeries { label: "Projected Score Team 2", values: &team2, color: SERIES_ORANGE },
            ],
            HISTOGRAM_BINS,
        )?;
        Ok(path)
    }

    /// Pairwise-complete Pearson correlation of [`CORRELATION_COLUMNS`], also drawn as a
    /// heatmap.
    pub fn correlation_matrix(&self) -> PolarsResult<(Array2<f64>, PathBuf)> {
        let matrix = correlation_matrix(&self.df, &CORRELATION_COLUMNS)?;
        let path = self.canvas.path_for("correlation_matrix");
        draw_correlation_heatmap(&path, "Correlation Matrix", &CORRELATION_COLUMNS, &matrix)?;
        Ok((matrix, path))
    }

    /// Adds the `result` column (home win / away win / draw).
    pub fn label_outcomes(&mut self) -> PolarsResult<()> {
        let labels = outcome_labels(&self.df, "score1", "score2")?;
        info!("Labelled {} matches ({} unplayed)", labels.len(), labels.null_count());
        self.df.with_column(labels)?;
        Ok(())
    }

    /// Fits one least-squares model per target on the training rows and returns the
    /// held-out MSE averaged over the targets. Rows missing any predictor or target are
    /// dropped first.
    pub fn train_regression(&mut self) -> PolarsResult<f64> {
        let features: Vec<&str> = self.columns.features.iter().map(String::as_str).collect();
        let targets: Vec<&str> = self.columns.targets.iter().map(String::as_str).collect();
        let all: Vec<&str> = features.iter().chain(targets.iter()).copied().collect();
        ensure_columns(&self.df, &all)?;

        let columns: Vec<Vec<Option<f64>>> = all
            .iter()
            .map(|name| column_f64(&self.df, name))
            .collect::<PolarsResult<_>>()?;
        let complete: Vec<usize> = (0..self.df.height())
            .filter(|&i| columns.iter().all(|c| c[i].is_some()))
            .collect();
        info!("Regression on {} of {} rows", complete.len(), self.df.height());
        let data = Array2::from_shape_fn((complete.len(), all.len()), |(r, j)| {
            columns[j][complete[r]].unwrap_or(f64::NAN)
        });
        let x = data.slice(s![.., ..features.len()]).to_owned();
        let y = data.slice(s![.., features.len()..]).to_owned();

        let split = train_test_indices(x.nrows(), self.test_size, self.random_state)?;
        let (x_train, x_test) = split.take(&x);
        let (y_train, y_test) = split.take(&y);

        let model = MultiTargetLinear::fit(x_train.view(), y_train.view(), &self.columns.targets)?;
        let mse = mean_squared_error_multi(y_test.view(), model.predict(x_test.view()).view());
        info!("Mean Squared Error: {:.4}", mse);
        println!("Mean Squared Error: {}", mse);

        self.model = Some(model);
        Ok(mse)
    }

    /// `rows × targets` predictions, or `None` when no model has been trained yet.
    pub fn predict(&self, features: &DataFrame) -> PolarsResult<Option<Array2<f64>>> {
        let Some(model) = &self.model else {
            report_not_trained("SoccerAnalysis");
            return Ok(None);
        };
        let names: Vec<&str> = self.columns.features.iter().map(String::as_str).collect();
        let x = frame_to_array(features, &names)?;
        Ok(Some(model.predict(x.view())))
    }

    pub fn result_column(&self) -> PolarsResult<&Column> {
        self.df.column(RESULT_COLUMN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::any_dataset::AnyDataset;
    use polars::df;

    fn tiny() -> DataFrame {
        df![
            "spi1" => [40.0, 60.0],
            "spi2" => [50.0, 45.0],
            "score1" => [1i64, 2],
            "score2" => [2i64, 1]
        ]
        .unwrap()
    }

    fn matches() -> DataFrame {
        let spi1: Vec<f64> = (0..20).map(|i| 40.0 + i as f64 * 2.0).collect();
        let spi2: Vec<f64> = (0..20).map(|i| 70.0 - i as f64 * 1.5 + (i % 3) as f64).collect();
        let prob1: Vec<f64> = spi1.iter().zip(&spi2).map(|(a, b)| a / (a + b)).collect();
        let prob2: Vec<f64> = spi1.iter().zip(&spi2).map(|(a, b)| b / (a + b + 10.0)).collect();
        let score1: Vec<Option<f64>> = (0..20)
            .map(|i| if i == 19 { None } else { Some((i % 4) as f64) })
            .collect();
        let score2: Vec<Option<f64>> = (0..20).map(|i| Some(((i + 1) % 3) as f64)).collect();
        df![
            "spi1" => spi1.clone(),
            "spi2" => spi2.clone(),
            "prob1" => prob1,
            "prob2" => prob2,
            "proj_score1" => spi1.iter().map(|v| v / 30.0).collect::<Vec<_>>(),
            "proj_score2" => spi2.iter().map(|v| v / 35.0).collect::<Vec<_>>(),
            "score1" => score1,
            "score2" => score2
        ]
        .unwrap()
    }

    #[test]
    fn tiny_table_scatters_and_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let mut analysis = SoccerAnalysis::new(&tiny(), tmp.path()).unwrap();
        let path = analysis.scatterplot_spi_ratings().unwrap();
        assert!(path.exists());

        analysis.label_outcomes().unwrap();
        let labels: Vec<Option<&str>> = analysis.result_column().unwrap().str().unwrap().into_iter().collect();
        assert_eq!(labels, vec![Some("away win"), Some("home win")]);
    }

    #[test]
    fn chart_methods_require_their_columns() {
        let tmp = tempfile::tempdir().unwrap();
        let analysis = SoccerAnalysis::new(&tiny(), tmp.path()).unwrap();
        assert!(matches!(
            analysis.histogram_projected_scores(),
            Err(PolarsError::ColumnNotFound(_))
        ));
        assert!(analysis.correlation_matrix().is_err());
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let tmp = tempfile::tempdir().unwrap();
        let analysis = SoccerAnalysis::new(&matches(), tmp.path()).unwrap();
        let (m, path) = analysis.correlation_matrix().unwrap();
        assert_eq!(m.dim(), (6, 6));
        for i in 0..6 {
            assert!((m[[i, i]] - 1.0).abs() < 1e-9);
            for j in 0..6 {
                assert!((m[[i, j]] - m[[j, i]]).abs() < 1e-9);
            }
        }
        assert!(path.exists());
        assert!(analysis.histogram_projected_scores().unwrap().exists());
    }

    #[test]
    fn predict_before_training_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let analysis = SoccerAnalysis::new(&matches(), tmp.path()).unwrap();
        assert!(!analysis.is_trained());
        assert!(analysis.predict(&matches()).unwrap().is_none());
    }

    #[test]
    fn regression_trains_and_predicts_two_targets() {
        let tmp = tempfile::tempdir().unwrap();
        let mut analysis = SoccerAnalysis::new(&matches(), tmp.path()).unwrap();
        let mse = analysis.train_regression().unwrap();
        assert!(mse.is_finite() && mse >= 0.0);
        assert!(analysis.is_trained());

        let new_rows = matches().head(Some(3));
        let predictions = analysis.predict(&new_rows).unwrap().unwrap();
        assert_eq!(predictions.dim(), (3, 2));
    }

    /// Match table as CSV with unplayed fixtures (empty scores) listed first.
    fn matches_csv(dir: &std::path::Path) -> AnyDataset {
        let mut body = String::from("spi1,spi2,prob1,prob2,proj_score1,proj_score2,score1,score2\n");
        for i in 0..3 {
            let (a, b) = (85.0 - i as f64 * 4.0, 30.0 + i as f64 * 3.0);
            let (p1, p2) = (a / (a + b), b / (a + b + 10.0));
            body.push_str(&format!("{},{},{},{},{},{},,\n", a, b, p1, p2, a / 30.0, b / 35.0));
        }
        for i in 0..20 {
            let a = 40.0 + i as f64 * 2.0;
            let b = 70.0 - i as f64 * 1.5 + (i % 3) as f64;
            body.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                a,
                b,
                a / (a + b),
                b / (a + b + 10.0),
                a / 30.0,
                b / 35.0,
                i % 4,
                (i + 1) % 3
            ));
        }
        let path = dir.join("spi_matches.csv");
        std::fs::write(&path, body).unwrap();
        AnyDataset::new(path.to_str().unwrap())
    }

    #[test]
    fn csv_matches_with_unplayed_fixtures() {
        let tmp = tempfile::tempdir().unwrap();
        let source = matches_csv(tmp.path());
        let columns = RegressionColumns {
            features: vec!["spi1".into(), "spi2".into(), "prob1".into()],
            targets: vec!["score1".into(), "score2".into()],
        };
        let mut analysis = SoccerAnalysis::new(&source, tmp.path()).unwrap().with_regression_columns(columns);
        assert_eq!(analysis.data().height(), 23);
        assert_eq!(analysis.data().column("score1").unwrap().null_count(), 3);

        // the rating pair keeps the unplayed rows
        let (m, _) = analysis.correlation_matrix().unwrap();
        let ratings = correlation_matrix(analysis.data(), &["spi1", "spi2"]).unwrap();
        assert!((m[[0, 1]] - ratings[[0, 1]]).abs() < 1e-9);

        analysis.label_outcomes().unwrap();
        assert_eq!(analysis.result_column().unwrap().null_count(), 3);

        let mse = analysis.train_regression().unwrap();
        assert!(mse.is_finite());
        let unplayed = analysis.data().head(Some(3));
        let predictions = analysis.predict(&unplayed).unwrap().unwrap();
        assert_eq!(predictions.dim(), (3, 2));
    }
}
