//! Feature preparation, split, training and evaluation over the team rankings table.
//!
//! The workflow moves through [`Stage`]s in order. `prepare`, `split` and `train` refuse to
//! run before their predecessor with an `InvalidOperation` error; `evaluate` and `predict`
//! before training report "Model not trained" and return `None`.

use std::fmt;
use std::path::PathBuf;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::features::{
    complete_rows, encode_classes, expand_feature_names, winning_percentage_column, FeatureSpec,
    OneHotEncoding, PreparedData,
};
use crate::charts::bars::draw_horizontal_bars;
use crate::charts::scatter::{draw_scatter, ScatterSpec};
use crate::charts::ChartCanvas;
use crate::helper_functions::{column_f64, column_str, ensure_columns, frame_to_array};
use crate::ml::forest::{ForestConfig, RandomForest};
use crate::ml::metrics::{mean_squared_error, r2_score, ClassificationReport};
use crate::ml::pipeline::Pipeline;
use crate::ml::split::train_test_indices;
use crate::ml::{Estimator, Task};
use crate::models::{report_not_trained, Dataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Loaded,
    Prepared,
    Split,
    Trained,
    Evaluated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelingConfig {
    pub spec: FeatureSpec,
    pub task: Task,
    pub test_size: f64,
    pub random_state: u64,
    pub forest: ForestConfig,
    /// Features charted after a regression evaluation, when the model was trained on them.
    pub importance_columns: Vec<String>,
}

impl Default for ModelingConfig {
    fn default() -> Self {
        Self {
            spec: FeatureSpec::default(),
            task: Task::Regression,
            test_size: 0.2,
            random_state: 42,
            forest: ForestConfig::default(),
            importance_columns: vec!["rank".to_string(), "prev_rank".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
struct Partition {
    x_train: Array2<f64>,
    x_test: Array2<f64>,
    y_train: Array1<f64>,
    y_test: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct RegressionEvaluation {
    pub mse: f64,
    pub r2: f64,
    pub predicted_vs_actual: PathBuf,
    /// `None` when none of the configured importance columns were features.
    pub importance_chart: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum Evaluation {
    Regression(RegressionEvaluation),
    Classification(ClassificationReport),
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Regression(r) => {
                writeln!(f, "Mean Squared Error: {}", r.mse)?;
                writeln!(f, "R^2 Score: {}", r.r2)
            }
            Evaluation::Classification(report) => {
                writeln!(f, "Accuracy: {}", report.accuracy)?;
                write!(f, "{}", report)
            }
        }
    }
}

pub struct ModelingAnalysis {
    df: DataFrame,
    config: ModelingConfig,
    canvas: ChartCanvas,
    stage: Stage,
    encoding: OneHotEncoding,
    prepared: Option<PreparedData>,
    partition: Option<Partition>,
    pipeline: Option<Pipeline<RandomForest>>,
}

impl ModelingAnalysis {
    pub fn new(source: &impl Dataset, config: ModelingConfig, chart_dir: impl Into<PathBuf>) -> PolarsResult<Self> {
        Ok(Self {
            df: source.load()?,
            config,
            canvas: ChartCanvas::new(chart_dir)?,
            stage: Stage::Loaded,
            encoding: OneHotEncoding::default(),
            prepared: None,
            partition: None,
            pipeline: None,
        })
    }

    /// Load, prepare and split in one go.
    pub fn load_prepared(
        source: &impl Dataset,
        config: ModelingConfig,
        chart_dir: impl Into<PathBuf>,
    ) -> PolarsResult<Self> {
        let mut analysis = Self::new(source, config, chart_dir)?;
        analysis.prepare()?;
        analysis.split()?;
        Ok(analysis)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn data(&self) -> &DataFrame {
        &self.df
    }

    pub fn prepared(&self) -> Option<&PreparedData> {
        self.prepared.as_ref()
    }

    fn require(&self, needed: Stage, operation: &str) -> PolarsResult<()> {
        if self.stage < needed {
            return Err(PolarsError::InvalidOperation(
                format!("`{}` needs the {:?} stage, the analysis is {:?}", operation, needed, self.stage).into(),
            ));
        }
        Ok(())
    }

    fn require_loaded(&self, operation: &str) -> PolarsResult<()> {
        if self.stage != Stage::Loaded {
            return Err(PolarsError::InvalidOperation(
                format!("`{}` edits the raw table and must run before `prepare`", operation).into(),
            ));
        }
        Ok(())
    }

    /// Keeps only rows of one league and/or season.
    pub fn filter_rows(&mut self, league: Option<&str>, season: Option<i64>) -> PolarsResult<()> {
        self.require_loaded("filter_rows")?;
        let mut predicate: Option<Expr> = None;
        if let Some(league) = league {
            ensure_columns(&self.df, &["league"])?;
            predicate = Some(col("league").eq(lit(league)));
        }
        if let Some(season) = season {
            ensure_columns(&self.df, &["season"])?;
            let by_season = col("season").cast(DataType::Int64).eq(lit(season));
            predicate = Some(match predicate {
                Some(p) => p.and(by_season),
                None => by_season,
            });
        }
        let Some(predicate) = predicate else {
            return Ok(());
        };

        let before = self.df.height();
        self.df = self.df.clone().lazy().filter(predicate).collect()?;
        info!("Row filter kept {} of {} rows", self.df.height(), before);
        Ok(())
    }

    /// Adds `out = wins / games` (0 where no games were played).
    pub fn add_winning_percentage(&mut self, wins: &str, games: &str, out: &str) -> PolarsResult<()> {
        self.require_loaded("add_winning_percentage")?;
        let column = winning_percentage_column(&self.df, wins, games, out)?;
        self.df.with_column(column)?;
        Ok(())
    }

    /// Selects and encodes features, coerces them to numbers and drops incomplete rows.
    pub fn prepare(&mut self) -> PolarsResult<()> {
        let spec = &self.config.spec;
        let features = spec.select_columns(&self.df)?;
        let categorical: Vec<String> = spec
            .categorical
            .iter()
            .filter(|c| features.contains(c))
            .cloned()
            .collect();

        let encoding = OneHotEncoding::fit(&self.df, &categorical)?;
        let encoded = encoding.transform(&self.df)?;
        let feature_names = expand_feature_names(&features, &encoding);

        let (target, class_names) = match self.config.task {
            Task::Regression => (column_f64(&encoded, &spec.target)?, Vec::new()),
            Task::Classification => encode_classes(&column_str(&encoded, &spec.target)?),
        };
        let (x, y, dropped_rows) = complete_rows(&encoded, &feature_names, target)?;
        if x.nrows() == 0 {
            return Err(PolarsError::NoData("no complete rows left after preparation".into()));
        }
        info!(
            "Prepared {} rows x {} features for target `{}`",
            x.nrows(),
            x.ncols(),
            spec.target
        );

        self.encoding = encoding;
        self.prepared = Some(PreparedData { feature_names, x, y, class_names, dropped_rows });
        self.partition = None;
        self.pipeline = None;
        self.stage = Stage::Prepared;
        Ok(())
    }

    pub fn split(&mut self) -> PolarsResult<()> {
        self.require(Stage::Prepared, "split")?;
        let Some(prepared) = &self.prepared else {
            return Err(PolarsError::InvalidOperation("nothing prepared to split".into()));
        };
        let split = train_test_indices(prepared.x.nrows(), self.config.test_size, self.config.random_state)?;
        let (x_train, x_test) = split.take(&prepared.x);
        let (y_train, y_test) = split.take(&prepared.y);
        info!("Split into {} training and {} test rows", x_train.nrows(), x_test.nrows());

        self.partition = Some(Partition { x_train, x_test, y_train, y_test });
        self.pipeline = None;
        self.stage = Stage::Split;
        Ok(())
    }

    /// Fits scaler and forest on the training partition; retraining replaces the model.
    pub fn train(&mut self) -> PolarsResult<()> {
        self.require(Stage::Split, "train")?;
        let Some(partition) = &self.partition else {
            return Err(PolarsError::InvalidOperation("no training partition".into()));
        };
        let forest_config = ForestConfig { seed: self.config.random_state, ..self.config.forest.clone() };
        let mut pipeline = Pipeline::new(RandomForest::new(forest_config, self.config.task));
        pipeline.fit(partition.x_train.view(), partition.y_train.view())?;

        self.pipeline = Some(pipeline);
        self.stage = Stage::Trained;
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn evaluate(&mut self) -> PolarsResult<Option<Evaluation>> {
        let (Some(pipeline), Some(partition)) = (&self.pipeline, &self.partition) else {
            report_not_trained("ModelingAnalysis");
            return Ok(None);
        };
        let predictions = pipeline.predict(partition.x_test.view())?;

        let evaluation = match self.config.task {
            Task::Regression => {
                let mse = mean_squared_error(partition.y_test.view(), predictions.view());
                let r2 = r2_score(partition.y_test.view(), predictions.view());
                let points: Vec<(f64, f64)> =
                    partition.y_test.iter().copied().zip(predictions.iter().copied()).collect();
                let predicted_vs_actual = self.canvas.path_for("predicted_vs_actual");
                let target = format!("Actual {}", self.config.spec.target);
                let spec = ScatterSpec {
                    title: "Predicted vs Actual",
                    x_label: &target,
                    y_label: "Predicted",
                    opacity: 0.6,
                    identity_line: true,
                };
                draw_scatter(&predicted_vs_actual, &spec, &points)?;
                let importance_chart = self.draw_importances()?;
                Evaluation::Regression(RegressionEvaluation { mse, r2, predicted_vs_actual, importance_chart })
            }
            Task::Classification => {
                let truth: Vec<usize> = partition.y_test.iter().map(|v| *v as usize).collect();
                let predicted: Vec<usize> = predictions.iter().map(|v| *v as usize).collect();
                let labels = self.prepared.as_ref().map(|p| p.class_names.clone()).unwrap_or_default();
                Evaluation::Classification(ClassificationReport::new(&truth, &predicted, &labels))
            }
        };

        print!("{}", evaluation);
        self.stage = Stage::Evaluated;
        Ok(Some(evaluation))
    }

    fn draw_importances(&self) -> PolarsResult<Option<PathBuf>> {
        let Some(importances) = self.feature_importances() else {
            return Ok(None);
        };
        let selected: Vec<(String, f64)> = importances
            .into_iter()
            .filter(|(name, _)| self.config.importance_columns.contains(name))
            .collect();
        if selected.is_empty() {
            warn!(
                "None of {:?} were used as features, skipping the importance chart",
                self.config.importance_columns
            );
            return Ok(None);
        }
        let path = self.canvas.path_for("feature_importance");
        draw_horizontal_bars(&path, "Feature Importance", "importance", &selected)?;
        Ok(Some(path))
    }

    /// Predictions for a table with the raw (unencoded) feature columns. Classification
    /// predictions are class indices into [`Self::class_names`].
    pub fn predict(&self, df: &DataFrame) -> PolarsResult<Option<Vec<f64>>> {
        let (Some(pipeline), Some(prepared)) = (&self.pipeline, &self.prepared) else {
            report_not_trained("ModelingAnalysis");
            return Ok(None);
        };
        let encoded = self.encoding.transform(df)?;
        let names: Vec<&str> = prepared.feature_names.iter().map(String::as_str).collect();
        let x = frame_to_array(&encoded, &names)?;
        Ok(Some(pipeline.predict(x.view())?.to_vec()))
    }

    /// `(feature, importance)` pairs of the trained forest, summing to 1.
    pub fn feature_importances(&self) -> Option<Vec<(String, f64)>> {
        let pipeline = self.pipeline.as_ref()?;
        let prepared = self.prepared.as_ref()?;
        let importances = pipeline.estimator().feature_importances()?;
        Some(prepared.feature_names.iter().cloned().zip(importances.iter().copied()).collect())
    }

    pub fn class_names(&self) -> &[String] {
        self.prepared.as_ref().map(|p| p.class_names.as_slice()).unwrap_or(&[])
    }
}
