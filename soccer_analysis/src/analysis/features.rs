//! Row-wise derived columns and the feature/target preparation shared by the modeling steps.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::helper_functions::{column_f64, column_str, ensure_columns, has_column, string_column_names};

pub const RESULT_COLUMN: &str = "result";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl Outcome {
    pub fn from_scores(home: f64, away: f64) -> Self {
        match home.partial_cmp(&away) {
            Some(Ordering::Greater) => Outcome::HomeWin,
            Some(Ordering::Less) => Outcome::AwayWin,
            _ => Outcome::Draw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::HomeWin => "home win",
            Outcome::AwayWin => "away win",
            Outcome::Draw => "draw",
        }
    }
}

/// Outcome label per row; null where either score is missing (fixtures not yet played).
pub fn outcome_labels(df: &DataFrame, home: &str, away: &str) -> PolarsResult<Series> {
    ensure_columns(df, &[home, away])?;
    let labels: Vec<Option<&str>> = column_f64(df, home)?
        .into_iter()
        .zip(column_f64(df, away)?)
        .map(|scores| match scores {
            (Some(h), Some(a)) => Some(Outcome::from_scores(h, a).label()),
            _ => None,
        })
        .collect();
    Ok(Series::new(PlSmallStr::from(RESULT_COLUMN), labels))
}

/// `wins / games`, defined as 0 when no games were played.
pub fn win_percentage(wins: f64, games: f64) -> f64 {
    if games == 0.0 {
        0.0
    } else {
        wins / games
    }
}

pub fn winning_percentage_column(
    df: &DataFrame,
    wins: &str,
    games: &str,
    out: &str,
) -> PolarsResult<Series> {
    ensure_columns(df, &[wins, games])?;
    let values: Vec<Option<f64>> = column_f64(df, wins)?
        .into_iter()
        .zip(column_f64(df, games)?)
        .map(|pair| match pair {
            (Some(w), Some(g)) => Some(win_percentage(w, g)),
            _ => None,
        })
        .collect();
    Ok(Series::new(PlSmallStr::from(out), values))
}

/// Which columns feed the estimator and which one it predicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSpec {
    pub target: String,
    /// Explicit feature list; `None` takes every remaining column.
    pub features: Option<Vec<String>>,
    /// Removed from the feature set when present in the table.
    pub drop_columns: Vec<String>,
    /// String columns to one-hot encode. Other string columns join the default feature
    /// set only when most of their values parse as numbers.
    pub categorical: Vec<String>,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            target: "spi".to_string(),
            features: None,
            drop_columns: ["rank", "prev_rank", "name", "league"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categorical: Vec::new(),
        }
    }
}

impl FeatureSpec {
    /// Feature column names as they appear in the table, before encoding.
    pub fn select_columns(&self, df: &DataFrame) -> PolarsResult<Vec<String>> {
        ensure_columns(df, &[self.target.as_str()])?;
        for name in self.drop_columns.iter().filter(|c| !has_column(df, c)) {
            debug!("Drop column `{}` not present, skipping", name);
        }

        if let Some(features) = &self.features {
            let refs: Vec<&str> = features.iter().map(String::as_str).collect();
            ensure_columns(df, &refs)?;
            return Ok(features.iter().filter(|f| **f != self.target).cloned().collect());
        }

        let strings = string_column_names(df);
        let mut selected = Vec::new();
        for column in df.get_column_names() {
            let name = column.as_str();
            if name == self.target || self.drop_columns.iter().any(|d| d == name) {
                continue;
            }
            if strings.iter().any(|s| s == name) && !self.categorical.iter().any(|c| c == name) {
                if !mostly_numeric(df, name)? {
                    warn!("String column `{}` is not declared categorical, leaving it out", name);
                    continue;
                }
                info!("Coercing `{}` to numbers, unparsable values become missing", name);
            }
            selected.push(name.to_string());
        }
        Ok(selected)
    }
}

/// True when more than half of the non-missing values parse as `f64`, e.g. a numeric
/// column the CSV reader typed as text because of a stray `n/a`.
fn mostly_numeric(df: &DataFrame, name: &str) -> PolarsResult<bool> {
    let values = column_str(df, name)?;
    let (present, parsed) = values.iter().flatten().fold((0usize, 0usize), |(present, parsed), v| {
        (present + 1, parsed + usize::from(v.trim().parse::<f64>().is_ok()))
    });
    Ok(present > 0 && parsed * 2 > present)
}

/// Category levels learned from the training table, applied identically to later tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OneHotEncoding {
    levels: Vec<(String, Vec<String>)>,
}

impl OneHotEncoding {
    pub fn fit(df: &DataFrame, columns: &[String]) -> PolarsResult<Self> {
        let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        ensure_columns(df, &refs)?;
        let levels = columns
            .iter()
            .map(|name| {
                let values: BTreeSet<String> = column_str(df, name)?.into_iter().flatten().collect();
                debug!("`{}` has {} levels", name, values.len());
                Ok((name.clone(), values.into_iter().collect()))
            })
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(Self { levels })
    }

    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(|(name, _)| name.as_str())
    }

    /// Indicator names for one source column, `{column}_{level}`.
    pub fn encoded_names(&self, column: &str) -> Vec<String> {
        self.levels
            .iter()
            .filter(|(name, _)| name == column)
            .flat_map(|(name, levels)| levels.iter().map(move |l| format!("{}_{}", name, l)))
            .collect()
    }

    /// Replaces every encoded source column by `0/1` indicator columns. Missing values and
    /// levels unseen during `fit` get zeros everywhere.
    pub fn transform(&self, df: &DataFrame) -> PolarsResult<DataFrame> {
        let mut out = df.clone();
        for (name, levels) in &self.levels {
            ensure_columns(&out, &[name.as_str()])?;
            let values = column_str(&out, name)?;
            out = out.drop(name)?;
            for level in levels {
                let indicator: Vec<f64> = values
                    .iter()
                    .map(|v| if v.as_deref() == Some(level.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                out.with_column(Series::new(PlSmallStr::from(format!("{}_{}", name, level)), indicator))?;
            }
        }
        Ok(out)
    }
}

/// Column names after encoding: categorical sources expand in place into their indicators.
pub fn expand_feature_names(features: &[String], encoding: &OneHotEncoding) -> Vec<String> {
    features
        .iter()
        .flat_map(|f| {
            if encoding.source_columns().any(|s| s == f) {
                encoding.encoded_names(f)
            } else {
                vec![f.clone()]
            }
        })
        .collect()
}

/// Orders numeric-looking labels by value and everything else lexicographically.
fn class_order(a: &String, b: &String) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

/// Maps labels to class indices following the sorted class names.
pub fn encode_classes(labels: &[Option<String>]) -> (Vec<Option<f64>>, Vec<String>) {
    let mut names: Vec<String> = labels
        .iter()
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    names.sort_by(class_order);
    let encoded = labels
        .iter()
        .map(|label| {
            label
                .as_ref()
                .and_then(|l| names.iter().position(|n| n == l))
                .map(|idx| idx as f64)
        })
        .collect();
    (encoded, names)
}

/// Dense feature matrix and target vector over the rows where nothing is missing.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
    /// Sorted class labels when the target was encoded for classification.
    pub class_names: Vec<String>,
    pub dropped_rows: usize,
}

/// Keeps rows whose features and target are all present. `target` must have the table's
/// height.
pub fn complete_rows(
    df: &DataFrame,
    features: &[String],
    target: Vec<Option<f64>>,
) -> PolarsResult<(Array2<f64>, Array1<f64>, usize)> {
    if target.len() != df.height() {
        return Err(PolarsError::ShapeMismatch(
            format!("target has {} rows, table has {}", target.len(), df.height()).into(),
        ));
    }
    let columns: Vec<Vec<Option<f64>>> = features
        .iter()
        .map(|name| column_f64(df, name))
        .collect::<PolarsResult<_>>()?;

    let keep: Vec<usize> = (0..df.height())
        .filter(|&i| target[i].is_some() && columns.iter().all(|c| c[i].is_some()))
        .collect();

    let mut x = Array2::<f64>::zeros((keep.len(), features.len()));
    let mut y = Array1::<f64>::zeros(keep.len());
    for (row, &i) in keep.iter().enumerate() {
        for (j, column) in columns.iter().enumerate() {
            x[[row, j]] = column[i].unwrap_or(f64::NAN);
        }
        y[row] = target[i].unwrap_or(f64::NAN);
    }

    let dropped = df.height() - keep.len();
    if dropped > 0 {
        info!("Dropped {} of {} rows with missing values", dropped, df.height());
    }
    Ok((x, y, dropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn labels_follow_score_comparison() {
        let df = df![
            "score1" => [Some(1.0), Some(2.0), Some(1.0), None],
            "score2" => [Some(2.0), Some(1.0), Some(1.0), Some(0.0)]
        ]
        .unwrap();
        let labels = outcome_labels(&df, "score1", "score2").unwrap();
        assert_eq!(labels.len(), df.height());
        let got: Vec<Option<&str>> = labels.str().unwrap().into_iter().collect();
        assert_eq!(got, vec![Some("away win"), Some("home win"), Some("draw"), None]);
    }

    #[test]
    fn win_percentage_handles_zero_games() {
        assert_eq!(win_percentage(0.0, 0.0), 0.0);
        assert_eq!(win_percentage(3.0, 0.0), 0.0);
        assert!((win_percentage(4.0, 10.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn default_selection_filters_existing_columns() {
        let df = df![
            "rank" => [1i64, 2],
            "prev_rank" => [2i64, 1],
            "name" => ["A", "B"],
            "league" => ["X", "Y"],
            "spi" => [80.0, 70.0],
            "off" => [2.5, 2.0],
            "def" => [0.5, 0.7]
        ]
        .unwrap();
        let selected = FeatureSpec::default().select_columns(&df).unwrap();
        assert_eq!(selected, vec!["off".to_string(), "def".to_string()]);

        let spec = FeatureSpec { target: "missing".into(), ..FeatureSpec::default() };
        assert!(spec.select_columns(&df).is_err());
    }

    #[test]
    fn uncategorised_strings_are_left_out() {
        let df = df!["spi" => [1.0, 2.0], "team" => ["a", "b"], "off" => [0.1, 0.2]].unwrap();
        let spec = FeatureSpec { drop_columns: Vec::new(), ..FeatureSpec::default() };
        assert_eq!(spec.select_columns(&df).unwrap(), vec!["off".to_string()]);

        let spec = FeatureSpec { categorical: vec!["team".into()], ..spec };
        assert_eq!(spec.select_columns(&df).unwrap(), vec!["team".to_string(), "off".to_string()]);
    }

    #[test]
    fn numbers_typed_as_text_stay_features() {
        let df = df![
            "spi" => [1.0, 2.0, 3.0],
            "off" => ["1.5", "n/a", "2.5"],
            "team" => ["a", "b", "c"]
        ]
        .unwrap();
        let spec = FeatureSpec { drop_columns: Vec::new(), ..FeatureSpec::default() };
        let selected = spec.select_columns(&df).unwrap();
        assert_eq!(selected, vec!["off".to_string()]);

        let (x, _, dropped) = complete_rows(&df, &selected, column_f64(&df, "spi").unwrap()).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(x.column(0).to_vec(), vec![1.5, 2.5]);
    }

    #[test]
    fn one_hot_uses_training_levels() {
        let train = df!["league" => ["EPL", "MLS", "EPL"], "spi" => [1.0, 2.0, 3.0]].unwrap();
        let enc = OneHotEncoding::fit(&train, &["league".to_string()]).unwrap();
        assert_eq!(enc.encoded_names("league"), vec!["league_EPL", "league_MLS"]);

        let later = df!["league" => [Some("MLS"), Some("Serie A"), None], "spi" => [4.0, 5.0, 6.0]].unwrap();
        let out = enc.transform(&later).unwrap();
        assert!(!has_column(&out, "league"));
        assert_eq!(column_f64(&out, "league_MLS").unwrap(), vec![Some(1.0), Some(0.0), Some(0.0)]);
        assert_eq!(column_f64(&out, "league_EPL").unwrap(), vec![Some(0.0); 3]);

        let names = expand_feature_names(&["league".into(), "spi".into()], &enc);
        assert_eq!(names, vec!["league_EPL", "league_MLS", "spi"]);
    }

    #[test]
    fn classes_sort_numerically_when_possible() {
        let labels = vec![Some("10".to_string()), Some("2".to_string()), None, Some("2".to_string())];
        let (encoded, names) = encode_classes(&labels);
        assert_eq!(names, vec!["2", "10"]);
        assert_eq!(encoded, vec![Some(1.0), Some(0.0), None, Some(0.0)]);
    }

    #[test]
    fn incomplete_rows_are_dropped_together() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "b" => ["x", "0.5", "1.5", "2.5"]
        ]
        .unwrap();
        let target = vec![Some(10.0), Some(20.0), Some(30.0), None];
        let (x, y, dropped) = complete_rows(&df, &["a".into(), "b".into()], target).unwrap();
        assert_eq!(dropped, 3);
        assert_eq!(x.nrows(), y.len());
        assert_eq!(x.nrows(), 1);
        assert_eq!(x[[0, 1]], 1.5);
        assert_eq!(y[0], 30.0);
    }
}
