//! Evaluation metrics.

use std::fmt;

use ndarray::{ArrayView1, ArrayView2, Axis};

pub fn mean_squared_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let diff = &y_true - &y_pred;
    diff.mapv(|d| d * d).sum() / y_true.len() as f64
}

/// MSE per target column, averaged uniformly over the targets.
pub fn mean_squared_error_multi(y_true: ArrayView2<f64>, y_pred: ArrayView2<f64>) -> f64 {
    let per_target: Vec<f64> = y_true
        .axis_iter(Axis(1))
        .zip(y_pred.axis_iter(Axis(1)))
        .map(|(t, p)| mean_squared_error(t, p))
        .collect();
    if per_target.is_empty() {
        return 0.0;
    }
    per_target.iter().sum::<f64>() / per_target.len() as f64
}

/// Coefficient of determination. A constant target scores 1 when predicted exactly, else 0.
pub fn r2_score(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) }
}

impl ClassificationReport {
    /// Per-class precision/recall/F1. Undefined ratios (no predictions or no support) are 0.
    pub fn new(y_true: &[usize], y_pred: &[usize], labels: &[String]) -> Self {
        let classes: Vec<ClassScores> = labels
            .iter()
            .enumerate()
            .map(|(k, label)| {
                let tp = y_true.iter().zip(y_pred).filter(|(t, p)| **t == k && **p == k).count();
                let predicted = y_pred.iter().filter(|p| **p == k).count();
                let support = y_true.iter().filter(|t| **t == k).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                ClassScores { label: label.clone(), precision, recall, f1: f1(precision, recall), support }
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let n = classes.len().max(1) as f64;
        let macro_avg = ClassScores {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
            support: total,
        };
        let weight = |f: fn(&ClassScores) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = ClassScores {
            label: "weighted avg".to_string(),
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1: weight(|c| c.f1),
            support: total,
        };

        Self { classes, accuracy: accuracy(y_true, y_pred), macro_avg, weighted_avg }
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, c: &ClassScores, width: usize) -> fmt::Result {
    writeln!(
        f,
        "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
        c.label, c.precision, c.recall, c.f1, c.support, width = width
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(f, "{:>width$} {:>10} {:>10} {:>10} {:>10}", "", "precision", "recall", "f1-score", "support", width = width)?;
        writeln!(f)?;
        for c in &self.classes {
            write_row(f, c, width)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support, width = width
        )?;
        write_row(f, &self.macro_avg, width)?;
        write_row(f, &self.weighted_avg, width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn regression_metrics() {
        let t = array![1.0, 2.0, 3.0];
        let p = array![1.0, 2.0, 5.0];
        assert!((mean_squared_error(t.view(), p.view()) - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(r2_score(t.view(), t.view()), 1.0);
        assert!((r2_score(t.view(), p.view()) - (1.0 - 4.0 / 2.0)).abs() < 1e-12);

        let t2 = array![[1.0, 0.0], [2.0, 0.0]];
        let p2 = array![[1.0, 2.0], [2.0, 0.0]];
        assert!((mean_squared_error_multi(t2.view(), p2.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn report_matches_hand_counts() {
        let labels = vec!["away win".to_string(), "draw".to_string(), "home win".to_string()];
        let y_true = [0, 0, 1, 2, 2, 2];
        let y_pred = [0, 2, 1, 2, 2, 0];
        let report = ClassificationReport::new(&y_true, &y_pred, &labels);

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        let away = &report.classes[0];
        assert!((away.precision - 0.5).abs() < 1e-12);
        assert!((away.recall - 0.5).abs() < 1e-12);
        assert_eq!(away.support, 2);
        let home = &report.classes[2];
        assert!((home.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((home.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.weighted_avg.support, 6);

        let text = report.to_string();
        assert!(text.contains("home win"));
        assert!(text.contains("weighted avg"));
    }

    #[test]
    fn class_never_predicted_scores_zero_precision() {
        let labels = vec!["a".to_string(), "b".to_string()];
        let report = ClassificationReport::new(&[0, 1], &[0, 0], &labels);
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
    }
}
