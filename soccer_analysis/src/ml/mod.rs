//! Estimators and the plumbing around them: split, scaling, pipeline, metrics.

use ndarray::{Array1, ArrayView1, ArrayView2};
use polars::prelude::PolarsResult;
use serde::{Deserialize, Serialize};

pub mod forest;
pub mod linear;
pub mod metrics;
pub mod pipeline;
pub mod scaler;
pub mod split;
pub mod tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    Regression,
    /// Targets are class indices `0..n_classes` stored as `f64`.
    Classification,
}

/// The estimator stage of a [`pipeline::Pipeline`].
pub trait Estimator {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> PolarsResult<()>;

    fn predict(&self, x: ArrayView2<f64>) -> PolarsResult<Array1<f64>>;

    /// Normalised per-feature importances, for estimators that track them.
    fn feature_importances(&self) -> Option<&[f64]> {
        None
    }
}
