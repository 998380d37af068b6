//! Ordinary least squares via `linfa-linear`, one fitted model per target column.

use linfa::traits::{Fit, Predict};
use linfa_linear::{FittedLinearRegression, LinearRegression};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use polars::prelude::*;
use tracing::info;

use super::Estimator;
use crate::models::polars_err;

fn fit_ols(x: ArrayView2<f64>, y: ArrayView1<f64>) -> PolarsResult<FittedLinearRegression<f64>> {
    let dataset = linfa::Dataset::new(x.to_owned(), y.to_owned());
    LinearRegression::new()
        .fit(&dataset)
        .map_err(|e| polars_err(Box::new(e)))
}

/// Single-target OLS usable as a pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct LinearRegressor {
    fitted: Option<FittedLinearRegression<f64>>,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn coefficients(&self) -> Option<(&Array1<f64>, f64)> {
        self.fitted.as_ref().map(|m| (m.params(), m.intercept()))
    }
}

impl Estimator for LinearRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> PolarsResult<()> {
        self.fitted = Some(fit_ols(x, y)?);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> PolarsResult<Array1<f64>> {
        let model = self
            .fitted
            .as_ref()
            .ok_or_else(|| PolarsError::InvalidOperation("linear model has not been fitted".into()))?;
        Ok(model.predict(&x))
    }
}

/// Independent OLS fits sharing one design matrix, one per target column.
#[derive(Debug, Clone)]
pub struct MultiTargetLinear {
    targets: Vec<String>,
    models: Vec<FittedLinearRegression<f64>>,
}

impl MultiTargetLinear {
    pub fn fit(x: ArrayView2<f64>, y: ArrayView2<f64>, targets: &[String]) -> PolarsResult<Self> {
        if y.ncols() != targets.len() {
            return Err(PolarsError::ShapeMismatch(
                format!("{} target columns but {} names", y.ncols(), targets.len()).into(),
            ));
        }
        let models = y
            .columns()
            .into_iter()
            .zip(targets)
            .map(|(column, name)| {
                let model = fit_ols(x, column)?;
                info!("{:<12} intercept {:>8.4}  coefficients {:?}", name, model.intercept(), model.params().to_vec());
                Ok(model)
            })
            .collect::<PolarsResult<Vec<_>>>()?;

        Ok(Self { targets: targets.to_vec(), models })
    }

    /// `rows × targets` predictions.
    pub fn predict(&self, x: ArrayView2<f64>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((x.nrows(), self.models.len()));
        for (j, model) in self.models.iter().enumerate() {
            let column: Array1<f64> = model.predict(&x);
            out.column_mut(j).assign(&column);
        }
        out
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}
