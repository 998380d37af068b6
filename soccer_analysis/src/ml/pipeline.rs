use ndarray::{Array1, ArrayView1, ArrayView2};
use polars::prelude::*;
use tracing::debug;

use super::scaler::StandardScaler;
use super::Estimator;

/// Scaling stage followed by an estimator, fitted jointly on the training partition.
/// The scaler only ever sees training rows, so test rows are transformed with training
/// statistics.
#[derive(Debug, Clone)]
pub struct Pipeline<E> {
    scaler: Option<StandardScaler>,
    estimator: E,
}

impl<E: Estimator> Pipeline<E> {
    pub fn new(estimator: E) -> Self {
        Self { scaler: None, estimator }
    }

    pub fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> PolarsResult<()> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x)?;
        debug!("Scaler fitted on {} rows", x.nrows());
        self.estimator.fit(scaled.view(), y)?;
        self.scaler = Some(scaler);
        Ok(())
    }

    pub fn predict(&self, x: ArrayView2<f64>) -> PolarsResult<Array1<f64>> {
        let scaler = self
            .scaler
            .as_ref()
            .ok_or_else(|| PolarsError::InvalidOperation("pipeline has not been fitted".into()))?;
        let scaled = scaler.transform(x)?;
        self.estimator.predict(scaled.view())
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    /// The inner estimator, e.g. for feature importances.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::linear::LinearRegressor;
    use ndarray::array;

    #[test]
    fn scaling_is_transparent_to_linear_predictions() {
        let x = array![[10.0, 100.0], [20.0, 300.0], [30.0, 200.0], [40.0, 500.0]];
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| 0.5 * v);
        let mut pipeline = Pipeline::new(LinearRegressor::new());
        assert!(pipeline.predict(x.view()).is_err());

        pipeline.fit(x.view(), y.view()).unwrap();
        assert!(pipeline.is_fitted());
        let pred = pipeline.predict(array![[50.0, 400.0]].view()).unwrap();
        assert!((pred[0] - 300.0).abs() < 1e-6);
        assert_eq!(pipeline.scaler().unwrap().means()[0], 25.0);
    }
}
