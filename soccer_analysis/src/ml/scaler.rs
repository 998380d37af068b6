use ndarray::{Array1, Array2, ArrayView2, Axis};
use polars::prelude::*;
use tracing::debug;

/// Per-column z-scoring with parameters learned from the training partition only.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Array1<f64>,
    stds: Array1<f64>,
}

impl StandardScaler {
    /// Population mean / standard deviation per column. Constant columns get a scale of 1.
    pub fn fit(x: ArrayView2<f64>) -> PolarsResult<Self> {
        if x.nrows() == 0 {
            return Err(PolarsError::ComputeError("cannot fit a scaler on zero rows".into()));
        }
        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| PolarsError::ComputeError("empty feature matrix".into()))?;
        let stds = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });

        for (j, (m, s)) in means.iter().zip(stds.iter()).enumerate() {
            debug!("feature {:>3}  μ = {:>10.6},  σ = {:>10.6}", j, m, s);
        }
        Ok(Self { means, stds })
    }

    pub fn transform(&self, x: ArrayView2<f64>) -> PolarsResult<Array2<f64>> {
        if x.ncols() != self.means.len() {
            return Err(PolarsError::ShapeMismatch(
                format!(
                    "scaler was fitted on {} features, got {}",
                    self.means.len(),
                    x.ncols()
                )
                .into(),
            ));
        }
        Ok((&x - &self.means) / &self.stds)
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn training_columns_become_zero_mean_unit_variance() {
        let x = array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0]];
        let scaler = StandardScaler::fit(x.view()).unwrap();
        let z = scaler.transform(x.view()).unwrap();

        let col = z.column(0);
        assert!(col.sum().abs() < 1e-12);
        assert!((col.std(0.0) - 1.0).abs() < 1e-12);
        // constant column is centred, not divided by zero
        assert!(z.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_rows_use_training_parameters() {
        let train = array![[0.0], [2.0]];
        let scaler = StandardScaler::fit(train.view()).unwrap();
        let z = scaler.transform(array![[4.0]].view()).unwrap();
        assert!((z[[0, 0]] - 3.0).abs() < 1e-12);
        assert!(scaler.transform(array![[1.0, 2.0]].view()).is_err());
    }
}
