use std::error::Error;

use polars::prelude::*;

/// A tabular source the analysis components can load their own copy of the table from.
pub trait Dataset {
    fn load(&self) -> PolarsResult<DataFrame>;
}

/// Wrap a foreign error (plotting, HTTP, estimators, io) into the polars error used crate-wide.
pub fn polars_err(e: Box<dyn Error>) -> PolarsError {
    PolarsError::ComputeError(format!("{}", e).into())
}

/// Guard for "model not fitted yet"; callers get `None` instead of an error.
pub fn report_not_trained(component: &str) {
    tracing::warn!("{}: prediction requested before training", component);
    println!("Model not trained. Call the training step first.");
}
