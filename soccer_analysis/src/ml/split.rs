use ndarray::{Array, Axis, Dimension, RemoveAxis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    pub fn take<A: Clone, D: Dimension + RemoveAxis>(&self, data: &Array<A, D>) -> (Array<A, D>, Array<A, D>) {
        (
            data.select(Axis(0), &self.train),
            data.select(Axis(0), &self.test),
        )
    }
}

/// Shuffle `0..n_samples` with a seeded RNG and hold out `ceil(n * test_size)` rows.
/// The same `(n_samples, test_size, seed)` always yields the same partition.
pub fn train_test_indices(n_samples: usize, test_size: f64, seed: u64) -> PolarsResult<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PolarsError::ComputeError(
            format!("test_size must be in (0, 1), got {}", test_size).into(),
        ));
    }
    let n_test = (n_samples as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(PolarsError::ComputeError(
            format!(
                "cannot split {} rows with test_size {}: one partition would be empty",
                n_samples, test_size
            )
            .into(),
        ));
    }

    let mut order: Vec<usize> = (0..n_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train = order.split_off(n_test);
    Ok(TrainTestSplit { train, test: order })
}
