//! Seeded train/holdout partitioning.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::common::error::{StuntingError, StuntingResult};

/// Row indices of each partition, in shuffled order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Partition `n` rows: `ceil(n * test_size)` go to the holdout, the rest to
/// training. The same `n`, `test_size` and `seed` always give the same split.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> StuntingResult<Split> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(StuntingError::invalid_config(format!(
            "test size must be within (0, 1), got {test_size}"
        )));
    }

    // The epsilon keeps e.g. 0.2 * 110 from rounding up to 23.
    let n_test = ((n as f64) * test_size - 1e-9).ceil().max(0.0) as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(StuntingError::fit(format!(
            "corpus of {n} rows is too small for a {test_size} holdout"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);

    Ok(Split {
        train,
        holdout: indices,
    })
}
