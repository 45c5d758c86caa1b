use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kb_tensor::{Matrix, Vector};

use crate::error::ConfigError;

fn uniform(count: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// A `rows` x `cols` matrix of values drawn uniformly from [-1, 1).
pub fn random_matrix(rows: usize, cols: usize, seed: u64) -> Result<Matrix, ConfigError> {
    if rows == 0 {
        return Err(ConfigError::EmptyShape { name: "--rows" });
    }
    if cols == 0 {
        return Err(ConfigError::EmptyShape { name: "--cols" });
    }
    let count = rows
        .checked_mul(cols)
        .ok_or(ConfigError::TooLarge { rows, cols })?;
    Matrix::new(rows, cols, uniform(count, seed)).map_err(|_| ConfigError::TooLarge { rows, cols })
}

/// A vector of `len` values drawn uniformly from [-1, 1).
pub fn random_vector(len: usize, seed: u64) -> Result<Vector, ConfigError> {
    if len == 0 {
        return Err(ConfigError::EmptyShape { name: "--len" });
    }
    Ok(Vector::new(uniform(len, seed)))
}
