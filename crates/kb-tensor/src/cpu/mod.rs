pub mod matmul;
pub mod vector;

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{Result, TensorError};
use crate::executor::{Executor, ThreadPerCall};
use crate::tensor::{Matrix, Vector};

/// Default matmul tile width used by the benchmark harness.
pub const DEFAULT_TILE: i32 = 64;

/// Per-call kernel configuration.
///
/// `workers <= 0` is treated as one worker. `tile <= 0` disables blocking in
/// matrix-matrix multiplication; other kernels ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub workers: i32,
    pub tile: i32,
}

impl KernelConfig {
    pub fn new(workers: i32, tile: i32) -> Self {
        KernelConfig { workers, tile }
    }

    /// Same configuration with a different worker count.
    pub fn with_workers(self, workers: i32) -> Self {
        KernelConfig { workers, ..self }
    }

    /// Normalized worker count, at least 1.
    pub fn worker_count(&self) -> usize {
        normalize_workers(self.workers)
    }

    /// Tile width, or `None` for the unblocked loop order.
    pub fn tile_size(&self) -> Option<usize> {
        usize::try_from(self.tile).ok().filter(|&t| t > 0)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            workers: 1,
            tile: DEFAULT_TILE,
        }
    }
}

pub(crate) fn normalize_workers(requested: i32) -> usize {
    usize::try_from(requested).ok().filter(|&n| n > 0).unwrap_or(1)
}

pub(crate) fn require_matrix(op: &'static str, name: &str, m: &Matrix) -> Result<()> {
    if m.is_allocated() {
        Ok(())
    } else {
        Err(TensorError::InvalidInput(format!(
            "{op}: matrix {name} ({}x{}) has no backing storage",
            m.rows(),
            m.cols()
        )))
    }
}

pub(crate) fn require_vector(op: &'static str, name: &str, v: &Vector) -> Result<()> {
    if v.is_allocated() {
        Ok(())
    } else {
        Err(TensorError::InvalidInput(format!(
            "{op}: vector {name} has no backing storage"
        )))
    }
}

/// Parallel CPU kernels.
///
/// Each call partitions its rows or elements statically across the requested
/// number of workers, runs them on the configured executor, and returns only
/// after every worker has been joined. Workers poll the cancel token once per
/// row (or element) and stop early when it is set; the call then reports
/// `Interrupted` and its outputs must be discarded.
#[derive(Debug, Clone)]
pub struct CpuKernels {
    executor: Arc<dyn Executor>,
    cancel: CancelToken,
}

impl CpuKernels {
    /// Kernels that spawn fresh threads for every call.
    pub fn new(cancel: CancelToken) -> Self {
        Self::with_executor(Arc::new(ThreadPerCall::new()), cancel)
    }

    pub fn with_executor(executor: Arc<dyn Executor>, cancel: CancelToken) -> Self {
        CpuKernels { executor, cancel }
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// y = A·x.
    ///
    /// - `a`: [rows, cols]
    /// - `x`: length `cols`
    /// - `y`: length `rows`, overwritten
    pub fn mat_vec(&self, a: &Matrix, x: &Vector, y: &mut Vector, cfg: KernelConfig) -> Result<()> {
        matmul::mat_vec(a, x, y, cfg.worker_count(), self.executor(), &self.cancel)
    }

    /// C = A·B, optionally cache-tiled.
    ///
    /// - `a`: [m, k]
    /// - `b`: [k, n]
    /// - `c`: [m, n], zero-filled then accumulated
    pub fn mat_mat(&self, a: &Matrix, b: &Matrix, c: &mut Matrix, cfg: KernelConfig) -> Result<()> {
        matmul::mat_mat(
            a,
            b,
            c,
            cfg.worker_count(),
            cfg.tile_size(),
            self.executor(),
            &self.cancel,
        )
    }

    /// Returns sum(x[i] * y[i]), reduced from per-worker partial sums in
    /// worker order.
    pub fn dot(&self, x: &Vector, y: &Vector, workers: i32) -> Result<f64> {
        vector::dot(x, y, normalize_workers(workers), self.executor(), &self.cancel)
    }

    /// y[i] = alpha * x[i] + y[i], in place.
    pub fn axpy(&self, alpha: f64, x: &Vector, y: &mut Vector, workers: i32) -> Result<()> {
        vector::axpy(alpha, x, y, normalize_workers(workers), self.executor(), &self.cancel)
    }
}

impl Default for CpuKernels {
    fn default() -> Self {
        Self::new(CancelToken::never())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernels() -> CpuKernels {
        CpuKernels::default()
    }

    fn mat(rows: &[Vec<f64>]) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_config_normalization() {
        assert_eq!(KernelConfig::new(0, 0).worker_count(), 1);
        assert_eq!(KernelConfig::new(-3, 8).worker_count(), 1);
        assert_eq!(KernelConfig::new(6, 8).worker_count(), 6);
        assert_eq!(KernelConfig::new(1, -1).tile_size(), None);
        assert_eq!(KernelConfig::new(1, 0).tile_size(), None);
        assert_eq!(KernelConfig::new(1, 32).tile_size(), Some(32));
        assert_eq!(KernelConfig::default().with_workers(4), KernelConfig::new(4, DEFAULT_TILE));
    }

    #[test]
    fn test_mat_mat_scenario() {
        let a = mat(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let b = mat(&[vec![7.0, 8.0], vec![9.0, 10.0], vec![11.0, 12.0]]);
        for workers in [1, 4] {
            for tile in [0, 1, 2, 64] {
                let mut c = Matrix::zeros(2, 2);
                kernels()
                    .mat_mat(&a, &b, &mut c, KernelConfig::new(workers, tile))
                    .unwrap();
                assert_eq!(c.data(), &[58.0, 64.0, 139.0, 154.0], "workers={workers} tile={tile}");
            }
        }
    }

    #[test]
    fn test_mat_vec_basic() {
        let a = mat(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        let x = Vector::from(vec![1.0, -1.0]);
        let mut y = Vector::zeros(3);
        kernels().mat_vec(&a, &x, &mut y, KernelConfig::new(2, 0)).unwrap();
        assert_eq!(y.data(), &[-1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_dot_scenario() {
        let x = Vector::from(vec![1.0, 2.0, 3.0]);
        let y = Vector::from(vec![4.0, 5.0, 6.0]);
        for workers in [1, 2, 3] {
            assert_eq!(kernels().dot(&x, &y, workers).unwrap(), 32.0);
        }
    }

    #[test]
    fn test_axpy_scenario() {
        let x = Vector::from(vec![1.0, 1.0, 1.0]);
        let mut y = Vector::from(vec![1.0, 1.0, 1.0]);
        kernels().axpy(2.0, &x, &mut y, 2).unwrap();
        assert_eq!(y.data(), &[3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_unallocated_inputs_rejected() {
        let k = kernels();
        let a = Matrix::default();
        let mut y = Vector::zeros(2);
        let err = k
            .mat_vec(&a, &Vector::zeros(2), &mut y, KernelConfig::default())
            .unwrap_err();
        assert!(matches!(err, TensorError::InvalidInput(_)));

        let empty = Vector::default();
        assert!(matches!(
            k.dot(&empty, &empty, 1),
            Err(TensorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_cancelled_before_call() {
        let k = CpuKernels::new(CancelToken::cancelled());
        let x = Vector::from(vec![1.0; 1000]);
        let mut y = Vector::from(vec![5.0; 1000]);
        let err = k.axpy(1.0, &x, &mut y, 4).unwrap_err();
        assert!(err.is_interrupted());
        // Workers stop before touching their first element.
        assert!(y.data().iter().all(|&v| v == 5.0));
    }
}
