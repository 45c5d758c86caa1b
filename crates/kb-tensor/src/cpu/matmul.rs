// Matrix kernels: matrix-vector and (optionally tiled) matrix-matrix products.
//
// Both partition output rows across workers. Each worker owns a contiguous
// band of output rows and writes nothing else.

use std::ops::Range;

use crate::cancel::CancelToken;
use crate::cpu::{require_matrix, require_vector};
use crate::error::{Result, TensorError};
use crate::executor::{dispatch, job_array, Executor, WorkerJob};
use crate::partition::{partition, split_rows_mut};
use crate::tensor::{Matrix, Vector};

struct MatVecJob<'a> {
    a: &'a Matrix,
    x: &'a [f64],
    y: &'a mut [f64],
    rows: Range<usize>,
    cancel: &'a CancelToken,
}

impl WorkerJob for MatVecJob<'_> {
    fn run(self) {
        for (out, i) in self.y.iter_mut().zip(self.rows) {
            if self.cancel.is_cancelled() {
                break;
            }
            let mut sum = 0.0;
            for (a_ik, x_k) in self.a.row(i).iter().zip(self.x) {
                sum += a_ik * x_k;
            }
            *out = sum;
        }
    }
}

pub(crate) fn mat_vec(
    a: &Matrix,
    x: &Vector,
    y: &mut Vector,
    workers: usize,
    executor: &dyn Executor,
    cancel: &CancelToken,
) -> Result<()> {
    const OP: &str = "mat_vec";
    require_matrix(OP, "A", a)?;
    require_vector(OP, "x", x)?;
    require_vector(OP, "y", y)?;
    if a.cols() != x.len() || a.rows() != y.len() {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            expected: vec![a.rows(), a.cols()],
            got: vec![y.len(), x.len()],
        });
    }

    log::debug!("{OP}: {}x{} on {workers} workers", a.rows(), a.cols());
    let ranges = partition(a.rows(), workers);
    let mut jobs = job_array(workers)?;
    for (rows, y) in ranges.iter().zip(split_rows_mut(y.data_mut(), &ranges, 1)) {
        jobs.push(MatVecJob {
            a,
            x: x.data(),
            y,
            rows: rows.clone(),
            cancel,
        });
    }
    dispatch(OP, executor, jobs)?;
    cancel.check(OP)
}

struct MatMatJob<'a> {
    a: &'a Matrix,
    b: &'a Matrix,
    c: &'a mut [f64],
    rows: Range<usize>,
    tile: Option<usize>,
    cancel: &'a CancelToken,
}

impl WorkerJob for MatMatJob<'_> {
    fn run(self) {
        let n = self.b.cols();
        let b = self.b.data();
        for (i, c_row) in self.rows.zip(self.c.chunks_exact_mut(n)) {
            if self.cancel.is_cancelled() {
                break;
            }
            let a_row = self.a.row(i);
            match self.tile {
                None => accumulate_row(a_row, b, n, c_row),
                Some(t) => accumulate_row_tiled(a_row, b, n, c_row, t),
            }
        }
    }
}

/// c_row += a_row · B, one full row of B per k.
pub fn accumulate_row(a_row: &[f64], b: &[f64], n: usize, c_row: &mut [f64]) {
    for (k, &a_ik) in a_row.iter().enumerate() {
        let b_row = &b[k * n..(k + 1) * n];
        for (c, &b_kj) in c_row.iter_mut().zip(b_row) {
            *c += a_ik * b_kj;
        }
    }
}

/// c_row += a_row · B, walking column blocks of width `tile` and, inside
/// each, k-blocks of width `tile`. Edge blocks are clipped, never padded.
///
/// Every output element still receives its k terms in ascending order.
pub fn accumulate_row_tiled(a_row: &[f64], b: &[f64], n: usize, c_row: &mut [f64], tile: usize) {
    let k_dim = a_row.len();
    for j0 in (0..n).step_by(tile) {
        let j1 = (j0 + tile).min(n);
        let c_blk = &mut c_row[j0..j1];
        for k0 in (0..k_dim).step_by(tile) {
            let k1 = (k0 + tile).min(k_dim);
            for k in k0..k1 {
                let a_ik = a_row[k];
                let b_blk = &b[k * n + j0..k * n + j1];
                for (c, &b_kj) in c_blk.iter_mut().zip(b_blk) {
                    *c += a_ik * b_kj;
                }
            }
        }
    }
}

pub(crate) fn mat_mat(
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    workers: usize,
    tile: Option<usize>,
    executor: &dyn Executor,
    cancel: &CancelToken,
) -> Result<()> {
    const OP: &str = "mat_mat";
    require_matrix(OP, "A", a)?;
    require_matrix(OP, "B", b)?;
    require_matrix(OP, "C", c)?;
    if a.cols() != b.rows() {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            expected: vec![a.rows(), a.cols(), a.cols(), b.cols()],
            got: vec![a.rows(), a.cols(), b.rows(), b.cols()],
        });
    }
    if c.shape() != (a.rows(), b.cols()) {
        return Err(TensorError::ShapeMismatch {
            op: OP,
            expected: vec![a.rows(), b.cols()],
            got: vec![c.rows(), c.cols()],
        });
    }

    c.data_mut().fill(0.0);

    log::debug!(
        "{OP}: [{}x{}] @ [{}x{}] on {workers} workers, tile={tile:?}",
        a.rows(),
        a.cols(),
        b.rows(),
        b.cols()
    );
    let n = b.cols();
    let ranges = partition(a.rows(), workers);
    let mut jobs = job_array(workers)?;
    for (rows, c) in ranges.iter().zip(split_rows_mut(c.data_mut(), &ranges, n)) {
        jobs.push(MatMatJob {
            a,
            b,
            c,
            rows: rows.clone(),
            tile,
            cancel,
        });
    }
    dispatch(OP, executor, jobs)?;
    cancel.check(OP)
}
