// Vector kernels: dot product (with partial-sum reduction) and axpy.

use crate::cancel::CancelToken;
use crate::cpu::require_vector;
use crate::error::{Result, TensorError};
use crate::executor::{dispatch, job_array, Executor, WorkerJob};
use crate::partition::{partition, split_rows_mut};
use crate::tensor::Vector;

fn check_lengths(op: &'static str, x: &Vector, y: &Vector) -> Result<()> {
    require_vector(op, "x", x)?;
    require_vector(op, "y", y)?;
    if x.len() != y.len() {
        return Err(TensorError::ShapeMismatch {
            op,
            expected: vec![x.len()],
            got: vec![y.len()],
        });
    }
    Ok(())
}

struct DotJob<'a> {
    x: &'a [f64],
    y: &'a [f64],
    partial: &'a mut f64,
    cancel: &'a CancelToken,
}

impl WorkerJob for DotJob<'_> {
    fn run(self) {
        let mut sum = 0.0;
        for (a, b) in self.x.iter().zip(self.y) {
            if self.cancel.is_cancelled() {
                break;
            }
            sum += a * b;
        }
        *self.partial = sum;
    }
}

pub(crate) fn dot(
    x: &Vector,
    y: &Vector,
    workers: usize,
    executor: &dyn Executor,
    cancel: &CancelToken,
) -> Result<f64> {
    const OP: &str = "dot";
    check_lengths(OP, x, y)?;

    log::debug!("{OP}: len={} on {workers} workers", x.len());
    let mut partials: Vec<f64> = job_array(workers)?;
    partials.resize(workers, 0.0);

    let ranges = partition(x.len(), workers);
    let mut jobs = job_array(workers)?;
    for (r, partial) in ranges.iter().zip(partials.iter_mut()) {
        jobs.push(DotJob {
            x: &x.data()[r.clone()],
            y: &y.data()[r.clone()],
            partial,
            cancel,
        });
    }
    dispatch(OP, executor, jobs)?;
    cancel.check(OP)?;

    Ok(partials.iter().fold(0.0, |acc, p| acc + p))
}

struct AxpyJob<'a> {
    alpha: f64,
    x: &'a [f64],
    y: &'a mut [f64],
    cancel: &'a CancelToken,
}

impl WorkerJob for AxpyJob<'_> {
    fn run(self) {
        for (y, &x) in self.y.iter_mut().zip(self.x) {
            if self.cancel.is_cancelled() {
                break;
            }
            *y += self.alpha * x;
        }
    }
}

pub(crate) fn axpy(
    alpha: f64,
    x: &Vector,
    y: &mut Vector,
    workers: usize,
    executor: &dyn Executor,
    cancel: &CancelToken,
) -> Result<()> {
    const OP: &str = "axpy";
    check_lengths(OP, x, y)?;

    log::debug!("{OP}: len={} alpha={alpha} on {workers} workers", x.len());
    let ranges = partition(x.len(), workers);
    let mut jobs = job_array(workers)?;
    for (r, y) in ranges.iter().zip(split_rows_mut(y.data_mut(), &ranges, 1)) {
        jobs.push(AxpyJob {
            alpha,
            x: &x.data()[r.clone()],
            y,
            cancel,
        });
    }
    dispatch(OP, executor, jobs)?;
    cancel.check(OP)
}
