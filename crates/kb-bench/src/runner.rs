use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kb_io::FileFormat;
use kb_tensor::{CancelToken, CpuKernels, Matrix, PooledExecutor, Vector};

use crate::cli::{ExecutorKind, Op};
use crate::config::BenchConfig;
use crate::error::{BenchError, Status};
use crate::report::{Dims, OpReport, Preview, Reporter};

type Result<T> = std::result::Result<T, BenchError>;

/// Kernels bound to the executor chosen by `config`.
pub fn build_kernels(config: &BenchConfig, cancel: CancelToken) -> Result<CpuKernels> {
    match config.executor {
        ExecutorKind::Threads => Ok(CpuKernels::new(cancel)),
        ExecutorKind::Pool => {
            let pool = PooledExecutor::new(config.worker_count())
                .map_err(|e| BenchError::kernel("pool", e))?;
            Ok(CpuKernels::with_executor(Arc::new(pool), cancel))
        }
    }
}

/// Average wall time of `repeat` calls to `run`. `prepare` runs before each
/// call and is not timed.
fn time_repeats<S>(
    op: &'static str,
    repeat: u32,
    cancel: &CancelToken,
    state: &mut S,
    mut prepare: impl FnMut(&mut S),
    mut run: impl FnMut(&mut S) -> kb_tensor::Result<()>,
) -> Result<f64> {
    let mut total = Duration::ZERO;
    for _ in 0..repeat {
        if cancel.is_cancelled() {
            return Err(BenchError::Interrupted { op });
        }
        prepare(state);
        let start = Instant::now();
        run(state).map_err(|e| BenchError::kernel(op, e))?;
        total += start.elapsed();
    }
    Ok(total.as_secs_f64() / f64::from(repeat.max(1)))
}

fn load_matrix(op: Op, path: &Path, format: FileFormat) -> Result<Matrix> {
    kb_io::load_matrix(path, format).map_err(|source| BenchError::Load {
        op: op.name(),
        what: path.display().to_string(),
        source,
    })
}

fn load_vector(op: Op, path: &Path, format: FileFormat) -> Result<Vector> {
    kb_io::load_vector(path, format).map_err(|source| BenchError::Load {
        op: op.name(),
        what: path.display().to_string(),
        source,
    })
}

/// Drives one `run` invocation.
pub struct Runner<W: Write> {
    config: BenchConfig,
    kernels: CpuKernels,
    reporter: Reporter<W>,
}

impl<W: Write> Runner<W> {
    pub fn new(config: BenchConfig, cancel: CancelToken, out: W) -> Result<Self> {
        let kernels = build_kernels(&config, cancel)?;
        let mut reporter = Reporter::new(out, config.format);
        if let Some(path) = &config.csv {
            reporter = reporter.with_csv_file(path)?;
        }
        Ok(Runner {
            config,
            kernels,
            reporter,
        })
    }

    /// Run every op the config selects.
    ///
    /// A failing op is logged and the remaining ops still run; an
    /// interruption stops the whole run.
    pub fn run(&mut self) -> Status {
        log::info!(
            "running {} with {} worker(s) on {} executor, repeat={}",
            self.config.op,
            self.config.worker_count(),
            self.kernels.executor().name(),
            self.config.repeat
        );
        if self.config.op == Op::All {
            if let Err(e) = self.print_inputs() {
                log::error!("{}", BenchError::from(e));
                return Status::Failed;
            }
        }

        let mut status = Status::Success;
        for &op in self.config.op.expand() {
            match self.run_op(op) {
                Ok(Some(report)) => {
                    if let Err(e) = self.reporter.report(&report) {
                        log::error!("{}", BenchError::from(e));
                        status = Status::Failed;
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_interrupted() => {
                    log::warn!("{e}");
                    return Status::Interrupted;
                }
                Err(e) => {
                    log::error!("{e}");
                    status = Status::Failed;
                }
            }
        }
        status
    }

    pub fn into_inner(self) -> W {
        self.reporter.into_inner()
    }

    fn print_inputs(&mut self) -> std::io::Result<()> {
        let show = |p: &Option<std::path::PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        };
        let c = &self.config;
        let line = format!(
            "[Inputs] A={} B={} x={} y={} alpha={} threads={} repeat={} tile={} format={}",
            show(&c.inputs.a),
            show(&c.inputs.b),
            show(&c.inputs.x),
            show(&c.inputs.y),
            crate::report::fmt_g(c.alpha),
            c.workers,
            c.repeat,
            c.tile,
            c.format
        );
        self.reporter.line("[Mode] --op all")?;
        self.reporter.line(&line)
    }

    /// Benchmark one op; `None` when its inputs were not given.
    fn run_op(&mut self, op: Op) -> Result<Option<OpReport>> {
        let inputs = self.config.inputs.clone();
        let needs = match op {
            Op::Mm => (inputs.a.as_deref(), inputs.b.as_deref(), "--A and --B"),
            Op::Mv => (inputs.a.as_deref(), inputs.x.as_deref(), "--A and --x"),
            Op::Dot | Op::Axpy => (inputs.x.as_deref(), inputs.y.as_deref(), "--x and --y"),
            Op::All => return Ok(None),
        };
        let (Some(first), Some(second), _) = needs else {
            self.reporter.skipped(op, needs.2)?;
            return Ok(None);
        };

        let report = match op {
            Op::Mm => self.mm(first, second)?,
            Op::Mv => self.mv(first, second)?,
            Op::Dot => self.dot(first, second)?,
            Op::Axpy => self.axpy(first, second)?,
            Op::All => return Ok(None),
        };
        Ok(Some(report))
    }

    fn mm(&self, a_path: &Path, b_path: &Path) -> Result<OpReport> {
        let op = Op::Mm;
        let a = load_matrix(op, a_path, self.config.format)?;
        let b = load_matrix(op, b_path, self.config.format)?;
        let cfg = self.config.kernel_config();
        let kernels = &self.kernels;
        let cancel = kernels.cancel_token();

        let mut c = Matrix::zeros(a.rows(), b.cols());
        let run_with = |workers: i32| {
            let (a, b) = (&a, &b);
            move |c: &mut Matrix| kernels.mat_mat(a, b, c, cfg.with_workers(workers))
        };
        let seconds_one =
            time_repeats(op.name(), self.config.repeat, cancel, &mut c, |_| {}, run_with(1))?;
        let seconds_many = time_repeats(
            op.name(),
            self.config.repeat,
            cancel,
            &mut c,
            |_| {},
            run_with(self.config.workers),
        )?;

        Ok(OpReport {
            op,
            dims: Dims::matmul(a.rows(), b.cols(), a.cols()),
            workers: self.config.worker_count(),
            seconds_one,
            seconds_many,
            preview: Preview::Matrix(c),
        })
    }

    fn mv(&self, a_path: &Path, x_path: &Path) -> Result<OpReport> {
        let op = Op::Mv;
        let a = load_matrix(op, a_path, self.config.format)?;
        let x = load_vector(op, x_path, self.config.format)?;
        let cfg = self.config.kernel_config();
        let kernels = &self.kernels;
        let cancel = kernels.cancel_token();

        let mut y = Vector::zeros(a.rows());
        let run_with = |workers: i32| {
            let (a, x) = (&a, &x);
            move |y: &mut Vector| kernels.mat_vec(a, x, y, cfg.with_workers(workers))
        };
        let seconds_one =
            time_repeats(op.name(), self.config.repeat, cancel, &mut y, |_| {}, run_with(1))?;
        let seconds_many = time_repeats(
            op.name(),
            self.config.repeat,
            cancel,
            &mut y,
            |_| {},
            run_with(self.config.workers),
        )?;

        Ok(OpReport {
            op,
            dims: Dims::matvec(a.rows(), a.cols()),
            workers: self.config.worker_count(),
            seconds_one,
            seconds_many,
            preview: Preview::Vector(y.into_data()),
        })
    }

    fn dot(&self, x_path: &Path, y_path: &Path) -> Result<OpReport> {
        let op = Op::Dot;
        let x = load_vector(op, x_path, self.config.format)?;
        let y = load_vector(op, y_path, self.config.format)?;
        let kernels = &self.kernels;
        let cancel = kernels.cancel_token();

        let run_with = |workers: i32| {
            let (x, y) = (&x, &y);
            move |out: &mut f64| -> kb_tensor::Result<()> {
                *out = kernels.dot(x, y, workers)?;
                Ok(())
            }
        };
        let mut one = 0.0;
        let seconds_one =
            time_repeats(op.name(), self.config.repeat, cancel, &mut one, |_| {}, run_with(1))?;
        let mut many = 0.0;
        let seconds_many = time_repeats(
            op.name(),
            self.config.repeat,
            cancel,
            &mut many,
            |_| {},
            run_with(self.config.workers),
        )?;

        Ok(OpReport {
            op,
            dims: Dims::vector(x.len()),
            workers: self.config.worker_count(),
            seconds_one,
            seconds_many,
            preview: Preview::Dot { one, many },
        })
    }

    fn axpy(&self, x_path: &Path, y_path: &Path) -> Result<OpReport> {
        let op = Op::Axpy;
        let alpha = self.config.alpha;
        let x = load_vector(op, x_path, self.config.format)?;
        let y0 = load_vector(op, y_path, self.config.format)?;
        let kernels = &self.kernels;
        let cancel = kernels.cancel_token();

        // Every repetition starts from the loaded y.
        let reset = |y: &mut Vector| {
            if y.len() == y0.len() {
                y.data_mut().copy_from_slice(y0.data());
            } else {
                *y = y0.clone();
            }
        };
        let run_with = |workers: i32| {
            let x = &x;
            move |y: &mut Vector| kernels.axpy(alpha, x, y, workers)
        };
        let mut y = y0.clone();
        let seconds_one =
            time_repeats(op.name(), self.config.repeat, cancel, &mut y, reset, run_with(1))?;
        let seconds_many = time_repeats(
            op.name(),
            self.config.repeat,
            cancel,
            &mut y,
            reset,
            run_with(self.config.workers),
        )?;

        Ok(OpReport {
            op,
            dims: Dims::vector(x.len()),
            workers: self.config.worker_count(),
            seconds_one,
            seconds_many,
            preview: Preview::Axpy {
                alpha,
                y: y.into_data(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Inputs;
    use kb_io::{save_matrix, save_vector};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let a = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
            let b = Matrix::new(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
            let fmt = FileFormat::Text;
            save_matrix(&dir.path().join("a.txt"), fmt, &a).unwrap();
            save_matrix(&dir.path().join("b.txt"), fmt, &b).unwrap();
            save_vector(&dir.path().join("x.txt"), fmt, &Vector::from(vec![1.0, 2.0, 3.0])).unwrap();
            save_vector(&dir.path().join("y.txt"), fmt, &Vector::from(vec![4.0, 5.0, 6.0])).unwrap();
            save_vector(&dir.path().join("z.txt"), fmt, &Vector::from(vec![1.0, 1.0])).unwrap();
            Fixture { dir }
        }

        fn path(&self, name: &str) -> Option<std::path::PathBuf> {
            Some(self.dir.path().join(name))
        }

        fn config(&self, op: Op, workers: i32) -> BenchConfig {
            BenchConfig {
                op,
                workers,
                repeat: 2,
                inputs: Inputs {
                    a: self.path("a.txt"),
                    b: self.path("b.txt"),
                    x: self.path("x.txt"),
                    y: self.path("y.txt"),
                },
                ..BenchConfig::default()
            }
        }
    }

    fn run_to_string(config: BenchConfig, cancel: CancelToken) -> (Status, String) {
        let mut runner = Runner::new(config, cancel, Vec::new()).unwrap();
        let status = runner.run();
        (status, String::from_utf8(runner.into_inner()).unwrap())
    }

    #[test]
    fn test_mm_report() {
        let fx = Fixture::new();
        let (status, out) = run_to_string(fx.config(Op::Mm, 4), CancelToken::new());
        assert_eq!(status, Status::Success);
        assert!(out.contains("[mm] Results:"));
        assert!(out.contains("\nmm,2,2,3,1,"));
        assert!(out.contains("\nmm,2,2,3,4,"));
        assert!(out.contains("C preview (top-left):\n[58, 64]\n[139, 154]\n"));
    }

    #[test]
    fn test_all_runs_in_order() {
        let fx = Fixture::new();
        let mut cfg = fx.config(Op::All, 2);
        cfg.inputs.y = None;
        let (status, out) = run_to_string(cfg, CancelToken::new());
        assert_eq!(status, Status::Success);
        assert!(out.starts_with("[Mode] --op all\n[Inputs] "));
        let mm = out.find("[mm] Results:").unwrap();
        let mv = out.find("[mv] Results:").unwrap();
        let dot = out.find("[dot] Skipped: need --x and --y").unwrap();
        let axpy = out.find("[axpy] Skipped: need --x and --y").unwrap();
        assert!(mm < mv && mv < dot && dot < axpy);
    }

    #[test]
    fn test_error_in_one_op_does_not_stop_others() {
        let fx = Fixture::new();
        let mut cfg = fx.config(Op::All, 2);
        // B does not exist and x no longer matches A's columns.
        cfg.inputs.b = fx.path("missing.txt");
        cfg.inputs.x = fx.path("z.txt");
        cfg.inputs.y = fx.path("z.txt");
        let (status, out) = run_to_string(cfg, CancelToken::new());
        assert_eq!(status, Status::Failed);
        assert!(!out.contains("[mm] Results:"));
        assert!(!out.contains("[mv] Results:"));
        assert!(out.contains("[dot] Results:"));
        assert!(out.contains("[axpy] Results:"));
    }

    #[test]
    fn test_dot_and_axpy_values() {
        let fx = Fixture::new();
        let (status, out) = run_to_string(fx.config(Op::Dot, 3), CancelToken::new());
        assert_eq!(status, Status::Success);
        assert!(out.contains("dot = 32 (1t), 32 (3t)"));

        let mut cfg = fx.config(Op::Axpy, 2);
        cfg.alpha = 2.0;
        cfg.repeat = 5;
        let (status, out) = run_to_string(cfg, CancelToken::new());
        assert_eq!(status, Status::Success);
        // y is reset each repetition, so the result is a single application.
        assert!(out.contains("alpha=2, y preview:\n[6, 9, 12]\n"));
    }

    #[test]
    fn test_interrupted_run() {
        let fx = Fixture::new();
        let (status, out) = run_to_string(fx.config(Op::All, 2), CancelToken::cancelled());
        assert_eq!(status, Status::Interrupted);
        assert!(!out.contains("Results:"));
    }

    #[test]
    fn test_pool_executor() {
        let fx = Fixture::new();
        let mut cfg = fx.config(Op::Mv, 2);
        cfg.executor = ExecutorKind::Pool;
        let (status, out) = run_to_string(cfg, CancelToken::new());
        assert_eq!(status, Status::Success);
        assert!(out.contains("y preview:\n[14, 32]\n"));
    }

    #[test]
    fn test_time_repeats_resets_state() {
        let cancel = CancelToken::new();
        let mut calls = Vec::new();
        let secs = time_repeats(
            "t",
            3,
            &cancel,
            &mut calls,
            |c: &mut Vec<u32>| c.push(0),
            |c| {
                c.push(1);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(calls, vec![0, 1, 0, 1, 0, 1]);
        assert!(secs >= 0.0);
    }
}
