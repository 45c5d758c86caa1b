//! `kb-bench` - Benchmark harness for the `kb-tensor` kernels.
//!
//! Loads operands with `kb-io`, times each kernel with one worker and with
//! N workers, and reports GFLOP/s, speedup and parallel efficiency as CSV.

pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod report;
pub mod runner;

pub use cli::{Cli, Commands, ExecutorKind, GenTarget, Op, RunArgs};
pub use config::{BenchConfig, Inputs};
pub use error::{BenchError, ConfigError, Status};
pub use runner::Runner;
