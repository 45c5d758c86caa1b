//! `kb-tensor` - Dense f64 tensors and the parallel kernel engine for kernel-bench.
//!
//! This crate provides:
//! - Row-major `Matrix` and `Vector` types with owned buffers
//! - Static row partitioning across workers
//! - A cooperative `CancelToken` polled by every worker
//! - An `Executor` trait for fork/join dispatch (thread-per-call, or a pooled
//!   variant behind the `pool` feature)
//! - `CpuKernels`: matrix-vector, matrix-matrix (optionally tiled), dot, axpy

pub mod cancel;
pub mod cpu;
pub mod error;
pub mod executor;
pub mod partition;
#[cfg(feature = "pool")]
pub mod pool;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use cancel::CancelToken;
pub use cpu::{CpuKernels, KernelConfig, DEFAULT_TILE};
pub use error::{Result, TensorError};
pub use executor::{Executor, SpawnReport, ThreadPerCall, WorkerJob, WorkerTask};
pub use partition::{partition, row_range};
#[cfg(feature = "pool")]
pub use pool::PooledExecutor;
pub use tensor::{Matrix, Vector};
