use std::path::PathBuf;

use kb_io::FileFormat;
use kb_tensor::{KernelConfig, DEFAULT_TILE};

use crate::cli::{ExecutorKind, Op, RunArgs};
use crate::error::ConfigError;

/// Operand paths; any of them may be absent, in which case ops that need
/// it are skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs {
    pub a: Option<PathBuf>,
    pub b: Option<PathBuf>,
    pub x: Option<PathBuf>,
    pub y: Option<PathBuf>,
}

/// Validated settings for one `run` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub op: Op,
    pub format: FileFormat,
    /// Worker count of the parallel run (the baseline always uses 1).
    pub workers: i32,
    pub repeat: u32,
    pub tile: i32,
    pub alpha: f64,
    pub inputs: Inputs,
    pub executor: ExecutorKind,
    pub csv: Option<PathBuf>,
}

impl BenchConfig {
    pub fn kernel_config(&self) -> KernelConfig {
        KernelConfig::new(self.workers, self.tile)
    }

    /// `workers` as a count; always >= 1 once validated.
    pub fn worker_count(&self) -> usize {
        self.kernel_config().worker_count()
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            op: Op::All,
            format: FileFormat::Text,
            workers: 1,
            repeat: 1,
            tile: DEFAULT_TILE,
            alpha: 1.0,
            inputs: Inputs::default(),
            executor: ExecutorKind::Threads,
            csv: None,
        }
    }
}

impl TryFrom<&RunArgs> for BenchConfig {
    type Error = ConfigError;

    fn try_from(args: &RunArgs) -> Result<Self, Self::Error> {
        if args.threads <= 0 {
            return Err(ConfigError::Threads(args.threads));
        }
        let repeat = u32::try_from(args.repeat)
            .ok()
            .filter(|&r| r > 0)
            .ok_or(ConfigError::Repeat(args.repeat))?;

        Ok(BenchConfig {
            op: args.op,
            format: args.format,
            workers: args.threads,
            repeat,
            tile: args.tile,
            alpha: args.alpha,
            inputs: Inputs {
                a: args.a.clone(),
                b: args.b.clone(),
                x: args.x.clone(),
                y: args.y.clone(),
            },
            executor: args.executor,
            csv: args.csv.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["kernel-bench", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_valid_config() {
        let cfg = BenchConfig::try_from(&run_args(&["--op", "dot", "-t", "8", "-r", "3"])).unwrap();
        assert_eq!(cfg.op, Op::Dot);
        assert_eq!(cfg.worker_count(), 8);
        assert_eq!(cfg.repeat, 3);
        assert_eq!(cfg.kernel_config(), KernelConfig::new(8, DEFAULT_TILE));
    }

    #[test]
    fn test_rejects_bad_threads_and_repeat() {
        assert!(matches!(
            BenchConfig::try_from(&run_args(&["--op", "mm", "--threads", "0"])),
            Err(ConfigError::Threads(0))
        ));
        assert!(matches!(
            BenchConfig::try_from(&run_args(&["--op", "mm", "--repeat", "-2"])),
            Err(ConfigError::Repeat(-2))
        ));
    }

    #[test]
    fn test_default() {
        let cfg = BenchConfig::default();
        assert_eq!(cfg.workers, 1);
        assert_eq!(cfg.tile, DEFAULT_TILE);
        assert_eq!(cfg.inputs, Inputs::default());
    }
}
