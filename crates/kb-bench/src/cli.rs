use std::fmt;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use kb_io::FileFormat;
use kb_tensor::DEFAULT_TILE;

#[derive(Parser, Debug)]
#[command(name = "kernel-bench")]
#[command(version, about = "Single- vs multi-worker benchmarks for dense linear-algebra kernels")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Time a kernel on 1 worker and on N workers and report speedup
    Run(RunArgs),

    /// Write random operands to disk
    Gen {
        #[command(subcommand)]
        target: GenTarget,
    },
}

/// Which kernel(s) to benchmark.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Matrix-matrix product (needs --A and --B)
    Mm,
    /// Matrix-vector product (needs --A and --x)
    Mv,
    /// Dot product (needs --x and --y)
    Dot,
    /// y = alpha*x + y (needs --x and --y)
    Axpy,
    /// mm, mv, dot, axpy in that order, skipping ops whose inputs are missing
    All,
}

impl Op {
    pub fn name(self) -> &'static str {
        match self {
            Op::Mm => "mm",
            Op::Mv => "mv",
            Op::Dot => "dot",
            Op::Axpy => "axpy",
            Op::All => "all",
        }
    }

    /// The ops a run of `self` expands to.
    pub fn expand(self) -> &'static [Op] {
        match self {
            Op::All => &[Op::Mm, Op::Mv, Op::Dot, Op::Axpy],
            Op::Mm => &[Op::Mm],
            Op::Mv => &[Op::Mv],
            Op::Dot => &[Op::Dot],
            Op::Axpy => &[Op::Axpy],
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fork/join strategy for the kernels.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    /// Spawn and join fresh threads on every call
    #[default]
    Threads,
    /// Reuse a persistent worker pool sized to --threads
    Pool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Kernel to benchmark
    #[arg(short, long, value_enum)]
    pub op: Op,

    /// Input file encoding (text or bin)
    #[arg(short, long, default_value = "text")]
    pub format: FileFormat,

    /// Worker count for the parallel run
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub threads: i32,

    /// Timed repetitions per configuration
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    pub repeat: i32,

    /// Matmul tile width; <= 0 disables tiling
    #[arg(long, default_value_t = DEFAULT_TILE, allow_negative_numbers = true)]
    pub tile: i32,

    /// Scale factor for axpy
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub alpha: f64,

    /// Matrix A
    #[arg(long = "A", value_name = "FILE")]
    pub a: Option<PathBuf>,

    /// Matrix B
    #[arg(long = "B", value_name = "FILE")]
    pub b: Option<PathBuf>,

    /// Vector x
    #[arg(long, value_name = "FILE")]
    pub x: Option<PathBuf>,

    /// Vector y
    #[arg(long, value_name = "FILE")]
    pub y: Option<PathBuf>,

    /// Fork/join strategy
    #[arg(long, value_enum, default_value_t = ExecutorKind::Threads)]
    pub executor: ExecutorKind,

    /// Also append result rows to this CSV file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GenTarget {
    /// Random matrix with values in [-1, 1)
    Matrix {
        #[arg(long)]
        rows: usize,

        #[arg(long)]
        cols: usize,

        /// Output path
        #[arg(short, long)]
        out: PathBuf,

        #[arg(short, long, default_value = "text")]
        format: FileFormat,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Random vector with values in [-1, 1)
    Vector {
        #[arg(long)]
        len: usize,

        /// Output path
        #[arg(short, long)]
        out: PathBuf,

        #[arg(short, long, default_value = "text")]
        format: FileFormat,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "kernel-bench", "run", "--op", "mm", "--A", "a.txt", "--B", "b.txt", "--threads", "4",
            "--tile", "-1", "--format", "bin",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.op, Op::Mm);
        assert_eq!(args.threads, 4);
        assert_eq!(args.tile, -1);
        assert_eq!(args.format, FileFormat::Binary);
        assert_eq!(args.a, Some(PathBuf::from("a.txt")));
        assert_eq!(args.repeat, 1);
        assert_eq!(args.executor, ExecutorKind::Threads);
    }

    #[test]
    fn test_parse_gen() {
        let cli = Cli::parse_from(["kernel-bench", "-vv", "gen", "vector", "--len", "8", "-o", "x.bin"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Gen {
                target: GenTarget::Vector { len: 8, seed: 42, .. }
            }
        ));
    }

    #[test]
    fn test_expand_all_order() {
        assert_eq!(Op::All.expand(), &[Op::Mm, Op::Mv, Op::Dot, Op::Axpy]);
    }
}
