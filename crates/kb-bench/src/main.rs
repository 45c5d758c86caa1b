use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use kb_bench::generate::{random_matrix, random_vector};
use kb_bench::{BenchConfig, Cli, Commands, GenTarget, RunArgs, Runner, Status};
use kb_tensor::CancelToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                Status::Failed.into()
            } else {
                Status::Success.into()
            };
        }
    };

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Gen { target } => generate(target).map(|()| Status::Success),
    };
    match result {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("Error: {e:#}");
            Status::Failed.into()
        }
    }
}

async fn run(args: RunArgs) -> Result<Status> {
    let config = BenchConfig::try_from(&args).context("invalid run arguments")?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received, stopping");
            on_interrupt.cancel();
        }
    });

    let bench = tokio::task::spawn_blocking(move || -> Result<Status> {
        let mut runner = Runner::new(config, cancel, io::stdout())?;
        Ok(runner.run())
    });
    let status = bench.await.context("benchmark task panicked")?;
    watcher.abort();
    status
}

fn generate(target: GenTarget) -> Result<()> {
    match target {
        GenTarget::Matrix {
            rows,
            cols,
            out,
            format,
            seed,
        } => {
            let m = random_matrix(rows, cols, seed)?;
            kb_io::save_matrix(&out, format, &m)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {m} to {} ({format})", out.display());
        }
        GenTarget::Vector {
            len,
            out,
            format,
            seed,
        } => {
            let v = random_vector(len, seed)?;
            kb_io::save_vector(&out, format, &v)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Wrote {v} to {} ({format})", out.display());
        }
    }
    Ok(())
}
