/// X-Gram build CLI

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xgram_build::{BuildConfig, BuildOptions, Pipeline, SpinnerObserver};

#[derive(Parser, Debug)]
#[command(name = "xgram")]
#[command(about = "X-Gram build tool - bundles a bot project into a single production artifact")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a production build
    Build {
        /// Project root (defaults to the current directory)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Keep intermediate artifacts in the scratch directory
        #[arg(long)]
        keep_scratch: bool,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match args.command {
        Command::Build { dir, keep_scratch, verbose } => {
            init_logging(verbose);
            build(dir, keep_scratch, verbose).await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn build(dir: Option<PathBuf>, keep_scratch: bool, verbose: bool) -> ExitCode {
    println!("Creating X-Gram.js production build\n");

    let (options, config) = match prepare(dir, keep_scratch, verbose) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("Build failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = Pipeline::from_config(options, &config).with_observer(SpinnerObserver::new());

    match pipeline.run().await {
        Ok(output) => {
            println!(
                "\nBuilt {} command(s) into {}",
                output.commands.len(),
                output.artifact.display()
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            if let Some(diagnostics) = failure.source.diagnostics() {
                eprintln!("{}", diagnostics.trim_end());
            }
            eprintln!("Build failed: {}", failure);
            ExitCode::from(failure.exit_code())
        }
    }
}

fn prepare(
    dir: Option<PathBuf>,
    keep_scratch: bool,
    verbose: bool,
) -> anyhow::Result<(BuildOptions, BuildConfig)> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("cannot determine the current directory")?,
    };
    let root = std::path::absolute(&dir)
        .with_context(|| format!("cannot resolve project root {}", dir.display()))?;
    let config = BuildConfig::load(&root)?;

    let options = BuildOptions::new(root).keep_scratch(keep_scratch).verbose(verbose);
    Ok((options, config))
}
