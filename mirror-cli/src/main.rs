mod cli;
mod error;
mod input;
mod utils;

use std::process;
use std::time::Instant;

use clap::Parser;
use hls_mirror_engine::{MirrorPipeline, NormalizeOutcome};
use tracing::{debug, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;
use crate::error::Result;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let start = Instant::now();

    let output_root = std::path::absolute(&args.output)?;
    let config = args.to_config(output_root)?;
    debug!(?config, "Effective configuration");

    let resources = input::load_resources(&args.resources).await?;
    info!(
        resources = resources.len(),
        output = %config.output_root.display(),
        decrypt = config.decrypt,
        "Loaded resource list"
    );

    let pipeline = MirrorPipeline::new(config)?;
    let summary = pipeline.run(&resources).await?;

    if let Some(NormalizeOutcome::Ambiguous { candidates }) = &summary.normalized {
        info!(candidates = *candidates, "Several top-level manifests, none renamed");
    }
    if summary.skipped() > 0 {
        debug!(skipped = summary.skipped(), "Duplicate URIs skipped");
    }

    println!(
        "Mirrored {} files to {} in {:.2?}",
        summary.completed,
        pipeline.config().output_root.display(),
        start.elapsed()
    );
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(verbose, quiet, rust_log.as_deref());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(verbose))
        .init();
}

/// `--quiet` and `--verbose` win over `RUST_LOG`; without either, a valid
/// `RUST_LOG` is used as is and anything else falls back to `info`.
fn log_filter(verbose: bool, quiet: bool, rust_log: Option<&str>) -> EnvFilter {
    if quiet {
        return EnvFilter::new("error");
    }
    if verbose {
        return EnvFilter::new("debug");
    }

    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
