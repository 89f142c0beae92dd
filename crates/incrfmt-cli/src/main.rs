use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use incrfmt_core::config::{CliOverrides, FormatConfig};
use incrfmt_core::session::FormatSession;

/// incrfmt - run a source formatter only on files that changed
#[derive(Parser, Debug, Clone)]
#[command(name = "incrfmt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root (default: current directory)
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Path to the configuration file (default: ROOT/incrfmt.yaml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Cache directory, relative to ROOT
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<String>,

    /// Formatter program, overriding the config file
    #[arg(long, value_name = "PROGRAM")]
    formatter: Option<String>,

    /// Ignore the cache: format everything and leave the cache file untouched
    #[arg(long)]
    no_cache: bool,

    /// Delete the cache file and exit
    #[arg(long)]
    clear_cache: bool,

    /// List the files that would be formatted without running anything
    #[arg(long)]
    dry_run: bool,

    /// Write a sample incrfmt.yaml into ROOT
    #[arg(long)]
    init: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG, when set, replaces the default level entirely
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let root = match cli.root {
        Some(ref root) => root.clone(),
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    if cli.init {
        let path = FormatConfig::init_file(&root)?;
        println!("Created {}", path.display());
        return Ok(());
    }

    let mut config = FormatConfig::load(&root, cli.config.as_deref())
        .context("Failed to load configuration")?;
    config.merge(&CliOverrides {
        jobs: cli.jobs,
        cache_dir: cli.cache_dir.clone(),
        formatter: cli.formatter.clone(),
    });
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let session = FormatSession::new(&root, config)?.use_cache(!cli.no_cache);

    if cli.clear_cache {
        if session.clear_cache()? {
            println!("Removed {}", session.cache_location().display());
        } else {
            println!("No cache at {}", session.cache_location().display());
        }
        return Ok(());
    }

    let plan = session.plan()?;
    println!("{} files to format.", plan.stale_count());

    if cli.dry_run {
        for descriptor in plan.stale() {
            println!("{}", descriptor.path().display());
        }
        return Ok(());
    }

    let report = session.execute(plan)?;
    info!(
        "Formatted {} of {} stale file(s), {} failed; {} cached",
        report.formatted.len(),
        report.stale,
        report.failures.len(),
        report.cached_entries
    );

    let failed = report.failures.len();
    report
        .into_result()
        .with_context(|| format!("{} file(s) failed to format", failed))?;

    Ok(())
}
