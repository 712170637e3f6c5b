//! ns-formatters - Main Entry Point
//!
//! Loads a snapshot of a stopped process and prints every root value the way a
//! debugger with the engine formatters installed would show it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ns_formatters::{
    backend::Snapshot,
    config::{AppConfig, DEFAULT_LOG_FILTER},
    render::ValueRenderer,
};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Render engine containers from a process snapshot
#[derive(Parser)]
#[command(name = "ns-formatters")]
#[command(about = "Display engine containers, strings and math types from a snapshot")]
struct Cli {
    /// Snapshot file (JSON)
    snapshot: PathBuf,

    /// Config file, instead of the one in the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Levels of children to print
    #[arg(long)]
    depth: Option<usize>,
}

/// Log filter that starts as `env` or the default and can be replaced later
fn filter_layer(
    env: Option<EnvFilter>,
) -> (reload::Layer<EnvFilter, Registry>, reload::Handle<EnvFilter, Registry>) {
    reload::Layer::new(env.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging before the config is read so its warnings are kept
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) = filter_layer(env_filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::load_or_default(),
    };
    // RUST_LOG wins over the config file
    if !filter_from_env {
        filter_handle
            .reload(EnvFilter::new(&config.log_filter))
            .context("Failed to apply log filter")?;
    }

    tracing::info!("Loading snapshot {:?}", cli.snapshot);
    let loaded = Snapshot::load(&cli.snapshot)
        .and_then(|snapshot| snapshot.build())
        .with_context(|| format!("Failed to load snapshot {}", cli.snapshot.display()))?;

    let depth = cli.depth.unwrap_or(config.max_depth);
    let renderer = ValueRenderer::new(&loaded.target, &config.formatters, depth);
    for root in &loaded.roots {
        print!("{}", renderer.render(root));
    }

    let stats = loaded.target.read_stats();
    tracing::debug!(
        "{} reads, {} failed, {} bytes",
        stats.successful_reads + stats.failed_reads,
        stats.failed_reads,
        stats.total_bytes_read
    );
    tracing::info!("Rendered {} root values", loaded.roots.len());
    Ok(())
}
