//! Binary entrypoint for the album frame.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use album_frame::cache::PhotoCache;
use album_frame::config::Configuration;
use album_frame::display::ConfiguredDisplay;
use album_frame::reconcile::{ReconciliationEngine, RefreshReport};
use album_frame::remote::{GooglePhotosApi, RemoteLibraryClient};
use album_frame::retry::RetryPolicy;
use album_frame::snapshot::SnapshotStore;
use album_frame::tasks::frame::Frame;
use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

#[derive(Debug, Parser)]
#[command(
    name = "album-frame",
    version,
    about = "Photo frame fed from a mirrored remote photo library"
)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Run one bootstrap/refresh, print what changed, and exit
    #[arg(long)]
    sync_once: bool,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("album_frame={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper_util=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).compact().init();
    Ok(())
}

fn spawn_shutdown_watchers(cancel: &CancellationToken) {
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = sigterm.recv() => {
                            info!("SIGTERM received; initiating shutdown");
                            cancel.cancel();
                        }
                    }
                }
                Err(err) => tracing::warn!("failed to register SIGTERM handler: {err}"),
            }
        });
    }
}

fn print_report(report: &RefreshReport) {
    println!(
        "# snapshot {}\n# albums: {}\n# photos: {}",
        report.snapshot.captured_at,
        report.snapshot.albums.len(),
        report.snapshot.photo_count()
    );
    let sections = [
        ("added", &report.added),
        ("updated", &report.updated),
        ("removed", &report.removed),
        ("ignored", &report.ignored),
        ("vanished", &report.vanished),
    ];
    for (label, titles) in sections {
        if titles.is_empty() {
            continue;
        }
        println!("\n# {label}:");
        for title in titles {
            println!("  {title}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", cli.config.display(), cfg);

    let cancel = CancellationToken::new();
    spawn_shutdown_watchers(&cancel);

    let api = GooglePhotosApi::new(&cfg.remote)?;
    let client = RemoteLibraryClient::new(
        api,
        RetryPolicy::from_options(&cfg.retry),
        cfg.display.size_suffix.clone(),
    );
    let engine = ReconciliationEngine::new(client, cfg.ignored_albums.clone());
    let store = SnapshotStore::new(&cfg.snapshot_path);

    if cli.sync_once {
        let report = tokio::select! {
            _ = cancel.cancelled() => {
                info!("sync interrupted; snapshot left untouched");
                return Ok(());
            }
            report = engine.sync(&store) => report?,
        };
        print_report(&report);
        return Ok(());
    }

    let display = ConfiguredDisplay::from_options(&cfg.display)?;
    let frame = Frame::new(
        engine,
        store,
        display,
        cfg.refresh_interval,
        cfg.rotation_interval,
    );
    let cache = frame.run(PhotoCache::new(cfg.cache_seed), cancel).await;
    info!(photos = cache.len(), "shutdown complete");
    Ok(())
}
