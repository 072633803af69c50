//! nvpowermizerd - a daemon to improve NVIDIA PowerMizer mode behavior.
//!
//! Polls X11 user idle time and toggles the GPU between low-power and
//! high-performance PowerMizer modes via nvidia-settings.

mod config;
mod controller;
mod idle;
mod power;

use crate::config::Config;
use crate::controller::Controller;
use crate::idle::{IdleSource, X11IdleSource};
use crate::power::NvidiaSettings;

use anyhow::{Context, Result};
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Idle-driven PowerMizer daemon for NVIDIA GPUs.
///
/// Keeps the GPU in low-power mode while the system is idle and switches
/// it to high-performance mode as soon as user activity is detected.
#[derive(Parser, Debug)]
#[command(name = "nvpowermizerd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show debugging logs.
    #[arg(short, long)]
    verbose: bool,

    /// GPU ID as shown by `nvidia-settings -q gpus`.
    #[arg(short, long = "gpuid")]
    gpuid: Option<u32>,

    /// Log mode-switch commands instead of executing them.
    #[arg(long)]
    dry_run: bool,

    /// Run in oneshot mode: print a few idle samples, then exit.
    #[arg(long)]
    oneshot: bool,

    /// Number of samples to print in oneshot mode.
    #[arg(long, default_value = "5")]
    oneshot_count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose)?;

    info!("nvpowermizerd v{} starting", env!("CARGO_PKG_VERSION"));

    // Check environment
    if env::var("DISPLAY").is_err() {
        error!("X environment not detected.");
        for diag in X11IdleSource::get_diagnostics() {
            error!("  {}", diag);
        }
        error!("");
        error!("If running as a systemd user service, ensure DISPLAY and XAUTHORITY are available.");
        anyhow::bail!("X display not available");
    }

    // Show diagnostics
    for diag in X11IdleSource::get_diagnostics() {
        debug!("{}", diag);
    }

    // Load config
    let mut config =
        Config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(gpuid) = args.gpuid {
        config.gpu_id = gpuid;
        debug!("GPU ID set to {}", gpuid);
    }
    if args.dry_run {
        config.dry_run = true;
    }

    info!(
        "Configuration loaded (gpu={}, dry_run={})",
        config.gpu_id, config.dry_run
    );

    // The idle provider is the one collaborator the daemon cannot run
    // without; failure here is fatal.
    let idle = match X11IdleSource::connect() {
        Ok(source) => source,
        Err(e) => {
            error!("Couldn't open X display: {}", e);
            anyhow::bail!("Idle time provider unavailable");
        }
    };

    // Oneshot mode
    if args.oneshot {
        return run_oneshot(idle, args.oneshot_count).await;
    }

    // Normal daemon mode
    run_daemon(idle, &config).await
}

/// Initialize logging with the specified verbosity.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_new(format!("nvpowermizerd={}", level))
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

/// Run in oneshot mode: print a few idle samples and exit.
async fn run_oneshot<I: IdleSource>(mut idle: I, count: usize) -> Result<()> {
    info!("Running in oneshot mode, printing {} samples", count);

    for i in 1..=count {
        let idle_ms = idle
            .sample_idle_ms()
            .context("Idle query failed")?;
        println!("[{}/{}] idle: {}ms", i, count, idle_ms);

        if i < count {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    Ok(())
}

/// Run the daemon control loop until a termination signal arrives.
async fn run_daemon(idle: X11IdleSource, config: &Config) -> Result<()> {
    let switch = NvidiaSettings::new(
        config.nvidia_settings_path.as_deref(),
        config.gpu_id,
        config.dry_run,
    );
    let mut controller = Controller::new(idle, switch, config.controller());

    // Install handlers before the loop starts so a signal delivered at
    // any point routes through the forced low-power shutdown.
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => debug!("SIGINT received"),
            _ = sigterm.recv() => debug!("SIGTERM received"),
        }
        trigger.cancel();
    });

    controller.run(shutdown).await;
    info!("Exiting program");
    Ok(())
}
