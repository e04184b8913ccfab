use std::path::{Path, PathBuf};

use clap::Parser;
use revision_reaper::{
    config::{DEFAULT_CONFIG_TEMPLATE, ReaperConfig},
    observability,
    retention::{build_coordinator, start_retention_worker},
};
use tokio_util::sync::CancellationToken;

/// CLI arguments for the revision reaper
#[derive(Parser, Debug)]
#[command(version, about = "Release revision retention for a cluster fleet", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = "revision-reaper.toml")]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run a single sweep over the fleet and print the summary as JSON
    Run {
        /// Log what would be evicted without archiving or deleting anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Sweep periodically until interrupted (default)
    Worker,
    /// Write a starter configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Load and validate the configuration file, then exit
    CheckConfig,
    /// Show enabled compile-time features
    Features,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { force }) => run_init(&args.config, force),
        Some(Command::CheckConfig) => run_check_config(&args.config),
        Some(Command::Features) => run_features(),
        Some(Command::Run { dry_run }) => run_once(&args.config, dry_run).await,
        Some(Command::Worker) | None => run_worker(&args.config).await,
    }
}

/// Load config and start logging and metrics, exiting on failure.
fn load_config(path: &Path, force_dry_run: bool) -> ReaperConfig {
    let config = match ReaperConfig::from_file_with_dry_run(path, force_dry_run) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = observability::init_tracing(&config.observability.logging) {
        eprintln!("Failed to initialize tracing: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics: {e}");
    }

    config
}

/// Run one sweep and print its summary.
async fn run_once(config_path: &Path, dry_run: bool) {
    let config = load_config(config_path, dry_run);

    tracing::info!(
        config_file = %config_path.display(),
        dry_run = config.retention.safety.dry_run,
        "Starting single retention run"
    );

    let coordinator = match build_coordinator(&config).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up retention");
            std::process::exit(1);
        }
    };

    match coordinator.run().await {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!(error = %e, "Failed to serialize summary"),
            }
            if summary.has_failures() {
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Retention run aborted");
            std::process::exit(1);
        }
    }
}

/// Run the periodic worker until Ctrl+C or SIGTERM.
async fn run_worker(config_path: &Path) {
    let config = load_config(config_path, false);

    tracing::info!(
        config_file = %config_path.display(),
        "Starting revision reaper"
    );

    let coordinator = match build_coordinator(&config).await {
        Ok(coordinator) => std::sync::Arc::new(coordinator),
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up retention");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let worker = tokio::spawn(start_retention_worker(
        coordinator,
        config.retention.clone(),
        cancel.clone(),
    ));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, waiting for the current run to finish...");
    cancel.cancel();

    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Retention worker exited abnormally");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Write the starter configuration file.
fn run_init(output_path: &Path, force: bool) {
    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(output_path, DEFAULT_CONFIG_TEMPLATE) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("Set REVISION_ARCHIVE_KEY to a 32-byte hex key (openssl rand -hex 32), then run:");
    println!("  revision-reaper run --dry-run --config {}", output_path.display());
}

/// Validate the config file without touching the fleet.
fn run_check_config(config_path: &Path) {
    match ReaperConfig::from_file(config_path) {
        Ok(config) => {
            println!("Config OK: {}", config_path.display());
            println!("  directory:    {}", config.directory.kind());
            println!("  cold storage: {:?}", config.cold_storage.backend);
            println!(
                "  keep:         {} revisions per release",
                config.retention.max_revisions_per_release
            );
            println!("  dry run:      {}", config.retention.safety.dry_run);
        }
        Err(e) => {
            eprintln!("Invalid config {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Print enabled compile-time features.
fn run_features() {
    let version = env!("CARGO_PKG_VERSION");

    let features: &[(&str, &str, bool)] = &[
        (
            "database-sqlite",
            "Directories",
            cfg!(feature = "database-sqlite"),
        ),
        (
            "database-postgres",
            "Directories",
            cfg!(feature = "database-postgres"),
        ),
        ("s3-storage", "Cold storage", cfg!(feature = "s3-storage")),
        ("prometheus", "Infrastructure", cfg!(feature = "prometheus")),
    ];

    println!("revision-reaper v{}", version);
    println!();

    let mut current_group = "";
    for (name, group, enabled) in features {
        if *group != current_group {
            if !current_group.is_empty() {
                println!();
            }
            println!("{}:", group);
            current_group = *group;
        }
        let mark = if *enabled { "+" } else { "-" };
        println!("  {} {}", mark, name);
    }
}
