//! probed — the ProbeGrid daemon.
//!
//! Loads a set of HTTP health targets from a TOML file, probes each one
//! on its own interval, and periodically reports every target's status.
//!
//! # Usage
//!
//! ```text
//! probed run --config /etc/probegrid/probed.toml
//! probed check --config /etc/probegrid/probed.toml
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use probegrid_health::{Registry, StatusSnapshot};

mod config;

use config::ProbedConfig;

#[derive(Parser)]
#[command(name = "probed", about = "ProbeGrid health probing daemon", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe every configured target until interrupted.
    Run {
        /// Path to probed.toml.
        #[arg(short, long, default_value = "probed.toml")]
        config: PathBuf,

        /// Override the status report interval, in seconds.
        #[arg(long)]
        report_interval: Option<u64>,

        /// Print each report as JSON lines on stdout.
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and list its targets.
    Check {
        /// Path to probed.toml.
        #[arg(short, long, default_value = "probed.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,probed=debug,probegrid_health=debug,probegrid_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            report_interval,
            json,
        } => {
            let mut config = load(&config)?;
            if let Some(secs) = report_interval.filter(|s| *s > 0) {
                config.report_interval = Duration::from_secs(secs);
            }
            run(config, json).await
        }
        Command::Check { config } => {
            let config = load(&config)?;
            println!(
                "config ok: {} target(s), report every {:?}, timeout {:?}",
                config.targets.len(),
                config.report_interval,
                config.timeout
            );
            for t in &config.targets {
                println!("  {:<20} every {:<8?} {}", t.id, t.interval, t.endpoint);
            }
            Ok(())
        }
    }
}

fn load(path: &Path) -> anyhow::Result<ProbedConfig> {
    ProbedConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

async fn run(config: ProbedConfig, json: bool) -> anyhow::Result<()> {
    info!(targets = config.targets.len(), "probed starting");

    let registry = probegrid_http::http_registry(config.timeout);
    for t in &config.targets {
        registry.add(&t.id, t.interval, t.endpoint.clone()).await?;
    }

    let mut report = tokio::time::interval(config.report_interval);
    // The first tick completes immediately; nothing has been checked yet.
    report.tick().await;

    loop {
        tokio::select! {
            _ = report.tick() => {
                report_all(&registry, json).await?;
            }
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for shutdown signal");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }

    registry.shutdown().await;
    info!("probed stopped");
    Ok(())
}

async fn report_all(registry: &Registry, json: bool) -> anyhow::Result<()> {
    for (id, status) in registry.statuses().await {
        if json {
            let line = serde_json::json!({ "id": id, "status": status });
            println!("{}", serde_json::to_string(&line)?);
        } else {
            log_status(&id, &status);
        }
    }
    Ok(())
}

fn log_status(id: &str, s: &StatusSnapshot) {
    let last_success = s.last_success_at.map(|t| t.to_rfc3339());
    let skew_ms = s.clock_skew().map(|d| d.num_milliseconds());
    if s.total_checks > 0 && !s.is_healthy() {
        warn!(
            %id,
            checks = s.total_checks,
            failures = s.total_failures,
            consecutive = s.consecutive_failures,
            ?last_success,
            "target unhealthy"
        );
    } else {
        info!(
            %id,
            checks = s.total_checks,
            failures = s.total_failures,
            latency_ms = s.last_latency.as_millis() as u64,
            loss = s.loss_ratio(),
            ?skew_ms,
            ?last_success,
            "target status"
        );
    }
}
