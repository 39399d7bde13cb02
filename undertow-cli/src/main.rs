//! Undertow CLI - interactive shell over the torrent registry

mod commands;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use undertow_core::config::{FailoverStrategy, IdentityPolicy, TierPolicy, UndertowConfig};
use undertow_core::spawn_http_registry;
use undertow_core::tracing_setup::{CliLogLevel, TracingOptions, init_tracing};

use crate::commands::ShellCommand;

/// Global options. `UNDERTOW_*` environment variables are applied first;
/// flags given here win over them.
#[derive(Parser, Debug)]
#[command(name = "undertow")]
#[command(about = "Register .torrent files and announce them to their trackers")]
#[command(version)]
struct Cli {
    /// Console log level; RUST_LOG overrides it
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Also write a full trace log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Per-tracker timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    tracker_timeout: Option<u64>,

    /// Duplicate detection: name or info-hash
    #[arg(long)]
    identity: Option<IdentityPolicy>,

    /// Failover: sequential, concurrent or concurrent:N
    #[arg(long)]
    failover: Option<FailoverStrategy>,

    /// Announce-list expansion: first-per-tier or every-url
    #[arg(long)]
    tier_policy: Option<TierPolicy>,
}

impl Cli {
    fn config(&self) -> UndertowConfig {
        let mut config = UndertowConfig::from_env();
        if let Some(secs) = self.tracker_timeout {
            config.network.tracker_timeout = Duration::from_secs(secs);
        }
        if let Some(identity) = self.identity {
            config.torrent.identity = identity;
        }
        if let Some(failover) = self.failover {
            config.network.failover = failover;
        }
        if let Some(tier_policy) = self.tier_policy {
            config.network.tier_policy = tier_policy;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        console_level: cli.log_level.as_tracing_level(),
        log_file: cli.log_file.clone(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let config = cli.config();
    tracing::debug!("Starting with {:?}", config);
    let handle = spawn_http_registry(config).context("failed to start torrent registry")?;

    println!("undertow shell. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ShellCommand::parse(&line) {
            Ok(None) => {}
            Ok(Some(command)) => {
                if !commands::execute(&handle, command).await {
                    break;
                }
            }
            Err(message) => println!("{message}"),
        }
    }

    handle.shutdown().await.ok();
    Ok(())
}
