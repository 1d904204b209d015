//! CLI argument parsing and the single verify-then-seal run.

pub mod args;

use std::io;

use anyhow::{Context, Result};
use args::Cli;
use clap::Parser;
use dnsseal::{verify_and_seal, Sealer};
use dnsseal_verify::{DnsClient, Resolve, Verifier};
use tracing::{info, warn};

use crate::config::{FileConfig, RunConfig};
use crate::logging;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let file = FileConfig::load(cli.config.as_deref())?;
    let config = RunConfig::build(&cli, file)?;
    execute(config).await
}

/// Verify the target's host key and write the sealed message to stdout.
pub async fn execute(config: RunConfig) -> Result<()> {
    if config.message.is_empty() {
        warn!("no message given (use -m or trailing words); sealing an empty message");
    }

    let client = DnsClient::new(config.resolver).context("invalid resolver settings")?;
    info!(peer = %config.target, resolver = %client.describe(), "verifying host key");

    let sealed = verify_and_seal(
        &config.target,
        Verifier::new(client),
        Sealer::new(config.message),
        io::stdout(),
        config.ssh_timeout,
    )
    .await?;

    info!(
        host = %sealed.host,
        sha256 = %sealed.fingerprint,
        bytes = sealed.bytes,
        "sealed message written"
    );
    Ok(())
}

