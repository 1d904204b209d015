//! Configuration management.
//!
//! Layers, lowest first: built-in defaults, the TOML file, environment,
//! flags. Clap already folds environment variables into the flags, so
//! [`RunConfig::build`] only merges the file underneath them.
//!
//! The file may hold resolver settings and the SSH port. Unknown keys are
//! rejected, so a recipient or key can never come from configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use dnsseal::{SshTarget, DEFAULT_SSH_PORT};
use dnsseal_verify::query::{sshfp_query_name, DEFAULT_TIMEOUT};
use dnsseal_verify::{ResolverConfig, Transport};
use serde::Deserialize;

use crate::cli::args::Cli;

/// Resolver used when neither file, environment nor flags name one.
pub const DEFAULT_NAMESERVER: &str = "9.9.9.9";

/// Time allowed for the SSH handshake to reach the host key check.
pub const DEFAULT_SSH_TIMEOUT: Duration = Duration::from_secs(10);

/// On-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// How to reach the validating resolver.
    pub resolver: ResolverSection,

    /// SSH connection settings.
    pub ssh: SshSection,
}

/// `[resolver]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverSection {
    pub nameserver: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<Transport>,
    pub tls_name: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[ssh]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshSection {
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Get the default config file path.
    pub fn path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "dnsseal")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used
    /// when present and built-in defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::path() {
                Ok(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Everything one run needs, fixed before any network traffic.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub target: SshTarget,
    pub resolver: ResolverConfig,
    pub message: String,
    pub ssh_timeout: Duration,
}

impl RunConfig {
    /// Merge flags over the file over defaults, and validate.
    ///
    /// A port in the target itself beats `--port`. IP literal targets are
    /// refused here, before anything is dialed, since SSHFP records hang off
    /// names.
    pub fn build(cli: &Cli, file: FileConfig) -> Result<Self> {
        let ssh_port = cli.port.or(file.ssh.port).unwrap_or(DEFAULT_SSH_PORT);
        let target = SshTarget::parse(&cli.target, ssh_port)?;
        sshfp_query_name(&target.host)?;

        let transport = cli
            .dns_proto
            .or(file.resolver.transport)
            .unwrap_or_default();
        let address = cli
            .nameserver
            .clone()
            .or(file.resolver.nameserver)
            .unwrap_or_else(|| DEFAULT_NAMESERVER.to_string());

        let mut resolver = ResolverConfig::new(address, transport);
        resolver.port = cli.dns_port.or(file.resolver.port);
        resolver.tls_name = cli.tls_name.clone().or(file.resolver.tls_name);
        resolver.timeout = cli
            .timeout
            .or(file.resolver.timeout_secs)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);
        resolver.validate().context("invalid resolver settings")?;

        let ssh_timeout = cli
            .timeout
            .or(file.ssh.timeout_secs)
            .map_or(DEFAULT_SSH_TIMEOUT, Duration::from_secs);
        if ssh_timeout.is_zero() {
            bail!("invalid ssh settings: timeout must not be 0");
        }

        Ok(Self {
            target,
            resolver,
            message: cli.message_text(),
            ssh_timeout,
        })
    }
}
