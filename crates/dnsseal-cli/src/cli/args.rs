//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use dnsseal_verify::Transport;

/// Encrypt a message to an SSH server's host key, verified through DNSSEC
///
/// Connects to TARGET, checks the presented host key against the SHA-256
/// SSHFP records returned by a DNSSEC-validating resolver, and only on a
/// match writes the age-encrypted, ASCII-armored message to stdout.
///
/// The resolver is trusted to validate DNSSEC. Use a resolver you control
/// or reach it over tcp-tls.
#[derive(Parser, Debug)]
#[command(name = "dnsseal")]
#[command(author, version, about)]
pub struct Cli {
    /// Host to seal to, as host or host:port
    pub target: String,

    /// Message words, joined with single spaces
    #[arg(value_name = "MESSAGE")]
    pub words: Vec<String>,

    /// Message to seal (instead of trailing words)
    #[arg(short, long, conflicts_with = "words")]
    pub message: Option<String>,

    /// SSH port (default 22)
    #[arg(short, long, env = "DNSSEAL_SSH_PORT")]
    pub port: Option<u16>,

    /// Resolver address (default 9.9.9.9)
    #[arg(short = 'n', long, env = "DNSSEAL_NAMESERVER")]
    pub nameserver: Option<String>,

    /// Resolver port (default 53, or 853 for tcp-tls)
    #[arg(long, env = "DNSSEAL_DNS_PORT")]
    pub dns_port: Option<u16>,

    /// Resolver transport: udp, tcp or tcp-tls
    #[arg(long, env = "DNSSEAL_DNS_PROTO", value_name = "PROTO")]
    pub dns_proto: Option<Transport>,

    /// TLS server name for tcp-tls (defaults to the nameserver)
    #[arg(long, env = "DNSSEAL_TLS_NAME")]
    pub tls_name: Option<String>,

    /// Timeout in seconds for each network step
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Config file (default: platform config dir, dnsseal/config.toml)
    #[arg(short, long, env = "DNSSEAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// The plaintext: `-m` if given, otherwise the trailing words.
    pub fn message_text(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.words.join(" "))
    }
}
