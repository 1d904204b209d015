//! SSHFP query construction and resolver settings.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use serde::Deserialize;

use crate::error::{Result, VerifyError};

/// EDNS0 payload size advertised so DNSSEC-signed answers fit.
pub const EDNS_PAYLOAD: u16 = 4096;

/// Default request timeout for one exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How queries reach the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    /// Plain UDP. Large signed answers may come back truncated.
    #[default]
    Udp,
    /// Plain TCP with two-byte length framing.
    Tcp,
    /// TCP inside TLS (DNS-over-TLS, RFC 7858).
    TcpTls,
}

impl Transport {
    /// Port used when none is configured.
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Udp | Self::Tcp => 53,
            Self::TcpTls => 853,
        }
    }
}

impl FromStr for Transport {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "tcp" => Ok(Self::Tcp),
            "tcp-tls" | "tls" | "dot" => Ok(Self::TcpTls),
            other => Err(VerifyError::Config(format!(
                "unknown resolver transport {other:?} (expected udp, tcp or tcp-tls)"
            ))),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Udp => "udp",
            Self::Tcp => "tcp",
            Self::TcpTls => "tcp-tls",
        })
    }
}

/// Where and how to ask for SSHFP records.
///
/// The resolver must validate DNSSEC itself. A NOERROR answer from it is
/// taken as authenticated; nothing here checks signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// IP address or hostname of the validating resolver.
    pub address: String,
    /// Port override. `None` uses the transport's default.
    pub port: Option<u16>,
    /// Transport protocol.
    pub transport: Transport,
    /// Upper bound on one full exchange.
    pub timeout: Duration,
    /// Name to check the resolver's TLS certificate against. Defaults to `address`.
    pub tls_name: Option<String>,
}

impl ResolverConfig {
    /// Settings for `address` over `transport` with default port and timeout.
    pub fn new(address: impl Into<String>, transport: Transport) -> Self {
        Self {
            address: address.into(),
            port: None,
            transport,
            timeout: DEFAULT_TIMEOUT,
            tls_name: None,
        }
    }

    /// Effective port.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.transport.default_port())
    }

    /// `address:port`, bracketing IPv6 literals.
    pub fn endpoint(&self) -> String {
        match self.address.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{v6}]:{}", self.port()),
            _ => format!("{}:{}", self.address, self.port()),
        }
    }

    /// Name presented in the TLS handshake.
    pub fn tls_server_name(&self) -> &str {
        self.tls_name.as_deref().unwrap_or(&self.address)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(VerifyError::Config("resolver address is empty".into()));
        }
        if self.port == Some(0) {
            return Err(VerifyError::Config("resolver port must not be 0".into()));
        }
        if self.timeout.is_zero() {
            return Err(VerifyError::Config("resolver timeout must not be 0".into()));
        }
        Ok(())
    }
}

/// Turn a target host into the fully qualified SSHFP owner name.
///
/// Accepts `host` or `host:port`. IP literals are rejected since SSHFP
/// records hang off names.
pub fn sshfp_query_name(host: &str) -> Result<Name> {
    let trimmed = host.trim();
    if trimmed.starts_with('[') {
        return Err(VerifyError::InvalidHostname(host.to_string()));
    }
    let hostname = match trimmed.rsplit_once(':') {
        Some((name, port)) if !name.contains(':') && port.parse::<u16>().is_ok() => name,
        _ => trimmed,
    };

    if hostname.is_empty() || hostname == "." {
        return Err(VerifyError::InvalidHostname(host.to_string()));
    }
    if hostname.parse::<IpAddr>().is_ok() {
        return Err(VerifyError::InvalidHostname(host.to_string()));
    }

    let fqdn = if hostname.ends_with('.') {
        hostname.to_string()
    } else {
        format!("{hostname}.")
    };
    Name::from_ascii(&fqdn).map_err(|e| VerifyError::InvalidHostname(format!("{host}: {e}")))
}

/// Build a recursive SSHFP query with EDNS0 and the DNSSEC OK bit set.
pub fn build_query(name: &Name) -> Message {
    let query = Query::query(name.clone(), RecordType::SSHFP);

    let mut edns = Edns::new();
    edns.set_max_payload(EDNS_PAYLOAD);
    edns.flags_mut().dnssec_ok = true;

    let mut message = Message::new();
    message
        .set_id(rand::random::<u16>())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query)
        .set_edns(edns);
    message
}
