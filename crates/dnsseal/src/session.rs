//! SSH handshake adapter.
//!
//! Dials the target, lets the transport call our host key check, and stops.
//! No authentication is attempted: the handshake exists only to obtain the
//! host key the server actually presents.

use std::borrow::Cow;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use dnsseal_verify::CandidateKey;
use russh::client;
use russh::keys::{Algorithm, PublicKey};
use russh::{Disconnect, Preferred};
use tracing::debug;

use crate::check::HostKeyVerifier;
use crate::error::{Error, Result};

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Host and port to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    /// DNS name (SSHFP records are looked up under it).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl SshTarget {
    /// Target from parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port` or `[addr]:port`; `default_port` fills in a
    /// missing port.
    pub fn parse(input: &str, default_port: u16) -> Result<Self> {
        let input = input.trim();
        let invalid = || Error::InvalidTarget(input.to_string());

        if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail.strip_prefix(':') {
                Some(p) => p.parse().map_err(|_| invalid())?,
                None if tail.is_empty() => default_port,
                None => return Err(invalid()),
            };
            return Self::checked(host, port).ok_or_else(invalid);
        }

        if input.parse::<IpAddr>().is_ok() {
            return Ok(Self::new(input, default_port));
        }

        let (host, port) = match input.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
            None => (input, default_port),
        };
        Self::checked(host, port).ok_or_else(invalid)
    }

    fn checked(host: &str, port: u16) -> Option<Self> {
        (!host.is_empty() && port != 0).then(|| Self::new(host, port))
    }
}

impl fmt::Display for SshTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Turn the transport's key type into the verifier's view of it.
pub fn candidate_from(key: &PublicKey) -> Result<CandidateKey> {
    let blob = key.to_bytes().map_err(|e| Error::HostKey(e.to_string()))?;
    Ok(CandidateKey::new(key.algorithm().as_str(), blob))
}

/// russh client handler that delegates host key checks to a [`HostKeyVerifier`].
pub struct HostKeyHandler<V> {
    target: SshTarget,
    verifier: V,
}

impl<V> HostKeyHandler<V> {
    /// Wrap `verifier` for a connection to `target`.
    pub const fn new(target: SshTarget, verifier: V) -> Self {
        Self { target, verifier }
    }
}

impl<V> client::Handler for HostKeyHandler<V>
where
    V: HostKeyVerifier + 'static,
{
    type Error = Error;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool> {
        let candidate = candidate_from(server_public_key)?;
        debug!(
            peer = %self.target,
            key = candidate.algorithm(),
            sha256 = %candidate.fingerprint_hex(),
            "server presented host key"
        );
        self.verifier.check(&self.target, &candidate).await?;
        Ok(true)
    }
}

/// Client settings: offer only the host key types that can be sealed to.
pub fn client_config(timeout: Duration) -> client::Config {
    client::Config {
        preferred: Preferred {
            key: Cow::Owned(vec![Algorithm::Ed25519]),
            ..Preferred::default()
        },
        inactivity_timeout: Some(timeout),
        ..client::Config::default()
    }
}

/// Run the SSH handshake against `target` far enough for `verifier` to see
/// the host key, then disconnect.
///
/// The verifier's rejection comes back as the error.
pub async fn handshake<V>(target: &SshTarget, verifier: V, timeout: Duration) -> Result<()>
where
    V: HostKeyVerifier + 'static,
{
    let config = Arc::new(client_config(timeout));
    let handler = HostKeyHandler::new(target.clone(), verifier);

    debug!(peer = %target, "connecting");
    let connect = client::connect(config, (target.host.as_str(), target.port), handler);
    let session = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| Error::Timeout {
            target: target.to_string(),
            secs: timeout.as_secs(),
        })??;

    // No credentials are configured; hang up instead of authenticating.
    if let Err(e) = session
        .disconnect(Disconnect::ByApplication, "", "en")
        .await
    {
        debug!(error = %e, "disconnect failed");
    }
    Ok(())
}
