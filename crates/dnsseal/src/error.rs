//! Error types for the verify-then-seal pipeline.

use dnsseal_verify::VerifyError;
use thiserror::Error;

/// Result type alias for dnsseal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from the Conditional Encryptor.
#[derive(Error, Debug)]
pub enum SealError {
    /// The verified key is not of a type age can encrypt to.
    #[error("unsupported key type {0}: only ssh-ed25519 host keys can be sealed to")]
    UnsupportedKeyType(String),

    /// The encryption library refused the recipient or failed mid-stream.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Writing the armored ciphertext failed.
    #[error("cannot write ciphertext: {0}")]
    Output(#[source] std::io::Error),
}

/// Errors from a full verification and sealing run.
#[derive(Error, Debug)]
pub enum Error {
    /// Host key verification rejected the presented key.
    #[error("DNSSEC: {0}")]
    Verify(#[from] VerifyError),

    /// Sealing failed after the key was accepted.
    #[error("age: {0}")]
    Seal(#[from] SealError),

    /// SSH transport failure before a host key was checked.
    #[error("ssh: {0}")]
    Ssh(#[from] russh::Error),

    /// The presented key could not be re-encoded.
    #[error("cannot encode presented host key: {0}")]
    HostKey(String),

    /// The target string is not `host`, `host:port` or `[addr]:port`.
    #[error("invalid target {0:?}")]
    InvalidTarget(String),

    /// The handshake did not finish in time.
    #[error("no host key from {target} within {secs}s")]
    Timeout {
        /// `host:port` that was dialed.
        target: String,
        /// Limit in seconds.
        secs: u64,
    },

    /// The transport finished without ever presenting a host key.
    #[error("connection to {0} ended before a host key was checked")]
    NotChecked(String),
}

impl Error {
    /// Stable short code for logs and scripts.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Verify(e) => e.reason(),
            Self::Seal(SealError::UnsupportedKeyType(_)) => "unsupported-key-type",
            Self::Seal(_) => "encryption-error",
            Self::Ssh(_) | Self::Timeout { .. } | Self::NotChecked(_) => "ssh-error",
            Self::HostKey(_) => "host-key-encoding",
            Self::InvalidTarget(_) => "invalid-target",
        }
    }
}
