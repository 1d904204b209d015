//! Error types for SSHFP host key verification.

use thiserror::Error;

/// Result type alias for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Reasons a presented host key is not accepted.
///
/// Every variant is terminal. None of them may be treated as "proceed anyway".
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The resolver could not be reached or did not answer usefully.
    #[error("resolver error ({resolver}): {message}")]
    Resolver {
        /// Resolver address the query was sent to.
        resolver: String,
        /// Underlying cause.
        message: String,
    },

    /// The resolver answered with something other than NOERROR.
    #[error("non-success response code from resolver: {name} ({code})")]
    NonSuccessResponseCode {
        /// Numeric RCODE.
        code: u16,
        /// Mnemonic, e.g. `NXDomain`.
        name: String,
    },

    /// The answer section held no SSHFP records at all.
    #[error("no SSHFP records published for {host}")]
    NoSshfpRecords {
        /// Queried host.
        host: String,
    },

    /// SSHFP records exist, but none for the presented key's algorithm.
    #[error("no SSHFP record for {algorithm} key published for {host}")]
    NoMatchingAlgorithmRecord {
        /// Queried host.
        host: String,
        /// SSH algorithm name of the presented key.
        algorithm: String,
    },

    /// Records for the algorithm exist, but only with digests we refuse to trust.
    #[error("only weak SSHFP fingerprints ({fingerprint_types}) published for {algorithm} key of {host}")]
    WeakFingerprintOnly {
        /// Queried host.
        host: String,
        /// SSH algorithm name of the presented key.
        algorithm: String,
        /// Digest types seen, e.g. `SHA-1`.
        fingerprint_types: String,
    },

    /// A published fingerprint for the presented key's algorithm does not match.
    #[error("HOST KEY MISMATCH for {host}: published SHA256 {published}, presented key hashes to {presented}")]
    FingerprintMismatch {
        /// Queried host.
        host: String,
        /// Hex of the published fingerprint.
        published: String,
        /// Hex of the SHA-256 over the presented key.
        presented: String,
    },

    /// Response or record data could not be decoded.
    #[error("malformed DNS data: {0}")]
    Decode(String),

    /// The hostname cannot be turned into an SSHFP owner name.
    #[error("invalid hostname {0:?}")]
    InvalidHostname(String),

    /// Resolver settings are unusable.
    #[error("config error: {0}")]
    Config(String),
}

impl VerifyError {
    pub(crate) fn resolver(resolver: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Resolver {
            resolver: resolver.into(),
            message: message.to_string(),
        }
    }

    /// Stable short code for logs and scripts.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Resolver { .. } => "resolver-error",
            Self::NonSuccessResponseCode { .. } => "non-success-response-code",
            Self::NoSshfpRecords { .. } => "no-sshfp-records",
            Self::NoMatchingAlgorithmRecord { .. } => "no-matching-algorithm-record",
            Self::WeakFingerprintOnly { .. } => "weak-fingerprint-only",
            Self::FingerprintMismatch { .. } => "fingerprint-mismatch",
            Self::Decode(_) => "decode-error",
            Self::InvalidHostname(_) => "invalid-hostname",
            Self::Config(_) => "config-error",
        }
    }

    /// True when the host has a record for this key type that contradicts it.
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::FingerprintMismatch { .. })
    }
}
