//! Presented and accepted host keys.

use std::fmt;

use ring::digest::{digest, SHA256};

use crate::sshfp::SshfpAlgorithm;

/// A host key as presented during the SSH handshake.
///
/// `blob` is the key's SSH wire encoding (RFC 4253 section 6.6), the same
/// bytes SSHFP fingerprints are computed over.
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateKey {
    algorithm: String,
    blob: Vec<u8>,
}

impl CandidateKey {
    /// Wrap a presented key.
    pub fn new(algorithm: impl Into<String>, blob: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            blob: blob.into(),
        }
    }

    /// SSH algorithm name, e.g. `ssh-ed25519`.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// SSHFP algorithm number for this key, if SSHFP defines one.
    pub fn sshfp_algorithm(&self) -> Option<SshfpAlgorithm> {
        SshfpAlgorithm::from_ssh_name(&self.algorithm)
    }

    /// SSH wire encoding.
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// SHA-256 over the wire encoding.
    pub fn sha256(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(digest(&SHA256, &self.blob).as_ref());
        out
    }

    /// Lowercase hex of [`Self::sha256`].
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.sha256())
    }
}

impl fmt::Debug for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateKey")
            .field("algorithm", &self.algorithm)
            .field("sha256", &self.fingerprint_hex())
            .finish()
    }
}

/// A key whose fingerprint matched a DNSSEC-served SSHFP record.
///
/// Only [`crate::Verifier`] can produce one, so holding an `AcceptedKey` is
/// proof that verification succeeded for exactly these key bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedKey {
    host: String,
    key: CandidateKey,
}

impl AcceptedKey {
    pub(crate) const fn new(host: String, key: CandidateKey) -> Self {
        Self { host, key }
    }

    /// Host the key was verified for.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// SSH algorithm name.
    pub fn algorithm(&self) -> &str {
        self.key.algorithm()
    }

    /// SSH wire encoding of the verified key.
    pub fn blob(&self) -> &[u8] {
        self.key.blob()
    }

    /// Lowercase hex SHA-256 of the verified key.
    pub fn fingerprint_hex(&self) -> String {
        self.key.fingerprint_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_over_blob() {
        let key = CandidateKey::new("ssh-ed25519", b"hello world".to_vec());
        assert_eq!(
            key.fingerprint_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(key.sshfp_algorithm(), Some(SshfpAlgorithm::Ed25519));
    }

    #[test]
    fn debug_does_not_dump_blob() {
        let key = CandidateKey::new("ssh-ed25519", vec![0x41; 51]);
        let debug = format!("{key:?}");
        assert!(debug.contains("ssh-ed25519"));
        assert!(debug.contains(&key.fingerprint_hex()));
    }
}
