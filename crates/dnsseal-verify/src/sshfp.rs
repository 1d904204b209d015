//! SSHFP record model (RFC 4255, RFC 6594, RFC 7479).
//!
//! Records are decoded from hickory's wire types into plain numbers so the
//! verification logic does not depend on how the DNS library names things.

use std::fmt;

use hickory_proto::rr::{RData, Record, RecordType};

use crate::error::{Result, VerifyError};

/// Public key algorithm number of an SSHFP record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SshfpAlgorithm {
    /// 0, reserved.
    Reserved,
    /// 1
    Rsa,
    /// 2
    Dsa,
    /// 3
    Ecdsa,
    /// 4
    Ed25519,
    /// 6
    Ed448,
    /// Anything IANA has not assigned.
    Unassigned(u8),
}

impl SshfpAlgorithm {
    /// Map an SSH public key algorithm name to its SSHFP number.
    ///
    /// Returns `None` for key types SSHFP has no number for (certificates,
    /// security-key variants).
    pub fn from_ssh_name(name: &str) -> Option<Self> {
        match name {
            "ssh-rsa" | "rsa-sha2-256" | "rsa-sha2-512" => Some(Self::Rsa),
            "ssh-dss" => Some(Self::Dsa),
            "ecdsa-sha2-nistp256" | "ecdsa-sha2-nistp384" | "ecdsa-sha2-nistp521" => {
                Some(Self::Ecdsa)
            }
            "ssh-ed25519" => Some(Self::Ed25519),
            "ssh-ed448" => Some(Self::Ed448),
            _ => None,
        }
    }
}

impl From<u8> for SshfpAlgorithm {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Reserved,
            1 => Self::Rsa,
            2 => Self::Dsa,
            3 => Self::Ecdsa,
            4 => Self::Ed25519,
            6 => Self::Ed448,
            n => Self::Unassigned(n),
        }
    }
}

impl From<SshfpAlgorithm> for u8 {
    fn from(value: SshfpAlgorithm) -> Self {
        match value {
            SshfpAlgorithm::Reserved => 0,
            SshfpAlgorithm::Rsa => 1,
            SshfpAlgorithm::Dsa => 2,
            SshfpAlgorithm::Ecdsa => 3,
            SshfpAlgorithm::Ed25519 => 4,
            SshfpAlgorithm::Ed448 => 6,
            SshfpAlgorithm::Unassigned(n) => n,
        }
    }
}

/// Digest algorithm number of an SSHFP fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintType {
    /// 0, reserved.
    Reserved,
    /// 1. Recognised, never trusted.
    Sha1,
    /// 2
    Sha256,
    /// Anything IANA has not assigned.
    Unassigned(u8),
}

impl From<u8> for FingerprintType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Reserved,
            1 => Self::Sha1,
            2 => Self::Sha256,
            n => Self::Unassigned(n),
        }
    }
}

impl From<FingerprintType> for u8 {
    fn from(value: FingerprintType) -> Self {
        match value {
            FingerprintType::Reserved => 0,
            FingerprintType::Sha1 => 1,
            FingerprintType::Sha256 => 2,
            FingerprintType::Unassigned(n) => n,
        }
    }
}

impl fmt::Display for FingerprintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "reserved"),
            Self::Sha1 => write!(f, "SHA-1"),
            Self::Sha256 => write!(f, "SHA-256"),
            Self::Unassigned(n) => write!(f, "type {n}"),
        }
    }
}

/// One published SSH host key fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshfpRecord {
    /// Key algorithm the fingerprint belongs to.
    pub algorithm: SshfpAlgorithm,
    /// Digest used to compute the fingerprint.
    pub fingerprint_type: FingerprintType,
    /// Raw digest bytes.
    pub fingerprint: Vec<u8>,
}

impl SshfpRecord {
    /// Build a record from presentation-format fields (`4 2 <hex>`).
    #[cfg(test)]
    fn from_hex(algorithm: u8, fingerprint_type: u8, fingerprint: &str) -> Result<Self> {
        let fingerprint = hex::decode(fingerprint.trim())
            .map_err(|e| VerifyError::Decode(format!("SSHFP fingerprint is not hex: {e}")))?;
        Ok(Self {
            algorithm: algorithm.into(),
            fingerprint_type: fingerprint_type.into(),
            fingerprint,
        })
    }

    /// Extract an SSHFP record from an answer.
    ///
    /// Returns `Ok(None)` for answers of other types (RRSIG, CNAME) and an
    /// error for SSHFP-typed answers whose data did not decode.
    pub fn from_answer(record: &Record) -> Result<Option<Self>> {
        if record.record_type() != RecordType::SSHFP {
            return Ok(None);
        }

        match record.data() {
            RData::SSHFP(sshfp) => Ok(Some(Self {
                algorithm: u8::from(sshfp.algorithm()).into(),
                fingerprint_type: u8::from(sshfp.fingerprint_type()).into(),
                fingerprint: sshfp.fingerprint().to_vec(),
            })),
            other => Err(VerifyError::Decode(format!(
                "SSHFP answer for {} carries undecodable data ({:?})",
                record.name(),
                other.record_type()
            ))),
        }
    }
}

impl fmt::Display for SshfpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            u8::from(self.algorithm),
            u8::from(self.fingerprint_type),
            hex::encode_upper(&self.fingerprint)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::sshfp::{Algorithm, FingerprintType as HickoryFpType};
    use hickory_proto::rr::rdata::{A, SSHFP};
    use hickory_proto::rr::Name;

    #[test]
    fn algorithm_numbers_roundtrip() {
        for n in 0..=u8::MAX {
            assert_eq!(u8::from(SshfpAlgorithm::from(n)), n);
            assert_eq!(u8::from(FingerprintType::from(n)), n);
        }
        assert_eq!(SshfpAlgorithm::from(4), SshfpAlgorithm::Ed25519);
        assert_eq!(FingerprintType::from(2), FingerprintType::Sha256);
    }

    #[test]
    fn ssh_names_map_to_sshfp_numbers() {
        assert_eq!(
            SshfpAlgorithm::from_ssh_name("ssh-ed25519"),
            Some(SshfpAlgorithm::Ed25519)
        );
        assert_eq!(
            SshfpAlgorithm::from_ssh_name("rsa-sha2-512"),
            Some(SshfpAlgorithm::Rsa)
        );
        assert_eq!(
            SshfpAlgorithm::from_ssh_name("ecdsa-sha2-nistp384"),
            Some(SshfpAlgorithm::Ecdsa)
        );
        assert_eq!(
            SshfpAlgorithm::from_ssh_name("sk-ssh-ed25519@openssh.com"),
            None
        );
    }

    #[test]
    fn presentation_format() {
        let record = SshfpRecord::from_hex(4, 2, "abcd01").unwrap();
        assert_eq!(record.to_string(), "4 2 ABCD01");
    }

    #[test]
    fn malformed_hex_is_decode_error() {
        let err = SshfpRecord::from_hex(4, 2, "xyz").unwrap_err();
        assert_eq!(err.reason(), "decode-error");
    }

    #[test]
    fn extracts_sshfp_answers_and_skips_others() {
        let name = Name::from_ascii("example.com.").unwrap();
        let sshfp = Record::from_rdata(
            name.clone(),
            300,
            RData::SSHFP(SSHFP::new(
                Algorithm::Ed25519,
                HickoryFpType::SHA256,
                vec![0xaa; 32],
            )),
        );
        let parsed = SshfpRecord::from_answer(&sshfp).unwrap().unwrap();
        assert_eq!(parsed.algorithm, SshfpAlgorithm::Ed25519);
        assert_eq!(parsed.fingerprint_type, FingerprintType::Sha256);
        assert_eq!(parsed.fingerprint, vec![0xaa; 32]);

        let a = Record::from_rdata(name, 300, RData::A(A::new(192, 0, 2, 1)));
        assert!(SshfpRecord::from_answer(&a).unwrap().is_none());
    }
}
