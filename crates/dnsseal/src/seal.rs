//! Conditional Encryptor: age-encrypt a message to a verified SSH host key.
//!
//! The only accepted input key type is [`AcceptedKey`], which the verifier
//! hands out after a fingerprint match. There is no way to seal to a key
//! taken from a file, a cache or a previous run.

use std::io::Write;
use std::iter;

use age::armor::{ArmoredWriter, Format};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use dnsseal_verify::AcceptedKey;
use tracing::debug;

use crate::error::SealError;

/// The single key type sealing supports.
pub const SEALABLE_KEY_TYPE: &str = "ssh-ed25519";

/// Derive the age recipient from a verified key's wire encoding.
///
/// The wire blob is the sole input: no randomness, no lookups.
pub fn recipient_for(key: &AcceptedKey) -> Result<age::ssh::Recipient, SealError> {
    if key.algorithm() != SEALABLE_KEY_TYPE {
        return Err(SealError::UnsupportedKeyType(key.algorithm().to_string()));
    }

    let line = format!("{SEALABLE_KEY_TYPE} {}", BASE64_STANDARD.encode(key.blob()));
    line.parse::<age::ssh::Recipient>()
        .map_err(|e| SealError::Encryption(format!("host key is not a valid recipient: {e:?}")))
}

/// Encrypts one operator message.
#[derive(Debug, Clone)]
pub struct Sealer {
    message: String,
}

impl Sealer {
    /// Seal `message` (UTF-8, may be empty).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The plaintext.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Encrypt to `key` and return the ASCII-armored ciphertext.
    ///
    /// Nothing is produced unless every step succeeds.
    pub fn seal(&self, key: &AcceptedKey) -> Result<Vec<u8>, SealError> {
        let recipient = recipient_for(key)?;
        let encryptor =
            age::Encryptor::with_recipients(iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| SealError::Encryption(e.to_string()))?;

        let armor = ArmoredWriter::wrap_output(Vec::new(), Format::AsciiArmor)
            .map_err(|e| SealError::Encryption(e.to_string()))?;
        let mut writer = encryptor
            .wrap_output(armor)
            .map_err(|e| SealError::Encryption(e.to_string()))?;
        writer
            .write_all(self.message.as_bytes())
            .map_err(|e| SealError::Encryption(e.to_string()))?;

        let armored = writer
            .finish()
            .and_then(ArmoredWriter::finish)
            .map_err(|e| SealError::Encryption(e.to_string()))?;

        debug!(
            host = key.host(),
            plaintext = self.message.len(),
            armored = armored.len(),
            "sealed message"
        );
        Ok(armored)
    }

    /// Seal, then write the armored text to `out` in one piece.
    ///
    /// Returns the number of bytes written.
    pub fn emit<W: Write>(&self, key: &AcceptedKey, out: &mut W) -> Result<usize, SealError> {
        let armored = self.seal(key)?;
        out.write_all(&armored).map_err(SealError::Output)?;
        out.flush().map_err(SealError::Output)?;
        Ok(armored.len())
    }
}
