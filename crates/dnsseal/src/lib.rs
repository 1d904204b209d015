//! # dnsseal
//!
//! Encrypt a message to an SSH server's host key, but only after that key
//! has been matched against SSHFP records served by a DNSSEC-validating
//! resolver.
//!
//! ```text
//! ssh handshake ──> check_server_key(key)
//!                     └─> Verifier::verify(host, key)   (dnsseal-verify)
//!                           ├─ Err  ─> handshake aborted, nothing written
//!                           └─ Ok(AcceptedKey)
//!                                 └─> Sealer::emit   ─> armored age text
//! ```
//!
//! The handshake never authenticates. Once the ciphertext is out, how the
//! connection ends does not matter.

pub mod check;
pub mod error;
pub mod seal;
pub mod session;

#[cfg(test)]
mod testing;

use std::io::Write;
use std::time::Duration;

use dnsseal_verify::{Resolve, Verifier};
use tracing::debug;

pub use check::{HostKeyVerifier, SealOnVerify, Sealed};
pub use error::{Error, Result, SealError};
pub use seal::{recipient_for, Sealer};
pub use session::{handshake, SshTarget, DEFAULT_SSH_PORT};

/// Connect to `target`, verify its host key through `verifier`, and on
/// acceptance write the sealed message to `out`.
///
/// Succeeds only when ciphertext was written. A handshake failure after
/// that point is logged and ignored.
pub async fn verify_and_seal<R, W>(
    target: &SshTarget,
    verifier: Verifier<R>,
    sealer: Sealer,
    out: W,
    timeout: Duration,
) -> Result<Sealed>
where
    R: Resolve + 'static,
    W: Write + Send + 'static,
{
    let (pipeline, mut sealed) = SealOnVerify::new(verifier, sealer, out);
    let outcome = handshake(target, pipeline, timeout).await;

    match (sealed.try_recv(), outcome) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(report), Err(e)) => {
            debug!(error = %e, "connection ended after sealing");
            Ok(report)
        }
        (Err(_), Err(e)) => Err(e),
        (Err(_), Ok(())) => Err(Error::NotChecked(target.to_string())),
    }
}
