//! Host key verification capability and the verify-then-seal pipeline.

use std::io::Write;

use async_trait::async_trait;
use dnsseal_verify::{CandidateKey, Resolve, Verifier};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::Result;
use crate::seal::Sealer;
use crate::session::SshTarget;

/// Decides whether a host key presented during the handshake is acceptable.
///
/// Installed as the SSH transport's host key callback. Any error aborts the
/// handshake.
#[async_trait]
pub trait HostKeyVerifier: Send {
    /// Check `key` as presented by `target`.
    async fn check(&mut self, target: &SshTarget, key: &CandidateKey) -> Result<()>;
}

/// What was sealed, for the caller's summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Host whose key was verified.
    pub host: String,
    /// SHA-256 of the verified key, lowercase hex.
    pub fingerprint: String,
    /// Armored bytes written.
    pub bytes: usize,
}

/// Verifies the presented key over DNS and, only on acceptance, seals the
/// message to it and writes the armored ciphertext to `out`.
///
/// Emits at most once per run.
pub struct SealOnVerify<R, W> {
    verifier: Verifier<R>,
    sealer: Sealer,
    out: W,
    report: Option<oneshot::Sender<Sealed>>,
}

impl<R, W> SealOnVerify<R, W> {
    /// Build the pipeline. The receiver yields a [`Sealed`] once ciphertext
    /// has been written.
    pub fn new(verifier: Verifier<R>, sealer: Sealer, out: W) -> (Self, oneshot::Receiver<Sealed>) {
        let (tx, rx) = oneshot::channel();
        let pipeline = Self {
            verifier,
            sealer,
            out,
            report: Some(tx),
        };
        (pipeline, rx)
    }
}

#[async_trait]
impl<R, W> HostKeyVerifier for SealOnVerify<R, W>
where
    R: Resolve,
    W: Write + Send,
{
    async fn check(&mut self, target: &SshTarget, key: &CandidateKey) -> Result<()> {
        let accepted = self.verifier.verify(&target.host, key).await?;

        let Some(report) = self.report.take() else {
            // rekey: still verified above, but the message went out already
            debug!(host = accepted.host(), "host key re-verified, not sealing again");
            return Ok(());
        };

        let bytes = self.sealer.emit(&accepted, &mut self.out)?;
        info!(host = accepted.host(), bytes, "ciphertext written");

        let _ = report.send(Sealed {
            host: accepted.host().to_string(),
            fingerprint: accepted.fingerprint_hex(),
            bytes,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{decrypt, key_pair, sshfp_response, Canned};
    use hickory_proto::op::ResponseCode;

    fn target() -> SshTarget {
        SshTarget::new("example.com", 22)
    }

    #[tokio::test]
    async fn accepted_key_is_sealed_and_reported() {
        let k = key_pair(1);
        let resolver = Canned::answering(sshfp_response(ResponseCode::NoError, &[&k.candidate]));
        let (mut pipeline, mut rx) =
            SealOnVerify::new(Verifier::new(resolver), Sealer::new("hello"), Vec::new());

        pipeline.check(&target(), &k.candidate).await.unwrap();

        let sealed = rx.try_recv().unwrap();
        assert_eq!(sealed.host, "example.com");
        assert_eq!(sealed.fingerprint, k.candidate.fingerprint_hex());
        assert_eq!(sealed.bytes, pipeline.out.len());
        assert_eq!(decrypt(&pipeline.out, &k), "hello");
    }

    #[tokio::test]
    async fn mismatched_key_is_never_sealed() {
        let published = key_pair(1);
        let presented = key_pair(2);
        let resolver =
            Canned::answering(sshfp_response(ResponseCode::NoError, &[&published.candidate]));
        let (mut pipeline, mut rx) =
            SealOnVerify::new(Verifier::new(resolver), Sealer::new("hello"), Vec::new());

        let err = pipeline
            .check(&target(), &presented.candidate)
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "fingerprint-mismatch");
        assert!(pipeline.out.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn non_success_rcode_is_never_sealed() {
        let k = key_pair(1);
        let resolver = Canned::answering(sshfp_response(ResponseCode::NXDomain, &[]));
        let (mut pipeline, _rx) =
            SealOnVerify::new(Verifier::new(resolver), Sealer::new("hello"), Vec::new());

        let err = pipeline.check(&target(), &k.candidate).await.unwrap_err();
        assert_eq!(err.reason(), "non-success-response-code");
        assert!(pipeline.out.is_empty());
    }

    #[tokio::test]
    async fn second_check_does_not_emit_twice() {
        let k = key_pair(3);
        let resolver = Canned::answering_repeatedly(sshfp_response(
            ResponseCode::NoError,
            &[&k.candidate],
        ));
        let (mut pipeline, _rx) =
            SealOnVerify::new(Verifier::new(resolver), Sealer::new("once"), Vec::new());

        pipeline.check(&target(), &k.candidate).await.unwrap();
        let first = pipeline.out.len();
        pipeline.check(&target(), &k.candidate).await.unwrap();
        assert_eq!(pipeline.out.len(), first);
        assert_eq!(pipeline.verifier.resolver().calls(), 2);
    }
}
