//! The accept/reject decision for a presented host key.

use hickory_proto::op::{Message, ResponseCode};
use tracing::{debug, error, info, warn};

use crate::error::{Result, VerifyError};
use crate::key::{AcceptedKey, CandidateKey};
use crate::query::{build_query, sshfp_query_name};
use crate::resolver::Resolve;
use crate::sshfp::{FingerprintType, SshfpRecord};

/// Checks presented host keys against SSHFP records served by one resolver.
#[derive(Debug, Clone)]
pub struct Verifier<R> {
    resolver: R,
}

impl<R: Resolve> Verifier<R> {
    /// Verify against `resolver`.
    pub const fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// The resolver in use.
    pub const fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Query SSHFP records for `host` and decide whether `candidate` is its key.
    ///
    /// `host` may carry a `:port` suffix. One query, no retries.
    pub async fn verify(&self, host: &str, candidate: &CandidateKey) -> Result<AcceptedKey> {
        let name = sshfp_query_name(host)?;
        let request = build_query(&name);
        debug!(
            name = %name,
            resolver = %self.resolver.describe(),
            key = candidate.algorithm(),
            "looking up SSHFP"
        );

        let response = self.resolver.exchange(&request).await?;
        let label = name.to_ascii();
        evaluate(label.trim_end_matches('.'), &response, candidate)
    }
}

/// Decide on a resolver response.
pub fn evaluate(host: &str, response: &Message, candidate: &CandidateKey) -> Result<AcceptedKey> {
    let code = response.response_code();
    if code != ResponseCode::NoError {
        return Err(VerifyError::NonSuccessResponseCode {
            code: u16::from(code),
            name: code.to_string(),
        });
    }

    let records = response
        .answers()
        .iter()
        .map(SshfpRecord::from_answer)
        .filter_map(Result::transpose)
        .collect::<Result<Vec<_>>>()?;
    debug!(host, records = records.len(), "SSHFP answer");

    evaluate_records(host, &records, candidate)
}

/// Decide on an already decoded SSHFP record set.
///
/// A SHA-256 record for the key's algorithm that does not match fails
/// immediately, even if another record matches. SHA-1 records are never
/// trusted.
pub fn evaluate_records(
    host: &str,
    records: &[SshfpRecord],
    candidate: &CandidateKey,
) -> Result<AcceptedKey> {
    if records.is_empty() {
        return Err(VerifyError::NoSshfpRecords {
            host: host.to_string(),
        });
    }

    let no_match = || VerifyError::NoMatchingAlgorithmRecord {
        host: host.to_string(),
        algorithm: candidate.algorithm().to_string(),
    };
    let algorithm = candidate.sshfp_algorithm().ok_or_else(no_match)?;
    let relevant: Vec<&SshfpRecord> = records
        .iter()
        .filter(|r| r.algorithm == algorithm)
        .collect();
    if relevant.is_empty() {
        return Err(no_match());
    }

    let presented = candidate.sha256();
    let mut matched = false;
    let mut weak: Vec<FingerprintType> = Vec::new();

    for record in relevant {
        match record.fingerprint_type {
            FingerprintType::Sha256 => {
                if record.fingerprint.as_slice() == presented.as_slice() {
                    matched = true;
                } else {
                    let err = VerifyError::FingerprintMismatch {
                        host: host.to_string(),
                        published: hex::encode(&record.fingerprint),
                        presented: hex::encode(presented),
                    };
                    error!(host, reason = err.reason(), "{err}");
                    return Err(err);
                }
            }
            other => {
                warn!(host, record = %record, "ignoring SSHFP record with untrusted digest {other}");
                if !weak.contains(&other) {
                    weak.push(other);
                }
            }
        }
    }

    if !matched {
        return Err(VerifyError::WeakFingerprintOnly {
            host: host.to_string(),
            algorithm: candidate.algorithm().to_string(),
            fingerprint_types: weak
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    info!(
        host,
        key = candidate.algorithm(),
        sha256 = %candidate.fingerprint_hex(),
        "host key matches DNSSEC SSHFP record"
    );
    Ok(AcceptedKey::new(host.to_string(), candidate.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use hickory_proto::op::MessageType;
    use hickory_proto::rr::rdata::sshfp::{Algorithm, FingerprintType as HickoryFpType};
    use hickory_proto::rr::rdata::{A, SSHFP};
    use hickory_proto::rr::{Name, RData, Record, RecordType};

    const HOST: &str = "example.com";

    fn key(seed: u8) -> CandidateKey {
        let mut blob = b"\x00\x00\x00\x0bssh-ed25519\x00\x00\x00\x20".to_vec();
        blob.extend_from_slice(&[seed; 32]);
        CandidateKey::new("ssh-ed25519", blob)
    }

    fn record(algorithm: u8, fp_type: u8, fingerprint: &[u8]) -> SshfpRecord {
        SshfpRecord {
            algorithm: algorithm.into(),
            fingerprint_type: fp_type.into(),
            fingerprint: fingerprint.to_vec(),
        }
    }

    fn response(code: ResponseCode, answers: Vec<Record>) -> Message {
        let mut message = Message::new();
        message
            .set_message_type(MessageType::Response)
            .set_response_code(code);
        for answer in answers {
            message.add_answer(answer);
        }
        message
    }

    fn sshfp_answer(algorithm: Algorithm, fp_type: HickoryFpType, fingerprint: Vec<u8>) -> Record {
        Record::from_rdata(
            Name::from_ascii("example.com.").unwrap(),
            300,
            RData::SSHFP(SSHFP::new(algorithm, fp_type, fingerprint)),
        )
    }

    #[test]
    fn matching_sha256_is_accepted() {
        let k = key(1);
        let records = [record(4, 2, &k.sha256())];
        let accepted = evaluate_records(HOST, &records, &k).unwrap();
        assert_eq!(accepted.host(), HOST);
        assert_eq!(accepted.blob(), k.blob());
        assert_eq!(accepted.fingerprint_hex(), k.fingerprint_hex());
    }

    #[test]
    fn mismatch_wins_over_a_later_match() {
        let k = key(1);
        let records = [record(4, 2, &key(2).sha256()), record(4, 2, &k.sha256())];
        let err = evaluate_records(HOST, &records, &k).unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn mismatch_wins_over_an_earlier_match() {
        let k = key(1);
        let records = [record(4, 2, &k.sha256()), record(4, 2, &key(2).sha256())];
        let err = evaluate_records(HOST, &records, &k).unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn empty_set_is_no_records() {
        let err = evaluate_records(HOST, &[], &key(1)).unwrap_err();
        assert_eq!(err.reason(), "no-sshfp-records");
    }

    #[test]
    fn other_algorithms_only_is_no_matching_algorithm() {
        let k = key(1);
        let records = [record(1, 2, &[0u8; 32]), record(3, 2, &k.sha256())];
        let err = evaluate_records(HOST, &records, &k).unwrap_err();
        assert_eq!(err.reason(), "no-matching-algorithm-record");
    }

    #[test]
    fn other_algorithm_mismatch_is_ignored() {
        let k = key(1);
        let records = [record(1, 2, &[0u8; 32]), record(4, 2, &k.sha256())];
        assert!(evaluate_records(HOST, &records, &k).is_ok());
    }

    #[test]
    fn sha1_alone_is_rejected_as_weak() {
        let k = key(1);
        let records = [record(4, 1, &[0u8; 20])];
        let err = evaluate_records(HOST, &records, &k).unwrap_err();
        assert_eq!(err.reason(), "weak-fingerprint-only");
        assert!(err.to_string().contains("SHA-1"));
    }

    #[test]
    fn sha1_beside_matching_sha256_is_accepted() {
        let k = key(1);
        let records = [record(4, 1, &[0u8; 20]), record(4, 2, &k.sha256())];
        assert!(evaluate_records(HOST, &records, &k).is_ok());
    }

    #[test]
    fn unknown_key_type_has_no_matching_record() {
        let k = CandidateKey::new("sk-ssh-ed25519@openssh.com", vec![1, 2, 3]);
        let records = [record(4, 2, &[0u8; 32])];
        let err = evaluate_records(HOST, &records, &k).unwrap_err();
        assert_eq!(err.reason(), "no-matching-algorithm-record");
    }

    #[test]
    fn nxdomain_is_non_success() {
        let err = evaluate(HOST, &response(ResponseCode::NXDomain, vec![]), &key(1)).unwrap_err();
        match err {
            VerifyError::NonSuccessResponseCode { code, .. } => assert_eq!(code, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn servfail_is_non_success() {
        let err = evaluate(HOST, &response(ResponseCode::ServFail, vec![]), &key(1)).unwrap_err();
        assert_eq!(err.reason(), "non-success-response-code");
    }

    #[test]
    fn non_sshfp_answers_are_skipped() {
        let k = key(1);
        let answers = vec![
            Record::from_rdata(
                Name::from_ascii("example.com.").unwrap(),
                300,
                RData::A(A::new(192, 0, 2, 10)),
            ),
            sshfp_answer(Algorithm::Ed25519, HickoryFpType::SHA256, k.sha256().to_vec()),
        ];
        let accepted = evaluate(HOST, &response(ResponseCode::NoError, answers), &k);
        assert!(accepted.is_ok());
    }

    #[test]
    fn noerror_without_answers_is_no_records() {
        let err = evaluate(HOST, &response(ResponseCode::NoError, vec![]), &key(1)).unwrap_err();
        assert_eq!(err.reason(), "no-sshfp-records");
    }

    struct Canned {
        response: Mutex<Option<Result<Message>>>,
        seen: Mutex<Vec<Message>>,
    }

    impl Canned {
        fn new(response: Result<Message>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Resolve for Canned {
        async fn exchange(&self, request: &Message) -> Result<Message> {
            self.seen.lock().unwrap().push(request.clone());
            let mut response = self.response.lock().unwrap().take().unwrap()?;
            response.set_id(request.id());
            Ok(response)
        }

        fn describe(&self) -> String {
            "canned".into()
        }
    }

    #[tokio::test]
    async fn verify_sends_sshfp_query_for_fqdn() {
        let k = key(7);
        let answers = vec![sshfp_answer(
            Algorithm::Ed25519,
            HickoryFpType::SHA256,
            k.sha256().to_vec(),
        )];
        let verifier = Verifier::new(Canned::new(Ok(response(ResponseCode::NoError, answers))));

        let accepted = verifier.verify("example.com:22", &k).await.unwrap();
        assert_eq!(accepted.host(), "example.com");

        let seen = verifier.resolver().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let query = &seen[0].queries()[0];
        assert_eq!(query.name().to_ascii(), "example.com.");
        assert_eq!(query.query_type(), RecordType::SSHFP);
        assert!(seen[0].recursion_desired());
    }

    #[test]
    fn verify_propagates_resolver_errors() {
        let verifier = Verifier::new(Canned::new(Err(VerifyError::resolver(
            "canned",
            "connection refused",
        ))));
        let err = tokio_test::block_on(verifier.verify(HOST, &key(1))).unwrap_err();
        assert_eq!(err.reason(), "resolver-error");
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn verify_rejects_presented_key_that_differs_from_published() {
        let published = key(1);
        let presented = key(2);
        let answers = vec![sshfp_answer(
            Algorithm::Ed25519,
            HickoryFpType::SHA256,
            published.sha256().to_vec(),
        )];
        let verifier = Verifier::new(Canned::new(Ok(response(ResponseCode::NoError, answers))));
        let err = verifier.verify(HOST, &presented).await.unwrap_err();
        assert!(err.is_mismatch());
    }
}
