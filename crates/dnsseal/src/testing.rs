//! Shared fixtures for unit tests.

use std::io::Read;
use std::iter;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dnsseal_verify::verifier::evaluate_records;
use dnsseal_verify::{AcceptedKey, CandidateKey, Resolve, SshfpAlgorithm, SshfpRecord};
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::sshfp::{Algorithm, FingerprintType};
use hickory_proto::rr::rdata::SSHFP;
use hickory_proto::rr::{Name, RData, Record};
use ssh_key::private::{Ed25519Keypair, KeypairData};
use ssh_key::{LineEnding, PrivateKey};

pub struct KeyPair {
    pub pem: String,
    pub candidate: CandidateKey,
}

/// Deterministic Ed25519 key pair.
pub fn key_pair(seed: u8) -> KeyPair {
    let keypair = Ed25519Keypair::from_seed(&[seed; 32]);
    let private = PrivateKey::new(KeypairData::Ed25519(keypair), "dnsseal-test").unwrap();
    let blob = private.public_key().to_bytes().unwrap();
    let pem = private.to_openssh(LineEnding::LF).unwrap().to_string();
    KeyPair {
        pem,
        candidate: CandidateKey::new("ssh-ed25519", blob),
    }
}

/// Accept `candidate` the way the verifier would after a matching lookup.
pub fn accepted(candidate: &CandidateKey) -> AcceptedKey {
    let record = SshfpRecord {
        algorithm: SshfpAlgorithm::Ed25519,
        fingerprint_type: dnsseal_verify::FingerprintType::Sha256,
        fingerprint: candidate.sha256().to_vec(),
    };
    evaluate_records("example.com", &[record], candidate).unwrap()
}

/// Response carrying one Ed25519/SHA-256 record per published key.
pub fn sshfp_response(code: ResponseCode, published: &[&CandidateKey]) -> Message {
    let mut message = Message::new();
    message
        .set_message_type(MessageType::Response)
        .set_response_code(code);
    for key in published {
        message.add_answer(Record::from_rdata(
            Name::from_ascii("example.com.").unwrap(),
            300,
            RData::SSHFP(SSHFP::new(
                Algorithm::Ed25519,
                FingerprintType::SHA256,
                key.sha256().to_vec(),
            )),
        ));
    }
    message
}

/// Resolver returning a prepared response.
pub struct Canned {
    response: Mutex<Option<Message>>,
    repeat: bool,
    calls: AtomicUsize,
}

impl Canned {
    pub fn answering(response: Message) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            repeat: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answering_repeatedly(response: Message) -> Self {
        Self {
            repeat: true,
            ..Self::answering(response)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolve for Canned {
    async fn exchange(&self, request: &Message) -> dnsseal_verify::Result<Message> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.response.lock().unwrap();
        let mut response = if self.repeat {
            slot.clone().unwrap()
        } else {
            slot.take().unwrap()
        };
        response.set_id(request.id());
        Ok(response)
    }

    fn describe(&self) -> String {
        "canned".into()
    }
}

/// Decrypt armored age output with the key pair's private half.
pub fn decrypt(armored: &[u8], pair: &KeyPair) -> String {
    let identity = age::ssh::Identity::from_buffer(pair.pem.as_bytes(), None).unwrap();
    let decryptor = age::Decryptor::new(age::armor::ArmoredReader::new(armored)).unwrap();
    let mut reader = decryptor
        .decrypt(iter::once(&identity as &dyn age::Identity))
        .unwrap();
    let mut plaintext = String::new();
    reader.read_to_string(&mut plaintext).unwrap();
    plaintext
}
