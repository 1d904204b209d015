//! # dnsseal-verify
//!
//! SSH host key verification against SSHFP records (RFC 4255).
//!
//! ## Trust boundary
//!
//! Signatures are not checked here. The configured resolver must validate
//! DNSSEC and only answer NOERROR with authenticated data. Point it at a
//! validating resolver you trust, over a path you trust (`tcp-tls` when the
//! network between you and it is not).
//!
//! ## Flow
//!
//! ```text
//! host ──> FQDN "host." ──> SSHFP query (RD, EDNS0 4096, DO)
//!      ──> resolver (udp | tcp | tcp-tls)
//!      ──> RCODE must be NOERROR
//!      ──> SSHFP answers for the key's algorithm
//!      ──> SHA-256(key wire blob) == every SHA-256 record
//!      ──> AcceptedKey
//! ```

pub mod error;
pub mod key;
pub mod query;
pub mod resolver;
pub mod sshfp;
pub mod verifier;

pub use error::{Result, VerifyError};
pub use key::{AcceptedKey, CandidateKey};
pub use query::{ResolverConfig, Transport};
pub use resolver::{DnsClient, Resolve};
pub use sshfp::{FingerprintType, SshfpAlgorithm, SshfpRecord};
pub use verifier::Verifier;
