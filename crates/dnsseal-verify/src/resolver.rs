//! One-shot DNS exchanges with a single validating resolver.
//!
//! Transports come from hickory-proto's client streams. Each call opens its
//! own connection and aborts the connection driver before returning, so error
//! paths never leak descriptors. No retries, no fallback servers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::runtime::{TokioRuntimeProvider, TokioTime};
use hickory_proto::rustls::tls_client_connect;
use hickory_proto::tcp::TcpClientStream;
use hickory_proto::udp::UdpClientStream;
use hickory_proto::xfer::{
    DnsExchange, DnsHandle, DnsMultiplexer, DnsRequest, DnsRequestOptions, DnsRequestSender,
    FirstAnswer,
};
use hickory_proto::{ProtoError, ProtoErrorKind};
use tokio::task::JoinHandle;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::ServerName;
use tracing::debug;

use crate::error::{Result, VerifyError};
use crate::query::{ResolverConfig, Transport};

/// Sends a query and returns the resolver's answer.
///
/// Implementations are trusted for DNSSEC status: a NOERROR answer is taken
/// as authenticated data.
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Exchange one query for one response.
    async fn exchange(&self, request: &Message) -> Result<Message>;

    /// Human-readable resolver identity for logs and errors.
    fn describe(&self) -> String;
}

/// Resolver client speaking UDP, TCP or DNS-over-TLS.
#[derive(Debug, Clone)]
pub struct DnsClient {
    config: ResolverConfig,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl DnsClient {
    /// Create a client. Fails if the settings are unusable.
    ///
    /// DNS-over-TLS trusts the webpki root set.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_root_certificates(config, roots)
    }

    /// Create a client whose DNS-over-TLS sessions trust only `roots`, for
    /// resolvers behind a private CA.
    pub fn with_root_certificates(
        config: ResolverConfig,
        roots: rustls::RootCertStore,
    ) -> Result<Self> {
        config.validate()?;
        let tls = match config.transport {
            Transport::TcpTls => Some(Arc::new(tls_config(&config, roots)?)),
            Transport::Udp | Transport::Tcp => None,
        };
        Ok(Self { config, tls })
    }

    /// The settings this client was built with.
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn error(&self, message: impl std::fmt::Display) -> VerifyError {
        VerifyError::resolver(self.describe(), message)
    }

    fn timed_out(&self) -> VerifyError {
        self.error(format!(
            "no answer within {}s",
            self.config.timeout.as_secs_f32()
        ))
    }

    fn transport_error(&self, error: &ProtoError) -> VerifyError {
        if matches!(error.kind(), ProtoErrorKind::Timeout) {
            self.timed_out()
        } else {
            self.error(error)
        }
    }

    async fn peer(&self) -> Result<SocketAddr> {
        let endpoint = self.config.endpoint();
        let addr = tokio::net::lookup_host(&endpoint)
            .await
            .map_err(|e| self.error(format!("cannot resolve resolver address: {e}")))?
            .next();
        addr.ok_or_else(|| self.error("resolver address has no usable IP"))
    }

    /// Finish connecting and start the driver task for the connection.
    async fn connect<F, S>(&self, connect: F) -> Result<(DnsExchange, Driver)>
    where
        F: Future<Output = std::result::Result<S, ProtoError>> + Send + Unpin + 'static,
        S: DnsRequestSender + Send + Unpin + 'static,
    {
        let (exchange, background) = DnsExchange::connect::<F, S, TokioTime>(connect)
            .await
            .map_err(|e| match e.kind() {
                ProtoErrorKind::Timeout => self.timed_out(),
                _ => self.error(format!("connect failed: {e}")),
            })?;
        Ok((exchange, Driver(tokio::spawn(background))))
    }

    async fn open(&self, peer: SocketAddr) -> Result<(DnsExchange, Driver)> {
        let provider = TokioRuntimeProvider::new();
        let timeout = self.config.timeout;

        match self.config.transport {
            Transport::Udp => {
                let stream = UdpClientStream::builder(peer, provider)
                    .with_timeout(Some(timeout))
                    .build();
                self.connect(stream).await
            }
            Transport::Tcp => {
                let (stream, handle) = TcpClientStream::new(peer, None, Some(timeout), provider);
                self.connect(DnsMultiplexer::with_timeout(stream, handle, timeout, None))
                    .await
            }
            Transport::TcpTls => {
                let config = self
                    .tls
                    .clone()
                    .ok_or_else(|| VerifyError::Config("TLS settings missing".into()))?;
                let (stream, handle) = tls_client_connect(
                    peer,
                    self.config.tls_server_name().to_owned(),
                    config,
                    provider,
                );
                self.connect(DnsMultiplexer::with_timeout(stream, handle, timeout, None))
                    .await
            }
        }
    }

    async fn round_trip(&self, request: &Message) -> Result<Message> {
        let peer = self.peer().await?;
        debug!(%peer, transport = %self.config.transport, "sending SSHFP query");

        let (exchange, _driver) = self.open(peer).await?;

        let mut options = DnsRequestOptions::default();
        options.use_edns = true;
        options.edns_set_dnssec_ok = true;
        options.recursion_desired = true;

        let response = exchange
            .send(DnsRequest::new(request.clone(), options))
            .first_answer()
            .await
            .map_err(|e| self.transport_error(&e))?;
        Ok(response.into_message())
    }
}

/// Connection driver; aborted when the exchange is finished with it.
struct Driver(JoinHandle<std::result::Result<(), ProtoError>>);

impl Drop for Driver {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn tls_config(
    config: &ResolverConfig,
    roots: rustls::RootCertStore,
) -> Result<rustls::ClientConfig> {
    let name = config.tls_server_name();
    ServerName::try_from(name.to_owned())
        .map_err(|e| VerifyError::Config(format!("invalid TLS name {name:?}: {e}")))?;

    let tls = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| VerifyError::Config(format!("TLS setup failed: {e}")))?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(tls)
}

#[async_trait]
impl Resolve for DnsClient {
    async fn exchange(&self, request: &Message) -> Result<Message> {
        let response = tokio::time::timeout(self.config.timeout, self.round_trip(request))
            .await
            .map_err(|_| self.timed_out())??;

        if response.truncated() {
            return Err(self.error(
                "answer truncated; use the tcp or tcp-tls transport for signed answers",
            ));
        }

        debug!(
            rcode = %response.response_code(),
            answers = response.answers().len(),
            "resolver answered"
        );
        Ok(response)
    }

    fn describe(&self) -> String {
        format!("{} over {}", self.config.endpoint(), self.config.transport)
    }
}
