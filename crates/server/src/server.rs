//! TLS server: listener setup and accept loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::ServerConfig;
use skiff_auth::{Certificate, CertificateKind, PrivateKey};
use skiff_clock::{Clock, CoarseClock};
use skiff_protocol::transport::{PROTO_V1, PROTO_V1_1_ACK, is_ack_protocol};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::processor::EntryProcessor;
use crate::verifier::ShapeVerifier;
use crate::{AUTH_TIMEOUT, DEFAULT_CLIENT_TIMEOUT, Result, ServerError};

/// Application hook that can reject an authenticated peer.
///
/// Runs once per connection, right after the handshake, with a one second
/// timeout; a timeout counts as rejection.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, certificate: &Certificate) -> Result<()>;
}

/// Server configuration.
pub struct TlsServerOptions {
    /// Bind address, e.g. `0.0.0.0:4610`.
    pub address: String,

    /// Private key matching `certificate`.
    pub private_key: PrivateKey,

    /// Server certificate presented during the handshake.
    pub certificate: Certificate,

    /// Root CA used to authenticate clients.
    pub root_ca: Certificate,

    /// Receives every decoded entry.
    pub entry_processor: Arc<dyn EntryProcessor>,

    /// Per-read timeout; a silent client is dropped after this long.
    pub client_timeout: Duration,

    /// Optional per-connection authentication hook.
    pub authenticator: Option<Arc<dyn Authenticator>>,

    /// Decode entries without copying string data out of the receive
    /// buffer.
    pub no_copy: bool,

    /// Time source; a coarse 1 Hz clock is started when unset.
    pub clock: Option<Arc<dyn Clock>>,
}

impl TlsServerOptions {
    /// Options with defaults for everything optional.
    pub fn new(
        address: impl Into<String>,
        private_key: PrivateKey,
        certificate: Certificate,
        root_ca: Certificate,
        entry_processor: Arc<dyn EntryProcessor>,
    ) -> Self {
        Self {
            address: address.into(),
            private_key,
            certificate,
            root_ca,
            entry_processor,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
            authenticator: None,
            no_copy: false,
            clock: None,
        }
    }
}

/// Collector-side TLS endpoint.
pub struct TlsServer {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

struct Shared {
    entry_processor: Arc<dyn EntryProcessor>,
    authenticator: Option<Arc<dyn Authenticator>>,
    client_timeout: Duration,
    no_copy: bool,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl TlsServer {
    /// Validate the material, set up TLS and bind the listener.
    pub async fn bind(options: TlsServerOptions) -> Result<Self> {
        options.certificate.validate(&options.private_key)?;

        if options.certificate.kind()? != Some(CertificateKind::Server) {
            return Err(ServerError::NotServerCertificate);
        }

        let verifier = ShapeVerifier::new(&options.root_ca)?;

        let mut config = ServerConfig::builder_with_protocol_versions(&[&rustls::version::TLS13])
            .with_client_cert_verifier(verifier)
            .with_single_cert(
                vec![options.certificate.to_rustls()],
                options.private_key.to_rustls(),
            )?;
        config.alpn_protocols = vec![PROTO_V1_1_ACK.to_vec(), PROTO_V1.to_vec()];

        let listener = TcpListener::bind(&options.address).await?;
        let local_addr = listener.local_addr()?;

        let cancel = CancellationToken::new();
        let clock = match options.clock {
            Some(clock) => clock,
            None => CoarseClock::start(cancel.child_token()),
        };

        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(Arc::new(config)),
            local_addr,
            shared: Arc::new(Shared {
                entry_processor: options.entry_processor,
                authenticator: options.authenticator,
                client_timeout: options.client_timeout,
                no_copy: options.no_copy,
                clock,
                cancel,
            }),
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until cancelled or the listener fails.
    ///
    /// Each connection runs in its own task; a failed connection never
    /// takes the accept loop down, but a listener failure does.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(address = %self.local_addr, "log server listening");

        loop {
            let accepted = tokio::select! {
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    let acceptor = self.acceptor.clone();
                    let shared = Arc::clone(&self.shared);
                    let conn_cancel = cancel.child_token();

                    tokio::spawn(async move {
                        if let Err(err) =
                            handle_connection(acceptor, shared, stream, peer_addr, conn_cancel)
                                .await
                        {
                            tracing::debug!(peer = %peer_addr, error = %err, "connection ended");
                        }
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "listener failed");
                    self.shared.cancel.cancel();
                    return Err(err.into());
                }
            }
        }

        self.shared.cancel.cancel();
        tracing::info!(address = %self.local_addr, "log server stopped");

        Ok(())
    }
}

async fn handle_connection(
    acceptor: TlsAcceptor,
    shared: Arc<Shared>,
    stream: TcpStream,
    peer_addr: SocketAddr,
    cancel: CancellationToken,
) -> Result<()> {
    stream.set_nodelay(true)?;

    let stream = match timeout(shared.client_timeout, acceptor.accept(stream)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => return Err(err.into()),
        Err(_) => return Err(ServerError::ClientTimeout),
    };

    let (_, server_conn) = stream.get_ref();

    let peer_der = server_conn
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or(ServerError::MissingPeerCertificate)?;
    let peer_cert = Certificate::from_der(peer_der.as_ref().to_vec())?;

    let ack = server_conn
        .alpn_protocol()
        .is_some_and(is_ack_protocol);

    if let Some(authenticator) = &shared.authenticator {
        match timeout(AUTH_TIMEOUT, authenticator.authenticate(&peer_cert)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) | Err(_) => return Err(ServerError::Unauthorized),
        }
    }

    let authorized_buckets = peer_cert.bucket_ids()?;
    let cert_id = peer_cert.id()?;

    tracing::debug!(
        peer = %peer_addr,
        certificate = %cert_id,
        ack,
        buckets = ?authorized_buckets,
        "connection authenticated"
    );

    let mut connection = Connection::new(
        stream,
        peer_addr,
        authorized_buckets,
        ack,
        Arc::clone(&shared.entry_processor),
        Arc::clone(&shared.clock),
        shared.client_timeout,
        shared.no_copy,
    );

    connection.run(cancel).await
}
