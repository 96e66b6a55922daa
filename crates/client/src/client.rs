//! TLS client construction and lifecycle

use std::sync::Arc;
use std::time::Duration;

use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::ServerName;
use skiff_auth::{Certificate, CertificateKind, PrivateKey};
use skiff_buffer::RingBuffer;
use skiff_clock::{Clock, CoarseClock};
use skiff_protocol::transport::{PROTO_V1, PROTO_V1_1_ACK};
use skiff_protocol::{Entry, EntryId, MAX_ENTRY_SIZE};
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use tokio_util::sync::CancellationToken;

use crate::conn::Conn;
use crate::{
    ClientError, DEFAULT_ACK_TIMEOUT, DEFAULT_BUFFER_SIZE, DEFAULT_WRITE_TIMEOUT, Result, ack,
    writer,
};

/// Callback for non-fatal pipeline errors.
pub type ErrorHandler = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Client configuration.
///
/// Everything beyond the four required pieces has a default: buffer of 128
/// entries, 3 s ack timeout, 5 s write timeout, coarse clock, no error
/// handler (errors are logged at debug level only).
pub struct TlsClientOptions {
    /// Collector host:port, e.g. `logs.example.com:4610`.
    pub address: String,

    /// Private key matching `certificate`.
    pub private_key: PrivateKey,

    /// Client certificate presented during the handshake.
    pub certificate: Certificate,

    /// Root CA used to authenticate the server.
    pub root_ca: Certificate,

    /// Ring buffer capacity, in entries.
    pub buffer_size: usize,

    /// How long to wait for one server acknowledgement byte.
    pub server_ack_timeout: Duration,

    /// How long to wait for one frame write.
    pub write_timeout: Duration,

    /// Callback for non-fatal errors.
    pub error_handler: Option<ErrorHandler>,

    /// Time source; a coarse 1 Hz clock is started when unset.
    pub clock: Option<Arc<dyn Clock>>,
}

impl TlsClientOptions {
    /// Options with defaults for everything optional.
    pub fn new(
        address: impl Into<String>,
        private_key: PrivateKey,
        certificate: Certificate,
        root_ca: Certificate,
    ) -> Self {
        Self {
            address: address.into(),
            private_key,
            certificate,
            root_ca,
            buffer_size: DEFAULT_BUFFER_SIZE,
            server_ack_timeout: DEFAULT_ACK_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            error_handler: None,
            clock: None,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) ring: RingBuffer,
    pub(crate) conn: Conn,
    pub(crate) connector: TlsConnector,
    pub(crate) server_name: ServerName<'static>,
    pub(crate) address: String,
    pub(crate) server_ack_timeout: Duration,
    pub(crate) write_timeout: Duration,
    pub(crate) error_handler: Option<ErrorHandler>,
    pub(crate) cancel: CancellationToken,
}

impl Inner {
    /// Report a non-fatal error to the handler, if any.
    pub(crate) fn report(&self, err: &ClientError) {
        tracing::debug!(error = %err, "client error");

        if let Some(handler) = &self.error_handler {
            handler(err);
        }
    }
}

/// Producer-side pipeline: encode, buffer, stream over mutual TLS.
///
/// Entries are enqueued under the replace policy: when the collector is
/// unreachable long enough for the ring to fill, the oldest entries drop
/// first and delivery resumes where the buffer stands.
pub struct TlsClient {
    inner: Arc<Inner>,
    clock: Arc<dyn Clock>,
    bucket_ids: Vec<u32>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl TlsClient {
    /// Validate the material, set up TLS and start the background tasks.
    ///
    /// Fails when the certificate does not validate against the key or is
    /// not a client certificate. Must be called within a tokio runtime.
    pub fn start(options: TlsClientOptions) -> Result<Self> {
        options.certificate.validate(&options.private_key)?;

        if options.certificate.kind()? != Some(CertificateKind::Client) {
            return Err(ClientError::NotClientCertificate);
        }

        let bucket_ids = options.certificate.bucket_ids()?;

        let mut roots = RootCertStore::empty();
        roots
            .add(options.root_ca.to_rustls())
            .map_err(ClientError::Tls)?;

        let mut config = ClientConfig::builder_with_protocol_versions(&[&rustls::version::TLS13])
            .with_root_certificates(roots)
            .with_client_auth_cert(
                vec![options.certificate.to_rustls()],
                options.private_key.to_rustls(),
            )?;
        config.alpn_protocols = vec![PROTO_V1_1_ACK.to_vec(), PROTO_V1.to_vec()];

        let host = options
            .address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ClientError::InvalidAddress(options.address.clone()))?;

        let server_name = ServerName::try_from(host.to_owned())
            .map_err(|_| ClientError::InvalidAddress(options.address.clone()))?;

        let cancel = CancellationToken::new();
        let clock: Arc<dyn Clock> = match options.clock {
            Some(clock) => clock,
            None => CoarseClock::start(cancel.child_token()),
        };

        let buffer_size = options.buffer_size.max(1);

        let inner = Arc::new(Inner {
            ring: RingBuffer::new(buffer_size, MAX_ENTRY_SIZE),
            conn: Conn::new(),
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
            address: options.address,
            server_ack_timeout: options.server_ack_timeout,
            write_timeout: options.write_timeout,
            error_handler: options.error_handler,
            cancel,
        });

        let writer = tokio::spawn(writer::run(Arc::clone(&inner)));
        let ack_reader = tokio::spawn(ack::run(Arc::clone(&inner)));

        tracing::info!(address = %inner.address, buffer_size, "log client started");

        Ok(Self {
            inner,
            clock,
            bucket_ids,
            tasks: parking_lot::Mutex::new(vec![writer, ack_reader]),
        })
    }

    /// Encode the entry and enqueue it for delivery.
    ///
    /// Never blocks: when the buffer is full, the oldest buffered entry is
    /// replaced. Returns false once the client is closing and the entry was
    /// not accepted.
    pub fn process_entry(&self, entry: &Entry) -> bool {
        self.inner.ring.write_or_replace(|slot| {
            entry.encode(slot);
        })
    }

    /// A fresh entry id stamped with the client's clock.
    pub fn new_entry_id(&self) -> EntryId {
        EntryId::new(self.clock.unix_now() as u32)
    }

    /// The client's time source.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// The single bucket id the certificate authorizes, when there is
    /// exactly one.
    pub fn bucket_id(&self) -> Option<u32> {
        match self.bucket_ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// All bucket ids the certificate authorizes.
    pub fn bucket_ids(&self) -> &[u32] {
        &self.bucket_ids
    }

    /// Number of entries currently buffered (including unacknowledged).
    pub fn pending(&self) -> usize {
        self.inner.ring.len()
    }

    /// Stop accepting entries, deliver everything buffered, then close.
    ///
    /// Cancelling `token` abandons the drain and hard-closes immediately.
    pub async fn close_graceful_with(&self, token: CancellationToken) {
        self.inner.ring.close_writing();

        tokio::select! {
            result = self.inner.ring.wait_until_empty() => {
                if let Err(err) = result {
                    tracing::debug!(error = %err, "drain interrupted");
                }
            }
            _ = token.cancelled() => {
                tracing::debug!("graceful close cancelled, closing hard");
            }
        }

        self.close().await;
    }

    /// Stop accepting entries, deliver everything buffered, then close.
    pub async fn close_graceful(&self) {
        self.close_graceful_with(CancellationToken::new()).await;
    }

    /// Cancel the background tasks and close the socket immediately.
    ///
    /// Buffered entries that were not delivered are lost.
    pub async fn close(&self) {
        self.inner.cancel.cancel();
        self.inner.ring.close();
        self.inner.conn.disconnect().await;

        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }

        tracing::info!(address = %self.inner.address, "log client closed");
    }
}

impl std::fmt::Debug for TlsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsClient")
            .field("address", &self.inner.address)
            .field("pending", &self.inner.ring.len())
            .finish_non_exhaustive()
    }
}
