//! Per-connection read loop
//!
//! Socket reads land in a growable `BytesMut`; every complete frame in the
//! buffer is processed in place (bucket authorization, validation, decode,
//! dispatch) before the next read. A zero length prefix is a ping and gets
//! a one-byte pong. In ack mode every frame is answered with one status
//! byte; a client timeout ends the connection without one.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use skiff_clock::Clock;
use skiff_protocol::transport::{RESP_ACK_NOK, RESP_ACK_OK, RESP_PONG};
use skiff_protocol::{Entry, EntryRef, LENGTH_PREFIX_SIZE, ProtocolError, validate_frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::server::TlsStream;
use tokio_util::sync::CancellationToken;

use crate::processor::EntryProcessor;
use crate::{Result, ServerError};

/// Smallest non-ping frame: length prefix plus a bucket id.
const MIN_FRAME_LEN: usize = 6;

/// Initial read buffer capacity; a larger buffer batches small frames into
/// fewer syscalls.
const READ_BUFFER_CAPACITY: usize = 128 * 1024;

pub(crate) struct Connection {
    stream: TlsStream<TcpStream>,
    peer_addr: SocketAddr,
    authorized_buckets: Vec<u32>,
    ack: bool,
    processor: Arc<dyn EntryProcessor>,
    clock: Arc<dyn Clock>,
    client_timeout: Duration,
    no_copy: bool,
    entry: Entry,
    connected_at: u64,
    last_active: u64,
    entries_received: u64,
    entries_succeeded: u64,
    pings_received: u64,
    pongs_sent: u64,
}

impl Connection {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        stream: TlsStream<TcpStream>,
        peer_addr: SocketAddr,
        authorized_buckets: Vec<u32>,
        ack: bool,
        processor: Arc<dyn EntryProcessor>,
        clock: Arc<dyn Clock>,
        client_timeout: Duration,
        no_copy: bool,
    ) -> Self {
        let now = clock.unix_now();

        Self {
            stream,
            peer_addr,
            authorized_buckets,
            ack,
            processor,
            clock,
            client_timeout,
            no_copy,
            entry: Entry::new(),
            connected_at: now,
            last_active: now,
            entries_received: 0,
            entries_succeeded: 0,
            pings_received: 0,
            pongs_sent: 0,
        }
    }

    pub(crate) async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut buf = BytesMut::with_capacity(READ_BUFFER_CAPACITY);

        let result = loop {
            if let Err(err) = self.process_buffer(&mut buf).await {
                break Err(err);
            }

            let read = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                read = timeout(self.client_timeout, self.stream.read_buf(&mut buf)) => read,
            };

            match read {
                Ok(Ok(0)) => {
                    if buf.is_empty() {
                        break Ok(());
                    }

                    // Stream ended in the middle of a frame.
                    break Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
                }
                Ok(Ok(_)) => {}
                Ok(Err(err)) => break Err(err.into()),
                Err(_) => break Err(ServerError::ClientTimeout),
            }
        };

        self.log_summary();
        let _ = self.stream.shutdown().await;

        result
    }

    /// Process every complete frame currently buffered.
    async fn process_buffer(&mut self, buf: &mut BytesMut) -> Result<()> {
        loop {
            let total = match peek_frame_len(buf) {
                Ok(Some(total)) => total,
                Ok(None) => return Ok(()),
                Err(err) => {
                    if self.ack {
                        let _ = self.send_ack(RESP_ACK_NOK).await;
                    }
                    return Err(err);
                }
            };

            self.last_active = self.clock.unix_now();

            // A zero length is a ping; answer with a one-byte pong.
            if total == 0 {
                self.pings_received += 1;
                self.stream.write_all(&[RESP_PONG]).await?;
                self.stream.flush().await?;
                self.pongs_sent += 1;
                buf.advance(LENGTH_PREFIX_SIZE);
                continue;
            }

            self.entries_received += 1;

            let result = self.handle_entry(&buf[..total]).await;
            buf.advance(total);

            match result {
                Ok(()) => {
                    self.entries_succeeded += 1;

                    if self.ack {
                        self.send_ack(RESP_ACK_OK).await?;
                    }
                }
                Err(err) => {
                    // NAK'd best-effort before the connection ends.
                    if self.ack {
                        let _ = self.send_ack(RESP_ACK_NOK).await;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn handle_entry(&mut self, frame: &[u8]) -> Result<()> {
        let bucket_id = u32::from_be_bytes([frame[2], frame[3], frame[4], frame[5]]);

        if !self.bucket_allowed(bucket_id) {
            return Err(ServerError::ForbiddenBucket(bucket_id));
        }

        validate_frame(frame)?;

        if self.no_copy {
            let view = EntryRef::parse(frame)?;
            self.processor
                .process_entry(&view)
                .await
                .map_err(ServerError::Processor)?;
        } else {
            self.entry.decode(frame)?;
            self.processor
                .process_entry(&self.entry.view())
                .await
                .map_err(ServerError::Processor)?;
        }

        Ok(())
    }

    /// An empty authorization set accepts every bucket.
    fn bucket_allowed(&self, bucket_id: u32) -> bool {
        self.authorized_buckets.is_empty() || self.authorized_buckets.contains(&bucket_id)
    }

    async fn send_ack(&mut self, status: u8) -> Result<()> {
        self.stream.write_all(&[status]).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn log_summary(&self) {
        if self.entries_received == 0 && self.pings_received == 0 {
            return;
        }

        let now = self.clock.unix_now();
        tracing::info!(
            peer = %self.peer_addr,
            entries_received = self.entries_received,
            entries_succeeded = self.entries_succeeded,
            pings_received = self.pings_received,
            pongs_sent = self.pongs_sent,
            seconds_connected = now.saturating_sub(self.connected_at),
            seconds_idle = now.saturating_sub(self.last_active),
            "connection finished"
        );
    }
}

/// Peek at the next frame length without consuming the buffer.
///
/// Returns:
/// - `Ok(Some(0))` for a buffered ping (a zero length prefix)
/// - `Ok(Some(len))` when a complete frame of `len` bytes is buffered
/// - `Ok(None)` when more data is needed
/// - `Err` when the declared length is below the smallest valid frame
fn peek_frame_len(buf: &BytesMut) -> Result<Option<usize>> {
    if buf.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let total = u16::from_be_bytes([buf[0], buf[1]]) as usize;

    if total == 0 {
        return Ok(Some(0));
    }

    if total < MIN_FRAME_LEN {
        return Err(ProtocolError::TooShort { actual: total }.into());
    }

    if buf.len() < total {
        return Ok(None);
    }

    Ok(Some(total))
}
