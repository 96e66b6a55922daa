//! Writer task
//!
//! Moves frames from the ring buffer to the collector, one at a time.
//! Owns the connection: dials, reconnects with backoff, and tears down on
//! any transport error. In a non-ack connection the writer also releases
//! each slot right after a completed write, since no acknowledgement will
//! ever arrive for it.

use std::sync::Arc;
use std::time::Duration;

use skiff_buffer::RingError;
use skiff_protocol::MAX_ENTRY_SIZE;
use skiff_protocol::transport::is_ack_protocol;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::backoff::Backoff;
use crate::client::Inner;
use crate::{ClientError, DIAL_TIMEOUT, Result};

/// How long the writer naps while waiting for outstanding acks during a
/// drain, between rewind checks.
const DRAIN_POLL: Duration = Duration::from_millis(25);

pub(crate) async fn run(inner: Arc<Inner>) {
    let mut scratch = vec![0u8; MAX_ENTRY_SIZE].into_boxed_slice();
    let mut backoff = Backoff::new();

    loop {
        let wait = tokio::select! {
            _ = inner.cancel.cancelled() => break,
            result = inner.ring.wait() => result,
        };

        match wait {
            Ok(_) => {}
            Err(RingError::Eof) => {
                if inner.ring.is_empty() {
                    break;
                }

                // Writing is closed but frames still await acknowledgement;
                // an ack failure may yet rewind them into the unread region.
                tokio::select! {
                    _ = inner.cancel.cancelled() => break,
                    _ = tokio::time::sleep(DRAIN_POLL) => {}
                }
                continue;
            }
            Err(_) => break,
        }

        if !ensure_connected(&inner, &mut backoff).await {
            break;
        }

        let mut frame_len = 0usize;
        let pulled = inner.ring.read_to_callback(
            |slot| {
                let len = (u16::from_be_bytes([slot[0], slot[1]]) as usize).min(slot.len());
                scratch[..len].copy_from_slice(&slot[..len]);
                frame_len = len;
                Ok(())
            },
            true,
        );

        match pulled {
            Ok(()) => {}
            Err(RingError::Empty) => continue,
            Err(_) => break,
        }

        match write_frame(&inner, &scratch[..frame_len]).await {
            Ok(ack_mode) => {
                if !ack_mode {
                    inner.ring.ack();
                }
            }
            Err(err) => {
                inner.report(&err);
                inner.conn.disconnect().await;
                let rewound = inner.ring.rewind();
                tracing::debug!(rewound, "rewound after write failure");
            }
        }
    }

    inner.conn.disconnect().await;
    tracing::debug!("writer stopped");
}

/// Connect if necessary, retrying with backoff until connected or
/// cancelled. Returns false when cancelled.
async fn ensure_connected(inner: &Inner, backoff: &mut Backoff) -> bool {
    if inner.conn.current().connected {
        return true;
    }

    loop {
        if inner.cancel.is_cancelled() {
            return false;
        }

        match connect(inner).await {
            Ok(()) => {
                backoff.reset();
                return true;
            }
            Err(err) => {
                inner.report(&err);

                let delay = backoff.next();
                tokio::select! {
                    _ = inner.cancel.cancelled() => return false,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

async fn connect(inner: &Inner) -> Result<()> {
    let tcp = timeout(DIAL_TIMEOUT, TcpStream::connect(&inner.address))
        .await
        .map_err(|_| ClientError::DialTimeout)??;
    tcp.set_nodelay(true)?;

    let stream = timeout(
        DIAL_TIMEOUT,
        inner.connector.connect(inner.server_name.clone(), tcp),
    )
    .await
    .map_err(|_| ClientError::DialTimeout)??;

    let ack = stream
        .get_ref()
        .1
        .alpn_protocol()
        .is_some_and(is_ack_protocol);

    inner.conn.install(stream, ack).await;
    tracing::debug!(address = %inner.address, ack, "connected to collector");

    Ok(())
}

/// Write one frame, all or nothing. Returns whether the connection is in
/// ack mode.
async fn write_frame(inner: &Inner, frame: &[u8]) -> Result<bool> {
    let mut guard = inner.conn.write.lock().await;

    let Some(write_half) = guard.as_mut() else {
        return Err(ClientError::Io(std::io::Error::from(
            std::io::ErrorKind::NotConnected,
        )));
    };

    let write = async {
        write_half.write_all(frame).await?;
        write_half.flush().await
    };

    match timeout(inner.write_timeout, write).await {
        Ok(Ok(())) => Ok(inner.conn.current().ack),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err(ClientError::WriteTimeout),
    }
}
