//! Acknowledgement reader task
//!
//! Active only while the negotiated ALPN token selects ack mode. Consumes
//! one status byte per emitted frame, releasing ring slots in emission
//! order. A timeout or read error tears the connection down and rewinds the
//! ring, so every unacknowledged frame is replayed on the next connection.

use std::sync::Arc;
use std::time::Duration;

use skiff_buffer::RingError;
use skiff_protocol::transport::RESP_ACK_NOK;
use tokio::io::AsyncReadExt;
use tokio::time::timeout;

use crate::ClientError;
use crate::client::Inner;

/// Re-check cadence while the connection is up but not in ack mode (the
/// writer releases slots itself there).
const NON_ACK_POLL: Duration = Duration::from_millis(50);

pub(crate) async fn run(inner: Arc<Inner>) {
    let mut state_rx = inner.conn.subscribe();

    loop {
        let wait = tokio::select! {
            _ = inner.cancel.cancelled() => break,
            result = inner.ring.wait_until_read() => result,
        };

        match wait {
            Ok(_) => {}
            Err(RingError::Eof) => break,
            Err(_) => break,
        }

        let state = inner.conn.current();

        if !(state.connected && state.ack) {
            tokio::select! {
                _ = inner.cancel.cancelled() => break,
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(NON_ACK_POLL) => {}
            }
            continue;
        }

        let mut guard = inner.conn.read.lock().await;

        let Some(read_half) = guard.as_mut() else {
            continue;
        };

        let mut status = [0u8; 1];
        let result = match timeout(inner.server_ack_timeout, read_half.read_exact(&mut status)).await
        {
            Ok(Ok(_)) => Ok(status[0]),
            Ok(Err(err)) => Err(ClientError::Io(err)),
            Err(_) => Err(ClientError::AckTimeout),
        };
        drop(guard);

        match result {
            Ok(status) => {
                inner.ring.ack();

                if status == RESP_ACK_NOK {
                    tracing::debug!("server rejected a frame");
                }
            }
            Err(err) => {
                inner.report(&err);
                inner.conn.disconnect().await;
                let rewound = inner.ring.rewind();
                tracing::debug!(rewound, "rewound after ack failure");
            }
        }
    }

    tracing::debug!("ack reader stopped");
}
