//! Shared connection state
//!
//! The writer owns connecting; the ack reader only ever borrows the read
//! half. Each half sits behind its own async mutex so a blocked frame write
//! never delays an acknowledgement read, and disconnecting from either task
//! is idempotent.

use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_rustls::client::TlsStream;

pub(crate) type TlsWriteHalf = WriteHalf<TlsStream<TcpStream>>;
pub(crate) type TlsReadHalf = ReadHalf<TlsStream<TcpStream>>;

/// Snapshot of the connection, published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ConnState {
    /// Bumped on every install, so watchers always observe a change.
    pub generation: u64,
    pub connected: bool,
    /// Whether the negotiated ALPN token selects ack mode.
    pub ack: bool,
}

pub(crate) struct Conn {
    pub(crate) write: Mutex<Option<TlsWriteHalf>>,
    pub(crate) read: Mutex<Option<TlsReadHalf>>,
    state: watch::Sender<ConnState>,
    // Keeps the channel alive while no task is subscribed.
    _state_rx: watch::Receiver<ConnState>,
}

impl Conn {
    pub(crate) fn new() -> Self {
        let (state, state_rx) = watch::channel(ConnState::default());

        Self {
            write: Mutex::new(None),
            read: Mutex::new(None),
            state,
            _state_rx: state_rx,
        }
    }

    /// Adopt a freshly established connection.
    pub(crate) async fn install(&self, stream: TlsStream<TcpStream>, ack: bool) {
        let (read_half, write_half) = tokio::io::split(stream);

        *self.write.lock().await = Some(write_half);
        *self.read.lock().await = Some(read_half);

        self.state.send_modify(|state| {
            state.generation += 1;
            state.connected = true;
            state.ack = ack;
        });
    }

    /// Drop both halves. Safe to call from either task, any number of times.
    pub(crate) async fn disconnect(&self) {
        let write_half = self.write.lock().await.take();
        let read_half = self.read.lock().await.take();

        if write_half.is_some() || read_half.is_some() {
            self.state.send_modify(|state| {
                state.generation += 1;
                state.connected = false;
            });
        }
    }

    /// Current connection snapshot.
    pub(crate) fn current(&self) -> ConnState {
        *self.state.borrow()
    }

    /// Subscribe to connection changes.
    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnState> {
        self.state.subscribe()
    }
}
