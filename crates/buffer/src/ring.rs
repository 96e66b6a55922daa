//! Ring buffer implementation

use std::pin::pin;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::RingError;

struct State {
    data: Box<[u8]>,
    start: usize,
    awaiting_ack: usize,
    length: usize,
    items_written: u64,
    items_read: u64,
    closed: bool,
    closed_writing: bool,
}

impl State {
    #[inline]
    fn unread(&self) -> usize {
        self.length - self.awaiting_ack
    }
}

/// Bounded multi-producer, single-consumer buffer of fixed-size byte slots.
///
/// See the [crate documentation](crate) for the region model. All write
/// callbacks receive a full mutable slot; read callbacks receive the full
/// slot contents. Frames carry their own length in their first two bytes, so
/// the buffer never needs to track per-slot lengths.
pub struct RingBuffer {
    state: Mutex<State>,
    readable: Notify,
    writable: Notify,
    capacity: usize,
    slot_size: usize,
}

impl RingBuffer {
    /// Create a buffer with `capacity` slots of `slot_size` bytes each.
    pub fn new(capacity: usize, slot_size: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be nonzero");
        assert!(slot_size > 0, "ring buffer slot size must be nonzero");

        Self {
            state: Mutex::new(State {
                data: vec![0u8; capacity * slot_size].into_boxed_slice(),
                start: 0,
                awaiting_ack: 0,
                length: 0,
                items_written: 0,
                items_read: 0,
                closed: false,
                closed_writing: false,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
            capacity,
            slot_size,
        }
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Write a slot, dropping the oldest slot when the buffer is full.
    ///
    /// An overwritten slot that was awaiting acknowledgement counts as a
    /// dropped in-flight entry: `awaiting_ack` moves down with `start`.
    /// Returns false (without calling `cb`) once writing is closed.
    pub fn write_or_replace(&self, cb: impl FnOnce(&mut [u8])) -> bool {
        let mut state = self.state.lock();

        if state.closed_writing {
            return false;
        }

        self.write_slot(&mut state, cb);
        drop(state);

        self.readable.notify_waiters();
        true
    }

    /// Write a slot, failing when the buffer is full.
    pub fn write_or_fail(&self, cb: impl FnOnce(&mut [u8])) -> bool {
        let mut state = self.state.lock();

        if state.closed_writing || state.length == self.capacity {
            return false;
        }

        self.write_slot(&mut state, cb);
        drop(state);

        self.readable.notify_waiters();
        true
    }

    /// Write a slot, waiting for a free one when the buffer is full.
    ///
    /// Returns false once writing is closed.
    pub async fn write_or_block(&self, cb: impl FnOnce(&mut [u8])) -> bool {
        let mut cb = Some(cb);
        let mut notified = pin!(self.writable.notified());

        loop {
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();

                if state.closed_writing {
                    return false;
                }

                if state.length < self.capacity {
                    if let Some(cb) = cb.take() {
                        self.write_slot(&mut state, cb);
                    }
                    drop(state);

                    self.readable.notify_waiters();
                    return true;
                }
            }

            notified.as_mut().await;
            notified.set(self.writable.notified());
        }
    }

    fn write_slot(&self, state: &mut State, cb: impl FnOnce(&mut [u8])) {
        let index = (state.start + state.length) % self.capacity;
        let offset = index * self.slot_size;
        cb(&mut state.data[offset..offset + self.slot_size]);

        if state.length < self.capacity {
            state.length += 1;
        } else {
            // Full: the slot just written replaced the oldest one.
            state.start = (state.start + 1) % self.capacity;

            if state.awaiting_ack > 0 {
                state.awaiting_ack -= 1;
            }
        }

        state.items_written += 1;
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Wait until there is at least one unread slot.
    ///
    /// Returns the number of unread slots. Fails with [`RingError::Eof`]
    /// once writing is closed and everything unread has been consumed, and
    /// with [`RingError::Closed`] after a hard close.
    pub async fn wait(&self) -> Result<usize, RingError> {
        let mut notified = pin!(self.readable.notified());

        loop {
            notified.as_mut().enable();

            {
                let state = self.state.lock();

                if state.closed {
                    return Err(RingError::Closed);
                }

                if state.unread() > 0 {
                    return Ok(state.unread());
                }

                if state.closed_writing {
                    return Err(RingError::Eof);
                }
            }

            notified.as_mut().await;
            notified.set(self.readable.notified());
        }
    }

    /// Wait until at least one slot is awaiting acknowledgement.
    ///
    /// Returns the number of awaiting-ack slots. Fails with
    /// [`RingError::Eof`] once writing is closed and the buffer has fully
    /// drained, and with [`RingError::Closed`] after a hard close.
    pub async fn wait_until_read(&self) -> Result<usize, RingError> {
        let mut notified = pin!(self.writable.notified());

        loop {
            notified.as_mut().enable();

            {
                let state = self.state.lock();

                if state.closed {
                    return Err(RingError::Closed);
                }

                if state.awaiting_ack > 0 {
                    return Ok(state.awaiting_ack);
                }

                if state.closed_writing && state.length == 0 {
                    return Err(RingError::Eof);
                }
            }

            notified.as_mut().await;
            notified.set(self.writable.notified());
        }
    }

    /// Wait until the buffer holds no slots at all.
    ///
    /// Fails with [`RingError::Closed`] after a hard close.
    pub async fn wait_until_empty(&self) -> Result<(), RingError> {
        let mut notified = pin!(self.writable.notified());

        loop {
            notified.as_mut().enable();

            {
                let state = self.state.lock();

                if state.closed {
                    return Err(RingError::Closed);
                }

                if state.length == 0 {
                    return Ok(());
                }
            }

            notified.as_mut().await;
            notified.set(self.writable.notified());
        }
    }

    /// Hand the oldest unread slot to `cb` and move it into the
    /// awaiting-ack region.
    ///
    /// When `cb` fails and `undo_on_err` is set, the slot stays unread and
    /// will be handed out again; otherwise a failed callback still consumes
    /// the slot. Fails with [`RingError::Empty`] when nothing is unread.
    pub fn read_to_callback(
        &self,
        cb: impl FnOnce(&[u8]) -> std::io::Result<()>,
        undo_on_err: bool,
    ) -> Result<(), RingError> {
        let mut state = self.state.lock();

        if state.closed {
            return Err(RingError::Closed);
        }

        if state.unread() == 0 {
            return Err(RingError::Empty);
        }

        let index = (state.start + state.awaiting_ack) % self.capacity;
        let offset = index * self.slot_size;
        let result = cb(&state.data[offset..offset + self.slot_size]);

        if result.is_ok() || !undo_on_err {
            state.awaiting_ack += 1;
            state.items_read += 1;
            drop(state);

            self.writable.notify_waiters();
        }

        result.map_err(RingError::from)
    }

    /// Acknowledge the oldest awaiting-ack slot, freeing it.
    ///
    /// No-op when nothing is awaiting acknowledgement.
    pub fn ack(&self) {
        let mut state = self.state.lock();

        if state.awaiting_ack == 0 {
            return;
        }

        state.awaiting_ack -= 1;
        state.length -= 1;
        state.start = (state.start + 1) % self.capacity;
        drop(state);

        self.writable.notify_waiters();
    }

    /// Return every awaiting-ack slot to the unread region, preserving
    /// order. Returns the number of slots rewound.
    pub fn rewind(&self) -> usize {
        let mut state = self.state.lock();

        let count = state.awaiting_ack;
        state.awaiting_ack = 0;
        drop(state);

        if count > 0 {
            self.readable.notify_waiters();
        }

        count
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Refuse all future writes. Pending reads and waits wake up and drain
    /// what is left.
    pub fn close_writing(&self) {
        let mut state = self.state.lock();

        if state.closed_writing {
            return;
        }

        state.closed_writing = true;
        drop(state);

        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    /// Close the buffer for all operations, waking every waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();

        if state.closed {
            return;
        }

        state.closed = true;
        state.closed_writing = true;
        drop(state);

        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Number of occupied slots (unread + awaiting ack).
    pub fn len(&self) -> usize {
        self.state.lock().length
    }

    /// Whether the buffer holds no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots written but not yet read.
    pub fn unread(&self) -> usize {
        self.state.lock().unread()
    }

    /// Number of slots read but not yet acknowledged.
    pub fn awaiting_ack(&self) -> usize {
        self.state.lock().awaiting_ack
    }

    /// Total slots written over the buffer's lifetime.
    pub fn items_written(&self) -> u64 {
        self.state.lock().items_written
    }

    /// Total slots read over the buffer's lifetime.
    pub fn items_read(&self) -> u64 {
        self.state.lock().items_read
    }

    /// Slot count the buffer was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot size in bytes the buffer was created with.
    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Whether writing has been closed.
    pub fn is_writing_closed(&self) -> bool {
        self.state.lock().closed_writing
    }

    /// Whether the buffer has been hard-closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("slot_size", &self.slot_size)
            .field("length", &state.length)
            .field("awaiting_ack", &state.awaiting_ack)
            .field("closed", &state.closed)
            .field("closed_writing", &state.closed_writing)
            .finish()
    }
}
