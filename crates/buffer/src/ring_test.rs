//! Ring buffer tests

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::{RingBuffer, RingError};

// ============================================================================
// Helper Functions
// ============================================================================

const SLOT: usize = 16;

fn ring(capacity: usize) -> RingBuffer {
    RingBuffer::new(capacity, SLOT)
}

fn write_byte(ring: &RingBuffer, byte: u8) -> bool {
    ring.write_or_replace(|slot| slot[0] = byte)
}

fn read_byte(ring: &RingBuffer) -> Result<u8, RingError> {
    let mut byte = 0;
    ring.read_to_callback(
        |slot| {
            byte = slot[0];
            Ok(())
        },
        true,
    )?;
    Ok(byte)
}

fn check_invariant(ring: &RingBuffer) {
    let awaiting = ring.awaiting_ack();
    let length = ring.len();
    assert!(awaiting <= length, "awaiting_ack {awaiting} > length {length}");
    assert!(length <= ring.capacity());
}

// ============================================================================
// Write Policies
// ============================================================================

#[test]
fn test_fifo_order() {
    let ring = ring(4);

    for byte in [b'a', b'b', b'c'] {
        assert!(write_byte(&ring, byte));
    }

    assert_eq!(read_byte(&ring).unwrap(), b'a');
    assert_eq!(read_byte(&ring).unwrap(), b'b');
    assert_eq!(read_byte(&ring).unwrap(), b'c');
}

#[test]
fn test_write_or_replace_drops_oldest() {
    let ring = ring(4);

    for byte in [b'A', b'B', b'C', b'D', b'E', b'F'] {
        assert!(write_byte(&ring, byte));
    }

    check_invariant(&ring);
    assert_eq!(ring.len(), 4);

    for expected in [b'C', b'D', b'E', b'F'] {
        assert_eq!(read_byte(&ring).unwrap(), expected);
        ring.ack();
    }

    assert!(ring.is_empty());
}

#[test]
fn test_write_or_replace_drops_awaiting_ack() {
    let ring = ring(2);

    write_byte(&ring, b'a');
    write_byte(&ring, b'b');
    read_byte(&ring).unwrap();
    assert_eq!(ring.awaiting_ack(), 1);

    // Full buffer: the replaced slot is the unacked one.
    write_byte(&ring, b'c');
    check_invariant(&ring);
    assert_eq!(ring.awaiting_ack(), 0);
    assert_eq!(ring.len(), 2);

    assert_eq!(read_byte(&ring).unwrap(), b'b');
    assert_eq!(read_byte(&ring).unwrap(), b'c');
}

#[test]
fn test_write_or_fail_when_full() {
    let ring = ring(2);

    assert!(ring.write_or_fail(|slot| slot[0] = 1));
    assert!(ring.write_or_fail(|slot| slot[0] = 2));
    assert!(!ring.write_or_fail(|slot| slot[0] = 3));

    assert_eq!(ring.len(), 2);
}

#[tokio::test]
async fn test_write_or_block_waits_for_ack() {
    let ring = Arc::new(ring(1));
    write_byte(&ring, b'a');

    let blocked = {
        let ring = Arc::clone(&ring);
        tokio::spawn(async move { ring.write_or_block(|slot| slot[0] = b'b').await })
    };

    // The writer is stuck until a slot frees up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    read_byte(&ring).unwrap();
    ring.ack();

    assert!(timeout(Duration::from_secs(1), blocked).await.unwrap().unwrap());
    assert_eq!(read_byte(&ring).unwrap(), b'b');
}

// ============================================================================
// Ack and Rewind
// ============================================================================

#[test]
fn test_ack_frees_slot() {
    let ring = ring(2);

    write_byte(&ring, b'a');
    read_byte(&ring).unwrap();
    assert_eq!(ring.len(), 1);
    assert_eq!(ring.awaiting_ack(), 1);

    ring.ack();
    assert_eq!(ring.len(), 0);
    assert_eq!(ring.awaiting_ack(), 0);
    check_invariant(&ring);
}

#[test]
fn test_ack_without_outstanding_read_is_noop() {
    let ring = ring(2);
    write_byte(&ring, b'a');

    ring.ack();
    assert_eq!(ring.len(), 1);
    assert_eq!(ring.unread(), 1);
}

#[test]
fn test_rewind_replays_in_order() {
    let ring = ring(4);

    for byte in [b'x', b'y', b'z'] {
        write_byte(&ring, byte);
    }

    assert_eq!(read_byte(&ring).unwrap(), b'x');
    assert_eq!(read_byte(&ring).unwrap(), b'y');
    assert_eq!(ring.awaiting_ack(), 2);

    assert_eq!(ring.rewind(), 2);
    assert_eq!(ring.awaiting_ack(), 0);
    assert_eq!(ring.unread(), 3);

    // Replay starts from the earliest unacked slot.
    assert_eq!(read_byte(&ring).unwrap(), b'x');
    assert_eq!(read_byte(&ring).unwrap(), b'y');
    assert_eq!(read_byte(&ring).unwrap(), b'z');
}

#[test]
fn test_read_undo_on_error() {
    let ring = ring(2);
    write_byte(&ring, b'a');

    let result = ring.read_to_callback(
        |_| Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "down")),
        true,
    );

    assert!(matches!(result, Err(RingError::Io(_))));
    assert_eq!(ring.awaiting_ack(), 0);
    assert_eq!(ring.unread(), 1);

    // The slot is handed out again.
    assert_eq!(read_byte(&ring).unwrap(), b'a');
}

#[test]
fn test_read_without_undo_consumes_slot() {
    let ring = ring(2);
    write_byte(&ring, b'a');

    let result = ring.read_to_callback(
        |_| Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "down")),
        false,
    );

    assert!(matches!(result, Err(RingError::Io(_))));
    assert_eq!(ring.awaiting_ack(), 1);
    assert_eq!(ring.unread(), 0);
}

#[test]
fn test_read_empty() {
    let ring = ring(2);
    assert!(matches!(read_byte(&ring), Err(RingError::Empty)));
}

// ============================================================================
// Waiting
// ============================================================================

#[tokio::test]
async fn test_wait_returns_unread_count() {
    let ring = ring(4);
    write_byte(&ring, b'a');
    write_byte(&ring, b'b');

    assert_eq!(ring.wait().await.unwrap(), 2);
}

#[tokio::test]
async fn test_wait_wakes_on_write() {
    let ring = Arc::new(ring(4));

    let waiter = {
        let ring = Arc::clone(&ring);
        tokio::spawn(async move { ring.wait().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    write_byte(&ring, b'a');

    let unread = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(unread.unwrap(), 1);
}

#[tokio::test]
async fn test_wait_until_read_wakes_on_read() {
    let ring = Arc::new(ring(4));
    write_byte(&ring, b'a');

    let waiter = {
        let ring = Arc::clone(&ring);
        tokio::spawn(async move { ring.wait_until_read().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    read_byte(&ring).unwrap();

    let awaiting = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert_eq!(awaiting.unwrap(), 1);
}

#[tokio::test]
async fn test_wait_until_empty_wakes_on_last_ack() {
    let ring = Arc::new(ring(4));
    write_byte(&ring, b'a');

    let waiter = {
        let ring = Arc::clone(&ring);
        tokio::spawn(async move { ring.wait_until_empty().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    read_byte(&ring).unwrap();
    ring.ack();

    timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

// ============================================================================
// Close Signals
// ============================================================================

#[tokio::test]
async fn test_close_writing_drains_then_eof() {
    let ring = ring(4);
    write_byte(&ring, b'a');
    ring.close_writing();

    assert!(!write_byte(&ring, b'b'));
    assert!(!ring.write_or_fail(|slot| slot[0] = b'b'));
    assert!(!ring.write_or_block(|slot| slot[0] = b'b').await);

    // The remaining slot is still readable; after that, EOF.
    assert_eq!(ring.wait().await.unwrap(), 1);
    assert_eq!(read_byte(&ring).unwrap(), b'a');
    ring.ack();

    assert!(matches!(ring.wait().await, Err(RingError::Eof)));
}

#[tokio::test]
async fn test_close_fails_everything() {
    let ring = ring(4);
    write_byte(&ring, b'a');
    ring.close();

    assert!(!write_byte(&ring, b'b'));
    assert!(matches!(ring.wait().await, Err(RingError::Closed)));
    assert!(matches!(ring.wait_until_read().await, Err(RingError::Closed)));
    assert!(matches!(ring.wait_until_empty().await, Err(RingError::Closed)));
    assert!(matches!(read_byte(&ring), Err(RingError::Closed)));
}

#[tokio::test]
async fn test_close_wakes_waiters() {
    let ring = Arc::new(ring(4));

    let waiter = {
        let ring = Arc::clone(&ring);
        tokio::spawn(async move { ring.wait().await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    ring.close();

    let result = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert!(matches!(result, Err(RingError::Closed)));
}

// ============================================================================
// Counters
// ============================================================================

#[test]
fn test_item_counters() {
    let ring = ring(2);

    write_byte(&ring, b'a');
    write_byte(&ring, b'b');
    write_byte(&ring, b'c');
    assert_eq!(ring.items_written(), 3);

    read_byte(&ring).unwrap();
    assert_eq!(ring.items_read(), 1);
}
