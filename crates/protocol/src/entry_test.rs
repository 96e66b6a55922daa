//! Entry codec tests

use crate::{
    Entry, EntryId, EntryRef, Field, MAX_ENTRY_SIZE, MAX_TAGS_COUNT,
    ProtocolError, Severity,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn encode_to_vec(entry: &Entry) -> Vec<u8> {
    let mut buf = vec![0u8; MAX_ENTRY_SIZE];
    let n = entry.encode(&mut buf);
    buf.truncate(n);
    buf
}

fn sample_entry() -> Entry {
    let mut entry = Entry::new();
    entry
        .set_bucket_id(42)
        .set_id(EntryId::new(1_700_000_000))
        .set_severity(Severity::Warning)
        .set_message("connection to %s lost after %s retries")
        .set_category_id(7)
        .push_tag("db-primary")
        .push_tag("3")
        .push_metric("retries", 3)
        .push_metric("latency_ms", 250)
        .push_meta("query", "SELECT 1")
        .push_stack_frame("src/pool.rs", 118)
        .set_ttl_entry(30)
        .set_ttl_meta(7);
    entry
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encode_minimal() {
    // Bucket id, zero id, severity and an empty message.
    let mut entry = Entry::new();
    entry.set_bucket_id(1).set_severity(Severity::Debug);

    let frame = encode_to_vec(&entry);

    let mut expected = vec![0x00, 0x14, 0x00, 0x00, 0x00, 0x01];
    expected.extend_from_slice(&[0u8; 12]);
    expected.extend_from_slice(&[0x07, 0x00]);

    assert_eq!(frame, expected);
    assert_eq!(frame.len(), 20);
}

#[test]
fn test_encode_length_prefix_matches() {
    let frame = encode_to_vec(&sample_entry());
    let declared = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    assert_eq!(declared, frame.len());
}

#[test]
fn test_encode_is_deterministic() {
    let entry = sample_entry();
    assert_eq!(encode_to_vec(&entry), encode_to_vec(&entry));
}

#[test]
fn test_encode_stops_at_level() {
    let mut entry = Entry::new();
    entry.set_bucket_id(9).set_severity(Severity::Info).set_message("hello");

    // Level is Message; nothing after the message may be emitted.
    let frame = encode_to_vec(&entry);
    assert_eq!(frame.len(), 2 + 4 + 12 + 1 + 1 + 5);
}

#[test]
fn test_encode_meta_overflow_rewrites_count() {
    let mut entry = Entry::new();
    let big = "v".repeat(40_000);
    entry.push_meta("k", &big);
    entry.push_meta("k", &big);

    let frame = encode_to_vec(&entry);
    assert!(frame.len() <= MAX_ENTRY_SIZE);

    let view = EntryRef::parse(&frame).unwrap();
    assert_eq!(view.meta().count(), 1);
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_decode_round_trip() {
    let entry = sample_entry();
    let frame = encode_to_vec(&entry);

    let mut decoded = Entry::new();
    decoded.decode(&frame).unwrap();

    assert_eq!(decoded, entry);
}

#[test]
fn test_decode_round_trip_reuses_entry() {
    let first = sample_entry();
    let mut second = Entry::new();
    second
        .set_bucket_id(1)
        .set_severity(Severity::Info)
        .set_message("short");

    let mut decoded = Entry::new();
    decoded.decode(&encode_to_vec(&first)).unwrap();
    decoded.decode(&encode_to_vec(&second)).unwrap();

    assert_eq!(decoded, second);
}

#[test]
fn test_decode_severity_only_frame() {
    // 19 bytes: length + bucket + id + severity, no message field.
    let mut frame = vec![0x00, 0x13, 0x00, 0x00, 0x00, 0x01];
    frame.extend_from_slice(&[0u8; 12]);
    frame.push(0x07);

    let view = EntryRef::parse(&frame).unwrap();
    assert_eq!(view.bucket_id(), 1);
    assert_eq!(view.id(), EntryId::NIL);
    assert_eq!(view.severity(), Severity::Debug);
    assert_eq!(view.level(), Field::Severity);
    assert_eq!(view.message(), "");
}

#[test]
fn test_decode_no_copy_borrows_input() {
    let entry = sample_entry();
    let frame = encode_to_vec(&entry);

    let view = EntryRef::parse(&frame).unwrap();
    assert_eq!(view.message(), entry.message());
    assert_eq!(view.tags(), &["db-primary", "3"]);

    // The borrowed message points into the frame buffer.
    let message_ptr = view.message().as_ptr() as usize;
    let frame_start = frame.as_ptr() as usize;
    assert!(message_ptr >= frame_start && message_ptr < frame_start + frame.len());
}

#[test]
fn test_decode_to_owned_entry() {
    let entry = sample_entry();
    let frame = encode_to_vec(&entry);

    let view = EntryRef::parse(&frame).unwrap();
    assert_eq!(view.to_entry(), entry);
}

#[test]
fn test_decode_too_short() {
    assert_eq!(
        EntryRef::parse(&[0x00, 0x05, 1, 2, 3]).unwrap_err(),
        ProtocolError::TooShort { actual: 5 }
    );
}

#[test]
fn test_decode_length_mismatch() {
    let mut frame = encode_to_vec(&sample_entry());
    frame.push(0);

    assert_eq!(
        EntryRef::parse(&frame).unwrap_err(),
        ProtocolError::CorruptEntry
    );
}

#[test]
fn test_decode_invalid_severity() {
    let mut frame = vec![0x00, 0x13, 0x00, 0x00, 0x00, 0x01];
    frame.extend_from_slice(&[0u8; 12]);
    frame.push(0x08);

    assert_eq!(
        EntryRef::parse(&frame).unwrap_err(),
        ProtocolError::InvalidSeverity(8)
    );
}

#[test]
fn test_decode_too_many_tags() {
    // Severity + empty message + category, then a tag count of 9.
    let mut frame = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
    frame.extend_from_slice(&[0u8; 12]);
    frame.extend_from_slice(&[0x07, 0x00, 0x00, 0x09]);
    let total = frame.len() as u16;
    frame[..2].copy_from_slice(&total.to_be_bytes());

    assert_eq!(
        EntryRef::parse(&frame).unwrap_err(),
        ProtocolError::TooManyTags(9)
    );
}

#[test]
fn test_decode_truncated_message() {
    // Message claims 10 bytes but the frame ends after 2.
    let mut frame = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
    frame.extend_from_slice(&[0u8; 12]);
    frame.extend_from_slice(&[0x07, 0x0a, b'h', b'i']);
    let total = frame.len() as u16;
    frame[..2].copy_from_slice(&total.to_be_bytes());

    assert_eq!(
        EntryRef::parse(&frame).unwrap_err(),
        ProtocolError::CorruptEntry
    );
}

// ============================================================================
// Field Limits
// ============================================================================

#[test]
fn test_tags_capped_at_maximum() {
    let mut entry = Entry::new();
    for i in 0..9 {
        entry.push_tag(&format!("tag-{i}"));
    }

    assert_eq!(entry.tags().count(), MAX_TAGS_COUNT);

    let frame = encode_to_vec(&entry);
    let view = EntryRef::parse(&frame).unwrap();
    assert_eq!(view.tags().len(), MAX_TAGS_COUNT);
}

#[test]
fn test_empty_tags_ignored() {
    let mut entry = Entry::new();
    entry.push_tag("").push_tag("real");

    assert_eq!(entry.tags().collect::<Vec<_>>(), vec!["real"]);
}

#[test]
fn test_message_truncated() {
    let mut entry = Entry::new();
    entry.set_message(&"x".repeat(300));

    assert_eq!(entry.message().len(), 255);
}

#[test]
fn test_level_tracks_highest_field() {
    let mut entry = Entry::new();
    assert_eq!(entry.level(), Field::Message);

    entry.push_tag("a");
    assert_eq!(entry.level(), Field::Tags);

    entry.set_category_id(1);
    assert_eq!(entry.level(), Field::Tags);

    entry.set_ttl_meta(1);
    assert_eq!(entry.level(), Field::TtlMeta);
}

#[test]
fn test_reset_clears_fields() {
    let mut entry = sample_entry();
    entry.reset();

    assert_eq!(entry, Entry::new());
}
