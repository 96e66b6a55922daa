//! Transport-level constants shared by client and server
//!
//! The TLS transport frames entries exactly as the codec lays them out; the
//! only additions are a ping (a zero total length) and, in ack mode, a
//! one-byte reply per frame.

/// ALPN token for the plain protocol (no per-frame acknowledgements).
pub const PROTO_V1: &[u8] = b"v1.0";

/// ALPN token of the legacy ack protocol, which carried the 12-byte entry id
/// in every acknowledgement. Recognized but no longer offered.
pub const PROTO_V1_ACK: &[u8] = b"v1.0-ack";

/// ALPN token for the ack protocol: one status byte per frame.
pub const PROTO_V1_1_ACK: &[u8] = b"v1.1-ack";

/// Whether a negotiated ALPN token selects ack mode.
pub fn is_ack_protocol(proto: &[u8]) -> bool {
    proto.ends_with(b"-ack")
}

/// Positive per-frame acknowledgement (ASCII ACK).
pub const RESP_ACK_OK: u8 = 0x06;

/// Negative per-frame acknowledgement (ASCII NAK).
pub const RESP_ACK_NOK: u8 = 0x15;

/// Reply to a ping.
pub const RESP_PONG: u8 = 0x01;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_protocols() {
        assert!(is_ack_protocol(PROTO_V1_1_ACK));
        assert!(is_ack_protocol(PROTO_V1_ACK));
        assert!(!is_ack_protocol(PROTO_V1));
    }
}
