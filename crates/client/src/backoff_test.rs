//! Backoff tests

use std::time::Duration;

use crate::backoff::Backoff;

#[test]
fn test_doubles_until_cap() {
    let mut backoff = Backoff::new();

    assert_eq!(backoff.next(), Duration::from_secs(1));
    assert_eq!(backoff.next(), Duration::from_secs(2));
    assert_eq!(backoff.next(), Duration::from_secs(4));
    assert_eq!(backoff.next(), Duration::from_secs(8));
    assert_eq!(backoff.next(), Duration::from_secs(16));
    assert_eq!(backoff.next(), Duration::from_secs(32));
    assert_eq!(backoff.next(), Duration::from_secs(64));
    assert_eq!(backoff.next(), Duration::from_secs(64));
}

#[test]
fn test_reset() {
    let mut backoff = Backoff::new();
    backoff.next();
    backoff.next();
    backoff.reset();

    assert_eq!(backoff.next(), Duration::from_secs(1));
}

#[test]
fn test_never_overflows() {
    let mut backoff = Backoff::new();

    for _ in 0..1000 {
        assert!(backoff.next() <= Duration::from_secs(64));
    }
}
