//! 96-bit sortable entry identifiers
//!
//! An id is 12 bytes: 4-byte big-endian unix seconds, 3-byte machine id,
//! 2-byte process id, 3-byte counter. Byte order doubles as creation order,
//! with the machine/pid/counter triple as tiebreak within a second.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::{ENTRY_ID_LENGTH, ProtocolError, Result};

/// Per-process counter, seeded randomly so ids do not collide across
/// restarts within the same second.
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

static MACHINE_ID: OnceLock<[u8; 3]> = OnceLock::new();

/// Sortable 96-bit entry identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId([u8; ENTRY_ID_LENGTH]);

impl EntryId {
    /// The all-zero id, used for entries that have not been stamped yet.
    pub const NIL: EntryId = EntryId([0; ENTRY_ID_LENGTH]);

    /// Generate a new id for the given unix timestamp.
    pub fn new(unix_secs: u32) -> Self {
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random()))
            .fetch_add(1, Ordering::AcqRel);

        let machine = MACHINE_ID.get_or_init(machine_id);
        let pid = std::process::id() as u16;

        let mut b = [0u8; ENTRY_ID_LENGTH];
        b[0..4].copy_from_slice(&unix_secs.to_be_bytes());
        b[4..7].copy_from_slice(machine);
        b[7..9].copy_from_slice(&pid.to_be_bytes());
        b[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);

        EntryId(b)
    }

    /// Build an id from raw bytes. Only the length is validated.
    pub fn from_bytes(b: &[u8]) -> Result<Self> {
        let b: [u8; ENTRY_ID_LENGTH] =
            b.try_into().map_err(|_| ProtocolError::CorruptEntry)?;
        Ok(EntryId(b))
    }

    /// Raw bytes of the id.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; ENTRY_ID_LENGTH] {
        &self.0
    }

    /// Creation time as unix seconds.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Machine portion of the id.
    pub fn machine(&self) -> [u8; 3] {
        [self.0[4], self.0[5], self.0[6]]
    }

    /// Process id portion of the id.
    pub fn pid(&self) -> u16 {
        u16::from_be_bytes([self.0[7], self.0[8]])
    }

    /// Counter portion of the id.
    pub fn counter(&self) -> u32 {
        u32::from_be_bytes([0, self.0[9], self.0[10], self.0[11]])
    }

    /// Whether this is the all-zero id.
    pub fn is_nil(&self) -> bool {
        *self == Self::NIL
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Derive a 3-byte machine id from the hostname, falling back to random
/// bytes when no hostname is available.
fn machine_id() -> [u8; 3] {
    let hostname = std::fs::read_to_string("/etc/hostname")
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()));

    match hostname {
        Some(name) => {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            name.hash(&mut hasher);
            let h = hasher.finish().to_be_bytes();
            [h[0], h[1], h[2]]
        }
        None => rand::random(),
    }
}
