//! Frame validation without materialization
//!
//! The server runs this over every received frame before decoding, so
//! malformed input is rejected without touching string data.

use crate::{
    Field, MAX_ENTRY_SIZE, MAX_META_COUNT, MAX_METRIC_COUNT,
    MAX_STACK_TRACE_COUNT, MAX_TAGS_COUNT, MIN_ENTRY_SIZE, ProtocolError,
    Result, Severity,
};

/// Walk the frame layout, checking lengths, counts and the severity range.
///
/// Accepts every frame [`EntryRef::parse`](crate::EntryRef::parse) accepts,
/// but allocates nothing and never looks at string contents (in particular,
/// it does not check UTF-8 validity).
pub fn validate_frame(b: &[u8]) -> Result<()> {
    if b.len() < MIN_ENTRY_SIZE {
        return Err(ProtocolError::TooShort { actual: b.len() });
    }

    if b.len() > MAX_ENTRY_SIZE {
        return Err(ProtocolError::TooLong { actual: b.len() });
    }

    let total = u16::from_be_bytes([b[0], b[1]]) as usize;

    if b.len() != total {
        return Err(ProtocolError::CorruptEntry);
    }

    // Bucket id and entry id are guaranteed by the minimum size.
    let mut s = 2 + 4 + 12;

    if s >= total {
        return finish(s, total);
    }

    // Severity
    Severity::try_from(b[s])?;
    s += 1;

    for index in Field::Message as u8..=Field::LAST as u8 {
        if s >= total {
            break;
        }

        let Some(field) = Field::from_index(index) else {
            break;
        };

        match field {
            Field::Message => {
                s += 1 + b[s] as usize;
            }

            Field::CategoryId => {
                s += 1;
            }

            Field::Tags => {
                let count = b[s];
                s += 1;

                if count as usize > MAX_TAGS_COUNT {
                    return Err(ProtocolError::TooManyTags(count));
                }

                for _ in 0..count {
                    if s >= total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    s += 1 + b[s] as usize;
                }
            }

            Field::Metrics => {
                let count = b[s];
                s += 1;

                if count as usize > MAX_METRIC_COUNT {
                    return Err(ProtocolError::TooManyMetrics(count));
                }

                for _ in 0..count {
                    if s >= total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    s += 1 + b[s] as usize + 4;
                }
            }

            Field::Meta => {
                let count = b[s];
                s += 1;

                if count as usize > MAX_META_COUNT {
                    return Err(ProtocolError::TooManyMeta(count));
                }

                for _ in 0..count {
                    if s >= total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    s += 1 + b[s] as usize;

                    if s + 2 > total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    s += 2 + u16::from_be_bytes([b[s], b[s + 1]]) as usize;
                }
            }

            Field::StackTrace => {
                let count = b[s];
                s += 1;

                if count as usize > MAX_STACK_TRACE_COUNT {
                    return Err(ProtocolError::TooManyStackTrace(count));
                }

                for _ in 0..count {
                    if s >= total {
                        return Err(ProtocolError::CorruptEntry);
                    }

                    s += 1 + b[s] as usize + 2;
                }
            }

            Field::TtlEntry | Field::TtlMeta => {
                s += 2;
            }

            Field::BucketId | Field::EntryId | Field::Severity => unreachable!(),
        }

        if s > total {
            return Err(ProtocolError::CorruptEntry);
        }
    }

    finish(s, total)
}

#[inline]
fn finish(s: usize, total: usize) -> Result<()> {
    if s == total {
        Ok(())
    } else {
        Err(ProtocolError::CorruptEntry)
    }
}
