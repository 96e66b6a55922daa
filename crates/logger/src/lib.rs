//! Skiff Logger - application-facing facade
//!
//! A [`LoggerPool`] owns a free-list of entries and the connection to the
//! delivery pipeline. [`Logger`]s drawn from it accumulate defaults (tags,
//! meta, metrics, category, TTLs) that are merged into every entry they
//! send, so request- or subsystem-scoped loggers stay cheap to derive.
//!
//! Entries are composed through a typed fluent builder, one method per
//! field kind:
//!
//! ```ignore
//! let pool = LoggerPool::new(client, LoggerPoolOptions::default());
//! let log = pool.logger().with_tag("billing");
//!
//! log.warning("charge for %s declined")
//!     .tag(customer_id)
//!     .metric("attempts", attempts)
//!     .meta("invoice", &invoice_id)
//!     .send();
//! ```
//!
//! Severities at or above the pool's stack-trace threshold (NOTICE by
//! default, EMERG being the highest) record the calling location
//! automatically. A builder that is dropped without [`EntryBuilder::send`]
//! returns its entry to the pool untouched.

mod builder;
mod pool;

pub use builder::EntryBuilder;
pub use pool::{EntrySink, Logger, LoggerPool, LoggerPoolOptions};

/// Default entry TTL in days.
pub const DEFAULT_ENTRY_TTL_DAYS: u16 = 30;

#[cfg(test)]
mod logger_test;
