//! Entry processor seam

use async_trait::async_trait;
use skiff_protocol::EntryRef;

/// Opaque error type for processor failures.
pub type ProcessorError = Box<dyn std::error::Error + Send + Sync>;

/// Receives every decoded entry of a connection, in arrival order.
///
/// The entry borrows the connection's receive buffer (or the server's
/// decode scratch when the server copies); a processor that needs to keep
/// an entry past the call copies it out with
/// [`EntryRef::to_entry`](skiff_protocol::EntryRef::to_entry).
///
/// A processor error is answered with a negative acknowledgement (in ack
/// mode) and ends the connection.
#[async_trait]
pub trait EntryProcessor: Send + Sync {
    async fn process_entry(&self, entry: &EntryRef<'_>) -> Result<(), ProcessorError>;
}

/// Processor that logs each entry through `tracing`. The default stand-in
/// until a real sink is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProcessor;

#[async_trait]
impl EntryProcessor for EchoProcessor {
    async fn process_entry(&self, entry: &EntryRef<'_>) -> Result<(), ProcessorError> {
        tracing::info!(
            bucket_id = entry.bucket_id(),
            entry_id = %entry.id(),
            severity = %entry.severity(),
            message = %entry.render(),
            "entry received"
        );

        Ok(())
    }
}
