//! Downstream sinks for finished records.
//!
//! Sinks are consumers, not participants: a sink failure is logged inside
//! the sink and never propagates into the retrieval loop.

pub mod sheet;
pub mod telegram;

pub use sheet::CsvSheet;
pub use telegram::TelegramAlerts;

use crate::results::ProductRecord;
use async_trait::async_trait;

/// Spreadsheet-style store for the full record list of a run.
///
/// Implementations write a header row matching [`ProductRecord::FIELDS`] on
/// first use, then append one row per record. An empty list is a no-op.
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn append_all(&self, records: &[ProductRecord]);
}

/// Notification channel for a single qualifying record. `threshold` is the
/// configured discount floor the record cleared, for context in the
/// delivered message or log.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn alert(&self, record: &ProductRecord, threshold: f64);
}
