pub mod sqlite;

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use sqlite::SqliteLedgerStore;

/// One recorded URL submission. Created only after a successful title fetch;
/// append-only, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    /// The URL as extracted from the message, not canonicalized.
    pub url: String,
    /// Free text that followed the URL in the message; may be empty.
    pub description: String,
    /// Page title resolved at fetch time; empty if unavailable.
    pub title: String,
    /// Identifier of the message author.
    pub submitter: String,
    /// Instant of successful fetch completion.
    pub timestamp: DateTime<Utc>,
}

/// Result of a conditional append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was appended; it is the first for its URL in the channel.
    Appended,
    /// An entry for this URL already existed; the store is unchanged.
    AlreadyRecorded,
}

/// Per-channel append-only URL ledger.
///
/// One ledger per channel id, created lazily and never deleted. The first
/// entry matching a URL is authoritative; `append` is an atomic
/// insert-if-absent, so a concurrent duplicate submission can never produce
/// a second entry for the same URL.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Ensure a ledger exists for `channel_id`. Safe to call concurrently;
    /// concurrent creation never yields two ledgers for the same id.
    async fn get_or_create(&self, channel_id: &str) -> Result<(), StorageError>;

    /// First stored entry (by insertion order) whose `url` equals the
    /// argument, or `None`.
    async fn find_entry(
        &self,
        channel_id: &str,
        url: &str,
    ) -> Result<Option<UrlEntry>, StorageError>;

    /// Append `entry` unless an entry with the same `url` already exists in
    /// the channel.
    async fn append(
        &self,
        channel_id: &str,
        entry: &UrlEntry,
    ) -> Result<AppendOutcome, StorageError>;

    /// All entries for a channel in insertion order; empty for an unknown
    /// channel.
    async fn entries(&self, channel_id: &str) -> Result<Vec<UrlEntry>, StorageError>;
}
