use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::boc::Boc;
use crate::cell::{Cell, HashBytes};
use crate::models::{BlockId, StdAddr, Transaction};

/// Filter identifier assigned by the filter store.
pub type FilterId = u64;

/// Subscription to the events of a contract.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Unique filter name.
    pub name: String,
    /// Contract which emits the events.
    pub address: StdAddr,
    pub event_topic: u32,
    /// Optional human readable event name.
    #[serde(default)]
    pub event_name: Option<String>,
    /// Lifetime of the matched logs. Falls back to the store retention.
    #[serde(default)]
    pub retention: Option<Duration>,
}

impl Filter {
    pub fn new(name: impl Into<String>, address: StdAddr, event_topic: u32) -> Self {
        Self {
            name: name.into(),
            address,
            event_topic,
            event_name: None,
            retention: None,
        }
    }

    pub fn with_event_name(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }
}

/// Filter with its assigned id.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RegisteredFilter {
    pub id: FilterId,
    pub filter: Filter,
}

/// Event emitted by a contract.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// Matched filter, `None` for logs which were not matched.
    pub filter_id: Option<FilterId>,
    pub event_topic: u32,
    /// Contract which emitted the event.
    pub address: StdAddr,
    /// Event body.
    #[serde(with = "Boc")]
    pub data: Cell,
    pub tx_hash: HashBytes,
    pub tx_lt: u64,
    pub tx_timestamp: u32,
    /// Shard block of the transaction.
    pub block: BlockId,
    /// Unix timestamp in seconds after which the log can be pruned.
    pub expires_at: Option<u64>,
    /// Set when the message could not be decoded into a log.
    pub error: Option<String>,
}

impl Log {
    /// Returns whether this log describes a decoding failure.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Range of masterchain blocks to process.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BlockRange {
    /// The last processed block (exclusive), `None` on the first run.
    pub prev: Option<BlockId>,
    /// The target block (inclusive).
    pub to: BlockId,
}

/// Parsed transaction with the shard block it belongs to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TxWithBlock {
    pub tx: Transaction,
    pub hash: HashBytes,
    pub block: BlockId,
}
