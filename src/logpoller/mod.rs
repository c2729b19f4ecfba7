//! Log poller.
//!
//! The poller follows the masterchain and, for every new block, loads the
//! transactions of the accounts referenced by the registered filters. External
//! out messages of those transactions are decoded into [`Log`]s and saved to
//! the [`LogStore`], where they can be queried with [`Query`].
//!
//! Each external out message carries its event topic in the destination
//! address (see [`ExtOutLogBucket`]) and the event payload in the body.
//!
//! [`ExtOutLogBucket`]: crate::ccip::ExtOutLogBucket

use std::time::{SystemTime, UNIX_EPOCH};

pub use self::config::PollerConfig;
pub use self::error::{IndexerError, LoaderError, PollerError, QueryError, StoreError};
pub use self::filter_store::{FilterStore, InMemoryFilterStore};
pub use self::indexer::Indexer;
#[cfg(feature = "shard-scan")]
pub use self::loader::ShardLoader;
pub use self::loader::{AccountLoader, TxLoader};
pub use self::log_store::{InMemoryLogStore, LogStore};
pub use self::query::{
    ByteFilter, ByteOp, Query, QueryOptions, QueryResult, SortBy, SortDir,
};
pub use self::service::{LogPoller, Service};
pub use self::types::{BlockRange, Filter, FilterId, Log, RegisteredFilter, TxWithBlock};

pub mod loader;

mod config;
mod error;
mod filter_store;
mod indexer;
mod log_store;
mod query;
mod service;
mod types;

/// Current unix timestamp in seconds.
pub(crate) fn now_sec() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
