use std::time::Duration;

use ahash::HashMap;
use parking_lot::RwLock;

use super::error::StoreError;
use super::types::Log;
use crate::models::StdAddr;

/// Append-only log storage.
pub trait LogStore: Send + Sync {
    /// Appends the log.
    ///
    /// Logs without an explicit expiration time expire after the store
    /// retention.
    fn save(&self, log: Log) -> Result<(), StoreError>;

    /// Returns logs of the address with the topic in insertion order.
    fn logs(&self, address: &StdAddr, topic: u32) -> Result<Vec<Log>, StoreError>;

    /// Removes logs which expired before `now` (unix timestamp in seconds).
    ///
    /// Returns the number of removed logs.
    fn prune_expired(&self, now: u64) -> Result<usize, StoreError>;

    /// Returns the highest transaction lt among stored logs.
    fn max_tx_lt(&self) -> Result<Option<u64>, StoreError>;
}

/// Log store which keeps everything in memory.
pub struct InMemoryLogStore {
    retention: Duration,
    logs: RwLock<HashMap<(StdAddr, u32), Vec<Log>>>,
}

impl Default for InMemoryLogStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

impl InMemoryLogStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            logs: Default::default(),
        }
    }

    /// Returns the total number of stored logs.
    pub fn len(&self) -> usize {
        self.logs.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogStore for InMemoryLogStore {
    fn save(&self, mut log: Log) -> Result<(), StoreError> {
        if log.expires_at.is_none() {
            log.expires_at = Some(super::now_sec().saturating_add(self.retention.as_secs()));
        }
        self.logs
            .write()
            .entry((log.address, log.event_topic))
            .or_default()
            .push(log);
        Ok(())
    }

    fn logs(&self, address: &StdAddr, topic: u32) -> Result<Vec<Log>, StoreError> {
        Ok(self
            .logs
            .read()
            .get(&(*address, topic))
            .cloned()
            .unwrap_or_default())
    }

    fn prune_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut removed = 0;
        self.logs.write().retain(|_, logs| {
            let before = logs.len();
            logs.retain(|log| !matches!(log.expires_at, Some(expires_at) if expires_at < now));
            removed += before - logs.len();
            !logs.is_empty()
        });
        Ok(removed)
    }

    fn max_tx_lt(&self) -> Result<Option<u64>, StoreError> {
        Ok(self
            .logs
            .read()
            .values()
            .flat_map(|logs| logs.iter().map(|log| log.tx_lt))
            .max())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cell::{Cell, CellBuilder, HashBytes};
    use crate::models::BlockId;

    pub(crate) fn make_log(address: StdAddr, topic: u32, lt: u64, data: Cell) -> Log {
        Log {
            filter_id: Some(1),
            event_topic: topic,
            address,
            data,
            tx_hash: HashBytes([lt as u8; 32]),
            tx_lt: lt,
            tx_timestamp: 1_700_000_000,
            block: BlockId::default(),
            expires_at: None,
            error: None,
        }
    }

    #[test]
    fn insertion_order_per_key() {
        let store = InMemoryLogStore::default();
        let x = StdAddr::new(0, HashBytes([1; 32]));
        let y = StdAddr::new(0, HashBytes([2; 32]));
        assert!(store.max_tx_lt().unwrap().is_none());

        for lt in [30, 10, 20] {
            store.save(make_log(x, 1, lt, Cell::empty_cell())).unwrap();
        }
        store.save(make_log(x, 2, 40, Cell::empty_cell())).unwrap();
        store.save(make_log(y, 1, 5, Cell::empty_cell())).unwrap();

        let logs = store.logs(&x, 1).unwrap();
        assert_eq!(logs.iter().map(|l| l.tx_lt).collect::<Vec<_>>(), [30, 10, 20]);
        assert_eq!(store.logs(&y, 1).unwrap().len(), 1);
        assert!(store.logs(&y, 2).unwrap().is_empty());
        assert_eq!(store.max_tx_lt().unwrap(), Some(40));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn retention() {
        let store = InMemoryLogStore::new(Duration::from_secs(60));
        let x = StdAddr::new(0, HashBytes([1; 32]));
        let now = crate::logpoller::now_sec();

        store.save(make_log(x, 1, 1, Cell::empty_cell())).unwrap();
        let mut explicit = make_log(x, 1, 2, CellBuilder::build_from(1u8).unwrap());
        explicit.expires_at = Some(now + 3600);
        store.save(explicit).unwrap();

        let expires_at = store.logs(&x, 1).unwrap()[0].expires_at.unwrap();
        assert!(expires_at >= now + 60 && expires_at <= now + 120);

        assert_eq!(store.prune_expired(now).unwrap(), 0);
        assert_eq!(store.prune_expired(now + 600).unwrap(), 1);
        assert_eq!(store.logs(&x, 1).unwrap()[0].tx_lt, 2);
        assert_eq!(store.prune_expired(now + 7200).unwrap(), 1);
        assert!(store.is_empty());
    }
}
