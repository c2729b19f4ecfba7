use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::config::PollerConfig;
use super::error::{PollerError, StoreError};
use super::filter_store::FilterStore;
use super::indexer::Indexer;
use super::loader::{lookup_mc_block, AccountLoader, TxLoader};
use super::log_store::LogStore;
use super::types::{BlockRange, Filter, FilterId};
use crate::client::TonClient;

/// Masterchain follower which indexes the transactions of filtered accounts.
pub struct LogPoller {
    client: Arc<dyn TonClient>,
    loader: Arc<dyn TxLoader>,
    indexer: Indexer,
    filters: Arc<dyn FilterStore>,
    logs: Arc<dyn LogStore>,
    config: PollerConfig,
    last_processed_block: u32,
    progress: Arc<AtomicU32>,
}

impl LogPoller {
    /// Creates a poller which uses the account loader.
    pub fn new(
        client: Arc<dyn TonClient>,
        filters: Arc<dyn FilterStore>,
        logs: Arc<dyn LogStore>,
        config: PollerConfig,
    ) -> Self {
        let loader = Arc::new(AccountLoader::new(
            client.clone(),
            config.page_size,
            config.max_concurrent_scans,
        ));

        Self {
            indexer: Indexer::new(filters.clone()).with_retention(config.log_retention),
            client,
            loader,
            filters,
            logs,
            config,
            last_processed_block: 0,
            progress: Default::default(),
        }
    }

    /// Replaces the transaction loader.
    pub fn with_loader(mut self, loader: Arc<dyn TxLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Returns the seqno of the last fully processed masterchain block.
    pub fn last_processed_block(&self) -> u32 {
        self.last_processed_block
    }

    /// Overrides the cursor, e.g. with a value restored on cold start.
    pub fn set_last_processed_block(&mut self, seqno: u32) {
        self.last_processed_block = seqno;
        self.progress.store(seqno, Ordering::Release);
    }

    pub fn filters(&self) -> &Arc<dyn FilterStore> {
        &self.filters
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.logs
    }

    /// Processes all masterchain blocks which appeared since the last tick.
    ///
    /// The cursor is advanced only when the whole range was processed.
    pub async fn process_tick(&mut self, cancel: &CancellationToken) -> Result<(), PollerError> {
        let head = self.client.get_masterchain_info().await?.last;
        let target = head.seqno.saturating_sub(self.config.block_confirmations);
        if target <= self.last_processed_block {
            return Ok(());
        }

        let addresses = self.filters.distinct_addresses()?;
        if addresses.is_empty() {
            tracing::debug!(seqno = target, "no filters registered");
            self.set_last_processed_block(target);
            return Ok(());
        }

        let timeout = self.config.block_wait_timeout;
        let to = lookup_mc_block(self.client.as_ref(), target, timeout).await?;
        let prev = match self.last_processed_block {
            0 => None,
            seqno => Some(lookup_mc_block(self.client.as_ref(), seqno, timeout).await?),
        };
        let range = BlockRange { prev, to };

        let mut txs = self.loader.load(&range, &addresses, cancel).await?;
        if range.prev.is_none() {
            // Cold start over a non-empty store, skip what was indexed before
            if let Some(max_lt) = self.logs.max_tx_lt()? {
                txs.retain(|item| item.tx.lt > max_lt);
            }
        }
        let logs = self.indexer.index(&txs)?;
        let log_count = logs.len();
        for log in logs {
            self.logs.save(log)?;
        }
        let pruned = self.logs.prune_expired(super::now_sec())?;

        tracing::debug!(
            from = self.last_processed_block,
            to = target,
            accounts = addresses.len(),
            txs = txs.len(),
            logs = log_count,
            pruned,
            "processed blocks"
        );
        self.set_last_processed_block(target);
        Ok(())
    }

    /// Runs ticks until cancelled and returns the poller back.
    ///
    /// Failed ticks are retried on the next period.
    pub async fn run(mut self, cancel: CancellationToken) -> Self {
        let period = self.config.poll_period.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            last_processed_block = self.last_processed_block,
            ?period,
            "log poller started"
        );
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            if let Err(e) = self.process_tick(&cancel).await {
                if cancel.is_cancelled() {
                    break;
                }
                tracing::warn!(
                    last_processed_block = self.last_processed_block,
                    "log poller tick failed: {e}"
                );
            }
        }
        tracing::info!(
            last_processed_block = self.last_processed_block,
            "log poller stopped"
        );
        self
    }
}

enum State {
    Idle(Box<LogPoller>),
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<LogPoller>,
    },
    Stopped,
}

/// Background task wrapper around [`LogPoller`].
pub struct Service {
    filters: Arc<dyn FilterStore>,
    logs: Arc<dyn LogStore>,
    progress: Arc<AtomicU32>,
    state: Mutex<State>,
}

impl Service {
    pub fn new(poller: LogPoller) -> Self {
        Self {
            filters: poller.filters.clone(),
            logs: poller.logs.clone(),
            progress: poller.progress.clone(),
            state: Mutex::new(State::Idle(Box::new(poller))),
        }
    }

    /// Spawns the tick task.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self) -> Result<(), PollerError> {
        let mut state = self.state.lock();
        let poller = match std::mem::replace(&mut *state, State::Stopped) {
            State::Idle(poller) => poller,
            other => {
                *state = other;
                return Err(PollerError::AlreadyRunning);
            }
        };

        let cancel = CancellationToken::new();
        let handle = tokio::spawn((*poller).run(cancel.clone()));
        *state = State::Running { cancel, handle };
        Ok(())
    }

    /// Cancels the tick task and waits for it to finish.
    pub async fn stop(&self) {
        let (cancel, handle) = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Stopped) {
                State::Running { cancel, handle } => (cancel, handle),
                other => {
                    *state = other;
                    return;
                }
            }
        };

        cancel.cancel();
        match handle.await {
            Ok(poller) => *self.state.lock() = State::Idle(Box::new(poller)),
            Err(e) => tracing::error!("log poller task failed: {e}"),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.state.lock(), State::Running { .. })
    }

    pub fn last_processed_block(&self) -> u32 {
        self.progress.load(Ordering::Acquire)
    }

    pub fn register_filter(&self, filter: Filter) -> Result<FilterId, StoreError> {
        self.filters.register(filter)
    }

    pub fn unregister_filter(&self, name: &str) -> Result<(), StoreError> {
        self.filters.unregister(name)
    }

    pub fn has_filter(&self, name: &str) -> Result<bool, StoreError> {
        self.filters.has(name)
    }

    pub fn filters(&self) -> &Arc<dyn FilterStore> {
        &self.filters
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellBuilder, HashBytes};
    use crate::client::MockChain;
    use crate::logpoller::{InMemoryFilterStore, InMemoryLogStore};
    use crate::models::StdAddr;

    fn init_logger() {
        _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn addr(byte: u8) -> StdAddr {
        StdAddr::new(0, HashBytes([byte; 32]))
    }

    fn body(value: u64) -> Cell {
        CellBuilder::build_from(value).unwrap()
    }

    fn make_poller(chain: &MockChain, config: PollerConfig) -> LogPoller {
        LogPoller::new(
            Arc::new(chain.clone()),
            Arc::new(InMemoryFilterStore::new()),
            Arc::new(InMemoryLogStore::default()),
            config,
        )
    }

    fn stored_values(store: &dyn LogStore, address: &StdAddr, topic: u32) -> Vec<u64> {
        store
            .logs(address, topic)
            .unwrap()
            .iter()
            .map(|log| log.data.parse::<u64>().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn tick_without_filters() {
        let chain = MockChain::new();
        chain.add_transaction(&addr(1), vec![(1, body(1))]);
        chain.push_master_block();
        let head = chain.push_master_block();

        let mut poller = make_poller(&chain, PollerConfig::default());
        poller.process_tick(&CancellationToken::new()).await.unwrap();

        assert_eq!(poller.last_processed_block(), head.seqno);
        assert!(poller.store().logs(&addr(1), 1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_tick_keeps_cursor() {
        init_logger();
        let chain = MockChain::new();
        let x = addr(1);
        let mut poller = make_poller(&chain, PollerConfig::default());
        poller.filters().register(Filter::new("A", x, 1)).unwrap();

        let cancel = CancellationToken::new();
        poller.process_tick(&cancel).await.unwrap();
        let before = poller.last_processed_block();

        chain.add_transaction(&x, vec![(1, body(10))]);
        let head = chain.push_master_block();

        chain.fail_next(1);
        assert!(poller.process_tick(&cancel).await.is_err());
        assert_eq!(poller.last_processed_block(), before);

        poller.process_tick(&cancel).await.unwrap();
        assert_eq!(poller.last_processed_block(), head.seqno);
        assert_eq!(stored_values(poller.store().as_ref(), &x, 1), [10]);

        // Nothing new
        poller.process_tick(&cancel).await.unwrap();
        assert_eq!(stored_values(poller.store().as_ref(), &x, 1), [10]);
    }

    #[tokio::test]
    async fn filters_are_not_retroactive() {
        let chain = MockChain::new();
        let x = addr(1);
        let cancel = CancellationToken::new();
        let mut poller = make_poller(&chain, PollerConfig::default());

        chain.add_transaction(&x, vec![(1, body(1))]);
        chain.push_master_block();
        poller.process_tick(&cancel).await.unwrap();

        poller.filters().register(Filter::new("A", x, 1)).unwrap();
        chain.add_transaction(&x, vec![(1, body(2)), (2, body(3))]);
        chain.push_master_block();
        poller.process_tick(&cancel).await.unwrap();

        assert_eq!(stored_values(poller.store().as_ref(), &x, 1), [2]);
        assert!(poller.store().logs(&x, 2).unwrap().is_empty());
    }

    #[tokio::test]
    async fn waits_for_confirmations() {
        let chain = MockChain::new();
        let x = addr(1);
        let cancel = CancellationToken::new();
        let config = PollerConfig {
            block_confirmations: 2,
            ..Default::default()
        };
        let mut poller = make_poller(&chain, config);
        poller.filters().register(Filter::new("A", x, 1)).unwrap();

        chain.add_transaction(&x, vec![(1, body(1))]);
        chain.push_master_block();
        poller.process_tick(&cancel).await.unwrap();
        assert_eq!(poller.last_processed_block(), 0);

        chain.push_master_block();
        poller.process_tick(&cancel).await.unwrap();
        assert_eq!(poller.last_processed_block(), 1);
        assert!(poller.store().logs(&x, 1).unwrap().is_empty());

        let head = chain.push_master_block();
        poller.process_tick(&cancel).await.unwrap();
        assert_eq!(poller.last_processed_block(), head.seqno - 2);
        assert_eq!(stored_values(poller.store().as_ref(), &x, 1), [1]);
    }

    #[tokio::test]
    async fn configured_log_retention() {
        let chain = MockChain::new();
        let x = addr(1);
        let config = PollerConfig {
            log_retention: Duration::from_secs(60),
            ..Default::default()
        };
        let mut poller = make_poller(&chain, config);
        poller.filters().register(Filter::new("A", x, 1)).unwrap();

        chain.add_transaction(&x, vec![(1, body(1))]);
        chain.push_master_block();

        let now = crate::logpoller::now_sec();
        poller.process_tick(&CancellationToken::new()).await.unwrap();

        let logs = poller.store().logs(&x, 1).unwrap();
        assert_eq!(logs.len(), 1);
        let ttl = logs[0].expires_at.unwrap() - now;
        assert!((60..=61).contains(&ttl));
    }

    #[tokio::test]
    async fn cold_start_skips_stored_logs() {
        let chain = MockChain::new();
        let x = addr(1);
        let cancel = CancellationToken::new();
        let filters: Arc<dyn FilterStore> = Arc::new(InMemoryFilterStore::new());
        let logs: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::default());
        filters.register(Filter::new("A", x, 1)).unwrap();

        let make = || {
            LogPoller::new(
                Arc::new(chain.clone()),
                filters.clone(),
                logs.clone(),
                PollerConfig::default(),
            )
        };

        chain.add_transaction(&x, vec![(1, body(1))]);
        chain.push_master_block();
        make().process_tick(&cancel).await.unwrap();
        assert_eq!(stored_values(logs.as_ref(), &x, 1), [1]);

        // Restart with the cursor lost but the store kept
        chain.add_transaction(&x, vec![(1, body(2))]);
        chain.push_master_block();
        let mut poller = make();
        assert_eq!(poller.last_processed_block(), 0);
        poller.process_tick(&cancel).await.unwrap();
        assert_eq!(stored_values(logs.as_ref(), &x, 1), [1, 2]);
    }

    #[tokio::test]
    async fn service_start_stop() {
        init_logger();
        let chain = MockChain::new();
        let x = addr(1);
        let config = PollerConfig {
            poll_period: Duration::from_millis(5),
            ..Default::default()
        };
        let service = Service::new(make_poller(&chain, config));

        service.register_filter(Filter::new("A", x, 1)).unwrap();
        assert!(service.has_filter("A").unwrap());

        service.start().unwrap();
        assert!(service.is_running());
        assert!(matches!(service.start(), Err(PollerError::AlreadyRunning)));

        chain.add_transaction(&x, vec![(1, body(7))]);
        let head = chain.push_master_block();

        for _ in 0..200 {
            if service.last_processed_block() >= head.seqno {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        service.stop().await;
        assert!(!service.is_running());
        assert_eq!(service.last_processed_block(), head.seqno);
        assert_eq!(stored_values(service.store().as_ref(), &x, 1), [7]);

        // Can be restarted
        service.unregister_filter("A").unwrap();
        assert!(!service.has_filter("A").unwrap());
        service.start().unwrap();
        service.stop().await;
    }
}
