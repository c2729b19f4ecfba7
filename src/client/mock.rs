use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::Notify;

use super::*;
use crate::ccip::ExtOutLogBucket;
use crate::cell::CellBuilder;
use crate::dict::Dict;
use crate::models::*;
use crate::num::Uint15;

type GetMethod = Arc<dyn Fn(&[StackEntry]) -> Result<Vec<StackEntry>, NetworkError> + Send + Sync>;

/// Deterministic in-memory chain.
///
/// Transactions added with [`MockChain::add_transaction`] become visible
/// once the next masterchain block is produced by
/// [`MockChain::push_master_block`].
#[derive(Clone)]
pub struct MockChain {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<ChainState>,
    new_block: Notify,
    failures: AtomicUsize,
}

struct ChainState {
    lt: u64,
    now: u32,
    masters: Vec<BlockId>,
    shard_snapshots: HashMap<u32, Vec<BlockId>>,
    slots: Vec<ShardSlot>,
    headers: HashMap<BlockId, BlockHeader>,
    block_txs: HashMap<BlockId, Vec<(TxId, Cell)>>,
    accounts: HashMap<StdAddr, Vec<AccountTx>>,
    get_methods: HashMap<(StdAddr, String), GetMethod>,
}

struct ShardSlot {
    shard: ShardIdent,
    prev: Vec<BlockId>,
}

struct AccountTx {
    id: TxId,
    cell: Cell,
    block: Option<(BlockId, u32)>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    const GENESIS_UTIME: u32 = 1_700_000_000;

    /// Creates a chain with a single basechain shard and the first
    /// masterchain block.
    pub fn new() -> Self {
        let chain = Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ChainState {
                    lt: 1_000_000,
                    now: Self::GENESIS_UTIME,
                    masters: Vec::new(),
                    shard_snapshots: HashMap::new(),
                    slots: vec![ShardSlot {
                        shard: ShardIdent::BASECHAIN,
                        prev: Vec::new(),
                    }],
                    headers: HashMap::new(),
                    block_txs: HashMap::new(),
                    accounts: HashMap::new(),
                    get_methods: HashMap::new(),
                }),
                new_block: Notify::new(),
                failures: AtomicUsize::new(0),
            }),
        };
        chain.push_master_block();
        chain
    }

    /// Returns the latest masterchain block.
    pub fn head(&self) -> BlockId {
        let state = self.inner.state.lock();
        state.masters[state.masters.len() - 1]
    }

    /// Makes the next `n` requests fail with [`NetworkError::Unavailable`].
    pub fn fail_next(&self, n: usize) {
        self.inner.failures.store(n, Ordering::Release);
    }

    /// Adds a pending transaction which emits the specified events.
    pub fn add_transaction(&self, address: &StdAddr, events: Vec<(u32, Cell)>) -> TxId {
        let mut state = self.inner.state.lock();
        state.lt += 10;
        let lt = state.lt;
        let now = state.now;

        let (prev_trans_lt, prev_trans_hash) = state
            .accounts
            .get(address)
            .and_then(|txs| txs.last())
            .map(|tx| (tx.id.lt, tx.id.hash))
            .unwrap_or_default();

        let mut out_msgs = Dict::new();
        for (i, (topic, body)) in events.iter().enumerate() {
            let message = Message {
                info: MsgInfo::ExtOut(ExtOutMsgInfo {
                    src: (*address).into(),
                    dst: Some(ExtOutLogBucket::new(*topic).to_ext_addr()),
                    created_lt: lt + 1 + i as u64,
                    created_at: now,
                }),
                init: None,
                body: body.clone(),
                layout: MessageLayout {
                    init_to_cell: false,
                    body_to_cell: true,
                },
            };
            let message = CellBuilder::build_from(&message).unwrap();
            out_msgs.set(Uint15::new(i as u16), message).unwrap();
        }

        let tx = Transaction {
            account: address.address,
            lt,
            prev_trans_hash,
            prev_trans_lt,
            now,
            out_msg_count: Uint15::new(events.len() as u16),
            orig_status: AccountStatus::Active,
            end_status: AccountStatus::Active,
            in_msg: None,
            out_msgs,
            total_fees: CurrencyCollection::new(1_000_000),
            state_update: HashUpdate::default(),
            info: TxInfo::Ordinary(OrdinaryTxInfo {
                credit_first: true,
                storage_phase: None,
                credit_phase: None,
                compute_phase: ComputePhase::Skipped(ComputePhaseSkipReason::NoGas),
                action_phase: None,
                aborted: false,
                bounce_phase: None,
                destroyed: false,
            }),
        };
        let cell = CellBuilder::build_from(&tx).unwrap();
        let id = TxId {
            account: address.address,
            lt,
            hash: *cell.repr_hash(),
        };
        state.accounts.entry(*address).or_default().push(AccountTx {
            id,
            cell,
            block: None,
        });
        id
    }

    /// Produces new shard blocks and a masterchain block which references
    /// them. All pending transactions are included into these blocks.
    pub fn push_master_block(&self) -> BlockId {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        state.now += 5;
        let gen_utime = state.now;
        let mc_seqno = state.masters.len() as u32 + 1;

        let mut shard_blocks = Vec::with_capacity(state.slots.len());
        for slot in &mut state.slots {
            let seqno = slot.prev.iter().map(|id| id.seqno).max().unwrap_or(0) + 1;
            let id = make_block_id(slot.shard, seqno);
            let after_merge = slot.prev.len() == 2;
            let after_split = slot.prev.len() == 1 && slot.prev[0].shard != slot.shard;
            state.headers.insert(id, BlockHeader {
                id,
                prev_blocks: std::mem::replace(&mut slot.prev, vec![id]),
                after_split,
                after_merge,
                gen_utime,
            });
            shard_blocks.push(id);
        }

        let mc_id = make_block_id(ShardIdent::MASTERCHAIN, mc_seqno);
        state.headers.insert(mc_id, BlockHeader {
            id: mc_id,
            prev_blocks: state.masters.last().copied().into_iter().collect(),
            after_split: false,
            after_merge: false,
            gen_utime,
        });

        for (address, txs) in &mut state.accounts {
            let block = if address.is_masterchain() {
                mc_id
            } else {
                match shard_blocks.iter().find(|id| {
                    id.shard.workchain() == address.workchain as i32
                        && id.shard.contains_account(&address.address)
                }) {
                    Some(id) => *id,
                    None => continue,
                }
            };

            for tx in txs.iter_mut().filter(|tx| tx.block.is_none()) {
                tx.block = Some((block, mc_seqno));
                state
                    .block_txs
                    .entry(block)
                    .or_default()
                    .push((tx.id, tx.cell.clone()));
            }
        }
        for txs in state.block_txs.values_mut() {
            txs.sort_by_key(|(id, _)| (id.account, id.lt));
        }

        state.shard_snapshots.insert(mc_seqno, shard_blocks);
        state.masters.push(mc_id);
        drop(guard);

        self.inner.new_block.notify_waiters();
        mc_id
    }

    /// Splits the shard. Takes effect with the next masterchain block.
    pub fn split_shard(&self, shard: ShardIdent) -> bool {
        let mut state = self.inner.state.lock();
        let Some(index) = state.slots.iter().position(|slot| slot.shard == shard) else {
            return false;
        };
        let Some((left, right)) = shard.split() else {
            return false;
        };
        let slot = state.slots.remove(index);
        state.slots.push(ShardSlot {
            shard: left,
            prev: slot.prev.clone(),
        });
        state.slots.push(ShardSlot {
            shard: right,
            prev: slot.prev,
        });
        true
    }

    /// Merges two children of the shard. Takes effect with the next
    /// masterchain block.
    pub fn merge_shards(&self, parent: ShardIdent) -> bool {
        let Some((left, right)) = parent.split() else {
            return false;
        };
        let mut state = self.inner.state.lock();
        let find = |slots: &[ShardSlot], shard| slots.iter().position(|slot| slot.shard == shard);
        let (Some(_), Some(_)) = (find(&state.slots, left), find(&state.slots, right)) else {
            return false;
        };

        let mut prev = Vec::with_capacity(2);
        for shard in [left, right] {
            if let Some(index) = find(&state.slots, shard) {
                prev.extend(state.slots.remove(index).prev);
            }
        }
        state.slots.push(ShardSlot {
            shard: parent,
            prev,
        });
        true
    }

    /// Registers a get-method handler for the account.
    pub fn set_get_method<F>(&self, address: &StdAddr, name: &str, f: F)
    where
        F: Fn(&[StackEntry]) -> Result<Vec<StackEntry>, NetworkError> + Send + Sync + 'static,
    {
        self.inner
            .state
            .lock()
            .get_methods
            .insert((*address, name.to_owned()), Arc::new(f));
    }

    fn check_failure(&self) -> Result<(), NetworkError> {
        let failures = &self.inner.failures;
        match failures.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1)) {
            Ok(_) => Err(NetworkError::Unavailable("injected failure".to_owned())),
            Err(_) => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl TonClient for MockChain {
    async fn get_masterchain_info(&self) -> Result<MasterchainInfo, NetworkError> {
        self.check_failure()?;
        Ok(MasterchainInfo { last: self.head() })
    }

    async fn lookup_block(&self, shard: ShardIdent, seqno: u32) -> Result<BlockId, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        let found = if shard.is_masterchain() {
            seqno
                .checked_sub(1)
                .and_then(|i| state.masters.get(i as usize))
                .copied()
        } else {
            state
                .headers
                .keys()
                .find(|id| id.shard == shard && id.seqno == seqno)
                .copied()
        };
        found.ok_or_else(|| NetworkError::NotFound(format!("block {shard}:{seqno}")))
    }

    async fn get_account_state(
        &self,
        block: &BlockId,
        address: &StdAddr,
    ) -> Result<Option<AccountState>, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        let Some(txs) = state.accounts.get(address) else {
            return Ok(None);
        };
        Ok(txs
            .iter()
            .rev()
            .find(|tx| matches!(tx.block, Some((_, mc_seqno)) if mc_seqno <= block.seqno))
            .map(|tx| AccountState {
                last_trans_lt: tx.id.lt,
                last_trans_hash: tx.id.hash,
                balance: 1_000_000_000,
            }))
    }

    async fn get_transactions(
        &self,
        address: &StdAddr,
        lt: u64,
        hash: &HashBytes,
        count: u32,
    ) -> Result<Vec<BlockTransaction>, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        let txs = match state.accounts.get(address) {
            Some(txs) => txs,
            None => return Err(NetworkError::NoTransactions),
        };
        let Some(start) = txs
            .iter()
            .position(|tx| tx.id.lt == lt && tx.id.hash == *hash && tx.block.is_some())
        else {
            return Err(NetworkError::NoTransactions);
        };

        Ok(txs[..=start]
            .iter()
            .rev()
            .take(count as usize)
            .filter_map(|tx| {
                let (block, _) = tx.block?;
                Some(BlockTransaction {
                    block,
                    cell: tx.cell.clone(),
                })
            })
            .collect())
    }

    async fn get_shards(&self, mc_block: &BlockId) -> Result<Vec<BlockId>, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        state
            .shard_snapshots
            .get(&mc_block.seqno)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(format!("masterchain block {}", mc_block.seqno)))
    }

    async fn get_block_header(&self, block: &BlockId) -> Result<BlockHeader, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        state
            .headers
            .get(block)
            .cloned()
            .ok_or_else(|| NetworkError::NotFound(format!("block {block}")))
    }

    async fn list_block_transactions(
        &self,
        block: &BlockId,
        after: Option<(HashBytes, u64)>,
        count: u32,
    ) -> Result<BlockTransactions, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        if !state.headers.contains_key(block) {
            return Err(NetworkError::NotFound(format!("block {block}")));
        }
        let Some(txs) = state.block_txs.get(block) else {
            return Ok(BlockTransactions::default());
        };

        let mut ids = txs
            .iter()
            .map(|(id, _)| *id)
            .filter(|id| match after {
                Some(after) => (id.account, id.lt) > after,
                None => true,
            });
        let page = ids.by_ref().take(count as usize).collect::<Vec<_>>();
        Ok(BlockTransactions {
            ids: page,
            incomplete: ids.next().is_some(),
        })
    }

    async fn get_transaction(
        &self,
        block: &BlockId,
        address: &StdAddr,
        lt: u64,
    ) -> Result<Cell, NetworkError> {
        self.check_failure()?;
        let state = self.inner.state.lock();
        state
            .block_txs
            .get(block)
            .and_then(|txs| {
                txs.iter()
                    .find(|(id, _)| id.account == address.address && id.lt == lt)
            })
            .map(|(_, cell)| cell.clone())
            .ok_or_else(|| NetworkError::NotFound(format!("transaction {address}:{lt}")))
    }

    async fn run_get_method(
        &self,
        address: &StdAddr,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, NetworkError> {
        self.check_failure()?;
        let handler = self
            .inner
            .state
            .lock()
            .get_methods
            .get(&(*address, method.to_owned()))
            .cloned();
        match handler {
            Some(handler) => handler(&stack),
            None => Err(NetworkError::VmError { exit_code: 11 }),
        }
    }

    async fn wait_masterchain_seqno(
        &self,
        seqno: u32,
        timeout: Duration,
    ) -> Result<(), NetworkError> {
        let wait = async {
            loop {
                let notified = self.inner.new_block.notified();
                if self.inner.state.lock().masters.len() as u32 >= seqno {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| NetworkError::Timeout)
    }
}

fn make_block_id(shard: ShardIdent, seqno: u32) -> BlockId {
    let mut hasher = Sha256::new();
    hasher.update(shard.workchain().to_be_bytes());
    hasher.update(shard.prefix().to_be_bytes());
    hasher.update(seqno.to_be_bytes());
    let root_hash = HashBytes(hasher.finalize().into());
    let file_hash = HashBytes(Sha256::digest(root_hash.0).into());
    BlockId {
        shard,
        seqno,
        root_hash,
        file_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> StdAddr {
        StdAddr::new(0, HashBytes([byte; 32]))
    }

    #[tokio::test]
    async fn transactions_become_visible_with_master_block() {
        let chain = MockChain::new();
        let address = addr(1);
        let genesis = chain.head();
        assert_eq!(genesis.seqno, 1);

        let first = chain.add_transaction(&address, vec![(1, Cell::empty_cell())]);
        let second = chain.add_transaction(&address, Vec::new());
        assert_eq!(chain.get_account_state(&genesis, &address).await.unwrap(), None);

        let head = chain.push_master_block();
        let state = chain.get_account_state(&head, &address).await.unwrap().unwrap();
        assert_eq!(state.last_trans_lt, second.lt);

        let txs = chain
            .get_transactions(&address, second.lt, &second.hash, 10)
            .await
            .unwrap();
        assert_eq!(txs.len(), 2);
        let newest = txs[0].cell.parse::<Transaction>().unwrap();
        assert_eq!(newest.prev_trans_lt, first.lt);
        assert_eq!(newest.prev_trans_hash, first.hash);
        assert_eq!(*txs[1].cell.repr_hash(), first.hash);
        assert!(!txs[0].block.is_masterchain());
    }

    #[tokio::test]
    async fn shard_split_and_merge() {
        let chain = MockChain::new();
        assert!(chain.split_shard(ShardIdent::BASECHAIN));
        let mc = chain.push_master_block();
        let shards = chain.get_shards(&mc).await.unwrap();
        assert_eq!(shards.len(), 2);
        for shard in &shards {
            let header = chain.get_block_header(shard).await.unwrap();
            assert!(header.after_split);
            assert_eq!(header.prev_blocks[0].shard, ShardIdent::BASECHAIN);
        }

        assert!(chain.merge_shards(ShardIdent::BASECHAIN));
        let mc = chain.push_master_block();
        let shards = chain.get_shards(&mc).await.unwrap();
        assert_eq!(shards.len(), 1);
        let header = chain.get_block_header(&shards[0]).await.unwrap();
        assert!(header.after_merge);
        assert_eq!(header.prev_blocks.len(), 2);
    }

    #[tokio::test]
    async fn failures_and_waiting() {
        let chain = MockChain::new();
        chain.fail_next(1);
        assert!(matches!(
            chain.get_masterchain_info().await,
            Err(NetworkError::Unavailable(_))
        ));
        assert!(chain.get_masterchain_info().await.is_ok());

        let err = chain
            .wait_masterchain_seqno(3, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, NetworkError::Timeout);

        let waiter = {
            let chain = chain.clone();
            tokio::spawn(async move {
                chain
                    .wait_masterchain_seqno(2, Duration::from_secs(5))
                    .await
            })
        };
        tokio::task::yield_now().await;
        chain.push_master_block();
        waiter.await.unwrap().unwrap();

        let err = chain
            .run_get_method(&addr(1), "unknown", Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err, NetworkError::VmError { exit_code: 11 });
    }
}
