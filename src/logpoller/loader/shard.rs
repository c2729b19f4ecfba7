use std::sync::Arc;
use std::time::Duration;

use ahash::{HashMap, HashSet};
use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use super::{check_range, lookup_mc_block, TxLoader};
use crate::cell::HashBytes;
use crate::client::TonClient;
use crate::error::ResultExt;
use crate::logpoller::error::LoaderError;
use crate::logpoller::types::{BlockRange, TxWithBlock};
use crate::models::{BlockId, ShardIdent, StdAddr, Transaction};

/// Loader which walks shard blocks between two masterchain blocks and
/// scans all their transactions.
pub struct ShardLoader {
    client: Arc<dyn TonClient>,
    page_size: u32,
    max_concurrent: usize,
    block_wait_timeout: Duration,
}

impl ShardLoader {
    pub fn new(
        client: Arc<dyn TonClient>,
        page_size: u32,
        max_concurrent: usize,
        block_wait_timeout: Duration,
    ) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            max_concurrent: max_concurrent.max(1),
            block_wait_timeout,
        }
    }

    /// Returns shard blocks which appeared after `range.prev` up to
    /// `range.to`, oldest first.
    async fn discover_blocks(
        &self,
        range: &BlockRange,
        with_masterchain: bool,
    ) -> Result<Vec<BlockId>, LoaderError> {
        let mut last_seen = HashMap::<ShardIdent, u32>::default();
        let first = match &range.prev {
            Some(prev) => {
                for block in self.client.get_shards(prev).await? {
                    last_seen.insert(block.shard, block.seqno);
                }
                prev.seqno + 1
            }
            None => 1,
        };

        let is_seen = |last_seen: &HashMap<ShardIdent, u32>, block: &BlockId| {
            last_seen
                .iter()
                .any(|(shard, seqno)| shard.intersects(&block.shard) && *seqno >= block.seqno)
        };

        let mut result = Vec::new();
        let mut discovered = HashSet::default();
        for mc_seqno in first..=range.to.seqno {
            let mc_block =
                lookup_mc_block(self.client.as_ref(), mc_seqno, self.block_wait_timeout).await?;
            let shards = self.client.get_shards(&mc_block).await?;

            for top in &shards {
                let mut new_blocks = Vec::new();
                let mut stack = vec![*top];
                while let Some(block) = stack.pop() {
                    if is_seen(&last_seen, &block) || !discovered.insert(block) {
                        continue;
                    }
                    let header = self.client.get_block_header(&block).await?;
                    stack.extend(header.prev_blocks);
                    new_blocks.push(block);
                }
                new_blocks.sort_by_key(|block| block.seqno);
                result.extend(new_blocks);
            }

            for top in shards {
                last_seen.insert(top.shard, top.seqno);
            }
            if with_masterchain {
                result.push(mc_block);
            }
        }

        tracing::debug!(
            from = first,
            to = range.to.seqno,
            count = result.len(),
            "discovered shard blocks"
        );
        Ok(result)
    }

    async fn scan_block(
        &self,
        block: &BlockId,
        accounts: &HashMap<(i8, HashBytes), StdAddr>,
    ) -> Result<Vec<TxWithBlock>, LoaderError> {
        // Shards of wider workchains cannot contain std accounts
        let Ok(workchain) = i8::try_from(block.shard.workchain()) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        let mut after = None;
        loop {
            let page = self
                .client
                .list_block_transactions(block, after, self.page_size)
                .await?;

            for id in &page.ids {
                let Some(address) = accounts.get(&(workchain, id.account)) else {
                    continue;
                };
                let cell = self.client.get_transaction(block, address, id.lt).await?;
                let tx = cell.parse::<Transaction>().context("transaction")?;
                result.push(TxWithBlock {
                    hash: *cell.repr_hash(),
                    block: *block,
                    tx,
                });
            }

            match page.ids.last() {
                Some(last) if page.incomplete => after = Some((last.account, last.lt)),
                _ => break,
            }
        }
        Ok(result)
    }
}

#[async_trait::async_trait]
impl TxLoader for ShardLoader {
    async fn load(
        &self,
        range: &BlockRange,
        addresses: &[StdAddr],
        cancel: &CancellationToken,
    ) -> Result<Vec<TxWithBlock>, LoaderError> {
        ok!(check_range(range));
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let accounts = addresses
            .iter()
            .map(|addr| ((addr.workchain, addr.address), *addr))
            .collect::<HashMap<_, _>>();
        let with_masterchain = addresses.iter().any(StdAddr::is_masterchain);

        let scan = async {
            let blocks = ok!(self.discover_blocks(range, with_masterchain).await);
            let scans = blocks
                .iter()
                .map(|block| self.scan_block(block, &accounts))
                .collect::<Vec<_>>();
            futures::stream::iter(scans)
                .buffered(self.max_concurrent)
                .try_collect::<Vec<_>>()
                .await
        };

        let blocks = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LoaderError::Cancelled),
            res = scan => ok!(res),
        };

        let mut result = blocks.into_iter().flatten().collect::<Vec<_>>();
        // Keep per-account lt order across blocks of different shards
        result.sort_by_key(|item| (item.tx.account, item.tx.lt));
        Ok(result)
    }
}
