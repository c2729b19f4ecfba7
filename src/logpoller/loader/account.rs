use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use super::{check_range, TxLoader};
use crate::client::{NetworkError, TonClient};
use crate::error::ResultExt;
use crate::logpoller::error::LoaderError;
use crate::logpoller::types::{BlockRange, TxWithBlock};
use crate::models::{StdAddr, Transaction};

/// Loader which pages account histories backwards from the target block.
pub struct AccountLoader {
    client: Arc<dyn TonClient>,
    page_size: u32,
    max_concurrent: usize,
}

impl AccountLoader {
    pub fn new(client: Arc<dyn TonClient>, page_size: u32, max_concurrent: usize) -> Self {
        Self {
            client,
            page_size: page_size.max(1),
            max_concurrent: max_concurrent.max(1),
        }
    }

    async fn scan_account(
        &self,
        range: &BlockRange,
        address: &StdAddr,
    ) -> Result<Vec<TxWithBlock>, LoaderError> {
        let start = match &range.prev {
            Some(prev) => self.client.get_account_state(prev, address).await?,
            None => None,
        };
        let start_lt = start.map(|state| state.last_trans_lt).unwrap_or_default();

        let Some(end) = self.client.get_account_state(&range.to, address).await? else {
            if start.is_some() {
                return Err(LoaderError::AccountMissing(*address));
            }
            return Ok(Vec::new());
        };
        if end.last_trans_lt <= start_lt {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        let (mut lt, mut hash) = (end.last_trans_lt, end.last_trans_hash);
        'pages: loop {
            let page = match self
                .client
                .get_transactions(address, lt, &hash, self.page_size)
                .await
            {
                Ok(page) => page,
                Err(NetworkError::NoTransactions) => break,
                Err(source) => {
                    return Err(LoaderError::PageFailed {
                        address: *address,
                        source,
                    })
                }
            };
            let page_len = page.len();

            for item in page {
                let tx = item.cell.parse::<Transaction>().context("transaction")?;
                if tx.lt <= start_lt {
                    break 'pages;
                }

                lt = tx.prev_trans_lt;
                hash = tx.prev_trans_hash;
                result.push(TxWithBlock {
                    hash: *item.cell.repr_hash(),
                    block: item.block,
                    tx,
                });
            }

            if lt == 0 || page_len < self.page_size as usize {
                break;
            }
        }

        // Pages are newest first
        result.reverse();

        tracing::debug!(
            %address,
            start_lt,
            end_lt = end.last_trans_lt,
            count = result.len(),
            "scanned account"
        );
        Ok(result)
    }
}

#[async_trait::async_trait]
impl TxLoader for AccountLoader {
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

        let scans = addresses
            .iter()
            .map(|address| self.scan_account(range, address))
            .collect::<Vec<_>>();
        let scan = futures::stream::iter(scans)
            .buffered(self.max_concurrent)
            .try_collect::<Vec<_>>();

        let accounts = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LoaderError::Cancelled),
            res = scan => ok!(res),
        };

        Ok(accounts.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellBuilder, HashBytes};
    use crate::client::MockChain;

    fn addr(byte: u8) -> StdAddr {
        StdAddr::new(0, HashBytes([byte; 32]))
    }

    fn loader(chain: &MockChain, page_size: u32) -> AccountLoader {
        AccountLoader::new(Arc::new(chain.clone()), page_size, 4)
    }

    fn add_txs(chain: &MockChain, address: &StdAddr, count: u32) -> Vec<u64> {
        (0..count)
            .map(|i| {
                let body = CellBuilder::build_from(i).unwrap();
                chain.add_transaction(address, vec![(1, body)]).lt
            })
            .collect()
    }

    #[tokio::test]
    async fn loads_new_transactions_only() {
        let chain = MockChain::new();
        let (x, y, z) = (addr(1), addr(2), addr(3));

        let old = add_txs(&chain, &x, 3);
        add_txs(&chain, &z, 2);
        let prev = chain.push_master_block();

        let new_x = add_txs(&chain, &x, 7);
        let new_y = add_txs(&chain, &y, 2);
        add_txs(&chain, &z, 1);
        let to = chain.push_master_block();

        let cancel = CancellationToken::new();
        let range = BlockRange {
            prev: Some(prev),
            to,
        };
        for page_size in [1, 3, 100] {
            let txs = loader(&chain, page_size)
                .load(&range, &[x, y], &cancel)
                .await
                .unwrap();

            let lts = txs.iter().map(|item| item.tx.lt).collect::<Vec<_>>();
            let expected = new_x.iter().chain(&new_y).copied().collect::<Vec<_>>();
            assert_eq!(lts, expected);

            for item in &txs {
                assert!(!old.contains(&item.tx.lt));
                assert!(item.tx.account == x.address || item.tx.account == y.address);
                assert!(!item.block.is_masterchain());
            }
        }
    }

    #[tokio::test]
    async fn first_run_loads_full_history() {
        let chain = MockChain::new();
        let x = addr(1);
        let mut all = add_txs(&chain, &x, 4);
        chain.push_master_block();
        all.extend(add_txs(&chain, &x, 4));
        let to = chain.push_master_block();

        let range = BlockRange { prev: None, to };
        let txs = loader(&chain, 3)
            .load(&range, &[x], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(txs.iter().map(|i| i.tx.lt).collect::<Vec<_>>(), all);
        assert_eq!(txs[0].tx.prev_trans_lt, 0);
    }

    #[tokio::test]
    async fn range_and_failures() {
        let chain = MockChain::new();
        let x = addr(1);
        add_txs(&chain, &x, 2);
        let head = chain.push_master_block();
        let loader = loader(&chain, 10);
        let cancel = CancellationToken::new();

        let range = BlockRange {
            prev: Some(head),
            to: head,
        };
        assert!(matches!(
            loader.load(&range, &[x], &cancel).await,
            Err(LoaderError::InvalidRange { prev: 2, to: 2 })
        ));

        let range = BlockRange {
            prev: None,
            to: head,
        };
        assert!(loader.load(&range, &[], &cancel).await.unwrap().is_empty());

        // Unknown accounts have no transactions
        let txs = loader.load(&range, &[addr(9)], &cancel).await.unwrap();
        assert!(txs.is_empty());

        chain.fail_next(1);
        let err = loader.load(&range, &[x], &cancel).await.unwrap_err();
        assert!(matches!(err, LoaderError::Network(_)));

        cancel.cancel();
        let err = loader.load(&range, &[x], &cancel).await.unwrap_err();
        assert!(matches!(err, LoaderError::Cancelled));
    }
}
