//! Transaction loaders.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::LoaderError;
use super::types::{BlockRange, TxWithBlock};
use crate::client::{NetworkError, TonClient};
use crate::models::{BlockId, ShardIdent, StdAddr};

pub use self::account::AccountLoader;
#[cfg(feature = "shard-scan")]
pub use self::shard::ShardLoader;

mod account;
#[cfg(feature = "shard-scan")]
mod shard;

/// Loads transactions of the monitored accounts.
#[async_trait::async_trait]
pub trait TxLoader: Send + Sync {
    /// Returns all transactions of `addresses` which were included after
    /// `range.prev` and up to `range.to`.
    ///
    /// Transactions of each account are ordered by lt.
    async fn load(
        &self,
        range: &BlockRange,
        addresses: &[StdAddr],
        cancel: &CancellationToken,
    ) -> Result<Vec<TxWithBlock>, LoaderError>;
}

fn check_range(range: &BlockRange) -> Result<(), LoaderError> {
    match &range.prev {
        Some(prev) if prev.seqno >= range.to.seqno => Err(LoaderError::InvalidRange {
            prev: prev.seqno,
            to: range.to.seqno,
        }),
        _ => Ok(()),
    }
}

/// Finds a masterchain block, waiting up to `timeout` for it to appear.
pub(crate) async fn lookup_mc_block(
    client: &dyn TonClient,
    seqno: u32,
    timeout: Duration,
) -> Result<BlockId, NetworkError> {
    match client.lookup_block(ShardIdent::MASTERCHAIN, seqno).await {
        Err(NetworkError::NotFound(_)) => {
            tracing::debug!(seqno, "waiting for masterchain block");
            ok!(client.wait_masterchain_seqno(seqno, timeout).await);
            client.lookup_block(ShardIdent::MASTERCHAIN, seqno).await
        }
        res => res,
    }
}
