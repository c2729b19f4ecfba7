//! Network seam used by the log poller and the chain accessor.
//!
//! [`TonClient`] mirrors the subset of the lite server API which is needed
//! to discover blocks, page account transactions and run get-methods.

use std::time::Duration;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::cell::{Cell, HashBytes, Load};
use crate::models::{BlockId, ShardIdent, StdAddr};
use crate::util::crc_16;

#[cfg(any(test, feature = "test-utils"))]
pub use self::mock::MockChain;

#[cfg(any(test, feature = "test-utils"))]
mod mock;

/// Read access to the blockchain.
#[async_trait::async_trait]
pub trait TonClient: Send + Sync {
    /// Returns the latest known masterchain block.
    async fn get_masterchain_info(&self) -> Result<MasterchainInfo, NetworkError>;

    /// Finds a block of the shard by its seqno.
    async fn lookup_block(&self, shard: ShardIdent, seqno: u32) -> Result<BlockId, NetworkError>;

    /// Returns the account state at the specified masterchain block.
    ///
    /// Returns `None` if the account did not exist at that block.
    async fn get_account_state(
        &self,
        block: &BlockId,
        address: &StdAddr,
    ) -> Result<Option<AccountState>, NetworkError>;

    /// Returns up to `count` account transactions starting from the one with
    /// the specified `lt` and `hash` (inclusive), newest first.
    async fn get_transactions(
        &self,
        address: &StdAddr,
        lt: u64,
        hash: &HashBytes,
        count: u32,
    ) -> Result<Vec<BlockTransaction>, NetworkError>;

    /// Returns the latest shard blocks referenced by the masterchain block.
    async fn get_shards(&self, mc_block: &BlockId) -> Result<Vec<BlockId>, NetworkError>;

    /// Returns the header of the block.
    async fn get_block_header(&self, block: &BlockId) -> Result<BlockHeader, NetworkError>;

    /// Lists ids of the block transactions, ordered by account and lt.
    async fn list_block_transactions(
        &self,
        block: &BlockId,
        after: Option<(HashBytes, u64)>,
        count: u32,
    ) -> Result<BlockTransactions, NetworkError>;

    /// Returns a transaction of the block.
    async fn get_transaction(
        &self,
        block: &BlockId,
        address: &StdAddr,
        lt: u64,
    ) -> Result<Cell, NetworkError>;

    /// Runs a get-method of the account at the latest block.
    async fn run_get_method(
        &self,
        address: &StdAddr,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, NetworkError>;

    /// Waits until the masterchain block with the specified seqno is known.
    async fn wait_masterchain_seqno(&self, seqno: u32, timeout: Duration)
        -> Result<(), NetworkError>;
}

/// Latest masterchain state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MasterchainInfo {
    pub last: BlockId,
}

/// Short account state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AccountState {
    pub last_trans_lt: u64,
    pub last_trans_hash: HashBytes,
    pub balance: u128,
}

/// Serialized transaction with the shard block it belongs to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BlockTransaction {
    pub block: BlockId,
    pub cell: Cell,
}

/// Part of the block header required to walk the shard chains.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BlockHeader {
    pub id: BlockId,
    /// One parent for an ordinary block or after a split, two after a merge.
    pub prev_blocks: Vec<BlockId>,
    pub after_split: bool,
    pub after_merge: bool,
    pub gen_utime: u32,
}

/// Short transaction id.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TxId {
    pub account: HashBytes,
    pub lt: u64,
    pub hash: HashBytes,
}

/// A page of block transactions.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct BlockTransactions {
    pub ids: Vec<TxId>,
    /// Whether there are more transactions after the last id.
    pub incomplete: bool,
}

/// TVM stack value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StackEntry {
    Null,
    /// Integer value (up to 257 bits).
    Int(BigInt),
    Cell(Cell),
    /// Slice over the whole cell.
    Slice(Cell),
    Tuple(Vec<StackEntry>),
}

impl StackEntry {
    /// Returns the entry as an integer, if it is one.
    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Self::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the entry as a `u64`, if it is an integer that fits.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_int().and_then(ToPrimitive::to_u64)
    }

    /// Returns the underlying cell of a cell or a slice entry.
    pub fn as_cell(&self) -> Option<&Cell> {
        match self {
            Self::Cell(cell) | Self::Slice(cell) => Some(cell),
            _ => None,
        }
    }

    /// Returns the tuple items, if it is a tuple.
    pub fn as_tuple(&self) -> Option<&[StackEntry]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Returns whether the entry is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Parses a cell or a slice entry.
    pub fn parse<T>(&self) -> Option<Result<T, crate::error::Error>>
    where
        for<'a> T: Load<'a>,
    {
        self.as_cell().map(Cell::parse::<T>)
    }
}

impl From<u64> for StackEntry {
    #[inline]
    fn from(value: u64) -> Self {
        Self::Int(BigInt::from(value))
    }
}

impl From<Cell> for StackEntry {
    #[inline]
    fn from(value: Cell) -> Self {
        Self::Cell(value)
    }
}

/// Computes a get-method id from its name.
pub fn method_id(name: &str) -> u32 {
    (crc_16(name.as_bytes()) as u32 & 0xffff) | 0x10000
}

/// Network error.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum NetworkError {
    #[error("request timed out")]
    Timeout,
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("no transactions found")]
    NoTransactions,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("get-method failed with exit code {exit_code}")]
    VmError { exit_code: i32 },
    #[error("unexpected response: {0}")]
    Unexpected(String),
}
