use crate::client::NetworkError;
use crate::error::CodecError;
use crate::models::StdAddr;

/// Storage backend failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexerError {
    #[error("failed to decode event topic: {0}")]
    TopicDecodeFailed(#[source] CodecError),
    #[error("filter store unavailable")]
    FilterStoreUnavailable(#[from] StoreError),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LoaderError {
    #[error("invalid block range: prev {prev} is not before {to}")]
    InvalidRange { prev: u32, to: u32 },
    #[error("account {0} is missing at the target block")]
    AccountMissing(StdAddr),
    #[error("failed to load transactions page of {address}")]
    PageFailed {
        address: StdAddr,
        #[source]
        source: NetworkError,
    },
    #[error("network error")]
    Network(#[from] NetworkError),
    #[error("failed to parse transaction")]
    Parse(#[from] CodecError),
    #[error("loading cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(&'static str),
    #[error("failed to parse log data")]
    ParseError(#[source] CodecError),
    #[error("store error")]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PollerError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Indexer(#[from] IndexerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("poller is already running")]
    AlreadyRunning,
}
