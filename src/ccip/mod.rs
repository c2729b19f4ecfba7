//! CCIP wire types.
//!
//! All types implement [`Store`] and [`Load`] with the same layout as the
//! on-chain contracts, so they can be passed to [`BocRepr`] directly.
//!
//! [`Store`]: crate::cell::Store
//! [`Load`]: crate::cell::Load
//! [`BocRepr`]: crate::boc::BocRepr

pub use self::chain::{ChainDefinition, ChainFamily};
pub use self::commit::{
    CommitReport, GasPriceUpdate, MerkleRoot, PriceUpdates, Signature, TokenPriceUpdate,
};
pub use self::common::{OnRampAddress, RampMessageHeader, SeqNumRange, Uint256};
pub use self::events::{
    event_topic, CCIPMessageSent, CommitReportAccepted, Event, ExecutionStateChanged,
    ExtOutLogBucket, MessageExecutionState,
};
pub use self::execute::ExecuteReport;
pub use self::extra_args::{ExtraArgs, GenericExtraArgsV2, SvmExtraArgsV1};
pub use self::fee_quoter::{
    DestChainConfig, DestChainConfigs, FeeQuoterStaticConfig, TimestampedPrice,
};
pub use self::message::{
    Any2TONRampMessage, Any2TONTokenTransfer, TON2AnyRampMessage, TON2AnyTokenTransfer,
};
pub use self::offramp::{
    OffRampDynamicConfig, OffRampStaticConfig, OnRampDestChainConfig, SourceChainConfig,
};

mod chain;
mod commit;
mod common;
mod events;
mod execute;
mod extra_args;
mod fee_quoter;
mod message;
mod offramp;
