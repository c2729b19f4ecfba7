//! Events emitted by the CCIP contracts as external out messages.

use super::{MerkleRoot, PriceUpdates, TON2AnyRampMessage};
use crate::cell::{CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::{CodecError, CodecErrorKind, Error};
use crate::models::ExtAddr;
use crate::snake::{pack_snake_data, unpack_snake_data};

/// Computes an event topic from the event name.
#[inline]
pub fn event_topic(name: &str) -> u32 {
    crc32fast::hash(name.as_bytes())
}

/// A contract event with a well-known topic.
pub trait Event: for<'a> Load<'a> {
    /// Event name used to compute the topic.
    const NAME: &'static str;

    /// Returns the event topic.
    fn topic() -> u32 {
        event_topic(Self::NAME)
    }
}

/// Destination of an external out message which carries an event.
///
/// A 256-bit external address where the last 4 bytes are the event topic.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct ExtOutLogBucket {
    pub topic: u32,
}

impl ExtOutLogBucket {
    /// Length of the bucket address in bits.
    pub const BITS: u16 = 256;

    /// Creates a bucket for the specified topic.
    #[inline]
    pub const fn new(topic: u32) -> Self {
        Self { topic }
    }

    /// Decodes a bucket from the message destination.
    pub fn from_ext_addr(addr: &ExtAddr) -> Result<Self, CodecError> {
        if addr.data_bit_len.into_inner() != Self::BITS || addr.data.len() != 32 {
            return Err(CodecError::new(
                CodecErrorKind::BadAddress,
                format!(
                    "expected a 256-bit log bucket, got {} bits",
                    addr.data_bit_len.into_inner()
                ),
            ));
        }
        let mut topic = [0; 4];
        topic.copy_from_slice(&addr.data[28..]);
        Ok(Self {
            topic: u32::from_be_bytes(topic),
        })
    }

    /// Converts the bucket into an external address.
    pub fn to_ext_addr(&self) -> ExtAddr {
        let mut data = vec![0; 32];
        data[28..].copy_from_slice(&self.topic.to_be_bytes());
        ExtAddr {
            data_bit_len: crate::num::Uint9::new(Self::BITS),
            data,
        }
    }
}

/// A message was accepted by the on-ramp.
///
/// ```text
/// ccip_message_sent#_ dest_chain_selector:uint64 sequence_number:uint64
///     message:^TON2AnyRampMessage = CCIPMessageSent;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CCIPMessageSent {
    pub dest_chain_selector: u64,
    pub sequence_number: u64,
    pub message: TON2AnyRampMessage,
}

impl CCIPMessageSent {
    /// Byte offset of the destination chain selector in the event body.
    pub const DEST_CHAIN_SELECTOR_OFFSET: usize = 0;
    /// Byte offset of the sequence number in the event body.
    pub const SEQUENCE_NUMBER_OFFSET: usize = 8;
}

impl Event for CCIPMessageSent {
    const NAME: &'static str = "CCIPMessageSent";
}

impl Store for CCIPMessageSent {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.dest_chain_selector));
        ok!(builder.store_u64(self.sequence_number));
        builder.store_reference(ok!(CellBuilder::build_from(&self.message)))
    }
}

impl<'a> Load<'a> for CCIPMessageSent {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            dest_chain_selector: ok!(slice.load_u64()),
            sequence_number: ok!(slice.load_u64()),
            message: ok!(ok!(slice.load_reference()).parse::<TON2AnyRampMessage>()),
        })
    }
}

/// A commit report was accepted by the off-ramp.
///
/// ```text
/// commit_report_accepted#_ merkle_roots:^(SnakeData MerkleRoot)
///     price_updates:(Maybe ^PriceUpdates) = CommitReportAccepted;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommitReportAccepted {
    pub merkle_roots: Vec<MerkleRoot>,
    pub price_updates: Option<PriceUpdates>,
}

impl Event for CommitReportAccepted {
    const NAME: &'static str = "CommitReportAccepted";
}

impl Store for CommitReportAccepted {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_reference(pack_snake_data(&self.merkle_roots)?));
        match &self.price_updates {
            Some(price_updates) => {
                ok!(builder.store_bit_one());
                builder.store_reference(ok!(CellBuilder::build_from(price_updates)))
            }
            None => builder.store_bit_zero(),
        }
    }
}

impl<'a> Load<'a> for CommitReportAccepted {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let merkle_roots = unpack_snake_data(ok!(slice.load_reference()))?;
        let price_updates = if ok!(slice.load_bit()) {
            Some(ok!(ok!(slice.load_reference()).parse::<PriceUpdates>()))
        } else {
            None
        };
        Ok(Self {
            merkle_roots,
            price_updates,
        })
    }
}

/// Message execution state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum MessageExecutionState {
    Untouched = 0,
    InProgress = 1,
    Success = 2,
    Failure = 3,
}

impl MessageExecutionState {
    /// Returns whether the message will not be executed again.
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl TryFrom<u8> for MessageExecutionState {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Untouched,
            1 => Self::InProgress,
            2 => Self::Success,
            3 => Self::Failure,
            _ => return Err(Error::InvalidData),
        })
    }
}

/// Execution state of a message has changed.
///
/// ```text
/// execution_state_changed#_ source_chain_selector:uint64 sequence_number:uint64
///     message_id:bits256 message_hash:bits256 state:uint8 = ExecutionStateChanged;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExecutionStateChanged {
    pub source_chain_selector: u64,
    pub sequence_number: u64,
    pub message_id: HashBytes,
    pub message_hash: HashBytes,
    pub state: MessageExecutionState,
}

impl ExecutionStateChanged {
    /// Byte offset of the source chain selector in the event body.
    pub const SOURCE_CHAIN_SELECTOR_OFFSET: usize = 0;
    /// Byte offset of the sequence number in the event body.
    pub const SEQUENCE_NUMBER_OFFSET: usize = 8;
}

impl Event for ExecutionStateChanged {
    const NAME: &'static str = "ExecutionStateChanged";
}

impl Store for ExecutionStateChanged {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.source_chain_selector));
        ok!(builder.store_u64(self.sequence_number));
        ok!(builder.store_u256(&self.message_id));
        ok!(builder.store_u256(&self.message_hash));
        builder.store_u8(self.state as u8)
    }
}

impl<'a> Load<'a> for ExecutionStateChanged {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            source_chain_selector: ok!(slice.load_u64()),
            sequence_number: ok!(slice.load_u64()),
            message_id: ok!(slice.load_u256()),
            message_hash: ok!(slice.load_u256()),
            state: ok!(MessageExecutionState::try_from(ok!(slice.load_u8()))),
        })
    }
}
