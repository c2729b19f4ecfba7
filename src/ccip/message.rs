//! Ramp messages in both directions.

use super::{RampMessageHeader, Uint256};
use crate::cell::{Cell, CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::Error;
use crate::models::StdAddr;
use crate::num::Tokens;
use crate::snake::{
    load_bytes_ref, pack_snake_ref, store_bytes_ref, unpack_snake_ref,
};

/// Token transfer delivered to TON.
///
/// ```text
/// any2ton_token_transfer#_ source_pool_address:^SnakeBytes dest_pool_address:MsgAddressInt
///     dest_gas_amount:uint32 extra_data:^SnakeBytes amount:uint256 = Any2TONTokenTransfer;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Any2TONTokenTransfer {
    pub source_pool_address: Vec<u8>,
    pub dest_pool_address: StdAddr,
    pub dest_gas_amount: u32,
    pub extra_data: Vec<u8>,
    pub amount: Uint256,
}

impl Store for Any2TONTokenTransfer {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        store_bytes_ref(&self.source_pool_address, builder)?;
        ok!(self.dest_pool_address.store_into(builder));
        ok!(builder.store_u32(self.dest_gas_amount));
        store_bytes_ref(&self.extra_data, builder)?;
        self.amount.store_into(builder)
    }
}

impl<'a> Load<'a> for Any2TONTokenTransfer {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            source_pool_address: load_bytes_ref(slice)?,
            dest_pool_address: ok!(StdAddr::load_from(slice)),
            dest_gas_amount: ok!(slice.load_u32()),
            extra_data: load_bytes_ref(slice)?,
            amount: ok!(Uint256::load_from(slice)),
        })
    }
}

/// Message from another chain executed on TON.
///
/// ```text
/// any2ton_ramp_message#_ header:RampMessageHeader sender:^SnakeBytes data:^SnakeBytes
///     receiver:MsgAddressInt gas_limit:Grams
///     token_amounts:^(SnakeRef Any2TONTokenTransfer) = Any2TONRampMessage;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Any2TONRampMessage {
    pub header: RampMessageHeader,
    /// Sender address in the source chain representation.
    pub sender: Vec<u8>,
    pub data: Vec<u8>,
    pub receiver: StdAddr,
    pub gas_limit: Tokens,
    pub token_amounts: Vec<Any2TONTokenTransfer>,
}

impl Store for Any2TONRampMessage {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.header.store_into(builder));
        store_bytes_ref(&self.sender, builder)?;
        store_bytes_ref(&self.data, builder)?;
        ok!(self.receiver.store_into(builder));
        ok!(self.gas_limit.store_into(builder));
        builder.store_reference(pack_snake_ref(&self.token_amounts)?)
    }
}

impl<'a> Load<'a> for Any2TONRampMessage {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            header: ok!(RampMessageHeader::load_from(slice)),
            sender: load_bytes_ref(slice)?,
            data: load_bytes_ref(slice)?,
            receiver: ok!(StdAddr::load_from(slice)),
            gas_limit: ok!(Tokens::load_from(slice)),
            token_amounts: unpack_snake_ref(ok!(slice.load_reference()))?,
        })
    }
}

/// Token transfer sent from TON.
///
/// ```text
/// ton2any_token_transfer#_ source_pool_address:MsgAddressInt dest_token_address:^SnakeBytes
///     extra_data:^SnakeBytes amount:uint256 dest_exec_data:^SnakeBytes = TON2AnyTokenTransfer;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TON2AnyTokenTransfer {
    pub source_pool_address: StdAddr,
    pub dest_token_address: Vec<u8>,
    pub extra_data: Vec<u8>,
    pub amount: Uint256,
    pub dest_exec_data: Vec<u8>,
}

impl Store for TON2AnyTokenTransfer {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.source_pool_address.store_into(builder));
        store_bytes_ref(&self.dest_token_address, builder)?;
        store_bytes_ref(&self.extra_data, builder)?;
        ok!(self.amount.store_into(builder));
        store_bytes_ref(&self.dest_exec_data, builder).map_err(From::from)
    }
}

impl<'a> Load<'a> for TON2AnyTokenTransfer {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            source_pool_address: ok!(StdAddr::load_from(slice)),
            dest_token_address: load_bytes_ref(slice)?,
            extra_data: load_bytes_ref(slice)?,
            amount: ok!(Uint256::load_from(slice)),
            dest_exec_data: load_bytes_ref(slice)?,
        })
    }
}

/// Message sent from TON to another chain.
///
/// ```text
/// ton2any_ramp_message#_ header:RampMessageHeader sender:MsgAddressInt
///     body:^[receiver:^SnakeBytes data:^SnakeBytes extra_args:^Cell
///            token_amounts:^(SnakeRef TON2AnyTokenTransfer)
///            fee_token:MsgAddressInt fee_token_amount:uint256
///            fee_value_juels:uint256] = TON2AnyRampMessage;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TON2AnyRampMessage {
    pub header: RampMessageHeader,
    pub sender: StdAddr,
    /// Receiver address in the destination chain representation.
    pub receiver: Vec<u8>,
    pub data: Vec<u8>,
    /// Encoded extra args (see [`ExtraArgs`]).
    ///
    /// [`ExtraArgs`]: super::ExtraArgs
    pub extra_args: Cell,
    pub token_amounts: Vec<TON2AnyTokenTransfer>,
    pub fee_token: StdAddr,
    pub fee_token_amount: Uint256,
    pub fee_value_juels: Uint256,
}

impl TON2AnyRampMessage {
    /// Returns the message id.
    #[inline]
    pub fn message_id(&self) -> &HashBytes {
        &self.header.message_id
    }
}

impl Store for TON2AnyRampMessage {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.header.store_into(builder));
        ok!(self.sender.store_into(builder));

        let mut body = CellBuilder::new();
        store_bytes_ref(&self.receiver, &mut body)?;
        store_bytes_ref(&self.data, &mut body)?;
        ok!(body.store_reference(self.extra_args.clone()));
        ok!(body.store_reference(pack_snake_ref(&self.token_amounts)?));
        ok!(self.fee_token.store_into(&mut body));
        ok!(self.fee_token_amount.store_into(&mut body));
        ok!(self.fee_value_juels.store_into(&mut body));

        builder.store_reference(ok!(body.build()))
    }
}

impl<'a> Load<'a> for TON2AnyRampMessage {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let header = ok!(RampMessageHeader::load_from(slice));
        let sender = ok!(StdAddr::load_from(slice));

        let mut body = ok!(slice.load_reference_as_slice());
        Ok(Self {
            header,
            sender,
            receiver: load_bytes_ref(&mut body)?,
            data: load_bytes_ref(&mut body)?,
            extra_args: ok!(body.load_reference_cloned()),
            token_amounts: unpack_snake_ref(ok!(body.load_reference()))?,
            fee_token: ok!(StdAddr::load_from(&mut body)),
            fee_token_amount: ok!(Uint256::load_from(&mut body)),
            fee_value_juels: ok!(Uint256::load_from(&mut body)),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ccip::{ExtraArgs, GenericExtraArgsV2};

    pub(crate) fn header(seq: u64) -> RampMessageHeader {
        RampMessageHeader {
            message_id: HashBytes([seq as u8; 32]),
            source_chain_selector: 16015286601757825753,
            dest_chain_selector: 13879075125137744094,
            sequence_number: seq,
            nonce: seq * 2,
        }
    }

    pub(crate) fn any2ton_message(seq: u64, tokens: usize) -> Any2TONRampMessage {
        Any2TONRampMessage {
            header: header(seq),
            sender: vec![0xee; 20],
            data: b"hello from evm".to_vec(),
            receiver: StdAddr::new(0, HashBytes([0x42; 32])),
            gas_limit: Tokens::new(200_000),
            token_amounts: (0..tokens)
                .map(|i| Any2TONTokenTransfer {
                    source_pool_address: vec![i as u8; 20],
                    dest_pool_address: StdAddr::new(0, HashBytes([i as u8; 32])),
                    dest_gas_amount: 90_000,
                    extra_data: vec![],
                    amount: Uint256::from(10u64.pow(18) + i as u64),
                })
                .collect(),
        }
    }

    pub(crate) fn ton2any_message(dest: u64, seq: u64) -> TON2AnyRampMessage {
        let extra_args = ExtraArgs::Generic(GenericExtraArgsV2 {
            gas_limit: Some(Uint256::from(300_000u64)),
            allow_out_of_order_execution: true,
        });

        TON2AnyRampMessage {
            header: RampMessageHeader {
                dest_chain_selector: dest,
                source_chain_selector: 13879075125137744094,
                ..header(seq)
            },
            sender: StdAddr::new(0, HashBytes([0x10; 32])),
            receiver: vec![0xab; 20],
            data: vec![1, 2, 3],
            extra_args: CellBuilder::build_from(&extra_args).unwrap(),
            token_amounts: vec![TON2AnyTokenTransfer {
                source_pool_address: StdAddr::new(0, HashBytes([0x20; 32])),
                dest_token_address: vec![0xcd; 20],
                extra_data: vec![],
                amount: Uint256::from(5u64),
                dest_exec_data: vec![0, 1],
            }],
            fee_token: StdAddr::new(0, HashBytes([0x30; 32])),
            fee_token_amount: Uint256::from(1_000u64),
            fee_value_juels: Uint256::from(2_000u64),
        }
    }

    #[test]
    fn any2ton_round_trip() {
        for tokens in [0, 1, 5] {
            let message = any2ton_message(7, tokens);
            let cell = CellBuilder::build_from(&message).unwrap();
            assert_eq!(cell.reference_count(), 3);

            let decoded = cell.parse::<Any2TONRampMessage>().unwrap();
            assert_eq!(decoded, message);
            assert_eq!(CellBuilder::build_from(&decoded).unwrap(), cell);
        }
    }

    #[test]
    fn large_message_data() {
        let mut message = any2ton_message(1, 0);
        message.data = (0..10_000).map(|i| i as u8).collect();
        let cell = CellBuilder::build_from(&message).unwrap();
        let decoded = cell.parse::<Any2TONRampMessage>().unwrap();
        assert_eq!(decoded.data, message.data);
    }

    #[test]
    fn ton2any_round_trip() {
        let message = ton2any_message(5009297550715157269, 3);
        let cell = CellBuilder::build_from(&message).unwrap();
        assert_eq!(cell.bit_len(), RampMessageHeader::BITS + StdAddr::BITS);

        let decoded = cell.parse::<TON2AnyRampMessage>().unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.message_id(), &HashBytes([3; 32]));
        assert_eq!(
            decoded.extra_args.parse::<ExtraArgs>().unwrap(),
            message.extra_args.parse::<ExtraArgs>().unwrap()
        );
    }
}
