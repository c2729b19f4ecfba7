//! Execute report.

use super::{Any2TONRampMessage, Signature, Uint256};
use crate::cell::{CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::Error;
use crate::snake::{
    pack_snake_data, pack_snake_ref, unpack_snake_data, unpack_snake_ref, InlineBytes,
};

/// Execute report produced by the execute plugin for a single source chain.
///
/// ```text
/// execute_report#_ source_chain_selector:uint64
///     messages:^(SnakeRef Any2TONRampMessage)
///     offchain_token_data:^(SnakeRef SnakeBytes)
///     proofs:^(SnakeData bits256)
///     signatures:^(SnakeRef Signature)
///     proof_flag_bits:uint256 = ExecuteReport;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExecuteReport {
    pub source_chain_selector: u64,
    pub messages: Vec<Any2TONRampMessage>,
    /// Offchain token data of each message, in the order of messages.
    pub offchain_token_data: Vec<Vec<u8>>,
    /// Merkle proof of the messages.
    pub proofs: Vec<HashBytes>,
    pub signatures: Vec<Signature>,
    pub proof_flag_bits: Uint256,
}

impl ExecuteReport {
    /// Returns an iterator over the sequence numbers of the reported messages.
    pub fn seq_nums(&self) -> impl Iterator<Item = u64> + '_ {
        self.messages.iter().map(|m| m.header.sequence_number)
    }
}

impl Store for ExecuteReport {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let token_data = self
            .offchain_token_data
            .iter()
            .map(|data| InlineBytes(data.clone()))
            .collect::<Vec<_>>();

        ok!(builder.store_u64(self.source_chain_selector));
        ok!(builder.store_reference(pack_snake_ref(&self.messages)?));
        ok!(builder.store_reference(pack_snake_ref(&token_data)?));
        ok!(builder.store_reference(pack_snake_data(&self.proofs)?));
        ok!(builder.store_reference(pack_snake_ref(&self.signatures)?));
        self.proof_flag_bits.store_into(builder)
    }
}

impl<'a> Load<'a> for ExecuteReport {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let source_chain_selector = ok!(slice.load_u64());
        let messages = unpack_snake_ref(ok!(slice.load_reference()))?;
        let offchain_token_data = unpack_snake_ref::<InlineBytes>(ok!(slice.load_reference()))?
            .into_iter()
            .map(|data| data.0)
            .collect();
        let proofs = unpack_snake_data(ok!(slice.load_reference()))?;
        let signatures = unpack_snake_ref(ok!(slice.load_reference()))?;

        Ok(Self {
            source_chain_selector,
            messages,
            offchain_token_data,
            proofs,
            signatures,
            proof_flag_bits: ok!(Uint256::load_from(slice)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boc::{Boc, BocRepr};
    use crate::ccip::message::tests::any2ton_message;

    #[test]
    fn execute_report_round_trip() {
        let report = ExecuteReport {
            source_chain_selector: 16015286601757825753,
            messages: (0..5).map(|i| any2ton_message(i, i as usize % 3)).collect(),
            offchain_token_data: vec![vec![], vec![1; 200], vec![], vec![2; 10], vec![]],
            proofs: (0..10).map(|i| HashBytes([i; 32])).collect(),
            signatures: Vec::new(),
            proof_flag_bits: Uint256::from(0b1011u64),
        };

        let boc = BocRepr::encode(&report).unwrap();
        let cell = Boc::decode(&boc).unwrap();
        assert_eq!(cell.bit_len(), 64 + 256);
        assert_eq!(cell.reference_count(), 4);

        let decoded = BocRepr::decode::<ExecuteReport, _>(&boc).unwrap();
        assert_eq!(decoded, report);
        assert_eq!(decoded.seq_nums().collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
        assert_eq!(
            CellBuilder::build_from(&decoded).unwrap().repr_hash(),
            cell.repr_hash()
        );
    }

    #[test]
    fn empty_execute_report() {
        let report = ExecuteReport {
            source_chain_selector: 1,
            messages: Vec::new(),
            offchain_token_data: Vec::new(),
            proofs: Vec::new(),
            signatures: Vec::new(),
            proof_flag_bits: Uint256::default(),
        };
        let cell = CellBuilder::build_from(&report).unwrap();
        for i in 0..4 {
            assert!(cell.reference(i).unwrap().is_empty());
        }
        assert_eq!(cell.parse::<ExecuteReport>().unwrap(), report);
    }
}
