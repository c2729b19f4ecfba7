//! Commit report and its parts.

use super::{OnRampAddress, SeqNumRange, Uint256};
use crate::cell::{CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::Error;
use crate::models::StdAddr;
use crate::snake::{
    pack_snake_data, pack_snake_ref, unpack_snake_data, unpack_snake_ref, InlineBytes,
};

/// New USD price of a TON token.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TokenPriceUpdate {
    pub source_token: StdAddr,
    /// USD price with 18 decimals per 1e18 of the smallest token unit.
    pub usd_per_token: Uint256,
}

impl TokenPriceUpdate {
    /// The number of data bits that the update occupies.
    pub const BITS: u16 = StdAddr::BITS + 256;
}

impl Store for TokenPriceUpdate {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.source_token.store_into(builder));
        self.usd_per_token.store_into(builder)
    }
}

impl<'a> Load<'a> for TokenPriceUpdate {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            source_token: ok!(StdAddr::load_from(slice)),
            usd_per_token: ok!(Uint256::load_from(slice)),
        })
    }
}

/// New gas price on a destination chain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GasPriceUpdate {
    pub dest_chain_selector: u64,
    pub usd_per_unit_gas: Uint256,
}

impl Store for GasPriceUpdate {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.dest_chain_selector));
        self.usd_per_unit_gas.store_into(builder)
    }
}

impl<'a> Load<'a> for GasPriceUpdate {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            dest_chain_selector: ok!(slice.load_u64()),
            usd_per_unit_gas: ok!(Uint256::load_from(slice)),
        })
    }
}

/// Token and gas price updates.
///
/// Stored as two references to snake data chains.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct PriceUpdates {
    pub token_price_updates: Vec<TokenPriceUpdate>,
    pub gas_price_updates: Vec<GasPriceUpdate>,
}

impl PriceUpdates {
    /// Returns whether there are no updates.
    pub fn is_empty(&self) -> bool {
        self.token_price_updates.is_empty() && self.gas_price_updates.is_empty()
    }
}

impl Store for PriceUpdates {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_reference(pack_snake_data(&self.token_price_updates)?));
        builder.store_reference(pack_snake_data(&self.gas_price_updates)?)
    }
}

impl<'a> Load<'a> for PriceUpdates {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            token_price_updates: unpack_snake_data(ok!(slice.load_reference()))?,
            gas_price_updates: unpack_snake_data(ok!(slice.load_reference()))?,
        })
    }
}

/// Merkle root of a committed range of messages from a source chain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MerkleRoot {
    pub source_chain_selector: u64,
    pub on_ramp_address: OnRampAddress,
    pub min_seq_nr: u64,
    pub max_seq_nr: u64,
    pub merkle_root: HashBytes,
}

impl MerkleRoot {
    /// The number of data bits that the root occupies.
    pub const BITS: u16 = 64 + OnRampAddress::BITS + 64 + 64 + 256;

    /// Returns the committed range of sequence numbers.
    #[inline]
    pub const fn seq_nums(&self) -> SeqNumRange {
        SeqNumRange::new(self.min_seq_nr, self.max_seq_nr)
    }
}

impl Store for MerkleRoot {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.source_chain_selector));
        ok!(self.on_ramp_address.store_into(builder));
        ok!(builder.store_u64(self.min_seq_nr));
        ok!(builder.store_u64(self.max_seq_nr));
        builder.store_u256(&self.merkle_root)
    }
}

impl<'a> Load<'a> for MerkleRoot {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            source_chain_selector: ok!(slice.load_u64()),
            on_ramp_address: ok!(OnRampAddress::load_from(slice)),
            min_seq_nr: ok!(slice.load_u64()),
            max_seq_nr: ok!(slice.load_u64()),
            merkle_root: ok!(slice.load_u256()),
        })
    }
}

/// Signature of an RMN node.
pub type Signature = InlineBytes;

/// Commit report produced by the commit plugin.
///
/// ```text
/// commit_report#_ price_updates:^[^(SnakeData TokenPriceUpdate) ^(SnakeData GasPriceUpdate)]
///     merkle_roots:^[^(SnakeData MerkleRoot) ^(SnakeData MerkleRoot)]
///     rmn_signatures:^(SnakeRef Signature) = CommitReport;
/// ```
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct CommitReport {
    pub price_updates: PriceUpdates,
    pub blessed_merkle_roots: Vec<MerkleRoot>,
    pub unblessed_merkle_roots: Vec<MerkleRoot>,
    pub rmn_signatures: Vec<Signature>,
}

impl CommitReport {
    /// Returns an iterator over all merkle roots (blessed first).
    pub fn merkle_roots(&self) -> impl Iterator<Item = &MerkleRoot> {
        self.blessed_merkle_roots
            .iter()
            .chain(self.unblessed_merkle_roots.iter())
    }

    /// Returns whether the report has neither prices nor roots.
    pub fn is_empty(&self) -> bool {
        self.price_updates.is_empty()
            && self.blessed_merkle_roots.is_empty()
            && self.unblessed_merkle_roots.is_empty()
    }
}

impl Store for CommitReport {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let price_updates = ok!(CellBuilder::build_from(&self.price_updates));

        let mut merkle_roots = CellBuilder::new();
        ok!(merkle_roots.store_reference(pack_snake_data(&self.blessed_merkle_roots)?));
        ok!(merkle_roots.store_reference(pack_snake_data(&self.unblessed_merkle_roots)?));
        let merkle_roots = ok!(merkle_roots.build());

        ok!(builder.store_reference(price_updates));
        ok!(builder.store_reference(merkle_roots));
        builder.store_reference(pack_snake_ref(&self.rmn_signatures)?)
    }
}

impl<'a> Load<'a> for CommitReport {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let price_updates = ok!(slice.load_reference()).parse::<PriceUpdates>()?;

        let mut merkle_roots = ok!(slice.load_reference_as_slice());
        let blessed_merkle_roots = unpack_snake_data(ok!(merkle_roots.load_reference()))?;
        let unblessed_merkle_roots = unpack_snake_data(ok!(merkle_roots.load_reference()))?;

        let rmn_signatures = unpack_snake_ref(ok!(slice.load_reference()))?;

        Ok(Self {
            price_updates,
            blessed_merkle_roots,
            unblessed_merkle_roots,
            rmn_signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boc::{Boc, BocRepr};

    const TOKEN: &str = "EQDtFpEwcFAEcRuZmLDg09igsKC3_fbqXW4dk7qLpOPAqNcq";

    fn minimal_report() -> CommitReport {
        CommitReport {
            price_updates: PriceUpdates {
                token_price_updates: vec![TokenPriceUpdate {
                    source_token: TOKEN.parse().unwrap(),
                    usd_per_token: Uint256::from(1_000_000u64),
                }],
                gas_price_updates: vec![GasPriceUpdate {
                    dest_chain_selector: 1,
                    usd_per_unit_gas: Uint256::from(2_000_000u64),
                }],
            },
            blessed_merkle_roots: Vec::new(),
            unblessed_merkle_roots: vec![MerkleRoot {
                source_chain_selector: 1,
                on_ramp_address: OnRampAddress::ZERO,
                min_seq_nr: 100,
                max_seq_nr: 200,
                merkle_root: HashBytes::ZERO,
            }],
            rmn_signatures: vec![InlineBytes(vec![0; 64])],
        }
    }

    #[test]
    fn minimal_commit_report() {
        let report = minimal_report();
        assert_eq!(
            report.price_updates.token_price_updates[0]
                .source_token
                .to_string(),
            "0:ed169130705004711b9998b0e0d3d8a0b0a0b7fdf6ea5d6e1d93ba8ba4e3c0a8"
        );

        let boc = BocRepr::encode(&report).unwrap();
        let cell = Boc::decode(&boc).unwrap();
        assert_eq!(cell.reference_count(), 3);

        let decoded = BocRepr::decode::<CommitReport, _>(&boc).unwrap();
        assert_eq!(decoded, report);

        let reencoded = CellBuilder::build_from(&decoded).unwrap();
        assert_eq!(reencoded.repr_hash(), cell.repr_hash());

        let roots = decoded.merkle_roots().collect::<Vec<_>>();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].seq_nums(), SeqNumRange::new(100, 200));
        assert!(roots[0].seq_nums().contains(150));
    }

    #[test]
    fn commit_report_layout() {
        let report = minimal_report();
        let cell = CellBuilder::build_from(&report).unwrap();

        let price_updates = cell.reference(0).unwrap();
        assert_eq!(price_updates.reference_count(), 2);
        let tokens = price_updates.reference(0).unwrap();
        assert_eq!(tokens.bit_len(), TokenPriceUpdate::BITS);
        let gas = price_updates.reference(1).unwrap();
        assert_eq!(gas.bit_len(), 64 + 256);

        let merkle_roots = cell.reference(1).unwrap();
        assert!(merkle_roots.reference(0).unwrap().is_empty());
        assert_eq!(merkle_roots.reference(1).unwrap().bit_len(), MerkleRoot::BITS);

        let signatures = cell.reference(2).unwrap();
        assert_eq!(signatures.reference_count(), 1);
        assert_eq!(signatures.reference(0).unwrap().bit_len(), 512);
    }

    #[test]
    fn large_commit_report() {
        let mut report = minimal_report();
        for i in 0..50u64 {
            report.blessed_merkle_roots.push(MerkleRoot {
                source_chain_selector: i,
                on_ramp_address: OnRampAddress::from_slice(&[i as u8; 20]).unwrap(),
                min_seq_nr: i * 10,
                max_seq_nr: i * 10 + 9,
                merkle_root: HashBytes([i as u8; 32]),
            });
            report.price_updates.gas_price_updates.push(GasPriceUpdate {
                dest_chain_selector: i,
                usd_per_unit_gas: Uint256::from(u128::MAX - i as u128),
            });
            report.rmn_signatures.push(InlineBytes(vec![i as u8; 64]));
        }

        let cell = CellBuilder::build_from(&report).unwrap();
        let decoded = cell.parse::<CommitReport>().unwrap();
        assert_eq!(decoded, report);
        assert_eq!(CellBuilder::build_from(&decoded).unwrap(), cell);
    }
}
