//! Cell codecs, wire types and a log poller for the CCIP integration on TON.
//!
//! ## Cells
//!
//! Every on-chain structure is a tree of [`Cell`]s. A cell holds up to 1023 bits
//! of data and up to 4 references to other cells. Cells are built with
//! [`CellBuilder`] and read with [`CellSlice`]; any type implementing [`Store`]
//! and [`Load`] can be converted to and from cells.
//!
//! Trees are transferred as a "bag of cells" ([`Boc`]).
//!
//! ## Snake containers
//!
//! Sequences which do not fit into a single cell are chained through references.
//! See the [`snake`] module for the supported layouts.
//!
//! ## CCIP
//!
//! [`ccip`] contains the wire types exchanged with the on-chain contracts:
//! commit and execute reports, ramp messages, extra args and configs.
//!
//! ## Log poller
//!
//! [`logpoller`] periodically scans blocks for external out messages emitted by
//! the registered contracts, decodes them into logs and serves filtered queries.
//! [`accessor`] is a thin read layer on top of it.
//!
//! [`Cell`]: cell::Cell
//! [`CellBuilder`]: cell::CellBuilder
//! [`CellSlice`]: cell::CellSlice
//! [`Store`]: cell::Store
//! [`Load`]: cell::Load
//! [`Boc`]: boc::Boc

/// Prevents using `From::from` for plain error conversion.
macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub mod accessor;
pub mod boc;
pub mod ccip;
pub mod cell;
pub mod client;
pub mod dict;
pub mod error;
pub mod logpoller;
pub mod models;
pub mod num;
pub mod prelude;
pub mod snake;
pub mod util;

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn correct_deserialization() {
        let cell = Boc::decode_base64("te6ccgEBAQEABQAABb23wA==").unwrap();

        let mut slice = cell.as_slice();
        assert!(!slice.is_data_empty());
        assert_eq!(slice.remaining_bits(), 17);
        assert!(slice.is_refs_empty());
        assert_eq!(slice.remaining_refs(), 0);
        assert!(slice.get_reference(0).is_err());

        assert!(slice.get_bit(0).unwrap());
        assert_eq!(slice.get_u8(0).unwrap(), 0xbd);
        assert_eq!(slice.get_u8(8).unwrap(), 0xb7);
        assert!(slice.get_u8(16).is_err());

        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.remaining_bits(), 16);
    }

    #[test]
    fn cell_tree_round_trip() {
        let mut child = CellBuilder::new();
        child.store_u32(0xdeafbeaf).unwrap();
        let child = child.build().unwrap();

        let mut builder = CellBuilder::new();
        builder.store_bit_one().unwrap();
        builder.store_u16(0x1234).unwrap();
        builder.store_reference(child.clone()).unwrap();
        builder.store_reference(child).unwrap();
        let root = builder.build().unwrap();

        let encoded = Boc::encode(&root);
        let decoded = Boc::decode(&encoded).unwrap();
        assert_eq!(decoded.repr_hash(), root.repr_hash());
        println!("{}", decoded.display_tree());
    }
}
