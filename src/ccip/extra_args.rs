//! Tagged extra args of outgoing messages.

use super::{ChainFamily, Uint256};
use crate::cell::{Cell, CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::{CodecError, CodecErrorKind, Error, ResultExt};
use crate::snake::{pack_snake_ref, unpack_snake_ref};

/// Extra args for EVM-like destination chains.
///
/// ```text
/// generic_extra_args_v2#181dcf10 gas_limit:(Maybe uint256)
///     allow_out_of_order_execution:Bool = ExtraArgs;
/// ```
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct GenericExtraArgsV2 {
    /// Gas limit on the destination chain. Defaults are applied by the
    /// fee quoter when it is absent.
    pub gas_limit: Option<Uint256>,
    pub allow_out_of_order_execution: bool,
}

impl GenericExtraArgsV2 {
    /// Magic prefix of the encoded args.
    pub const TAG: u32 = 0x181dcf10;
}

impl Store for GenericExtraArgsV2 {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.gas_limit.store_into(builder));
        builder.store_bit(self.allow_out_of_order_execution)
    }
}

impl<'a> Load<'a> for GenericExtraArgsV2 {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            gas_limit: ok!(Option::<Uint256>::load_from(slice)),
            allow_out_of_order_execution: ok!(slice.load_bit()),
        })
    }
}

/// Extra args for SVM destination chains.
///
/// ```text
/// svm_extra_args_v1#1f3b3aba compute_units:uint32 account_is_writable_bitmap:uint64
///     allow_out_of_order_execution:Bool token_receiver:bits256
///     accounts:^(SnakeRef bits256) = ExtraArgs;
/// ```
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct SvmExtraArgsV1 {
    pub compute_units: u32,
    pub account_is_writable_bitmap: u64,
    pub allow_out_of_order_execution: bool,
    pub token_receiver: HashBytes,
    pub accounts: Vec<HashBytes>,
}

impl SvmExtraArgsV1 {
    /// Magic prefix of the encoded args.
    pub const TAG: u32 = 0x1f3b3aba;
}

impl Store for SvmExtraArgsV1 {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u32(self.compute_units));
        ok!(builder.store_u64(self.account_is_writable_bitmap));
        ok!(builder.store_bit(self.allow_out_of_order_execution));
        ok!(builder.store_u256(&self.token_receiver));
        builder.store_reference(pack_snake_ref(&self.accounts)?)
    }
}

impl<'a> Load<'a> for SvmExtraArgsV1 {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            compute_units: ok!(slice.load_u32()),
            account_is_writable_bitmap: ok!(slice.load_u64()),
            allow_out_of_order_execution: ok!(slice.load_bit()),
            token_receiver: ok!(slice.load_u256()),
            accounts: unpack_snake_ref(ok!(slice.load_reference()))?,
        })
    }
}

/// Extra args selected by a 4-byte tag.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExtraArgs {
    Generic(GenericExtraArgsV2),
    Svm(SvmExtraArgsV1),
}

impl ExtraArgs {
    /// Returns the magic prefix of the variant.
    pub const fn tag(&self) -> u32 {
        match self {
            Self::Generic(_) => GenericExtraArgsV2::TAG,
            Self::Svm(_) => SvmExtraArgsV1::TAG,
        }
    }

    /// Returns whether the message can be executed out of order.
    pub const fn allow_out_of_order_execution(&self) -> bool {
        match self {
            Self::Generic(args) => args.allow_out_of_order_execution,
            Self::Svm(args) => args.allow_out_of_order_execution,
        }
    }

    /// Returns whether these args can be sent to the specified chain family.
    pub const fn supports(&self, family: ChainFamily) -> bool {
        match self {
            Self::Generic(_) => !matches!(family, ChainFamily::Svm),
            Self::Svm(_) => matches!(family, ChainFamily::Svm),
        }
    }

    /// Encodes args into a new cell.
    pub fn encode(&self) -> Result<Cell, CodecError> {
        CellBuilder::build_from(self).context("extra args")
    }

    /// Decodes args from a cell.
    ///
    /// Fails with [`CodecErrorKind::UnsupportedExtraArgs`] if the cell starts
    /// with an unknown tag.
    pub fn decode(cell: &Cell) -> Result<Self, CodecError> {
        let mut slice = cell.as_slice();
        let tag = slice.load_u32().context("extra args tag")?;
        let result = match tag {
            GenericExtraArgsV2::TAG => {
                Self::Generic(GenericExtraArgsV2::load_from(&mut slice).context("generic extra args")?)
            }
            SvmExtraArgsV1::TAG => {
                Self::Svm(SvmExtraArgsV1::load_from(&mut slice).context("svm extra args")?)
            }
            _ => {
                return Err(CodecError::new(
                    CodecErrorKind::UnsupportedExtraArgs,
                    format!("unknown extra args tag {tag:08x}"),
                ))
            }
        };
        Ok(result)
    }
}

impl Store for ExtraArgs {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u32(self.tag()));
        match self {
            Self::Generic(args) => args.store_into(builder),
            Self::Svm(args) => args.store_into(builder),
        }
    }
}

impl<'a> Load<'a> for ExtraArgs {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match ok!(slice.load_u32()) {
            GenericExtraArgsV2::TAG => GenericExtraArgsV2::load_from(slice).map(Self::Generic),
            SvmExtraArgsV1::TAG => SvmExtraArgsV1::load_from(slice).map(Self::Svm),
            _ => Err(Error::InvalidTag),
        }
    }
}

impl From<GenericExtraArgsV2> for ExtraArgs {
    #[inline]
    fn from(value: GenericExtraArgsV2) -> Self {
        Self::Generic(value)
    }
}

impl From<SvmExtraArgsV1> for ExtraArgs {
    #[inline]
    fn from(value: SvmExtraArgsV1) -> Self {
        Self::Svm(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_extra_args() {
        let args = ExtraArgs::Generic(GenericExtraArgsV2 {
            gas_limit: Some(Uint256::from(400_000u64)),
            allow_out_of_order_execution: true,
        });
        let cell = args.encode().unwrap();
        assert_eq!(cell.bit_len(), 32 + 1 + 256 + 1);
        assert_eq!(cell.as_slice().load_u32().unwrap(), 0x181dcf10);
        assert_eq!(ExtraArgs::decode(&cell).unwrap(), args);
        assert!(args.supports(ChainFamily::Evm));
        assert!(!args.supports(ChainFamily::Svm));

        // Absent gas limit is stored as a single bit
        let args = ExtraArgs::Generic(GenericExtraArgsV2::default());
        let cell = args.encode().unwrap();
        assert_eq!(cell.bit_len(), 32 + 1 + 1);
        let decoded = ExtraArgs::decode(&cell).unwrap();
        assert_eq!(decoded, args);
        assert_eq!(decoded.encode().unwrap(), cell);
    }

    #[test]
    fn svm_extra_args() {
        let args = ExtraArgs::Svm(SvmExtraArgsV1 {
            compute_units: 200_000,
            account_is_writable_bitmap: 0b101,
            allow_out_of_order_execution: true,
            token_receiver: HashBytes([0x55; 32]),
            accounts: (0..7).map(|i| HashBytes([i; 32])).collect(),
        });
        let cell = args.encode().unwrap();
        assert_eq!(cell.as_slice().load_u32().unwrap(), 0x1f3b3aba);
        let decoded = ExtraArgs::decode(&cell).unwrap();
        assert_eq!(decoded, args);
        assert_eq!(decoded.encode().unwrap().repr_hash(), cell.repr_hash());
        assert!(decoded.allow_out_of_order_execution());
    }

    #[test]
    fn unknown_tag() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0xdeadbeef).unwrap();
        builder.store_u64(123).unwrap();
        let cell = builder.build().unwrap();

        let err = ExtraArgs::decode(&cell).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::UnsupportedExtraArgs);
        assert_eq!(cell.parse::<ExtraArgs>().unwrap_err(), Error::InvalidTag);
    }
}
