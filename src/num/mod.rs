//! Integer types used in blockchain models.

use num_bigint::BigUint;

use crate::cell::*;
use crate::error::{Error, ParseIntError};
use crate::util::unlikely;

macro_rules! impl_ops {
    ($ident:ident, $inner:ty) => {
        impl From<$ident> for $inner {
            #[inline]
            fn from(value: $ident) -> Self {
                value.0
            }
        }

        impl TryFrom<$inner> for $ident {
            type Error = ParseIntError;

            #[inline]
            fn try_from(inner: $inner) -> Result<Self, Self::Error> {
                let result = Self::new(inner);
                if result.is_valid() {
                    Ok(result)
                } else {
                    Err(ParseIntError::Overflow)
                }
            }
        }

        impl std::str::FromStr for $ident {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match std::str::FromStr::from_str(s) {
                    Ok(inner) => {
                        let result = Self::new(inner);
                        if result.is_valid() {
                            Ok(result)
                        } else {
                            Err(ParseIntError::Overflow)
                        }
                    }
                    Err(e) => Err(ParseIntError::InvalidString(e)),
                }
            }
        }

        impl PartialEq<$inner> for $ident {
            #[inline]
            fn eq(&self, other: &$inner) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

/// Variable-length 120-bit integer. Used for native currencies.
///
/// Stored as 4 bits of `len` (`0..=15`), followed by `len` bytes.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tokens(u128);

impl Tokens {
    /// The additive identity for this integer type, i.e. `0`.
    pub const ZERO: Self = Tokens(0);

    /// The largest value that can be represented by this integer type.
    pub const MAX: Self = Tokens((1u128 << 120) - 1);

    /// The number of data bits that the length occupies.
    pub const LEN_BITS: u16 = 4;

    /// The maximum number of data bits that this struct occupies.
    pub const MAX_BITS: u16 = Self::LEN_BITS + 15 * 8;

    /// Creates a new integer value from a primitive integer.
    #[inline]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Converts integer into an underlying primitive integer.
    #[inline]
    pub const fn into_inner(self) -> u128 {
        self.0
    }

    /// Returns `true` if an underlying primitive integer is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if an underlying primitive integer fits into the repr.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= Self::MAX.0
    }

    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> Option<u16> {
        let bytes = (16 - self.0.leading_zeros() / 8) as u16;
        if bytes > 15 {
            None
        } else {
            Some(Self::LEN_BITS + bytes * 8)
        }
    }
}

impl_ops!(Tokens, u128);

impl From<u64> for Tokens {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl Store for Tokens {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let bytes = (16 - self.0.leading_zeros() / 8) as u8;
        let bits = bytes as u16 * 8;

        if unlikely(bytes > 15 || !builder.has_capacity(Self::LEN_BITS + bits, 0)) {
            return Err(Error::CellOverflow);
        }

        ok!(builder.store_small_uint(bytes, Self::LEN_BITS));
        builder.store_raw(&self.0.to_be_bytes()[16 - bytes as usize..], bits)
    }
}

impl<'a> Load<'a> for Tokens {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let bytes = ok!(slice.load_small_uint(Self::LEN_BITS)) as usize;
        let mut buffer = [0u8; 16];
        ok!(slice.load_raw(&mut buffer[16 - bytes..], bytes as u16 * 8));
        Ok(Self(u128::from_be_bytes(buffer)))
    }
}

macro_rules! impl_var_uints {
    ($($(#[doc = $doc:expr])* $vis:vis struct $ident:ident($inner:ty[..$max_bytes:literal]);)*) => {
        $(
            impl_var_uints!{@impl $(#[doc = $doc])* $vis $ident $inner, $max_bytes}
        )*
    };

    (@impl $(#[doc = $doc:expr])* $vis:vis $ident:ident $inner:ty, $max_bytes:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[repr(transparent)]
        $vis struct $ident($inner);

        impl $ident {
            /// The additive identity for this integer type, i.e. `0`.
            pub const ZERO: Self = $ident(0);

            /// The largest value that can be represented by this integer type.
            pub const MAX: Self = $ident(((1 as $inner) << ($max_bytes * 8)) - 1);

            /// The number of data bits that the length occupies.
            pub const LEN_BITS: u16 = 8 - ($max_bytes as u8).leading_zeros() as u16;

            /// Creates a new integer value from a primitive integer.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Converts integer into an underlying primitive integer.
            #[inline]
            pub const fn into_inner(self) -> $inner {
                self.0
            }

            /// Returns `true` if an underlying primitive integer fits into the repr.
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self.0 <= Self::MAX.0
            }
        }

        impl Store for $ident {
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                let bytes = (std::mem::size_of::<$inner>() as u32 - self.0.leading_zeros() / 8) as u8;
                if unlikely(bytes > $max_bytes) {
                    return Err(Error::IntOverflow);
                }
                ok!(builder.store_small_uint(bytes, Self::LEN_BITS));
                builder.store_uint(self.0 as u64, bytes as u16 * 8)
            }
        }

        impl<'a> Load<'a> for $ident {
            fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
                let bytes = ok!(slice.load_small_uint(Self::LEN_BITS));
                if unlikely(bytes > $max_bytes) {
                    return Err(Error::IntOverflow);
                }
                match slice.load_uint(bytes as u16 * 8) {
                    Ok(value) => Ok(Self(value as $inner)),
                    Err(e) => Err(e),
                }
            }
        }

        impl_ops! { $ident, $inner }
    };
}

impl_var_uints! {
    /// Variable-length 24-bit integer.
    ///
    /// Stored as 2 bits of `len` (`0..=3`), followed by `len` bytes.
    pub struct VarUint24(u32[..3]);

    /// Variable-length 56-bit integer.
    ///
    /// Stored as 3 bits of `len` (`0..=7`), followed by `len` bytes.
    pub struct VarUint56(u64[..7]);
}

/// Variable-length 248-bit integer.
///
/// Stored as 5 bits of `len` (`0..=31`), followed by `len` bytes.
/// Zero is stored with zero length.
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VarUint32(BigUint);

impl VarUint32 {
    /// The number of data bits that the length occupies.
    pub const LEN_BITS: u16 = 5;

    /// The maximum number of value bytes.
    pub const MAX_BYTES: usize = 31;

    /// Creates a new integer value from a big integer.
    #[inline]
    pub const fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Returns a reference to the underlying big integer.
    #[inline]
    pub const fn as_inner(&self) -> &BigUint {
        &self.0
    }

    /// Converts integer into an underlying big integer.
    #[inline]
    pub fn into_inner(self) -> BigUint {
        self.0
    }

    /// Returns `true` if an underlying integer is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.bits() == 0
    }

    /// Returns `true` if an underlying integer fits into the repr.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.bits() <= (Self::MAX_BYTES * 8) as u64
    }

    fn byte_len(&self) -> usize {
        self.0.bits().div_ceil(8) as usize
    }
}

impl From<u64> for VarUint32 {
    #[inline]
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for VarUint32 {
    #[inline]
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl std::str::FromStr for VarUint32 {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<BigUint>() {
            Ok(inner) => {
                let result = Self(inner);
                if result.is_valid() {
                    Ok(result)
                } else {
                    Err(ParseIntError::Overflow)
                }
            }
            Err(e) => Err(ParseIntError::InvalidBigInt(e)),
        }
    }
}

impl std::fmt::Display for VarUint32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl Store for VarUint32 {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let bytes = self.byte_len();
        if unlikely(bytes > Self::MAX_BYTES) {
            return Err(Error::IntOverflow);
        }

        let bits = bytes as u16 * 8;
        if unlikely(!builder.has_capacity(Self::LEN_BITS + bits, 0)) {
            return Err(Error::CellOverflow);
        }

        ok!(builder.store_small_uint(bytes as u8, Self::LEN_BITS));
        builder.store_biguint(&self.0, bits)
    }
}

impl<'a> Load<'a> for VarUint32 {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let bytes = ok!(slice.load_small_uint(Self::LEN_BITS));
        match slice.load_biguint(bytes as u16 * 8) {
            Ok(value) => Ok(Self(value)),
            Err(e) => Err(e),
        }
    }
}

macro_rules! impl_small_uints {
    ($($(#[doc = $doc:expr])* $vis:vis struct $ident:ident($bits:literal);)*) => {
        $(
            impl_small_uints!{@impl $(#[doc = $doc])* $vis $ident, $bits}
        )*
    };

    (@impl $(#[doc = $doc:expr])* $vis:vis $ident:ident, $bits:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
        #[repr(transparent)]
        $vis struct $ident(u16);

        impl $ident {
            /// The additive identity for this integer type, i.e. `0`.
            pub const ZERO: Self = $ident(0);

            /// The largest value that can be represented by this integer type.
            pub const MAX: Self = $ident((1u16 << $bits) - 1);

            /// The number of data bits that this struct occupies.
            pub const BITS: u16 = $bits;

            /// Creates a new integer value from a primitive integer.
            #[inline]
            pub const fn new(value: u16) -> Self {
                Self(value)
            }

            /// Converts integer into an underlying primitive integer.
            #[inline]
            pub const fn into_inner(self) -> u16 {
                self.0
            }

            /// Returns `true` if an underlying primitive integer fits into the repr.
            #[inline]
            pub const fn is_valid(&self) -> bool {
                self.0 <= Self::MAX.0
            }
        }

        impl Store for $ident {
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                if !self.is_valid() {
                    return Err(Error::IntOverflow);
                }
                builder.store_uint(self.0 as u64, Self::BITS)
            }
        }

        impl<'a> Load<'a> for $ident {
            fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
                match slice.load_uint(Self::BITS) {
                    Ok(value) => Ok(Self(value as u16)),
                    Err(e) => Err(e),
                }
            }
        }

        impl crate::dict::DictKey for $ident {
            const BITS: u16 = $bits;

            #[inline]
            fn from_raw_data(raw_data: &[u8]) -> Option<Self> {
                let bytes: [u8; 2] = raw_data.get(..2)?.try_into().ok()?;
                Some($ident(u16::from_be_bytes(bytes) >> (16 - $bits)))
            }
        }

        impl_ops! { $ident, u16 }
    };
}

impl_small_uints! {
    /// Fixed-length 9-bit integer.
    pub struct Uint9(9);

    /// Fixed-length 15-bit integer.
    pub struct Uint15(15);
}


#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T>(value: &T) -> (u16, T)
    where
        T: Store + for<'a> Load<'a>,
    {
        let cell = CellBuilder::build_from(value).unwrap();
        let mut slice = cell.as_slice();
        let parsed = T::load_from(&mut slice).unwrap();
        assert!(slice.is_data_empty());
        (cell.bit_len(), parsed)
    }

    #[test]
    fn tokens_serialization() {
        assert_eq!(round_trip(&Tokens::ZERO), (4, Tokens::ZERO));
        assert_eq!(round_trip(&Tokens::new(1)), (12, Tokens::new(1)));
        assert_eq!(
            round_trip(&Tokens::new(1_000_000_000)),
            (4 + 32, Tokens::new(1_000_000_000))
        );
        assert_eq!(round_trip(&Tokens::MAX), (124, Tokens::MAX));

        let mut builder = CellBuilder::new();
        assert_eq!(
            Tokens::new(u128::MAX).store_into(&mut builder),
            Err(Error::CellOverflow)
        );

        assert_eq!(Tokens::ZERO.bit_len(), Some(4));
        assert_eq!(Tokens::new(u128::MAX).bit_len(), None);
    }

    #[test]
    fn var_uint32_serialization() {
        let zero = VarUint32::default();
        let (bits, parsed) = round_trip(&zero);
        assert_eq!(bits, 5);
        assert!(parsed.is_zero());

        let value = VarUint32::from(200_000u64);
        assert_eq!(round_trip(&value), (5 + 24, value.clone()));

        let max = VarUint32::new((BigUint::from(1u8) << 248u32) - 1u8);
        assert_eq!(round_trip(&max), (5 + 248, max.clone()));

        let too_big = VarUint32::new(BigUint::from(1u8) << 248u32);
        let mut builder = CellBuilder::new();
        assert_eq!(too_big.store_into(&mut builder), Err(Error::IntOverflow));
        assert!("1000000".parse::<VarUint32>().is_ok());
    }

    #[test]
    fn small_uints() {
        assert_eq!(round_trip(&Uint9::new(511)), (9, Uint9::new(511)));
        assert_eq!(round_trip(&Uint15::new(12345)), (15, Uint15::new(12345)));

        let mut builder = CellBuilder::new();
        assert_eq!(
            Uint9::new(512).store_into(&mut builder),
            Err(Error::IntOverflow)
        );
        assert!("512".parse::<Uint9>().is_err());
        assert_eq!("511".parse::<Uint9>().unwrap(), 511u16);
    }

    #[test]
    fn var_uints() {
        assert_eq!(VarUint24::LEN_BITS, 2);
        assert_eq!(VarUint56::LEN_BITS, 3);

        assert_eq!(round_trip(&VarUint24::ZERO), (2, VarUint24::ZERO));
        assert_eq!(round_trip(&VarUint24::MAX), (2 + 24, VarUint24::MAX));
        assert_eq!(
            round_trip(&VarUint56::new(1_000_000)),
            (3 + 24, VarUint56::new(1_000_000))
        );

        let mut builder = CellBuilder::new();
        assert_eq!(
            VarUint24::new(1 << 24).store_into(&mut builder),
            Err(Error::IntOverflow)
        );
    }

    #[test]
    fn small_uint_dict_keys() {
        use crate::dict::{Dict, DictKey};

        assert_eq!(
            Uint15::from_raw_data(&[0xff, 0xfe]),
            Some(Uint15::MAX)
        );

        let mut dict = Dict::<Uint15, u32>::new();
        dict.set(Uint15::new(3), 30u32).unwrap();
        dict.set(Uint15::new(1), 10u32).unwrap();
        let keys = dict.keys().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(keys, [Uint15::new(1), Uint15::new(3)]);
    }
}
