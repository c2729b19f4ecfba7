use num_bigint::BigUint;

use crate::cell::{CellBuilder, CellSlice, HashBytes, Load, Store};
use crate::error::{CodecError, CodecErrorKind, Error};

/// Fixed-length (512 bits) on-ramp address of a source chain.
///
/// Shorter addresses are left-padded with zeros.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct OnRampAddress(pub [u8; 64]);

impl OnRampAddress {
    /// The number of data bits that the address occupies.
    pub const BITS: u16 = 512;

    /// An address with all bytes set to zero.
    pub const ZERO: Self = Self([0; 64]);

    /// Left-pads the provided bytes to 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() > 64 {
            return Err(CodecError::new(
                CodecErrorKind::BadAddress,
                format!("on-ramp address of {} bytes", bytes.len()),
            ));
        }
        let mut result = [0; 64];
        result[64 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(result))
    }

    /// Returns the underlying bytes.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Returns the last `len` bytes of the padded address.
    pub fn trimmed(&self, len: usize) -> &[u8] {
        &self.0[64 - len.min(64)..]
    }
}

impl Default for OnRampAddress {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl std::fmt::Debug for OnRampAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OnRampAddress({})", hex::encode(self.0))
    }
}

impl Store for OnRampAddress {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_raw(&self.0, Self::BITS)
    }
}

impl<'a> Load<'a> for OnRampAddress {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let mut result = [0; 64];
        ok!(slice.load_raw(&mut result, Self::BITS));
        Ok(Self(result))
    }
}

/// Common header of ramp messages in both directions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RampMessageHeader {
    /// Unique message id.
    pub message_id: HashBytes,
    pub source_chain_selector: u64,
    pub dest_chain_selector: u64,
    /// Sequence number assigned by the on-ramp.
    pub sequence_number: u64,
    pub nonce: u64,
}

impl RampMessageHeader {
    /// The number of data bits that the header occupies.
    pub const BITS: u16 = 256 + 64 * 4;
}

impl Store for RampMessageHeader {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u256(&self.message_id));
        ok!(builder.store_u64(self.source_chain_selector));
        ok!(builder.store_u64(self.dest_chain_selector));
        ok!(builder.store_u64(self.sequence_number));
        builder.store_u64(self.nonce)
    }
}

impl<'a> Load<'a> for RampMessageHeader {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            message_id: ok!(slice.load_u256()),
            source_chain_selector: ok!(slice.load_u64()),
            dest_chain_selector: ok!(slice.load_u64()),
            sequence_number: ok!(slice.load_u64()),
            nonce: ok!(slice.load_u64()),
        })
    }
}

/// An inclusive range of sequence numbers.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SeqNumRange {
    pub start: u64,
    pub end: u64,
}

impl SeqNumRange {
    /// Creates a new range.
    #[inline]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Returns whether the range contains the specified sequence number.
    #[inline]
    pub const fn contains(&self, seq_num: u64) -> bool {
        self.start <= seq_num && seq_num <= self.end
    }

    /// Returns the number of sequence numbers in the range.
    #[inline]
    pub const fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Returns whether the range has no sequence numbers.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl std::fmt::Display for SeqNumRange {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A 256-bit unsigned amount (token amounts, USD prices).
#[derive(Default, Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Uint256(pub BigUint);

impl Uint256 {
    /// Returns the underlying big integer.
    #[inline]
    pub fn as_inner(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for Uint256 {
    #[inline]
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Uint256 {
    #[inline]
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Uint256 {
    #[inline]
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Uint256 {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl Store for Uint256 {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u256_int(&self.0)
    }
}

impl<'a> Load<'a> for Uint256 {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_u256_int().map(Self)
    }
}
