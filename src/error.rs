//! Common error types.

use std::borrow::Cow;

/// Error type for cell related errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// There were not enough bits or refs in the cell slice.
    #[error("cell underflow")]
    CellUnderflow,
    /// There were not enough bits or refs capacity in the cell builder.
    #[error("cell overflow")]
    CellOverflow,
    /// Cell contains invalid descriptor or data.
    #[error("invalid cell")]
    InvalidCell,
    /// Data does not satisfy some constraints.
    #[error("invalid data")]
    InvalidData,
    /// Unknown TLB tag.
    #[error("invalid tag")]
    InvalidTag,
    /// Tree of cells is too deep.
    #[error("cell depth overflow")]
    DepthOverflow,
    /// Underlying integer type does not fit into the target type.
    #[error("underlying integer is too large to fit in target type")]
    IntOverflow,
}

/// Kind of a codec failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CodecErrorKind {
    /// An element or a field does not fit into the cell data capacity.
    BitOverflow,
    /// A cell ran out of reference slots.
    RefOverflow,
    /// The input ended before the value was fully decoded.
    UnexpectedEnd,
    /// A length prefix or an integer is out of its allowed range.
    LengthOverflow,
    /// The input has a structure other than the expected one.
    TypeMismatch,
    /// An address has an invalid length or representation.
    BadAddress,
    /// Extra args are prefixed with an unknown tag.
    UnsupportedExtraArgs,
}

impl std::fmt::Display for CodecErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::BitOverflow => "bit overflow",
            Self::RefOverflow => "ref overflow",
            Self::UnexpectedEnd => "unexpected end",
            Self::LengthOverflow => "length overflow",
            Self::TypeMismatch => "type mismatch",
            Self::BadAddress => "bad address",
            Self::UnsupportedExtraArgs => "unsupported extra args",
        })
    }
}

/// Snake and wire codec error.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("{kind}: {context}")]
pub struct CodecError {
    /// Failure kind.
    pub kind: CodecErrorKind,
    /// What was being encoded or decoded.
    pub context: Cow<'static, str>,
}

impl CodecError {
    /// Creates a new codec error.
    pub fn new<C>(kind: CodecErrorKind, context: C) -> Self
    where
        C: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into(),
        }
    }
}

impl From<Error> for CodecErrorKind {
    fn from(value: Error) -> Self {
        match value {
            Error::CellUnderflow => Self::UnexpectedEnd,
            Error::CellOverflow => Self::BitOverflow,
            Error::IntOverflow => Self::LengthOverflow,
            Error::InvalidCell | Error::InvalidData | Error::InvalidTag | Error::DepthOverflow => {
                Self::TypeMismatch
            }
        }
    }
}

impl From<Error> for CodecError {
    #[inline]
    fn from(value: Error) -> Self {
        Self::new(value.into(), value.to_string())
    }
}

impl From<CodecError> for Error {
    fn from(value: CodecError) -> Self {
        match value.kind {
            CodecErrorKind::BitOverflow | CodecErrorKind::RefOverflow => Self::CellOverflow,
            CodecErrorKind::UnexpectedEnd => Self::CellUnderflow,
            CodecErrorKind::LengthOverflow => Self::IntOverflow,
            CodecErrorKind::UnsupportedExtraArgs => Self::InvalidTag,
            CodecErrorKind::TypeMismatch | CodecErrorKind::BadAddress => Self::InvalidData,
        }
    }
}

impl From<ParseAddrError> for CodecError {
    #[inline]
    fn from(value: ParseAddrError) -> Self {
        Self::new(CodecErrorKind::BadAddress, value.to_string())
    }
}

impl From<crate::boc::de::Error> for CodecError {
    #[inline]
    fn from(value: crate::boc::de::Error) -> Self {
        Self::new(CodecErrorKind::TypeMismatch, value.to_string())
    }
}

/// Extension to attach a context to cell errors.
pub trait ResultExt<T> {
    /// Converts the error into a [`CodecError`] with the specified context.
    fn context(self, context: &'static str) -> Result<T, CodecError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<CodecError>,
{
    #[inline]
    fn context(self, context: &'static str) -> Result<T, CodecError> {
        match self {
            Ok(value) => Ok(value),
            Err(e) => {
                let e: CodecError = e.into();
                Err(CodecError::new(e.kind, format!("{context}: {}", e.context)))
            }
        }
    }
}

/// Error type for integer parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseIntError {
    /// Error while parsing underlying type.
    #[error("cannot parse underlying integer")]
    InvalidString(#[source] std::num::ParseIntError),
    /// Error while parsing a big integer.
    #[error("cannot parse underlying big integer")]
    InvalidBigInt(#[source] num_bigint::ParseBigIntError),
    /// Underlying integer type does not fit into the target type.
    #[error("underlying integer is too large to fit in target type")]
    Overflow,
}

/// Error type for hash bytes parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseHashBytesError {
    /// Failed to parse base64 encoded bytes.
    #[error("invalid base64 string")]
    InvalidBase64(#[from] base64::DecodeSliceError),
    /// Failed to parse hex encoded bytes.
    #[error("invalid hex string")]
    InvalidHex(#[from] hex::FromHexError),
    /// Error for an unexpected string length.
    #[error("expected string of 44, 64 or 66 bytes")]
    UnexpectedStringLength,
}

/// Error type for address parsing related errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ParseAddrError {
    /// Tried to parse an empty string.
    #[error("cannot parse address from an empty string")]
    Empty,
    /// Workchain id is too large.
    #[error("workchain id is too large to fit in target type")]
    InvalidWorkchain,
    /// Invalid account id hex.
    #[error("cannot parse account id")]
    InvalidAccountId,
    /// Too many address parts.
    #[error("unexpected address part")]
    UnexpectedPart,
    /// Unexpected or invalid address format.
    #[error("invalid address format")]
    BadFormat,
    /// User-friendly address checksum mismatch.
    #[error("invalid address checksum")]
    InvalidChecksum,
    /// Raw binary address has an unexpected length.
    #[error("expected {expected} bytes of raw address, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
}

/// Error type for block id parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseBlockIdError {
    /// Tried to parse an empty string.
    #[error("cannot parse block id from an empty string")]
    Empty,
    /// Invalid workchain or shard prefix.
    #[error("invalid shard id")]
    InvalidShardIdent,
    /// Invalid block seqno.
    #[error("cannot parse block seqno")]
    InvalidSeqno,
    /// Invalid block root hash.
    #[error("cannot parse root hash")]
    InvalidRootHash,
    /// Invalid block file hash.
    #[error("cannot parse file hash")]
    InvalidFileHash,
    /// Too many block id parts.
    #[error("unexpected block id part")]
    UnexpectedPart,
}
