//! BOC (Bag Of Cells) implementation.

use crate::cell::{Cell, CellBuilder, Load, Store};
use crate::error::{CodecError, CodecErrorKind};
use crate::util::{decode_base64, encode_base64};

/// BOC decoder implementation.
pub mod de;
/// BOC encoder implementation.
pub mod ser;

#[cfg(test)]
mod tests;

/// BOC file magic number.
#[derive(Default, Copy, Clone, Debug, Eq, PartialEq)]
pub enum BocTag {
    /// Single root, cells index, no CRC32.
    Indexed,
    /// Single root, cells index, with CRC32.
    IndexedCrc32,
    /// Multiple roots, optional cells index, optional CRC32.
    #[default]
    Generic,
}

impl BocTag {
    const BOC_INDEXED_TAG: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    const BOC_INDEXED_CRC32_TAG: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];
    const BOC_GENERIC_TAG: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

    /// Tries to match bytes with BOC tag.
    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::BOC_GENERIC_TAG => Some(Self::Generic),
            Self::BOC_INDEXED_CRC32_TAG => Some(Self::IndexedCrc32),
            Self::BOC_INDEXED_TAG => Some(Self::Indexed),
            _ => None,
        }
    }

    /// Converts BOC tag to bytes.
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Indexed => Self::BOC_INDEXED_TAG,
            Self::IndexedCrc32 => Self::BOC_INDEXED_CRC32_TAG,
            Self::Generic => Self::BOC_GENERIC_TAG,
        }
    }
}

/// BOC (Bag Of Cells) helper.
pub struct Boc;

impl Boc {
    /// Encodes the specified cell tree as BOC and
    /// returns the `base64` encoded bytes as a string.
    pub fn encode_base64<T: AsRef<Cell>>(cell: T) -> String {
        encode_base64(Self::encode(cell))
    }

    /// Encodes the specified cell tree as BOC and
    /// returns the `hex` encoded bytes as a string.
    pub fn encode_hex<T: AsRef<Cell>>(cell: T) -> String {
        hex::encode(Self::encode(cell))
    }

    /// Encodes the specified cell tree as BOC.
    pub fn encode<T: AsRef<Cell>>(cell: T) -> Vec<u8> {
        let mut result = Vec::new();
        ser::BocHeader::new(cell.as_ref()).encode(&mut result);
        result
    }

    /// Encodes the specified cell tree as BOC with a CRC32C trailer.
    pub fn encode_with_crc<T: AsRef<Cell>>(cell: T) -> Vec<u8> {
        let mut result = Vec::new();
        ser::BocHeader::new(cell.as_ref())
            .with_crc(true)
            .encode(&mut result);
        result
    }

    /// Encodes a pair of cell trees as BOC.
    pub fn encode_pair<T1, T2>((cell1, cell2): (T1, T2)) -> Vec<u8>
    where
        T1: AsRef<Cell>,
        T2: AsRef<Cell>,
    {
        let mut result = Vec::new();
        let mut encoder = ser::BocHeader::new(cell1.as_ref());
        encoder.add_root(cell2.as_ref());
        encoder.encode(&mut result);
        result
    }

    /// Decodes a `base64` encoded BOC into a cell tree.
    pub fn decode_base64<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        fn decode_base64_impl(data: &[u8]) -> Result<Cell, de::Error> {
            match decode_base64(data) {
                Ok(data) => Boc::decode_ext(data.as_slice(), &de::Options::exact(1)),
                Err(_) => Err(de::Error::UnknownBocTag),
            }
        }
        decode_base64_impl(data.as_ref())
    }

    /// Decodes a `hex` encoded BOC into a cell tree.
    pub fn decode_hex<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        fn decode_hex_impl(data: &[u8]) -> Result<Cell, de::Error> {
            match hex::decode(data) {
                Ok(data) => Boc::decode_ext(data.as_slice(), &de::Options::exact(1)),
                Err(_) => Err(de::Error::UnknownBocTag),
            }
        }
        decode_hex_impl(data.as_ref())
    }

    /// Decodes a cell tree from bytes.
    #[inline]
    pub fn decode<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        Self::decode_ext(data.as_ref(), &de::Options::exact(1))
    }

    /// Decodes a pair of cell trees from bytes.
    pub fn decode_pair<T: AsRef<[u8]>>(data: T) -> Result<(Cell, Cell), de::Error> {
        let header = ok!(de::BocHeader::decode(
            data.as_ref(),
            &de::Options::exact(2)
        ));

        let mut roots = header.roots().iter();
        let (Some(&root1), Some(&root2)) = (roots.next(), roots.next()) else {
            return Err(de::Error::RootCellNotFound);
        };

        let cells = ok!(header.finalize());
        match (cells.get(root1), cells.get(root2)) {
            (Some(cell1), Some(cell2)) => Ok((cell1, cell2)),
            _ => Err(de::Error::RootCellNotFound),
        }
    }

    /// Decodes a cell tree from bytes using the specified options.
    pub fn decode_ext(data: &[u8], options: &de::Options) -> Result<Cell, de::Error> {
        let header = ok!(de::BocHeader::decode(data, options));

        if let Some(&root) = header.roots().first() {
            let cells = ok!(header.finalize());
            if let Some(root) = cells.get(root) {
                return Ok(root);
            }
        }

        Err(de::Error::RootCellNotFound)
    }

    /// Serializes cell into an encoded BOC (as base64 for human readable serializers).
    pub fn serialize<T: AsRef<Cell>, S>(cell: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let boc = Self::encode(cell);
        if serializer.is_human_readable() {
            serializer.serialize_str(&encode_base64(boc))
        } else {
            serializer.serialize_bytes(&boc)
        }
    }

    /// Deserializes cell from an encoded BOC (from base64 for human readable deserializers).
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Cell, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        use serde::Deserialize;

        if deserializer.is_human_readable() {
            let s = ok!(<std::borrow::Cow<'de, str>>::deserialize(deserializer));
            Boc::decode_base64(s.as_bytes()).map_err(Error::custom)
        } else {
            let bytes = ok!(<Vec<u8>>::deserialize(deserializer));
            Boc::decode(bytes).map_err(Error::custom)
        }
    }
}

/// BOC representation helper for types which can be stored into cells.
pub struct BocRepr;

impl BocRepr {
    /// Encodes the specified value into a cell and then into BOC bytes.
    pub fn encode<T: Store>(data: T) -> Result<Vec<u8>, CodecError> {
        match CellBuilder::build_from(data) {
            Ok(cell) => Ok(Boc::encode(cell)),
            Err(e) => Err(e.into()),
        }
    }

    /// Encodes the specified value into a cell and then into a base64 string.
    pub fn encode_base64<T: Store>(data: T) -> Result<String, CodecError> {
        match Self::encode(data) {
            Ok(boc) => Ok(encode_base64(boc)),
            Err(e) => Err(e),
        }
    }

    /// Decodes BOC bytes into a cell and parses it as the specified type.
    ///
    /// The whole root cell must be consumed.
    pub fn decode<T, D>(data: D) -> Result<T, CodecError>
    where
        for<'a> T: Load<'a>,
        D: AsRef<[u8]>,
    {
        let cell = ok!(Boc::decode(data).map_err(CodecError::from));
        let mut slice = cell.as_slice();
        let value = ok!(T::load_from(&mut slice).map_err(CodecError::from));
        if slice.is_empty() {
            Ok(value)
        } else {
            Err(CodecError::new(
                CodecErrorKind::TypeMismatch,
                "root cell was not fully consumed",
            ))
        }
    }
}
