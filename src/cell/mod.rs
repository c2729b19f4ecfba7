//! Cell tree implementation.

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use sha2::Digest;
use smallvec::SmallVec;

use crate::error::{Error, ParseHashBytesError};
use crate::util::{decode_base64_slice, DisplayHash};

pub use self::builder::CellBuilder;
pub use self::slice::CellSlice;

mod builder;
mod slice;

/// Max cell data capacity in bits
pub const MAX_BIT_LEN: u16 = 1023;
/// Maximum number of child cells
pub const MAX_REF_COUNT: usize = 4;
/// Maximum allowed depth of a cell tree.
pub const MAX_DEPTH: u16 = 1024;

/// A data structure that can be serialized into cells.
pub trait Store {
    /// Tries to store itself into the cell builder.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error>;
}

impl<T: Store + ?Sized> Store for &T {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self, builder)
    }
}

impl<T: Store + ?Sized> Store for Box<T> {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self.as_ref(), builder)
    }
}

/// A data structure that can be deserialized from cells.
pub trait Load<'a>: Sized {
    /// Tries to load itself from a cell slice.
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error>;
}

impl<'a, T: Load<'a>> Load<'a> for Box<T> {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match T::load_from(slice) {
            Ok(value) => Ok(Box::new(value)),
            Err(e) => Err(e),
        }
    }
}

macro_rules! impl_primitive_loads {
    ($($type:ty => |$s:ident| $expr:expr),*$(,)?) => {
        $(impl Load<'_> for $type {
            #[inline]
            fn load_from($s: &mut CellSlice) -> Result<Self, Error> {
                $expr
            }
        })*
    };
}

impl_primitive_loads! {
    bool => |s| s.load_bit(),
    u8 => |s| s.load_u8(),
    i8 => |s| Ok(ok!(s.load_u8()) as i8),
    u16 => |s| s.load_u16(),
    i16 => |s| Ok(ok!(s.load_u16()) as i16),
    u32 => |s| s.load_u32(),
    i32 => |s| Ok(ok!(s.load_u32()) as i32),
    u64 => |s| s.load_u64(),
    i64 => |s| Ok(ok!(s.load_u64()) as i64),
    HashBytes => |s| s.load_u256(),
}

macro_rules! impl_primitive_stores {
    ($($type:ty => |$b:ident, $v:ident| $expr:expr),*$(,)?) => {
        $(impl Store for $type {
            #[inline]
            fn store_into(&self, $b: &mut CellBuilder) -> Result<(), Error> {
                let $v = self;
                $expr
            }
        })*
    };
}

impl_primitive_stores! {
    bool => |b, v| b.store_bit(*v),
    u8 => |b, v| b.store_u8(*v),
    i8 => |b, v| b.store_u8(*v as u8),
    u16 => |b, v| b.store_u16(*v),
    i16 => |b, v| b.store_u16(*v as u16),
    u32 => |b, v| b.store_u32(*v),
    i32 => |b, v| b.store_u32(*v as u32),
    u64 => |b, v| b.store_u64(*v),
    i64 => |b, v| b.store_u64(*v as u64),
    HashBytes => |b, v| b.store_u256(v),
}

/// `Maybe X` representation.
impl<T: Store> Store for Option<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Some(value) => {
                ok!(builder.store_bit_one());
                value.store_into(builder)
            }
            None => builder.store_bit_zero(),
        }
    }
}

impl<'a, T: Load<'a>> Load<'a> for Option<T> {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_bit()) {
            match T::load_from(slice) {
                Ok(value) => Ok(Some(value)),
                Err(e) => Err(e),
            }
        } else {
            Ok(None)
        }
    }
}

/// Cells are stored as references.
impl Store for Cell {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_reference(self.clone())
    }
}

impl<'a> Load<'a> for Cell {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_reference_cloned()
    }
}

/// Cell descriptor bytes.
#[derive(Hash, Debug, Clone, Copy, Eq, PartialEq)]
pub struct CellDescriptor {
    /// First descriptor byte with a generic info about cell.
    pub d1: u8,
    /// Second descriptor byte with a packed data size.
    pub d2: u8,
}

impl CellDescriptor {
    /// Bit mask to store the number of references in the descriptor.
    pub const REF_COUNT_MASK: u8 = 0b0000_0111;
    /// Bit mask to store the `is_exotic` flag in the descriptor.
    pub const IS_EXOTIC_MASK: u8 = 0b0000_1000;
    /// Bit mask to store the `store_hashes` flag in the descriptor.
    pub const STORE_HASHES_MASK: u8 = 0b0001_0000;
    /// Bit mask to store the level mask in the descriptor.
    pub const LEVEL_MASK: u8 = 0b1110_0000;

    /// Computes d1 descriptor byte for an ordinary cell.
    #[inline(always)]
    pub const fn compute_d1(ref_count: u8) -> u8 {
        ref_count & Self::REF_COUNT_MASK
    }

    /// Computes d2 descriptor byte from the cell data length.
    #[inline(always)]
    pub const fn compute_d2(bit_len: u16) -> u8 {
        (((bit_len >> 2) as u8) & !0b1) | ((bit_len % 8) != 0) as u8
    }

    /// Constructs cell descriptor from its parts.
    #[inline]
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self {
            d1: bytes[0],
            d2: bytes[1],
        }
    }

    /// Returns the number of child cells.
    #[inline]
    pub const fn reference_count(self) -> u8 {
        self.d1 & Self::REF_COUNT_MASK
    }

    /// Returns whether the cell is not [`Ordinary`].
    ///
    /// [`Ordinary`]: CellType::Ordinary
    #[inline]
    pub const fn is_exotic(self) -> bool {
        self.d1 & Self::IS_EXOTIC_MASK != 0
    }

    /// Returns whether this cell should store hashes in data.
    #[inline]
    pub const fn store_hashes(self) -> bool {
        self.d1 & Self::STORE_HASHES_MASK != 0
    }

    /// Returns the cell level.
    #[inline]
    pub const fn level(self) -> u8 {
        (self.d1 >> 5).count_ones() as u8
    }

    /// Returns whether this cell's data is 8-bit aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.d2 & 1 == 0
    }

    /// Returns this cell's data length in bytes.
    #[inline]
    pub const fn byte_len(self) -> u8 {
        (self.d2 & 1) + (self.d2 >> 1)
    }

    /// Returns whether this cell is a reference to the absent cell.
    #[inline]
    pub const fn is_absent(self) -> bool {
        self.d1 == (Self::REF_COUNT_MASK | Self::IS_EXOTIC_MASK)
    }
}

/// Immutable ordinary cell.
///
/// Cloning is cheap, equality is defined by the representation hash.
#[derive(Clone)]
#[repr(transparent)]
pub struct Cell(Arc<CellInner>);

struct CellInner {
    descriptor: CellDescriptor,
    bit_len: u16,
    data: Box<[u8]>,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
    hash: HashBytes,
    depth: u16,
}

impl Cell {
    /// Returns a static reference to the empty cell.
    pub fn empty_cell_ref() -> &'static Cell {
        static EMPTY: OnceLock<Cell> = OnceLock::new();
        EMPTY.get_or_init(|| Cell::from_parts(0, &[], SmallVec::new()))
    }

    /// Returns the empty cell.
    #[inline]
    pub fn empty_cell() -> Cell {
        Self::empty_cell_ref().clone()
    }

    /// Assembles a cell from already validated parts.
    ///
    /// `data` must have the completion tag applied if `bit_len % 8 != 0`
    /// and its length must be exactly `(bit_len + 7) / 8`.
    pub(crate) fn from_parts(
        bit_len: u16,
        data: &[u8],
        references: SmallVec<[Cell; MAX_REF_COUNT]>,
    ) -> Cell {
        debug_assert!(bit_len <= MAX_BIT_LEN);
        debug_assert!(references.len() <= MAX_REF_COUNT);
        debug_assert_eq!(data.len(), bit_len.div_ceil(8) as usize);

        let descriptor = CellDescriptor {
            d1: CellDescriptor::compute_d1(references.len() as u8),
            d2: CellDescriptor::compute_d2(bit_len),
        };

        let mut hasher = sha2::Sha256::new();
        hasher.update([descriptor.d1, descriptor.d2]);
        hasher.update(data);

        let mut depth = 0u16;
        for child in &references {
            let child_depth = child.repr_depth();
            depth = std::cmp::max(depth, child_depth.saturating_add(1));
            hasher.update(child_depth.to_be_bytes());
        }
        for child in &references {
            hasher.update(child.repr_hash().as_slice());
        }

        Cell(Arc::new(CellInner {
            descriptor,
            bit_len,
            data: Box::from(data),
            references,
            hash: HashBytes(hasher.finalize().into()),
            depth,
        }))
    }

    /// Returns cell descriptor.
    #[inline]
    pub fn descriptor(&self) -> CellDescriptor {
        self.0.descriptor
    }

    /// Returns the raw data of this cell (with the completion tag).
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.0.bit_len
    }

    /// Returns the number of child cells.
    #[inline]
    pub fn reference_count(&self) -> u8 {
        self.0.references.len() as u8
    }

    /// Returns a reference to the Nth child cell.
    #[inline]
    pub fn reference(&self, index: u8) -> Option<&Cell> {
        self.0.references.get(index as usize)
    }

    /// Returns the Nth child cell.
    #[inline]
    pub fn reference_cloned(&self, index: u8) -> Option<Cell> {
        self.reference(index).cloned()
    }

    /// Returns an iterator over child cells.
    #[inline]
    pub fn references(&self) -> std::slice::Iter<'_, Cell> {
        self.0.references.iter()
    }

    /// Returns the representation hash of the cell.
    #[inline]
    pub fn repr_hash(&self) -> &HashBytes {
        &self.0.hash
    }

    /// Returns the representation depth of the cell.
    #[inline]
    pub fn repr_depth(&self) -> u16 {
        self.0.depth
    }

    /// Returns `true` if the cell has no data and no references.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.bit_len == 0 && self.0.references.is_empty()
    }

    /// Returns a slice over the whole cell.
    #[inline]
    pub fn as_slice(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Parses the cell contents as the specified type.
    pub fn parse<'a, T: Load<'a>>(&'a self) -> Result<T, Error> {
        T::load_from(&mut self.as_slice())
    }

    /// Computes the total number of unique cells and bits in the tree.
    pub fn compute_unique_stats(&self) -> CellTreeStats {
        let mut visited = ahash::HashSet::default();
        let mut stats = CellTreeStats::default();
        let mut stack = vec![self];
        while let Some(cell) = stack.pop() {
            if !visited.insert(*cell.repr_hash()) {
                continue;
            }
            stats.cell_count += 1;
            stats.bit_count += cell.bit_len() as u64;
            stats.ref_count += cell.reference_count() as u64;
            stack.extend(cell.references());
        }
        stats
    }

    /// Returns an object that implements [`Display`] for printing only the root cell.
    ///
    /// [`Display`]: std::fmt::Display
    #[inline]
    pub fn display_root(&self) -> DisplayCellRoot<'_> {
        DisplayCellRoot {
            cell: self,
            level: 0,
        }
    }

    /// Returns an object that implements [`Display`] for printing the whole cell tree.
    ///
    /// [`Display`]: std::fmt::Display
    #[inline]
    pub fn display_tree(&self) -> DisplayCellTree<'_> {
        DisplayCellTree(self)
    }
}

impl AsRef<Cell> for Cell {
    #[inline]
    fn as_ref(&self) -> &Cell {
        self
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::empty_cell()
    }
}

impl Eq for Cell {}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.repr_hash() == other.repr_hash()
    }
}

impl std::hash::Hash for Cell {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.repr_hash().hash(state)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("bit_len", &self.bit_len())
            .field("refs", &self.reference_count())
            .field("repr_hash", self.repr_hash())
            .finish()
    }
}

/// Tree statistics.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct CellTreeStats {
    /// Total number of bits in the tree.
    pub bit_count: u64,
    /// Total number of cells in the tree.
    pub cell_count: u64,
    /// Total number of references in the tree.
    pub ref_count: u64,
}

/// Helper struct to print only the root cell in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellRoot<'a> {
    cell: &'a Cell,
    level: usize,
}

impl std::fmt::Display for DisplayCellRoot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = hex::encode(self.cell.data());
        let indent = self.level * 2;
        if f.alternate() {
            f.write_fmt(format_args!("{:indent$}{data}\n", ""))
        } else {
            f.write_fmt(format_args!(
                "{:indent$}{data}\n{:indent$}bits: {:>4}, refs: {}, hash: {}\n",
                "",
                "",
                self.cell.bit_len(),
                self.cell.reference_count(),
                self.cell.repr_hash(),
            ))
        }
    }
}

/// Helper struct to print all cells in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellTree<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![(0, self.0)];

        while let Some((level, cell)) = stack.pop() {
            ok!(std::fmt::Display::fmt(&DisplayCellRoot { cell, level }, f));

            let reference_count = cell.reference_count();
            for i in (0..reference_count).rev() {
                if let Some(child) = cell.reference(i) {
                    stack.push((level + 1, child));
                }
            }
        }

        Ok(())
    }
}

/// Type alias for a cell hash.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct HashBytes(pub [u8; 32]);

impl HashBytes {
    /// Array of zero bytes.
    pub const ZERO: Self = Self([0; 32]);

    /// Converts slice to a hash bytes.
    ///
    /// # Panics
    ///
    /// Panics if the length of the slice is not 32 bytes.
    #[inline]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.try_into().expect("slice with incorrect length"))
    }

    /// Tries to convert a slice into hash bytes.
    #[inline]
    pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
        slice.try_into().ok().map(Self)
    }

    /// Returns a byte slice of this hash.
    #[inline]
    pub const fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns an internal array.
    #[inline]
    pub const fn as_array(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::ops::Deref for HashBytes {
    type Target = [u8; 32];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for HashBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<[u8; 32]> for HashBytes {
    #[inline(always)]
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<HashBytes> for [u8; 32] {
    #[inline(always)]
    fn from(value: HashBytes) -> Self {
        value.0
    }
}

impl FromStr for HashBytes {
    type Err = ParseHashBytesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Self::default();
        match s.len() {
            64 => hex::decode_to_slice(s, &mut result.0)?,
            66 => hex::decode_to_slice(&s[2..], &mut result.0)?,
            44 => decode_base64_slice(s, &mut result.0)?,
            _ => return Err(ParseHashBytesError::UnexpectedStringLength),
        }
        Ok(result)
    }
}

impl std::fmt::Display for HashBytes {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&DisplayHash(&self.0), f)
    }
}

impl std::fmt::Debug for HashBytes {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl serde::Serialize for HashBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for HashBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        if deserializer.is_human_readable() {
            let s = ok!(<std::borrow::Cow<'de, str>>::deserialize(deserializer));
            HashBytes::from_str(&s).map_err(Error::custom)
        } else {
            let bytes = ok!(<Vec<u8>>::deserialize(deserializer));
            HashBytes::try_from_slice(&bytes)
                .ok_or_else(|| Error::invalid_length(bytes.len(), &"32 bytes"))
        }
    }
}
