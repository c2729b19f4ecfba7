//! Multi-cell containers used by the CCIP contracts.
//!
//! - *snake data*: element bits packed into the current cell, the next cell
//!   is chained through the first reference;
//! - *snake ref*: one element per reference, the fourth reference chains
//!   to the next cell;
//! - *snake bytes*: a byte-aligned stream, chained through the first reference;
//! - *2d bytes*: 16-bit lengths with each non-empty array stored as a
//!   referenced snake bytes chain.
//!
//! All chains are linked in reverse after the cells were laid out, so the
//! returned cell is always the root which contains the first elements.

use crate::cell::{Cell, CellBuilder, CellSlice, Load, Store, MAX_BIT_LEN, MAX_DEPTH};
use crate::error::{CodecError, CodecErrorKind, Error, ResultExt};

/// Number of whole bytes stored in each snake bytes cell.
pub const BYTES_PER_CELL: usize = (MAX_BIT_LEN / 8) as usize;

/// Max length of a snake bytes chain. A longer chain would exceed the
/// cell depth limit.
pub const MAX_SNAKE_BYTES_LEN: usize = (MAX_DEPTH as usize + 1) * BYTES_PER_CELL;

/// Number of element references in a snake ref cell which has a continuation.
pub const REFS_PER_CELL: usize = 3;

/// Max length of an inner 2d bytes array.
pub const MAX_INNER_LEN: usize = u16::MAX as usize;

/// Packs elements into a snake data chain.
///
/// Elements must fit into a single cell and must not contain references.
/// An empty input produces an empty cell.
pub fn pack_snake_data<T: Store>(items: &[T]) -> Result<Cell, CodecError> {
    let mut cells = Vec::new();
    let mut current = CellBuilder::new();

    for (i, item) in items.iter().enumerate() {
        let mut element = CellBuilder::new();
        if item.store_into(&mut element).is_err() {
            return Err(CodecError::new(
                CodecErrorKind::BitOverflow,
                format!("snake data element {i} exceeds {MAX_BIT_LEN} bits"),
            ));
        }
        if !element.references().is_empty() {
            return Err(CodecError::new(
                CodecErrorKind::RefOverflow,
                format!("snake data element {i} has references"),
            ));
        }

        if !current.has_capacity(element.bit_len(), 0) {
            cells.push(std::mem::take(&mut current));
        }
        current
            .store_builder(&element)
            .context("snake data element")?;
    }
    cells.push(current);

    link_reversed(cells, "snake data chain")
}

/// Unpacks elements from a snake data chain.
pub fn unpack_snake_data<T>(root: &Cell) -> Result<Vec<T>, CodecError>
where
    for<'a> T: Load<'a>,
{
    let mut result = Vec::new();
    let mut cell = root;
    loop {
        let mut slice = cell.as_slice();
        while !slice.is_data_empty() {
            match T::load_from(&mut slice) {
                Ok(item) => result.push(item),
                Err(_) => {
                    return Err(CodecError::new(
                        CodecErrorKind::UnexpectedEnd,
                        format!("partial snake data element {}", result.len()),
                    ))
                }
            }
        }

        match slice.remaining_refs() {
            0 => break,
            _ => cell = slice.get_reference(0).context("snake data chain")?,
        }
    }
    Ok(result)
}

/// Packs elements into a snake ref chain. Each element is built into its own cell.
pub fn pack_snake_ref<T: Store>(items: &[T]) -> Result<Cell, CodecError> {
    let mut cells = Vec::with_capacity(items.len());
    for item in items {
        cells.push(CellBuilder::build_from(item).context("snake ref element")?);
    }
    pack_snake_ref_cells(cells)
}

/// Packs prebuilt element cells into a snake ref chain.
///
/// An empty input produces an empty cell.
pub fn pack_snake_ref_cells(cells: Vec<Cell>) -> Result<Cell, CodecError> {
    let mut next = None::<Cell>;
    for chunk in cells.chunks(REFS_PER_CELL).rev() {
        let mut builder = CellBuilder::new();
        for cell in chunk {
            builder
                .store_reference(cell.clone())
                .context("snake ref element")?;
        }
        if let Some(next) = next.take() {
            builder.store_reference(next).context("snake ref chain")?;
        }
        next = Some(builder.build().context("snake ref chain")?);
    }
    Ok(next.unwrap_or_else(Cell::empty_cell))
}

/// Unpacks element cells from a snake ref chain.
pub fn unpack_snake_ref_cells(root: &Cell) -> Result<Vec<Cell>, CodecError> {
    let mut result = Vec::new();
    let mut cell = root;
    loop {
        let refs = cell.reference_count() as usize;
        let elements = if refs > REFS_PER_CELL {
            REFS_PER_CELL
        } else {
            refs
        };
        result.extend(cell.references().take(elements).cloned());

        if refs <= REFS_PER_CELL {
            break;
        }
        cell = match cell.reference(REFS_PER_CELL as u8) {
            Some(next) => next,
            None => {
                return Err(CodecError::new(
                    CodecErrorKind::UnexpectedEnd,
                    "snake ref chain",
                ))
            }
        };
    }
    Ok(result)
}

/// Unpacks elements from a snake ref chain.
pub fn unpack_snake_ref<T>(root: &Cell) -> Result<Vec<T>, CodecError>
where
    for<'a> T: Load<'a>,
{
    let cells = ok!(unpack_snake_ref_cells(root));
    let mut result = Vec::with_capacity(cells.len());
    for (i, cell) in cells.iter().enumerate() {
        match cell.parse::<T>() {
            Ok(item) => result.push(item),
            Err(e) => {
                let kind = CodecErrorKind::from(e);
                return Err(CodecError::new(kind, format!("snake ref element {i}: {e}")));
            }
        }
    }
    Ok(result)
}

/// Packs bytes into a snake bytes chain. Returns `None` for an empty input.
///
/// Inputs longer than [`MAX_SNAKE_BYTES_LEN`] fail with
/// [`CodecErrorKind::LengthOverflow`].
pub fn pack_bytes(bytes: &[u8]) -> Result<Option<Cell>, CodecError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() > MAX_SNAKE_BYTES_LEN {
        return Err(CodecError::new(
            CodecErrorKind::LengthOverflow,
            format!(
                "snake bytes of {} bytes exceed {MAX_SNAKE_BYTES_LEN} bytes",
                bytes.len()
            ),
        ));
    }

    let mut cells = Vec::with_capacity(bytes.len().div_ceil(BYTES_PER_CELL));
    for chunk in bytes.chunks(BYTES_PER_CELL) {
        let mut builder = CellBuilder::new();
        builder
            .store_raw(chunk, (chunk.len() * 8) as u16)
            .context("snake bytes")?;
        cells.push(builder);
    }

    link_reversed(cells, "snake bytes chain").map(Some)
}

/// Unpacks bytes from a snake bytes chain.
pub fn unpack_bytes(root: &Cell) -> Result<Vec<u8>, CodecError> {
    let mut result = Vec::new();
    let mut cell = root;
    loop {
        let mut slice = cell.as_slice();
        if slice.remaining_bits() % 8 != 0 {
            return Err(CodecError::new(
                CodecErrorKind::TypeMismatch,
                format!("unaligned snake bytes cell of {} bits", slice.remaining_bits()),
            ));
        }
        result.extend_from_slice(&slice.load_remaining_bytes().context("snake bytes")?);

        match slice.remaining_refs() {
            0 => break,
            _ => cell = slice.get_reference(0).context("snake bytes chain")?,
        }
    }
    Ok(result)
}

/// Stores bytes as a reference to a snake bytes chain.
///
/// An empty input is stored as a reference to an empty cell.
pub fn store_bytes_ref(bytes: &[u8], builder: &mut CellBuilder) -> Result<(), CodecError> {
    let cell = ok!(pack_bytes(bytes)).unwrap_or_else(Cell::empty_cell);
    builder.store_reference(cell).context("snake bytes ref")
}

/// Loads bytes from a referenced snake bytes chain.
pub fn load_bytes_ref(slice: &mut CellSlice<'_>) -> Result<Vec<u8>, CodecError> {
    let cell = slice.load_reference().context("snake bytes ref")?;
    unpack_bytes(cell)
}

/// Packs an array of byte arrays.
///
/// Each entry is a 16-bit length followed by a reference to its snake bytes
/// chain if the entry is not empty. One reference in each cell is reserved
/// for the continuation, which is always stored last.
pub fn pack_2d_bytes<B: AsRef<[u8]>>(items: &[B]) -> Result<Cell, CodecError> {
    let mut cells = Vec::new();
    let mut current = CellBuilder::new();

    for (i, item) in items.iter().enumerate() {
        let item = item.as_ref();
        if item.len() > MAX_INNER_LEN {
            return Err(CodecError::new(
                CodecErrorKind::LengthOverflow,
                format!("2d bytes element {i} has {} bytes", item.len()),
            ));
        }

        let refs = !item.is_empty() as u8;
        if !current.has_capacity(16, refs + 1) {
            cells.push(std::mem::take(&mut current));
        }

        current.store_u16(item.len() as u16).context("2d bytes")?;
        if let Some(cell) = ok!(pack_bytes(item)) {
            current.store_reference(cell).context("2d bytes")?;
        }
    }
    cells.push(current);

    link_reversed(cells, "2d bytes chain")
}

/// Unpacks an array of byte arrays.
pub fn unpack_2d_bytes(root: &Cell) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut result = Vec::new();
    let mut cell = root;
    loop {
        let mut slice = cell.as_slice();
        while slice.remaining_bits() >= 16 {
            let len = slice.load_u16().context("2d bytes")? as usize;
            let item = if len == 0 {
                Vec::new()
            } else {
                ok!(load_bytes_ref(&mut slice))
            };
            if item.len() != len {
                return Err(CodecError::new(
                    CodecErrorKind::TypeMismatch,
                    format!("2d bytes element has {} bytes, expected {len}", item.len()),
                ));
            }
            result.push(item);
        }

        if !slice.is_data_empty() {
            return Err(CodecError::new(
                CodecErrorKind::UnexpectedEnd,
                "partial 2d bytes length",
            ));
        }

        match slice.remaining_refs() {
            0 => break,
            1 => cell = slice.get_reference(0).context("2d bytes chain")?,
            n => {
                return Err(CodecError::new(
                    CodecErrorKind::TypeMismatch,
                    format!("{n} unused references in 2d bytes cell"),
                ))
            }
        }
    }
    Ok(result)
}

fn link_reversed(cells: Vec<CellBuilder>, context: &'static str) -> Result<Cell, CodecError> {
    let mut next = None::<Cell>;
    for mut builder in cells.into_iter().rev() {
        if let Some(next) = next.take() {
            builder.store_reference(next).context(context)?;
        }
        next = Some(builder.build().context(context)?);
    }
    Ok(next.unwrap_or_else(Cell::empty_cell))
}

/// Elements stored as a referenced snake data chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnakeData<T>(pub Vec<T>);

impl<T> Default for SnakeData<T> {
    #[inline]
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> From<Vec<T>> for SnakeData<T> {
    #[inline]
    fn from(value: Vec<T>) -> Self {
        Self(value)
    }
}

impl<T: Store> Store for SnakeData<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let cell = pack_snake_data(&self.0)?;
        builder.store_reference(cell)
    }
}

impl<'a, T> Load<'a> for SnakeData<T>
where
    for<'b> T: Load<'b>,
{
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let cell = ok!(slice.load_reference());
        Ok(Self(unpack_snake_data(cell)?))
    }
}

/// Elements stored as a referenced snake ref chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnakeRef<T>(pub Vec<T>);

impl<T> Default for SnakeRef<T> {
    #[inline]
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> From<Vec<T>> for SnakeRef<T> {
    #[inline]
    fn from(value: Vec<T>) -> Self {
        Self(value)
    }
}

impl<T: Store> Store for SnakeRef<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let cell = pack_snake_ref(&self.0)?;
        builder.store_reference(cell)
    }
}

impl<'a, T> Load<'a> for SnakeRef<T>
where
    for<'b> T: Load<'b>,
{
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let cell = ok!(slice.load_reference());
        Ok(Self(unpack_snake_ref(cell)?))
    }
}

/// Bytes stored as a referenced snake bytes chain.
///
/// Empty bytes are stored as a reference to an empty cell. At most
/// [`MAX_SNAKE_BYTES_LEN`] bytes can be stored.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnakeBytes(pub Vec<u8>);

impl SnakeBytes {
    /// Returns the underlying bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns true if there are no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SnakeBytes {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for SnakeBytes {
    #[inline]
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl AsRef<[u8]> for SnakeBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Store for SnakeBytes {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        store_bytes_ref(&self.0, builder).map_err(From::from)
    }
}

impl<'a> Load<'a> for SnakeBytes {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self(load_bytes_ref(slice)?))
    }
}

/// Bytes stored inline as a snake bytes chain root (without an extra reference).
///
/// Used as an element of snake ref arrays.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InlineBytes(pub Vec<u8>);

impl Store for InlineBytes {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match pack_bytes(&self.0)? {
            Some(cell) => builder.store_slice(&cell.as_slice()),
            None => Ok(()),
        }
    }
}

impl<'a> Load<'a> for InlineBytes {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let mut bytes = ok!(slice.load_remaining_bytes());
        if !slice.is_refs_empty() {
            let next = ok!(slice.load_reference());
            bytes.extend_from_slice(&unpack_bytes(next)?);
        }
        Ok(Self(bytes))
    }
}

impl From<Vec<u8>> for InlineBytes {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::boc::Boc;
    use crate::cell::HashBytes;

    fn count_refs(cell: &Cell) -> usize {
        cell.references()
            .map(|child| 1 + count_refs(child))
            .sum::<usize>()
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Wide {
        head: u64,
        tail: HashBytes,
        extra: HashBytes,
    }

    impl Store for Wide {
        fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
            ok!(builder.store_u64(self.head));
            ok!(builder.store_u256(&self.tail));
            builder.store_u256(&self.extra)
        }
    }

    impl Load<'_> for Wide {
        fn load_from(slice: &mut CellSlice<'_>) -> Result<Self, Error> {
            Ok(Self {
                head: ok!(slice.load_u64()),
                tail: ok!(slice.load_u256()),
                extra: ok!(slice.load_u256()),
            })
        }
    }

    #[test]
    fn snake_data_chain() {
        let items = (0..100u64)
            .map(|i| Wide {
                head: i,
                tail: HashBytes([i as u8; 32]),
                extra: HashBytes([!(i as u8); 32]),
            })
            .collect::<Vec<_>>();

        let root = pack_snake_data(&items).unwrap();

        // 576 bits per element, only one element fits into each cell
        let mut cells = 1;
        let mut cell = &root;
        while let Some(next) = cell.reference(0) {
            assert_eq!(cell.bit_len(), 576);
            cells += 1;
            cell = next;
        }
        assert_eq!(cells, 100);

        let decoded = unpack_snake_data::<Wide>(&root).unwrap();
        assert_eq!(decoded, items);
        assert_eq!(pack_snake_data(&decoded).unwrap(), root);
    }

    #[test]
    fn snake_data_dense() {
        let items = (0..1000u64).collect::<Vec<_>>();
        let root = pack_snake_data(&items).unwrap();

        // 15 u64 values per cell
        assert_eq!(root.bit_len(), 960);
        let stats = root.compute_unique_stats();
        assert_eq!(stats.cell_count, 1000u64.div_ceil(15));
        assert_eq!(stats.bit_count, 64 * 1000);

        assert_eq!(unpack_snake_data::<u64>(&root).unwrap(), items);
    }

    #[test]
    fn snake_data_empty() {
        let root = pack_snake_data::<u64>(&[]).unwrap();
        assert_eq!(root, Cell::empty_cell());
        assert!(unpack_snake_data::<u64>(&root).unwrap().is_empty());
    }

    #[test]
    fn snake_data_errors() {
        struct Huge;
        impl Store for Huge {
            fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
                builder.store_zeros(1024)
            }
        }

        let err = pack_snake_data(&[Huge]).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::BitOverflow);

        let err = pack_snake_data(&[Cell::empty_cell()]).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::RefOverflow);

        let partial = CellBuilder::build_from(0xdeadu16).unwrap();
        let err = unpack_snake_data::<u64>(&partial).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::UnexpectedEnd);
    }

    #[test]
    fn snake_ref_counts() {
        for (n, cells, refs) in [
            (0, 1, 0),
            (1, 1, 1),
            (3, 1, 3),
            (4, 2, 5),
            (6, 2, 7),
            (7, 3, 9),
        ] {
            let items = (0..n as u32).collect::<Vec<_>>();
            let root = pack_snake_ref(&items).unwrap();

            let mut chain = 1;
            let mut cell = &root;
            while let Some(next) = cell.reference(3) {
                chain += 1;
                cell = next;
            }
            assert_eq!(chain, cells, "n={n}");
            assert_eq!(count_refs(&root), refs, "n={n}");

            assert_eq!(unpack_snake_ref::<u32>(&root).unwrap(), items);
        }
    }

    #[test]
    fn snake_ref_of_snake_bytes() {
        let items = (0..1000)
            .map(|i| InlineBytes(vec![(i % 251) as u8; 100]))
            .collect::<Vec<_>>();

        let root = pack_snake_ref(&items).unwrap();
        assert_eq!(count_refs(&root), 1333);

        let decoded = unpack_snake_ref::<InlineBytes>(&root).unwrap();
        assert_eq!(decoded, items);

        let boc = Boc::encode(&root);
        let reparsed = Boc::decode(boc).unwrap();
        assert_eq!(reparsed.repr_hash(), root.repr_hash());
        let decoded = unpack_snake_ref::<InlineBytes>(&reparsed).unwrap();
        assert_eq!(pack_snake_ref(&decoded).unwrap(), root);
    }

    #[test]
    fn snake_bytes() {
        assert!(pack_bytes(&[]).unwrap().is_none());

        let mut rng = rand::rngs::StdRng::seed_from_u64(123);
        for len in [1usize, 126, 127, 128, 254, 255, 1000, 10_000] {
            let bytes = (0..len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>();
            let root = pack_bytes(&bytes).unwrap().unwrap();

            let stats = root.compute_unique_stats();
            assert_eq!(stats.cell_count as usize, len.div_ceil(BYTES_PER_CELL));
            assert_eq!(stats.bit_count as usize, len * 8);

            assert_eq!(unpack_bytes(&root).unwrap(), bytes);
        }

        let unaligned = CellBuilder::build_from(true).unwrap();
        let err = unpack_bytes(&unaligned).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::TypeMismatch);
    }

    #[test]
    fn snake_bytes_length_limit() {
        let bytes = vec![0x5a; MAX_SNAKE_BYTES_LEN];
        let root = pack_bytes(&bytes).unwrap().unwrap();
        assert_eq!(root.repr_depth(), MAX_DEPTH);
        assert_eq!(unpack_bytes(&root).unwrap(), bytes);

        for len in [MAX_SNAKE_BYTES_LEN + 1, 1_000_000] {
            let err = pack_bytes(&vec![0; len]).unwrap_err();
            assert_eq!(err.kind, CodecErrorKind::LengthOverflow);
            assert!(err.context.contains(&len.to_string()));
        }

        let mut builder = CellBuilder::new();
        let err = store_bytes_ref(&vec![0; MAX_SNAKE_BYTES_LEN + 1], &mut builder).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::LengthOverflow);
    }

    #[test]
    fn snake_bytes_field() {
        for bytes in [vec![], vec![1, 2, 3], vec![0xaa; 300]] {
            let value = SnakeBytes(bytes);
            let cell = CellBuilder::build_from(&value).unwrap();
            assert_eq!(cell.reference_count(), 1);
            assert_eq!(cell.parse::<SnakeBytes>().unwrap(), value);
        }
    }

    #[test]
    fn two_dimensional_bytes() {
        let items = (0..50usize)
            .map(|i| vec![i as u8; (i * 37) % 300])
            .collect::<Vec<_>>();

        let root = pack_2d_bytes(&items).unwrap();
        let decoded = unpack_2d_bytes(&root).unwrap();
        assert_eq!(decoded, items);
        assert_eq!(pack_2d_bytes(&decoded).unwrap(), root);

        let empty: [Vec<u8>; 0] = [];
        let root = pack_2d_bytes(&empty).unwrap();
        assert!(unpack_2d_bytes(&root).unwrap().is_empty());

        let only_empty = vec![Vec::<u8>::new(); 100];
        let root = pack_2d_bytes(&only_empty).unwrap();
        assert_eq!(unpack_2d_bytes(&root).unwrap(), only_empty);

        let err = pack_2d_bytes(&[vec![0u8; MAX_INNER_LEN + 1]]).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::LengthOverflow);
    }

    #[test]
    fn wrappers() {
        let data = SnakeData(vec![1u16, 2, 3]);
        let cell = CellBuilder::build_from(&data).unwrap();
        assert_eq!(cell.parse::<SnakeData<u16>>().unwrap(), data);

        let refs = SnakeRef(vec![HashBytes([1; 32]), HashBytes([2; 32])]);
        let cell = CellBuilder::build_from(&refs).unwrap();
        assert_eq!(cell.parse::<SnakeRef<HashBytes>>().unwrap(), refs);
    }
}
