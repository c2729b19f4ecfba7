//! Dictionary implementation.
//!
//! [`Dict`] is a `HashmapE n X` with fixed-length keys. Edges are labeled with
//! the shortest of the `hml_short`, `hml_long` and `hml_same` encodings.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::cell::*;
use crate::error::Error;

/// Type which can be used as a dictionary key.
pub trait DictKey: Store + Sized {
    /// Length in bits for a dictionary key.
    const BITS: u16;

    /// Creates a key from a raw builder data.
    fn from_raw_data(raw_data: &[u8]) -> Option<Self>;
}

macro_rules! impl_dict_key {
    ($($ty:ty => $bits:literal => |$raw_data:ident| $expr:expr),*,) => {
        $(impl DictKey for $ty {
            const BITS: u16 = $bits;

            #[inline]
            fn from_raw_data($raw_data: &[u8]) -> Option<Self> {
                $expr
            }
        })*
    };
}

impl_dict_key! {
    u8 => 8 => |d| d.first().copied(),
    u16 => 16 => |d| Some(u16::from_be_bytes(d.get(..2)?.try_into().ok()?)),
    u32 => 32 => |d| Some(u32::from_be_bytes(d.get(..4)?.try_into().ok()?)),
    i32 => 32 => |d| Some(i32::from_be_bytes(d.get(..4)?.try_into().ok()?)),
    u64 => 64 => |d| Some(u64::from_be_bytes(d.get(..8)?.try_into().ok()?)),
    i64 => 64 => |d| Some(i64::from_be_bytes(d.get(..8)?.try_into().ok()?)),
    HashBytes => 256 => |d| HashBytes::try_from_slice(d.get(..32)?),
}

/// Typed dictionary with fixed length keys.
pub struct Dict<K, V> {
    root: Option<Cell>,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
}

impl<K, V> Default for Dict<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Dict<K, V> {
    fn clone(&self) -> Self {
        Self::from_raw(self.root.clone())
    }
}

impl<K, V> Eq for Dict<K, V> {}

impl<K, V> PartialEq for Dict<K, V> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (Some(this), Some(other)) => this == other,
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K, V> std::fmt::Debug for Dict<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dict").field("root", &self.root).finish()
    }
}

impl<K, V> Store for Dict<K, V> {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        self.root.store_into(builder)
    }
}

impl<'a, K, V> Load<'a> for Dict<K, V> {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self::from_raw(ok!(Option::<Cell>::load_from(slice))))
    }
}

impl<K, V> Dict<K, V> {
    /// Constructs a new empty dictionary.
    pub const fn new() -> Self {
        Self::from_raw(None)
    }

    /// Creates a dictionary from a raw cell.
    pub const fn from_raw(root: Option<Cell>) -> Self {
        Self {
            root,
            _key: PhantomData,
            _value: PhantomData,
        }
    }

    /// Returns `true` if the dictionary contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the underlying root cell of the dictionary.
    #[inline]
    pub const fn root(&self) -> &Option<Cell> {
        &self.root
    }

    /// Returns the underlying root cell of the dictionary.
    #[inline]
    pub fn into_root(self) -> Option<Cell> {
        self.root
    }
}

impl<K: DictKey, V> Dict<K, V> {
    /// Returns the value corresponding to the key.
    pub fn get<'a>(&'a self, key: K) -> Result<Option<V>, Error>
    where
        V: Load<'a>,
    {
        match ok!(self.find(&key)) {
            Some(mut value) => V::load_from(&mut value).map(Some),
            None => Ok(None),
        }
    }

    /// Returns `true` if the dictionary contains a value for the specified key.
    pub fn contains_key(&self, key: K) -> Result<bool, Error> {
        Ok(ok!(self.find(&key)).is_some())
    }

    fn find(&self, key: &K) -> Result<Option<CellSlice<'_>>, Error> {
        let key = ok!(key_bits(key));

        let Some(mut cell) = self.root.as_ref() else {
            return Ok(None);
        };

        let mut offset = 0u16;
        let mut remaining = K::BITS;
        loop {
            let mut slice = cell.as_slice();
            let label = ok!(read_label(&mut slice, remaining));
            let label_len = label.bit_len();

            let label_bits = label.raw_data();
            if (0..label_len).any(|i| bit_at(label_bits, i) != bit_at(&key, offset + i)) {
                return Ok(None);
            }

            offset += label_len;
            remaining -= label_len;
            if remaining == 0 {
                return Ok(Some(slice));
            }

            let branch = bit_at(&key, offset);
            offset += 1;
            remaining -= 1;
            cell = ok!(slice.get_reference(branch as u8));
        }
    }

    /// Sets the value associated with the key in the dictionary.
    pub fn set<T: Store>(&mut self, key: K, value: T) -> Result<(), Error> {
        let mut entries = ok!(self.raw_entries());

        let mut builder = CellBuilder::new();
        ok!(value.store_into(&mut builder));
        entries.insert(ok!(key_bits(&key)), builder);

        self.root = ok!(build_dict(entries, K::BITS));
        Ok(())
    }

    /// Removes the value associated with the key in the dictionary.
    ///
    /// Returns `true` if the key was present.
    pub fn remove(&mut self, key: K) -> Result<bool, Error> {
        let mut entries = ok!(self.raw_entries());

        let removed = entries.remove(&ok!(key_bits(&key))).is_some();
        if removed {
            self.root = ok!(build_dict(entries, K::BITS));
        }
        Ok(removed)
    }

    /// Gets an iterator over the entries of the dictionary, sorted by key bits.
    pub fn iter<'a>(&'a self) -> Iter<'a, K, V>
    where
        V: Load<'a>,
    {
        Iter {
            inner: RawIter::new(self.root.as_ref(), K::BITS),
            _key: PhantomData,
            _value: PhantomData,
        }
    }

    /// Gets an iterator over the keys of the dictionary.
    pub fn keys(&self) -> impl Iterator<Item = Result<K, Error>> + '_ {
        RawIter::new(self.root.as_ref(), K::BITS).map(|item| match item {
            Ok((key, _)) => K::from_raw_data(key.raw_data()).ok_or(Error::InvalidData),
            Err(e) => Err(e),
        })
    }

    /// Counts the number of entries in the dictionary.
    pub fn len(&self) -> Result<usize, Error> {
        let mut len = 0;
        for item in RawIter::new(self.root.as_ref(), K::BITS) {
            ok!(item);
            len += 1;
        }
        Ok(len)
    }

    /// Builds a dictionary from the sorted map.
    pub fn try_from_btree<T: Store>(map: &BTreeMap<K, T>) -> Result<Self, Error> {
        let mut entries = BTreeMap::new();
        for (key, value) in map {
            let mut builder = CellBuilder::new();
            ok!(value.store_into(&mut builder));
            entries.insert(ok!(key_bits(key)), builder);
        }
        Ok(Self::from_raw(ok!(build_dict(entries, K::BITS))))
    }

    fn raw_entries(&self) -> Result<BTreeMap<Vec<u8>, CellBuilder>, Error> {
        let mut entries = BTreeMap::new();
        for item in RawIter::new(self.root.as_ref(), K::BITS) {
            let (key, value) = ok!(item);
            let mut builder = CellBuilder::new();
            ok!(builder.store_slice(&value));
            entries.insert(key.raw_data().to_vec(), builder);
        }
        Ok(entries)
    }
}

fn key_bits<K: DictKey>(key: &K) -> Result<Vec<u8>, Error> {
    let mut builder = CellBuilder::new();
    ok!(key.store_into(&mut builder));
    if builder.bit_len() != K::BITS {
        return Err(Error::InvalidData);
    }
    Ok(builder.raw_data().to_vec())
}

/// An iterator over the entries of a [`Dict`].
pub struct Iter<'a, K, V> {
    inner: RawIter<'a>,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: DictKey,
    V: Load<'a>,
{
    type Item = Result<(K, V), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, mut value) = match self.inner.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };

        let Some(key) = K::from_raw_data(key.raw_data()) else {
            return Some(Err(self.inner.finish(Error::InvalidData)));
        };
        Some(match V::load_from(&mut value) {
            Ok(value) => Ok((key, value)),
            Err(e) => Err(self.inner.finish(e)),
        })
    }
}

/// Depth-first traversal over the dictionary leaves.
struct RawIter<'a> {
    stack: Vec<(&'a Cell, CellBuilder, u16)>,
}

impl<'a> RawIter<'a> {
    fn new(root: Option<&'a Cell>, key_bit_len: u16) -> Self {
        Self {
            stack: root
                .map(|root| (root, CellBuilder::new(), key_bit_len))
                .into_iter()
                .collect(),
        }
    }

    fn finish(&mut self, e: Error) -> Error {
        self.stack.clear();
        e
    }

    fn visit(&mut self, cell: &'a Cell, mut prefix: CellBuilder, remaining: u16) -> NodeResult<'a> {
        let mut slice = cell.as_slice();
        let label = ok!(read_label(&mut slice, remaining));
        ok!(prefix.store_builder(&label));

        let remaining = remaining - label.bit_len();
        if remaining == 0 {
            return Ok(Some((prefix, slice)));
        }

        let left = ok!(slice.get_reference(0));
        let right = ok!(slice.get_reference(1));

        let mut right_prefix = prefix.clone();
        ok!(right_prefix.store_bit_one());
        ok!(prefix.store_bit_zero());

        // NOTE: left branch is visited first
        self.stack.push((right, right_prefix, remaining - 1));
        self.stack.push((left, prefix, remaining - 1));
        Ok(None)
    }
}

type NodeResult<'a> = Result<Option<(CellBuilder, CellSlice<'a>)>, Error>;

impl<'a> Iterator for RawIter<'a> {
    type Item = Result<(CellBuilder, CellSlice<'a>), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((cell, prefix, remaining)) = self.stack.pop() {
            match self.visit(cell, prefix, remaining) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(e) => return Some(Err(self.finish(e))),
            }
        }
        None
    }
}

fn build_dict(
    entries: BTreeMap<Vec<u8>, CellBuilder>,
    key_bit_len: u16,
) -> Result<Option<Cell>, Error> {
    if entries.is_empty() {
        return Ok(None);
    }
    let entries = entries.into_iter().collect::<Vec<_>>();
    build_node(&entries, 0, key_bit_len).map(Some)
}

fn build_node(
    entries: &[(Vec<u8>, CellBuilder)],
    offset: u16,
    key_bit_len: u16,
) -> Result<Cell, Error> {
    let remaining = key_bit_len - offset;
    let mut builder = CellBuilder::new();

    match entries {
        [] => return Err(Error::InvalidData),
        [(key, value)] => {
            ok!(write_label(key, offset, remaining, remaining, &mut builder));
            ok!(builder.store_builder(value));
        }
        [(first, _), .., (last, _)] => {
            let mut lcp = 0;
            while lcp < remaining && bit_at(first, offset + lcp) == bit_at(last, offset + lcp) {
                lcp += 1;
            }
            if lcp == remaining {
                // Duplicate keys
                return Err(Error::InvalidData);
            }
            ok!(write_label(first, offset, lcp, remaining, &mut builder));

            let fork = offset + lcp;
            let split = entries.partition_point(|(key, _)| !bit_at(key, fork));
            let left = ok!(build_node(&entries[..split], fork + 1, key_bit_len));
            let right = ok!(build_node(&entries[split..], fork + 1, key_bit_len));
            ok!(builder.store_reference(left));
            ok!(builder.store_reference(right));
        }
    }

    builder.build()
}

#[inline]
fn bit_at(data: &[u8], index: u16) -> bool {
    match data.get((index / 8) as usize) {
        Some(byte) => (byte >> (7 - index % 8)) & 1 != 0,
        None => false,
    }
}

#[inline]
fn bits_for_len(key_bit_len: u16) -> u16 {
    (16 - key_bit_len.leading_zeros()) as u16
}

/// Writes `len` key bits starting from `offset` as a label of the edge
/// with `key_bit_len` remaining bits.
fn write_label(
    key: &[u8],
    offset: u16,
    len: u16,
    key_bit_len: u16,
    label: &mut CellBuilder,
) -> Result<(), Error> {
    let bits_for_len = bits_for_len(key_bit_len);

    let hml_short_len = 2 + 2 * len;
    let hml_long_len = 2 + bits_for_len + len;
    let hml_same_len = 3 + bits_for_len;

    if len > 0 && hml_same_len < hml_long_len && hml_same_len < hml_short_len {
        let first = bit_at(key, offset);
        if (offset..offset + len).all(|i| bit_at(key, i) == first) {
            return write_hml_same(first, len, bits_for_len, label);
        }
    }

    if hml_short_len <= MAX_BIT_LEN && hml_short_len <= hml_long_len {
        ok!(write_hml_short_tag(len, label));
    } else if hml_long_len <= MAX_BIT_LEN {
        ok!(write_hml_long_tag(len, bits_for_len, label));
    } else {
        return Err(Error::InvalidData);
    }

    for i in offset..offset + len {
        ok!(label.store_bit(bit_at(key, i)));
    }
    Ok(())
}

fn read_label(label: &mut CellSlice<'_>, key_bit_len: u16) -> Result<CellBuilder, Error> {
    let bits_for_len = bits_for_len(key_bit_len);

    let mut result = CellBuilder::new();
    if label.is_data_empty() && bits_for_len == 0 {
        return Ok(result);
    }

    if !ok!(label.load_bit()) {
        let mut len = 0;
        while ok!(label.load_bit()) {
            len += 1;
        }
        let bits = ok!(label.load_prefix(len, 0));
        ok!(result.store_slice_data(&bits));
    } else if !ok!(label.load_bit()) {
        let len = ok!(label.load_uint(bits_for_len)) as u16;
        let bits = ok!(label.load_prefix(len, 0));
        ok!(result.store_slice_data(&bits));
    } else {
        let bit = ok!(label.load_bit());
        let len = ok!(label.load_uint(bits_for_len)) as u16;
        if bit {
            for _ in 0..len {
                ok!(result.store_bit_one());
            }
        } else {
            ok!(result.store_zeros(len));
        }
    }

    if result.bit_len() > key_bit_len {
        return Err(Error::InvalidData);
    }
    Ok(result)
}

fn write_hml_short_tag(len: u16, label: &mut CellBuilder) -> Result<(), Error> {
    ok!(label.store_bit_zero());

    for _ in 0..len / 32 {
        ok!(label.store_u32(u32::MAX));
    }

    let rem = len % 32;
    if rem != 0 {
        ok!(label.store_uint(u64::MAX, rem));
    }
    label.store_bit_zero()
}

fn write_hml_long_tag(len: u16, bits_for_len: u16, label: &mut CellBuilder) -> Result<(), Error> {
    ok!(label.store_bit_one());
    ok!(label.store_bit_zero());
    label.store_uint(len as u64, bits_for_len)
}

fn write_hml_same(
    bit: bool,
    len: u16,
    bits_for_len: u16,
    label: &mut CellBuilder,
) -> Result<(), Error> {
    ok!(label.store_small_uint(0b110 | bit as u8, 3));
    label.store_uint(len as u64, bits_for_len)
}
