use num_bigint::BigUint;

use super::{Cell, HashBytes, Load};
use crate::error::Error;

/// A read-only view for a subcell of a cell.
#[derive(Clone, Copy)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bits_window_start: u16,
    bits_window_end: u16,
    refs_window_start: u8,
    refs_window_end: u8,
}

impl std::fmt::Debug for CellSlice<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellSlice")
            .field("cell", self.cell.repr_hash())
            .field("bits", &(self.bits_window_start..self.bits_window_end))
            .field("refs", &(self.refs_window_start..self.refs_window_end))
            .finish()
    }
}

impl<'a> CellSlice<'a> {
    /// Constructs a new cell slice from the specified cell.
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            bits_window_start: 0,
            bits_window_end: cell.bit_len(),
            refs_window_start: 0,
            refs_window_end: cell.reference_count(),
            cell,
        }
    }

    /// Returns a reference to the underlying cell.
    #[inline]
    pub const fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Returns whether there are no data bits and refs left.
    pub const fn is_empty(&self) -> bool {
        self.is_data_empty() && self.is_refs_empty()
    }

    /// Returns whether there are no bits of data left.
    pub const fn is_data_empty(&self) -> bool {
        self.bits_window_start >= self.bits_window_end
    }

    /// Returns whether there are no references left.
    pub const fn is_refs_empty(&self) -> bool {
        self.refs_window_start >= self.refs_window_end
    }

    /// Returns the number of remaining references in the slice.
    pub const fn remaining_refs(&self) -> u8 {
        if self.refs_window_start > self.refs_window_end {
            0
        } else {
            self.refs_window_end - self.refs_window_start
        }
    }

    /// Returns the number of remaining bits of data in the slice.
    pub const fn remaining_bits(&self) -> u16 {
        if self.bits_window_start > self.bits_window_end {
            0
        } else {
            self.bits_window_end - self.bits_window_start
        }
    }

    /// Returns the start of the data window.
    #[inline]
    pub const fn offset_bits(&self) -> u16 {
        self.bits_window_start
    }

    /// Returns the start of the references window.
    #[inline]
    pub const fn offset_refs(&self) -> u8 {
        self.refs_window_start
    }

    /// Returns true if the slice contains at least `bits` and `refs`.
    #[inline]
    pub const fn has_remaining(&self, bits: u16, refs: u8) -> bool {
        self.bits_window_start as usize + bits as usize <= self.bits_window_end as usize
            && self.refs_window_start as usize + refs as usize <= self.refs_window_end as usize
    }

    /// Tries to advance the start of data and refs windows.
    pub fn skip_first(&mut self, bits: u16, refs: u8) -> Result<(), Error> {
        if self.has_remaining(bits, refs) {
            self.bits_window_start += bits;
            self.refs_window_start += refs;
            Ok(())
        } else {
            Err(Error::CellUnderflow)
        }
    }

    /// Returns a subslice with the data prefix of the specified length.
    pub fn get_prefix(&self, bits: u16, refs: u8) -> Result<Self, Error> {
        if self.has_remaining(bits, refs) {
            Ok(Self {
                cell: self.cell,
                bits_window_start: self.bits_window_start,
                bits_window_end: self.bits_window_start + bits,
                refs_window_start: self.refs_window_start,
                refs_window_end: self.refs_window_start + refs,
            })
        } else {
            Err(Error::CellUnderflow)
        }
    }

    /// Returns a subslice with the data prefix of the specified length,
    /// advancing the original slice.
    pub fn load_prefix(&mut self, bits: u16, refs: u8) -> Result<Self, Error> {
        let prefix = ok!(self.get_prefix(bits, refs));
        self.bits_window_start += bits;
        self.refs_window_start += refs;
        Ok(prefix)
    }

    /// Returns whether all remaining data bits are equal to the specified bit.
    pub fn test_uniform(&self, value: bool) -> bool {
        let data = self.cell.data();
        (self.bits_window_start..self.bits_window_end).all(|i| {
            let bit = (data[(i / 8) as usize] >> (7 - i % 8)) & 1 != 0;
            bit == value
        })
    }

    /// Returns `true` if both slices contain the same data bits.
    pub fn data_eq(&self, other: &CellSlice<'_>) -> bool {
        if self.remaining_bits() != other.remaining_bits() {
            return false;
        }
        let mut left = [0u8; 128];
        let mut right = [0u8; 128];
        let bits = self.remaining_bits();
        match (
            self.get_raw(0, &mut left, bits),
            other.get_raw(0, &mut right, bits),
        ) {
            (Ok(left), Ok(right)) => left == right,
            _ => false,
        }
    }

    /// Tries to read the bit at the specified offset (relative to the current bits window).
    pub fn get_bit(&self, offset: u16) -> Result<bool, Error> {
        if self.bits_window_start as usize + offset as usize >= self.bits_window_end as usize {
            return Err(Error::CellUnderflow);
        }
        let index = self.bits_window_start + offset;
        match self.cell.data().get((index / 8) as usize) {
            Some(byte) => Ok((byte >> (7 - index % 8)) & 1 != 0),
            None => Err(Error::CellUnderflow),
        }
    }

    /// Tries to read the next bit, incrementing the bits window start.
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        let bit = ok!(self.get_bit(0));
        self.bits_window_start += 1;
        Ok(bit)
    }

    /// Reads `bits` into the target buffer starting from the offset.
    ///
    /// Returns the filled prefix of the target.
    pub fn get_raw<'b>(
        &self,
        offset: u16,
        target: &'b mut [u8],
        bits: u16,
    ) -> Result<&'b mut [u8], Error> {
        if bits == 0 {
            return Ok(&mut target[..0]);
        }
        if self.bits_window_start as usize + offset as usize + bits as usize
            > self.bits_window_end as usize
        {
            return Err(Error::CellUnderflow);
        }

        let byte_len = bits.div_ceil(8) as usize;
        if target.len() < byte_len {
            return Err(Error::CellOverflow);
        }

        let index = self.bits_window_start + offset;
        let q = (index / 8) as usize;
        let r = index % 8;
        let data = self.cell.data();

        if r == 0 {
            target[..byte_len].copy_from_slice(&data[q..q + byte_len]);
        } else {
            // xxxyyyyy|yyyzzzzz -> yyyyyyyy
            for (i, byte) in target[..byte_len].iter_mut().enumerate() {
                let hi = data[q + i] << r;
                let lo = match data.get(q + i + 1) {
                    Some(next) => next >> (8 - r),
                    None => 0,
                };
                *byte = hi | lo;
            }
        }

        let rem = bits % 8;
        if rem != 0 {
            target[byte_len - 1] &= 0xff << (8 - rem);
        }
        Ok(&mut target[..byte_len])
    }

    /// Reads `bits` into the target buffer, advancing the data window.
    pub fn load_raw<'b>(&mut self, target: &'b mut [u8], bits: u16) -> Result<&'b mut [u8], Error> {
        let result = ok!(self.get_raw(0, target, bits));
        self.bits_window_start += bits;
        Ok(result)
    }

    /// Reads the specified number of bits (up to 64) as an unsigned integer.
    pub fn get_uint(&self, offset: u16, bits: u16) -> Result<u64, Error> {
        if bits > 64 {
            return Err(Error::IntOverflow);
        }
        if bits == 0 {
            return Ok(0);
        }
        let mut buffer = [0u8; 8];
        ok!(self.get_raw(offset, &mut buffer, bits));
        Ok(u64::from_be_bytes(buffer) >> (64 - bits))
    }

    /// Reads the specified number of bits (up to 64) as an unsigned integer,
    /// advancing the data window.
    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        let value = ok!(self.get_uint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads the specified number of bits (up to 8) as `u8`.
    pub fn get_small_uint(&self, offset: u16, bits: u16) -> Result<u8, Error> {
        if bits > 8 {
            return Err(Error::IntOverflow);
        }
        Ok(ok!(self.get_uint(offset, bits)) as u8)
    }

    /// Reads the specified number of bits (up to 8) as `u8`,
    /// advancing the data window.
    pub fn load_small_uint(&mut self, bits: u16) -> Result<u8, Error> {
        let value = ok!(self.get_small_uint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads `u8` starting from the `offset`.
    #[inline]
    pub fn get_u8(&self, offset: u16) -> Result<u8, Error> {
        Ok(ok!(self.get_uint(offset, 8)) as u8)
    }

    /// Tries to read the next `u8`, incrementing the bits window start.
    #[inline]
    pub fn load_u8(&mut self) -> Result<u8, Error> {
        Ok(ok!(self.load_uint(8)) as u8)
    }

    /// Reads `u16` starting from the `offset`.
    #[inline]
    pub fn get_u16(&self, offset: u16) -> Result<u16, Error> {
        Ok(ok!(self.get_uint(offset, 16)) as u16)
    }

    /// Tries to read the next `u16`, incrementing the bits window start.
    #[inline]
    pub fn load_u16(&mut self) -> Result<u16, Error> {
        Ok(ok!(self.load_uint(16)) as u16)
    }

    /// Reads `u32` starting from the `offset`.
    #[inline]
    pub fn get_u32(&self, offset: u16) -> Result<u32, Error> {
        Ok(ok!(self.get_uint(offset, 32)) as u32)
    }

    /// Tries to read the next `u32`, incrementing the bits window start.
    #[inline]
    pub fn load_u32(&mut self) -> Result<u32, Error> {
        Ok(ok!(self.load_uint(32)) as u32)
    }

    /// Reads `u64` starting from the `offset`.
    #[inline]
    pub fn get_u64(&self, offset: u16) -> Result<u64, Error> {
        self.get_uint(offset, 64)
    }

    /// Tries to read the next `u64`, incrementing the bits window start.
    #[inline]
    pub fn load_u64(&mut self) -> Result<u64, Error> {
        self.load_uint(64)
    }

    /// Tries to read the next `u128`, incrementing the bits window start.
    pub fn load_u128(&mut self) -> Result<u128, Error> {
        let mut buffer = [0u8; 16];
        ok!(self.load_raw(&mut buffer, 128));
        Ok(u128::from_be_bytes(buffer))
    }

    /// Reads 32 bytes starting from the `offset`.
    pub fn get_u256(&self, offset: u16) -> Result<HashBytes, Error> {
        let mut result = HashBytes::ZERO;
        ok!(self.get_raw(offset, &mut result.0, 256));
        Ok(result)
    }

    /// Tries to read the next 32 bytes, incrementing the bits window start.
    pub fn load_u256(&mut self) -> Result<HashBytes, Error> {
        let value = ok!(self.get_u256(0));
        self.bits_window_start += 256;
        Ok(value)
    }

    /// Reads a big unsigned integer of exactly `bits` width.
    pub fn get_biguint(&self, offset: u16, bits: u16) -> Result<BigUint, Error> {
        if bits == 0 {
            return Ok(BigUint::default());
        }
        let mut buffer = [0u8; 128];
        let data = ok!(self.get_raw(offset, &mut buffer, bits));

        let value = BigUint::from_bytes_be(data);
        let rem = bits % 8;
        Ok(if rem != 0 { value >> (8 - rem) } else { value })
    }

    /// Reads a big unsigned integer of exactly `bits` width,
    /// advancing the data window.
    pub fn load_biguint(&mut self, bits: u16) -> Result<BigUint, Error> {
        let value = ok!(self.get_biguint(0, bits));
        self.bits_window_start += bits;
        Ok(value)
    }

    /// Reads the next 256-bit unsigned integer.
    #[inline]
    pub fn load_u256_int(&mut self) -> Result<BigUint, Error> {
        self.load_biguint(256)
    }

    /// Reads all remaining whole bytes of the data window.
    ///
    /// Fails if the remaining bits are not byte-aligned.
    pub fn load_remaining_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let bits = self.remaining_bits();
        if bits % 8 != 0 {
            return Err(Error::InvalidData);
        }
        let mut buffer = vec![0u8; (bits / 8) as usize];
        ok!(self.load_raw(&mut buffer, bits));
        Ok(buffer)
    }

    /// Returns a reference to the Nth child cell (relative to this slice's refs window).
    pub fn get_reference(&self, index: u8) -> Result<&'a Cell, Error> {
        if self.refs_window_start as usize + index as usize >= self.refs_window_end as usize {
            return Err(Error::CellUnderflow);
        }
        match self.cell.reference(self.refs_window_start + index) {
            Some(cell) => Ok(cell),
            None => Err(Error::CellUnderflow),
        }
    }

    /// Returns the Nth child cell (relative to this slice's refs window).
    #[inline]
    pub fn get_reference_cloned(&self, index: u8) -> Result<Cell, Error> {
        self.get_reference(index).cloned()
    }

    /// Returns a slice of the Nth child cell.
    #[inline]
    pub fn get_reference_as_slice(&self, index: u8) -> Result<CellSlice<'a>, Error> {
        Ok(ok!(self.get_reference(index)).as_slice())
    }

    /// Tries to get the next child cell, incrementing the refs window start.
    pub fn load_reference(&mut self) -> Result<&'a Cell, Error> {
        let cell = ok!(self.get_reference(0));
        self.refs_window_start += 1;
        Ok(cell)
    }

    /// Tries to get the next child cell, incrementing the refs window start.
    #[inline]
    pub fn load_reference_cloned(&mut self) -> Result<Cell, Error> {
        self.load_reference().cloned()
    }

    /// Tries to get the next child cell as a slice, incrementing the refs window start.
    #[inline]
    pub fn load_reference_as_slice(&mut self) -> Result<CellSlice<'a>, Error> {
        Ok(ok!(self.load_reference()).as_slice())
    }

    /// Returns an iterator over the remaining references.
    pub fn references(&self) -> impl Iterator<Item = &'a Cell> + 'a {
        let cell = self.cell;
        (self.refs_window_start..self.refs_window_end).filter_map(move |i| cell.reference(i))
    }

    /// Loads the specified type from the slice.
    #[inline]
    pub fn load<T: Load<'a>>(&mut self) -> Result<T, Error> {
        T::load_from(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::CellBuilder;

    use super::*;

    fn build_cell<F: FnOnce(&mut CellBuilder) -> Result<(), Error>>(f: F) -> Cell {
        let mut builder = CellBuilder::new();
        f(&mut builder).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn get_raw() -> anyhow::Result<()> {
        let cell = build_cell(|b| b.store_raw(&[0xff; 128], 1023));

        let mut data = [0; 1];
        assert!(cell.as_slice().get_raw(0, &mut data, 100).is_err());

        let mut data = [0; 64];
        cell.as_slice().get_raw(0, &mut data, 500)?;

        let cell = build_cell(|b| b.store_u64(0xfafafafafafafafa));

        let mut slice = cell.as_slice();
        slice.skip_first(4, 0)?;
        let mut data = [0; 2];
        assert_eq!(slice.get_raw(0, &mut data, 12)?, &[0xaf, 0xa0]);
        assert_eq!(slice.get_raw(4, &mut data, 12)?, &[0xfa, 0xf0]);

        Ok(())
    }

    #[test]
    fn load_uints() -> anyhow::Result<()> {
        let cell = build_cell(|b| {
            b.store_small_uint(0b101, 3)?;
            b.store_u32(0xdeadbeef)?;
            b.store_uint(0x1ff, 9)
        });

        let mut slice = cell.as_slice();
        assert_eq!(slice.load_small_uint(3)?, 0b101);
        assert_eq!(slice.get_u8(0)?, 0xde);
        assert_eq!(slice.load_u32()?, 0xdeadbeef);
        assert_eq!(slice.load_uint(9)?, 0x1ff);
        assert!(slice.is_data_empty());
        assert_eq!(slice.load_bit(), Err(Error::CellUnderflow));
        Ok(())
    }

    #[test]
    fn references_window() -> anyhow::Result<()> {
        let child = build_cell(|b| b.store_u8(1));
        let cell = build_cell(|b| {
            b.store_reference(Cell::empty_cell())?;
            b.store_reference(child.clone())
        });

        let mut slice = cell.as_slice();
        assert_eq!(slice.remaining_refs(), 2);
        assert!(slice.load_reference()?.is_empty());
        assert_eq!(slice.get_reference(0)?, &child);
        assert!(slice.get_reference(1).is_err());
        assert_eq!(slice.references().count(), 1);
        Ok(())
    }

    #[test]
    fn prefix_and_uniform() -> anyhow::Result<()> {
        let cell = build_cell(|b| {
            b.store_zeros(5)?;
            b.store_small_uint(0b111, 3)
        });

        let slice = cell.as_slice();
        assert!(slice.get_prefix(5, 0)?.test_uniform(false));
        assert!(!slice.test_uniform(false));

        let mut rest = slice;
        rest.skip_first(5, 0)?;
        assert!(rest.test_uniform(true));
        assert!(slice.get_prefix(9, 0).is_err());
        Ok(())
    }
}
