use num_bigint::BigUint;
use smallvec::SmallVec;

use super::{Cell, CellSlice, HashBytes, Store, MAX_BIT_LEN, MAX_DEPTH, MAX_REF_COUNT};
use crate::error::Error;

/// Builder for constructing cells with densely packed data.
#[derive(Clone)]
pub struct CellBuilder {
    data: [u8; 128],
    bit_len: u16,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
}

impl Default for CellBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let byte_len = self.bit_len.div_ceil(8) as usize;
        f.debug_struct("CellBuilder")
            .field("data", &hex::encode(&self.data[..byte_len]))
            .field("bit_len", &self.bit_len)
            .field("references", &self.references.len())
            .finish()
    }
}

impl CellBuilder {
    /// Builds a new cell from the specified data.
    pub fn build_from<T: Store>(data: T) -> Result<Cell, Error> {
        let mut builder = Self::new();
        ok!(data.store_into(&mut builder));
        builder.build()
    }

    /// Creates an empty cell builder.
    pub fn new() -> Self {
        Self {
            data: [0; 128],
            bit_len: 0,
            references: SmallVec::new(),
        }
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub const fn bit_len(&self) -> u16 {
        self.bit_len
    }

    /// Returns remaining data capacity in bits.
    #[inline]
    pub const fn spare_bits_capacity(&self) -> u16 {
        MAX_BIT_LEN - self.bit_len
    }

    /// Returns remaining references capacity.
    #[inline]
    pub fn spare_refs_capacity(&self) -> u8 {
        (MAX_REF_COUNT - self.references.len()) as u8
    }

    /// Returns true if there is enough remaining capacity to fit `bits` and `refs`.
    #[inline]
    pub fn has_capacity(&self, bits: u16, refs: u8) -> bool {
        self.bit_len as usize + bits as usize <= MAX_BIT_LEN as usize
            && self.references.len() + refs as usize <= MAX_REF_COUNT
    }

    /// Returns a slice of the child cells stored in the builder.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        self.references.as_slice()
    }

    /// Returns the stored cell data (without the completion tag).
    #[inline]
    pub fn raw_data(&self) -> &[u8] {
        &self.data[..self.bit_len.div_ceil(8) as usize]
    }

    /// Tries to store the specified number of zero bits in the cell.
    pub fn store_zeros(&mut self, bits: u16) -> Result<(), Error> {
        if self.bit_len as usize + bits as usize <= MAX_BIT_LEN as usize {
            // NOTE: bits after `bit_len` are always zero
            self.bit_len += bits;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store one zero bit in the cell.
    #[inline]
    pub fn store_bit_zero(&mut self) -> Result<(), Error> {
        self.store_zeros(1)
    }

    /// Tries to store one non-zero bit in the cell.
    pub fn store_bit_one(&mut self) -> Result<(), Error> {
        if self.bit_len < MAX_BIT_LEN {
            let q = (self.bit_len / 8) as usize;
            let r = self.bit_len % 8;
            self.data[q] |= 1 << (7 - r);
            self.bit_len += 1;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store one bit in the cell.
    #[inline]
    pub fn store_bit(&mut self, value: bool) -> Result<(), Error> {
        if value {
            self.store_bit_one()
        } else {
            self.store_bit_zero()
        }
    }

    /// Tries to store `u8` in the cell,
    /// but only the specified number of bits (up to 8).
    pub fn store_small_uint(&mut self, value: u8, bits: u16) -> Result<(), Error> {
        if bits > 8 {
            return Err(Error::IntOverflow);
        }
        self.store_uint(value as u64, bits)
    }

    /// Tries to store `u64` in the cell,
    /// but only the specified number of bits.
    ///
    /// Widths above 64 bits are padded with leading zeros.
    pub fn store_uint(&mut self, value: u64, mut bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return Ok(());
        }
        if self.bit_len as usize + bits as usize > MAX_BIT_LEN as usize {
            return Err(Error::CellOverflow);
        }

        if bits > 64 {
            ok!(self.store_zeros(bits - 64));
            bits = 64;
        }

        // Align the value to the highest bit
        let value = value << (64 - bits);
        self.store_raw(&value.to_be_bytes(), bits)
    }

    /// Tries to store `u8` in the cell.
    #[inline]
    pub fn store_u8(&mut self, value: u8) -> Result<(), Error> {
        self.store_raw(&[value], 8)
    }

    /// Tries to store `u16` in the cell.
    #[inline]
    pub fn store_u16(&mut self, value: u16) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 16)
    }

    /// Tries to store `u32` in the cell.
    #[inline]
    pub fn store_u32(&mut self, value: u32) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 32)
    }

    /// Tries to store `u64` in the cell.
    #[inline]
    pub fn store_u64(&mut self, value: u64) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 64)
    }

    /// Tries to store `u128` in the cell.
    #[inline]
    pub fn store_u128(&mut self, value: u128) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 128)
    }

    /// Tries to store 32 bytes in the cell.
    #[inline]
    pub fn store_u256(&mut self, value: &HashBytes) -> Result<(), Error> {
        self.store_raw(value.as_slice(), 256)
    }

    /// Tries to store a big unsigned integer in the cell,
    /// using exactly the specified number of bits.
    pub fn store_biguint(&mut self, value: &BigUint, bits: u16) -> Result<(), Error> {
        let value_bits = value.bits();
        if value_bits > bits as u64 {
            return Err(Error::IntOverflow);
        }
        if self.bit_len as usize + bits as usize > MAX_BIT_LEN as usize {
            return Err(Error::CellOverflow);
        }
        if value_bits == 0 {
            return self.store_zeros(bits);
        }

        let bytes = value.to_bytes_be();
        let value_bits = bytes.len() as u16 * 8;
        if value_bits > bits {
            // Top byte has some leading zeros which are cut off
            let shift = value_bits - bits;
            let mut shifted = Vec::with_capacity(bytes.len());
            for i in 0..bytes.len() {
                let hi = bytes[i] << shift;
                let lo = match bytes.get(i + 1) {
                    Some(next) => next >> (8 - shift),
                    None => 0,
                };
                shifted.push(hi | lo);
            }
            self.store_raw(&shifted, bits)
        } else {
            ok!(self.store_zeros(bits - value_bits));
            self.store_raw(&bytes, value_bits)
        }
    }

    /// Tries to store a 256-bit unsigned integer.
    #[inline]
    pub fn store_u256_int(&mut self, value: &BigUint) -> Result<(), Error> {
        self.store_biguint(value, 256)
    }

    /// Tries to store the first `bits` of the provided bytes.
    pub fn store_raw(&mut self, value: &[u8], bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return Ok(());
        }
        if self.bit_len as usize + bits as usize > MAX_BIT_LEN as usize {
            return Err(Error::CellOverflow);
        }

        let byte_len = bits.div_ceil(8) as usize;
        if value.len() < byte_len {
            return Err(Error::CellUnderflow);
        }
        let value = &value[..byte_len];

        let q = (self.bit_len / 8) as usize;
        let r = self.bit_len % 8;
        if r == 0 {
            self.data[q..q + byte_len].copy_from_slice(value);
        } else {
            // yyyxxxxx|xxx00000
            for (i, byte) in value.iter().enumerate() {
                self.data[q + i] |= byte >> r;
                if let Some(next) = self.data.get_mut(q + i + 1) {
                    *next = byte << (8 - r);
                }
            }
        }

        self.bit_len += bits;

        // Keep all bits after `bit_len` zeroed
        let end = self.bit_len.div_ceil(8) as usize;
        let rem = self.bit_len % 8;
        if rem != 0 {
            self.data[end - 1] &= 0xff << (8 - rem);
        }
        let dirty_end = std::cmp::min(q + byte_len + 1, self.data.len());
        if end < dirty_end {
            self.data[end..dirty_end].fill(0);
        }

        Ok(())
    }

    /// Tries to store a child in the cell,
    /// returns `false` if there is not enough remaining references.
    pub fn store_reference(&mut self, cell: Cell) -> Result<(), Error> {
        if self.references.len() < MAX_REF_COUNT {
            self.references.push(cell);
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store the remaining slice data in the cell.
    pub fn store_slice_data(&mut self, value: &CellSlice<'_>) -> Result<(), Error> {
        let bits = value.remaining_bits();
        if self.bit_len as usize + bits as usize > MAX_BIT_LEN as usize {
            return Err(Error::CellOverflow);
        }

        let mut buffer = [0u8; 128];
        let data = ok!(value.get_raw(0, &mut buffer, bits));
        self.store_raw(data, bits)
    }

    /// Tries to store the remaining slice data and references in the cell.
    pub fn store_slice(&mut self, value: &CellSlice<'_>) -> Result<(), Error> {
        if !self.has_capacity(value.remaining_bits(), value.remaining_refs()) {
            return Err(Error::CellOverflow);
        }

        ok!(self.store_slice_data(value));
        for i in 0..value.remaining_refs() {
            let cell = ok!(value.get_reference_cloned(i));
            ok!(self.store_reference(cell));
        }
        Ok(())
    }

    /// Tries to append a builder with its data and references.
    pub fn store_builder(&mut self, value: &CellBuilder) -> Result<(), Error> {
        if !self.has_capacity(value.bit_len, value.references.len() as u8) {
            return Err(Error::CellOverflow);
        }

        ok!(self.store_raw(&value.data, value.bit_len));
        for cell in &value.references {
            ok!(self.store_reference(cell.clone()));
        }
        Ok(())
    }

    /// Tries to build a new cell.
    pub fn build(self) -> Result<Cell, Error> {
        debug_assert!(self.bit_len <= MAX_BIT_LEN);
        debug_assert!(self.references.len() <= MAX_REF_COUNT);

        for child in &self.references {
            if child.repr_depth() >= MAX_DEPTH {
                return Err(Error::DepthOverflow);
            }
        }

        let mut data = self.data;
        let rem = self.bit_len % 8;
        let last_byte = (self.bit_len / 8) as usize;
        if rem > 0 {
            // x0000000 - rem=1, tag_mask=01000000, data_mask=11000000
            // xx000000 - rem=2, tag_mask=00100000, data_mask=11100000
            // xxxxxxx0 - rem=7, tag_mask=00000001, data_mask=11111111
            let tag_mask: u8 = 1 << (7 - rem);
            let data_mask = !(tag_mask - 1);

            // xxxxyyyy & data_mask -> xxxxy000 | tag_mask -> xxxx1000
            data[last_byte] = (data[last_byte] & data_mask) | tag_mask;
        }

        let byte_len = self.bit_len.div_ceil(8) as usize;
        Ok(Cell::from_parts(
            self.bit_len,
            &data[..byte_len],
            self.references,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_builder() {
        let mut builder = CellBuilder::new();
        builder.store_u32(0xdeafbeaf).unwrap();
        let cell1 = builder.clone().build().unwrap();
        let cell2 = builder.clone().build().unwrap();
        assert_eq!(cell1, cell2);

        builder.store_u32(0xb00b5).unwrap();
        let cell3 = builder.build().unwrap();
        assert_ne!(cell1, cell3);
    }

    #[test]
    fn completion_tag() {
        let mut builder = CellBuilder::new();
        builder.store_small_uint(0b101, 3).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 3);
        assert_eq!(cell.data(), &[0b1011_0000]);
    }

    #[test]
    fn unaligned_stores() {
        let mut builder = CellBuilder::new();
        builder.store_bit_one().unwrap();
        builder.store_u16(0xabcd).unwrap();
        builder.store_uint(0x5, 3).unwrap();
        builder.store_u64(u64::MAX).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 84);

        let mut slice = cell.as_slice();
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.load_u16().unwrap(), 0xabcd);
        assert_eq!(slice.load_uint(3).unwrap(), 0x5);
        assert_eq!(slice.load_u64().unwrap(), u64::MAX);
        assert!(slice.is_data_empty());
    }

    #[test]
    fn store_biguint_widths() {
        let value = BigUint::from(0x1_0000_0000_0001u64);

        let mut builder = CellBuilder::new();
        builder.store_bit_one().unwrap();
        builder.store_biguint(&value, 256).unwrap();
        builder.store_biguint(&value, 49).unwrap();
        assert_eq!(
            builder.store_biguint(&value, 48).unwrap_err(),
            Error::IntOverflow
        );
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 1 + 256 + 49);

        let mut slice = cell.as_slice();
        slice.skip_first(1, 0).unwrap();
        assert_eq!(slice.load_biguint(256).unwrap(), value);
        assert_eq!(slice.load_biguint(49).unwrap(), value);
    }

    #[test]
    fn overflow() {
        let mut builder = CellBuilder::new();
        builder.store_zeros(1020).unwrap();
        assert_eq!(builder.store_u8(1), Err(Error::CellOverflow));
        builder.store_small_uint(0b111, 3).unwrap();
        assert_eq!(builder.store_bit_one(), Err(Error::CellOverflow));

        for _ in 0..4 {
            builder.store_reference(Cell::empty_cell()).unwrap();
        }
        assert_eq!(
            builder.store_reference(Cell::empty_cell()),
            Err(Error::CellOverflow)
        );
        assert!(!builder.has_capacity(0, 1));
        assert!(builder.has_capacity(0, 0));
    }

    #[test]
    fn full_cell_last_byte() {
        let mut builder = CellBuilder::new();
        builder.store_zeros(7).unwrap();
        builder.store_raw(&[0xff; 128], 1016).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 1023);
        assert_eq!(cell.data().len(), 128);
        assert_eq!(cell.data()[0], 0x01);
        assert_eq!(cell.data()[127], 0xff);
    }
}
