//! Message address models.

use std::str::FromStr;

use crate::cell::*;
use crate::error::{Error, ParseAddrError};
use crate::num::*;
use crate::util::{crc_16, decode_base64_slice, encode_base64, encode_base64_url, unlikely};

/// Internal message address.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum IntAddr {
    /// Standard internal address.
    Std(StdAddr),
    /// Variable-length internal address.
    Var(VarAddr),
}

impl Default for IntAddr {
    #[inline]
    fn default() -> Self {
        Self::Std(StdAddr::default())
    }
}

impl IntAddr {
    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        match self {
            Self::Std(_) => StdAddr::BITS,
            Self::Var(addr) => addr.bit_len(),
        }
    }

    /// Returns the standard address if this is one.
    pub fn as_std(&self) -> Option<&StdAddr> {
        match self {
            Self::Std(addr) => Some(addr),
            Self::Var(_) => None,
        }
    }
}

impl FromStr for IntAddr {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::Std(ok!(StdAddr::from_str(s))))
    }
}

impl std::fmt::Display for IntAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntAddr::Std(addr) => std::fmt::Display::fmt(addr, f),
            IntAddr::Var(addr) => f.write_fmt(format_args!(
                "{}:{}",
                addr.workchain,
                hex::encode(&addr.address)
            )),
        }
    }
}

impl From<StdAddr> for IntAddr {
    #[inline]
    fn from(value: StdAddr) -> Self {
        Self::Std(value)
    }
}

impl From<VarAddr> for IntAddr {
    #[inline]
    fn from(value: VarAddr) -> Self {
        Self::Var(value)
    }
}

impl Store for IntAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::Std(addr) => addr.store_into(builder),
            Self::Var(addr) => addr.store_into(builder),
        }
    }
}

impl<'a> Load<'a> for IntAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if !ok!(slice.get_bit(0)) {
            return Err(Error::InvalidTag);
        }

        if unlikely(ok!(slice.get_bit(1))) {
            VarAddr::load_from(slice).map(Self::Var)
        } else {
            StdAddr::load_from(slice).map(Self::Std)
        }
    }
}

/// Standard internal address.
///
/// ```text
/// addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256 = MsgAddressInt;
/// ```
///
/// Anycast addresses are not used by the contracts and are rejected on load.
///
/// The workchain is kept as `i8` as in `addr_std`. Forms which carry a wider
/// workchain (the 36-byte raw form, shard identifiers) are narrowed with
/// [`StdAddr::try_new`] and rejected when out of range.
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StdAddr {
    /// Workchain id (one-byte range).
    pub workchain: i8,
    /// Account id.
    pub address: HashBytes,
}

impl std::fmt::Debug for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdAddr")
            .field("workchain", &self.workchain)
            .field("address", &self.address)
            .finish()
    }
}

impl StdAddr {
    /// The number of data bits that address occupies.
    ///
    /// - 2 bits id (`0b10`)
    /// - 1 bit Maybe None
    /// - 8 bits workchain
    /// - 256 bits address
    pub const BITS: u16 = 2 + 1 + 8 + 256;

    /// The length of the raw binary form.
    pub const RAW_LEN: usize = 36;

    /// The length of the decoded user-friendly form.
    pub const FRIENDLY_LEN: usize = 36;

    /// Constructs a new standard address.
    #[inline]
    pub const fn new(workchain: i8, address: HashBytes) -> Self {
        Self { workchain, address }
    }

    /// Constructs a new standard address from a 32-bit workchain id.
    pub fn try_new(workchain: i32, address: HashBytes) -> Result<Self, ParseAddrError> {
        match i8::try_from(workchain) {
            Ok(workchain) => Ok(Self { workchain, address }),
            Err(_) => Err(ParseAddrError::InvalidWorkchain),
        }
    }

    /// Returns `true` if this address is for a masterchain block.
    #[inline]
    pub const fn is_masterchain(&self) -> bool {
        self.workchain == -1
    }

    /// Returns an address which encodes the oracle index in the lowest
    /// bytes of the account id. Used as a placeholder transmitter address.
    pub fn from_oracle_id(index: u8) -> Self {
        let mut address = HashBytes::ZERO;
        address.0[31] = index;
        Self {
            workchain: 0,
            address,
        }
    }

    /// Serializes the address into 36 bytes: big-endian `i32` workchain
    /// followed by the account id.
    pub fn to_raw_bytes(&self) -> [u8; Self::RAW_LEN] {
        let mut result = [0u8; Self::RAW_LEN];
        result[..4].copy_from_slice(&(self.workchain as i32).to_be_bytes());
        result[4..].copy_from_slice(self.address.as_slice());
        result
    }

    /// Parses the address from its 36 bytes raw binary form.
    ///
    /// Fails with [`ParseAddrError::InvalidWorkchain`] if the workchain does
    /// not fit into `i8`.
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, ParseAddrError> {
        if bytes.len() != Self::RAW_LEN {
            return Err(ParseAddrError::InvalidLength {
                expected: Self::RAW_LEN,
                actual: bytes.len(),
            });
        }

        let mut workchain = [0u8; 4];
        workchain.copy_from_slice(&bytes[..4]);
        Self::try_new(
            i32::from_be_bytes(workchain),
            HashBytes::from_slice(&bytes[4..]),
        )
    }

    /// Parses the address from the user-friendly base64 form.
    ///
    /// Both standard and url-safe alphabets are accepted.
    pub fn from_str_ext(s: &str) -> Result<(Self, Base64AddrFlags), ParseAddrError> {
        if s.len() != 48 {
            return Err(ParseAddrError::BadFormat);
        }

        let mut buffer = [0u8; Self::FRIENDLY_LEN];
        if decode_base64_slice(s, &mut buffer).is_err() {
            return Err(ParseAddrError::BadFormat);
        }

        let crc = u16::from_be_bytes([buffer[34], buffer[35]]);
        if crc_16(&buffer[..34]) != crc {
            return Err(ParseAddrError::InvalidChecksum);
        }

        let tag = buffer[0];
        let testnet = tag & 0x80 != 0;
        let bounceable = match tag & 0x7f {
            0x11 => true,
            0x51 => false,
            _ => return Err(ParseAddrError::BadFormat),
        };

        let addr = Self {
            workchain: buffer[1] as i8,
            address: HashBytes::from_slice(&buffer[2..34]),
        };
        Ok((
            addr,
            Base64AddrFlags {
                testnet,
                bounceable,
                url_safe: !s.contains(['+', '/']),
            },
        ))
    }

    /// Returns a user-friendly base64 representation of the address.
    pub fn display_base64(&self, flags: Base64AddrFlags) -> String {
        let mut buffer = [0u8; Self::FRIENDLY_LEN];
        buffer[0] = (if flags.bounceable { 0x11 } else { 0x51 })
            | if flags.testnet { 0x80 } else { 0 };
        buffer[1] = self.workchain as u8;
        buffer[2..34].copy_from_slice(self.address.as_slice());
        let crc = crc_16(&buffer[..34]);
        buffer[34..].copy_from_slice(&crc.to_be_bytes());

        if flags.url_safe {
            encode_base64_url(buffer)
        } else {
            encode_base64(buffer)
        }
    }
}

/// User-friendly address flags.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Base64AddrFlags {
    /// Address belongs to the testnet.
    pub testnet: bool,
    /// Messages to this address must be bounceable.
    pub bounceable: bool,
    /// Use url-safe base64 alphabet.
    pub url_safe: bool,
}

impl Default for Base64AddrFlags {
    #[inline]
    fn default() -> Self {
        Self {
            testnet: false,
            bounceable: true,
            url_safe: true,
        }
    }
}

impl std::fmt::Display for StdAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}:{}", self.workchain, self.address))
    }
}

impl FromStr for StdAddr {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAddrError::Empty);
        }

        if !s.contains(':') {
            return Self::from_str_ext(s).map(|(addr, _)| addr);
        }

        let mut result = Self::default();

        let mut parts = s.split(':');
        match parts.next() {
            Some(part) => match part.parse() {
                Ok(workchain) => result.workchain = workchain,
                Err(_) => return Err(ParseAddrError::InvalidWorkchain),
            },
            None => return Err(ParseAddrError::Empty),
        }

        match parts.next() {
            Some(part) => match hex::decode_to_slice(part, &mut result.address.0) {
                Ok(()) => {}
                Err(_) => return Err(ParseAddrError::InvalidAccountId),
            },
            None => return Err(ParseAddrError::InvalidAccountId),
        }

        if parts.next().is_none() {
            Ok(result)
        } else {
            Err(ParseAddrError::UnexpectedPart)
        }
    }
}

impl Store for StdAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(Self::BITS, 0) {
            return Err(Error::CellOverflow);
        }
        ok!(builder.store_small_uint(0b100, 3));
        ok!(builder.store_u8(self.workchain as u8));
        builder.store_u256(&self.address)
    }
}

impl<'a> Load<'a> for StdAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_small_uint(2)) != 0b10 {
            return Err(Error::InvalidTag);
        }
        if ok!(slice.load_bit()) {
            // anycast
            return Err(Error::InvalidData);
        }

        Ok(Self {
            workchain: ok!(slice.load_u8()) as i8,
            address: ok!(slice.load_u256()),
        })
    }
}

impl serde::Serialize for StdAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.workchain, &self.address).serialize(serializer)
        }
    }
}

impl<'de> serde::Deserialize<'de> for StdAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        if deserializer.is_human_readable() {
            let s = ok!(<std::borrow::Cow<'de, str>>::deserialize(deserializer));
            s.parse().map_err(Error::custom)
        } else {
            let (workchain, address) = ok!(<(i8, HashBytes)>::deserialize(deserializer));
            Ok(Self { workchain, address })
        }
    }
}

/// Variable-length internal address.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarAddr {
    /// Address length in bits.
    pub address_len: Uint9,
    /// Workchain id (full range).
    pub workchain: i32,
    /// Variable-length address.
    pub address: Vec<u8>,
}

impl VarAddr {
    /// Returns the number of data bits that this struct occupies.
    ///
    /// - 2 bits id (`0b11`)
    /// - 1 bit Maybe None
    /// - 9 bits `address_len`
    /// - 32 bits workchain
    /// - `address_len` bits of address
    pub const fn bit_len(&self) -> u16 {
        2 + 1 + Uint9::BITS + 32 + self.address_len.into_inner()
    }
}

impl Store for VarAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(self.bit_len(), 0) {
            return Err(Error::CellOverflow);
        }
        ok!(builder.store_small_uint(0b110, 3));
        ok!(self.address_len.store_into(builder));
        ok!(builder.store_u32(self.workchain as u32));
        builder.store_raw(&self.address, self.address_len.into_inner())
    }
}

impl<'a> Load<'a> for VarAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_small_uint(2)) != 0b11 {
            return Err(Error::InvalidTag);
        }
        if ok!(slice.load_bit()) {
            return Err(Error::InvalidData);
        }

        let address_len = ok!(Uint9::load_from(slice));
        let workchain = ok!(slice.load_u32()) as i32;
        let bits = address_len.into_inner();
        let mut address = vec![0u8; bits.div_ceil(8) as usize];
        ok!(slice.load_raw(&mut address, bits));

        Ok(Self {
            address_len,
            workchain,
            address,
        })
    }
}

/// External address.
///
/// ```text
/// addr_none$00 = MsgAddressExt;
/// addr_extern$01 len:(## 9) external_address:(bits len) = MsgAddressExt;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ExtAddr {
    /// Number of bits stored in data.
    pub data_bit_len: Uint9,
    /// External address data
    pub data: Vec<u8>,
}

impl ExtAddr {
    /// Creates non-empty external address.
    pub fn new<T>(data_bit_len: u16, data: T) -> Option<Self>
    where
        T: Into<Vec<u8>>,
    {
        let data_bit_len = Uint9::new(data_bit_len);
        if data_bit_len.is_valid() {
            Some(Self {
                data_bit_len,
                data: data.into(),
            })
        } else {
            None
        }
    }

    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        Uint9::BITS + self.data_bit_len.into_inner()
    }
}

/// Stores an optional external address (`addr_none` for `None`).
pub(crate) fn store_opt_ext_addr(
    addr: &Option<ExtAddr>,
    builder: &mut CellBuilder,
) -> Result<(), Error> {
    match addr {
        None => builder.store_zeros(2),
        Some(addr) => {
            if !builder.has_capacity(2 + addr.bit_len(), 0) {
                return Err(Error::CellOverflow);
            }
            ok!(builder.store_small_uint(0b01, 2));
            ok!(addr.data_bit_len.store_into(builder));
            builder.store_raw(&addr.data, addr.data_bit_len.into_inner())
        }
    }
}

/// Loads an optional external address (`None` for `addr_none`).
pub(crate) fn load_opt_ext_addr(slice: &mut CellSlice<'_>) -> Result<Option<ExtAddr>, Error> {
    match ok!(slice.load_small_uint(2)) {
        0b00 => Ok(None),
        0b01 => {
            let data_bit_len = ok!(Uint9::load_from(slice));
            let bits = data_bit_len.into_inner();
            let mut data = vec![0u8; bits.div_ceil(8) as usize];
            ok!(slice.load_raw(&mut data, bits));
            Ok(Some(ExtAddr { data_bit_len, data }))
        }
        _ => Err(Error::InvalidTag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_addr_raw_form() {
        let addr: StdAddr = "0:ed169130705004711b9998b0e0d3d8a0b0a0b7fdf6ea5d6e1d93ba8ba4e3c0a8"
            .parse()
            .unwrap();
        assert_eq!(addr.workchain, 0);
        assert_eq!(
            addr.to_string(),
            "0:ed169130705004711b9998b0e0d3d8a0b0a0b7fdf6ea5d6e1d93ba8ba4e3c0a8"
        );

        assert_eq!("".parse::<StdAddr>(), Err(ParseAddrError::Empty));
        assert_eq!(
            "1000:00".parse::<StdAddr>(),
            Err(ParseAddrError::InvalidWorkchain)
        );
        assert_eq!(
            "0:zz".parse::<StdAddr>(),
            Err(ParseAddrError::InvalidAccountId)
        );
    }

    #[test]
    fn std_addr_raw_bytes() {
        let addr = StdAddr::new(-1, HashBytes([0x11; 32]));
        let bytes = addr.to_raw_bytes();
        assert_eq!(&bytes[..4], &[0xff, 0xff, 0xff, 0xff]);
        assert_eq!(&bytes[4..], &[0x11; 32]);
        assert_eq!(StdAddr::from_raw_bytes(&bytes).unwrap(), addr);

        assert_eq!(
            StdAddr::from_raw_bytes(&bytes[..35]),
            Err(ParseAddrError::InvalidLength {
                expected: 36,
                actual: 35
            })
        );

        let mut bad_workchain = bytes;
        bad_workchain[..4].copy_from_slice(&1000i32.to_be_bytes());
        assert_eq!(
            StdAddr::from_raw_bytes(&bad_workchain),
            Err(ParseAddrError::InvalidWorkchain)
        );

        bad_workchain[..4].copy_from_slice(&(-129i32).to_be_bytes());
        assert_eq!(
            StdAddr::from_raw_bytes(&bad_workchain),
            Err(ParseAddrError::InvalidWorkchain)
        );

        let mut lowest = bytes;
        lowest[..4].copy_from_slice(&(-128i32).to_be_bytes());
        assert_eq!(StdAddr::from_raw_bytes(&lowest).unwrap().workchain, -128);

        assert_eq!(
            StdAddr::try_new(127, HashBytes::ZERO),
            Ok(StdAddr::new(127, HashBytes::ZERO))
        );
        assert_eq!(
            StdAddr::try_new(128, HashBytes::ZERO),
            Err(ParseAddrError::InvalidWorkchain)
        );
    }

    #[test]
    fn oracle_id_address() {
        let addr = StdAddr::from_oracle_id(7);
        let bytes = addr.to_raw_bytes();
        assert_eq!(bytes.len(), 36);
        assert_eq!(bytes[35], 7);
        assert!(bytes[..35].iter().all(|b| *b == 0));
        assert_ne!(StdAddr::from_oracle_id(8), addr);
    }

    #[test]
    fn std_addr_base64_form() {
        let addr = StdAddr::new(0, HashBytes([0xab; 32]));
        for flags in [
            Base64AddrFlags::default(),
            Base64AddrFlags {
                testnet: true,
                bounceable: false,
                url_safe: false,
            },
        ] {
            let s = addr.display_base64(flags);
            assert_eq!(s.len(), 48);
            let (parsed, parsed_flags) = StdAddr::from_str_ext(&s).unwrap();
            assert_eq!(parsed, addr);
            assert_eq!(parsed_flags.testnet, flags.testnet);
            assert_eq!(parsed_flags.bounceable, flags.bounceable);
            assert_eq!(s.parse::<StdAddr>().unwrap(), addr);
        }

        let mut broken = addr.display_base64(Base64AddrFlags::default()).into_bytes();
        broken[10] = if broken[10] == b'A' { b'B' } else { b'A' };
        let broken = String::from_utf8(broken).unwrap();
        assert!(StdAddr::from_str_ext(&broken).is_err());
    }

    #[test]
    fn addr_cells() {
        let addr = StdAddr::new(-1, HashBytes([0x42; 32]));
        let cell = CellBuilder::build_from(addr).unwrap();
        assert_eq!(cell.bit_len(), StdAddr::BITS);
        assert_eq!(cell.parse::<StdAddr>().unwrap(), addr);
        assert_eq!(cell.parse::<IntAddr>().unwrap(), IntAddr::Std(addr));

        let var = VarAddr {
            address_len: Uint9::new(12),
            workchain: 123,
            address: vec![0xab, 0xc0],
        };
        let cell = CellBuilder::build_from(&var).unwrap();
        assert_eq!(cell.parse::<IntAddr>().unwrap(), IntAddr::Var(var));

        let ext = Some(ExtAddr::new(256, vec![0x33; 32]).unwrap());
        let mut builder = CellBuilder::new();
        store_opt_ext_addr(&ext, &mut builder).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(load_opt_ext_addr(&mut cell.as_slice()).unwrap(), ext);
    }
}
