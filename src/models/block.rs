//! Block and shard identifiers.

use std::str::FromStr;

use crate::cell::*;
use crate::error::{Error, ParseBlockIdError};

/// Full block id.
#[derive(Debug, Default, Clone, Copy, Eq, Hash, PartialEq, Ord, PartialOrd)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BlockId {
    /// Block shard ident.
    pub shard: ShardIdent,
    /// Block number in shard.
    pub seqno: u32,
    /// Representation hash of the root cell of the block.
    pub root_hash: HashBytes,
    /// Hash of the BOC encoded root cell of the block.
    pub file_hash: HashBytes,
}

impl BlockId {
    /// The number of data bits that this struct occupies.
    pub const BITS: u16 = ShardIdent::BITS + 32 + 256 + 256;

    /// Returns `true` if this block id is for a masterchain block.
    ///
    /// See [`ShardIdent::MASTERCHAIN`]
    #[inline]
    pub const fn is_masterchain(&self) -> bool {
        self.shard.is_masterchain()
    }

    /// Returns short block id.
    pub const fn as_short_id(&self) -> BlockIdShort {
        BlockIdShort {
            shard: self.shard,
            seqno: self.seqno,
        }
    }
}

impl Store for BlockId {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.shard.store_into(builder));
        ok!(builder.store_u32(self.seqno));
        ok!(builder.store_u256(&self.root_hash));
        builder.store_u256(&self.file_hash)
    }
}

impl<'a> Load<'a> for BlockId {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            shard: ok!(ShardIdent::load_from(slice)),
            seqno: ok!(slice.load_u32()),
            root_hash: ok!(slice.load_u256()),
            file_hash: ok!(slice.load_u256()),
        })
    }
}

impl FromStr for BlockId {
    type Err = ParseBlockIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseBlockIdError::Empty);
        }

        let mut parts = s.split(':');
        let workchain = match parts.next() {
            Some(wc) => match wc.parse::<i32>() {
                Ok(wc) => wc,
                Err(_) => return Err(ParseBlockIdError::InvalidShardIdent),
            },
            None => return Err(ParseBlockIdError::Empty),
        };

        let shard = 'shard: {
            if let Some(prefix) = parts.next() {
                if let Ok(prefix) = u64::from_str_radix(prefix, 16) {
                    if let Some(shard) = ShardIdent::new(workchain, prefix) {
                        break 'shard shard;
                    }
                }
            }
            return Err(ParseBlockIdError::InvalidShardIdent);
        };

        let seqno = 'seqno: {
            if let Some(seqno) = parts.next() {
                if let Ok(seqno) = seqno.parse::<u32>() {
                    break 'seqno seqno;
                }
            }
            return Err(ParseBlockIdError::InvalidSeqno);
        };

        let mut result = Self {
            shard,
            seqno,
            ..Default::default()
        };

        'hash: {
            if let Some(hash) = parts.next() {
                if hex::decode_to_slice(hash, &mut result.root_hash.0).is_ok() {
                    break 'hash;
                }
            }
            return Err(ParseBlockIdError::InvalidRootHash);
        }

        'hash: {
            if let Some(hash) = parts.next() {
                if hex::decode_to_slice(hash, &mut result.file_hash.0).is_ok() {
                    break 'hash;
                }
            }
            return Err(ParseBlockIdError::InvalidFileHash);
        }

        if parts.next().is_none() {
            Ok(result)
        } else {
            Err(ParseBlockIdError::UnexpectedPart)
        }
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}:{}:{}:{}",
            self.shard, self.seqno, self.root_hash, self.file_hash,
        ))
    }
}

/// Short block id.
#[derive(Debug, Default, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct BlockIdShort {
    /// Block shard ident.
    pub shard: ShardIdent,
    /// Block number in shard.
    pub seqno: u32,
}

impl std::fmt::Display for BlockIdShort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}:{}", self.shard, self.seqno))
    }
}

impl From<(ShardIdent, u32)> for BlockIdShort {
    #[inline]
    fn from((shard, seqno): (ShardIdent, u32)) -> Self {
        Self { shard, seqno }
    }
}

/// Shard ident.
///
/// The prefix length is implicit: the lowest set bit of the prefix
/// is a tag which marks its end.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ShardIdent {
    workchain: i32,
    prefix: u64,
}

impl Default for ShardIdent {
    #[inline]
    fn default() -> Self {
        ShardIdent::MASTERCHAIN
    }
}

impl std::fmt::Display for ShardIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}:{:016x}", self.workchain, self.prefix))
    }
}

impl std::fmt::Debug for ShardIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl ShardIdent {
    /// The prefix for the full shard.
    pub const PREFIX_FULL: u64 = 0x8000000000000000;

    /// Max possible shard split depth.
    pub const MAX_SPLIT_DEPTH: u8 = 60;

    /// The number of data bits that this struct occupies.
    pub const BITS: u16 = 8 + 32 + 64;

    const UNUSED_BITS_MASK: u64 = !0 >> (Self::MAX_SPLIT_DEPTH + 1);

    /// Masterchain shard ident.
    pub const MASTERCHAIN: Self = Self::new_full(-1);
    /// Base workchain shard ident.
    pub const BASECHAIN: Self = Self::new_full(0);

    /// Tries to create a new shard ident from parts.
    pub const fn new(workchain: i32, prefix: u64) -> Option<Self> {
        if prefix == 0
            || prefix & Self::UNUSED_BITS_MASK != 0
            || workchain == -1 && prefix != Self::PREFIX_FULL
        {
            return None;
        }
        Some(Self { workchain, prefix })
    }

    /// Creates a new full shard ident for the specified workchain.
    pub const fn new_full(workchain: i32) -> Self {
        Self {
            workchain,
            prefix: Self::PREFIX_FULL,
        }
    }

    /// Returns the shard workchain.
    #[inline]
    pub const fn workchain(&self) -> i32 {
        self.workchain
    }

    /// Returns the shard prefix.
    #[inline]
    pub const fn prefix(&self) -> u64 {
        self.prefix
    }

    /// Returns `true` if this shard is a masterchain shard.
    #[inline]
    pub const fn is_masterchain(&self) -> bool {
        self.workchain == Self::MASTERCHAIN.workchain
    }

    /// Returns `true` if this shard could not be merged further.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.prefix == Self::PREFIX_FULL
    }

    /// Returns `true` if the current shard is the direct parent of the specified shard.
    pub const fn is_parent_of(&self, child: &Self) -> bool {
        if self.workchain != child.workchain || child.is_full() {
            return false;
        }

        let tag = child.prefix_tag();
        let child_parent_prefix = (child.prefix - tag) | (tag << 1);
        child_parent_prefix == self.prefix
    }

    /// Returns `true` if the current shard is the direct child of the specified shard.
    pub const fn is_child_of(&self, parent: &Self) -> bool {
        parent.is_parent_of(self)
    }

    /// Returns the parent shard of the current shard.
    ///
    /// Returns `None` for the full shard.
    pub const fn merge(&self) -> Option<Self> {
        if self.is_full() {
            None
        } else {
            let tag = self.prefix_tag();
            Some(Self {
                workchain: self.workchain,
                prefix: (self.prefix - tag) | (tag << 1),
            })
        }
    }

    /// Splits the current shard into two children.
    ///
    /// Returns `None` for the shard with `depth > MAX_SPLIT_DEPTH`.
    pub const fn split(&self) -> Option<(Self, Self)> {
        if self.prefix & ((Self::UNUSED_BITS_MASK << 1) + 1) != 0 {
            None
        } else {
            let tag = self.prefix_tag() >> 1;
            let left = Self {
                workchain: self.workchain,
                prefix: self.prefix - tag,
            };
            let right = Self {
                workchain: self.workchain,
                prefix: self.prefix + tag,
            };
            Some((left, right))
        }
    }

    /// Returns shard prefix len in bits.
    pub const fn prefix_len(&self) -> u16 {
        match self.prefix {
            0 => 64,
            _ => 63 - self.prefix.trailing_zeros() as u16,
        }
    }

    /// Returns `true` if the specified account could be stored in the current shard.
    pub const fn contains_account(&self, account: &HashBytes) -> bool {
        let account = &account.0;
        let mut bits = self.prefix_len();

        let mut byte = 0;
        let prefix = self.prefix.to_be_bytes();
        while bits > 0 && byte < 8 {
            let prefix_byte = prefix[byte];
            let account_byte = account[byte];

            if bits >= 8 {
                if prefix_byte != account_byte {
                    return false;
                }
                bits -= 8;
                byte += 1;
            } else {
                let mask = 0xff << (8 - bits);
                return (prefix_byte ^ account_byte) & mask == 0;
            }
        }

        true
    }

    /// Returns `true` if one shard is an ancestor of the other or they are equal.
    pub const fn intersects(&self, other: &Self) -> bool {
        if self.workchain != other.workchain {
            return false;
        }

        let (a, b) = (self.prefix_tag(), other.prefix_tag());
        let tag = if a > b { a } else { b };
        let mask = !((tag << 1).wrapping_sub(1));
        self.prefix & mask == other.prefix & mask
    }

    #[inline]
    const fn prefix_tag(&self) -> u64 {
        self.prefix & (!self.prefix).wrapping_add(1)
    }
}

impl Store for ShardIdent {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        // shard_ident$00 shard_pfx_bits:(#<= 60) workchain_id:int32 shard_prefix:uint64
        ok!(builder.store_small_uint(0, 2));
        ok!(builder.store_small_uint(self.prefix_len() as u8, 6));
        ok!(builder.store_u32(self.workchain as u32));
        builder.store_u64(self.prefix - self.prefix_tag())
    }
}

impl<'a> Load<'a> for ShardIdent {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_small_uint(2)) != 0 {
            return Err(Error::InvalidTag);
        }
        let prefix_len = ok!(slice.load_small_uint(6));
        if prefix_len > Self::MAX_SPLIT_DEPTH {
            return Err(Error::IntOverflow);
        }
        let workchain = ok!(slice.load_u32()) as i32;
        let prefix_without_tag = ok!(slice.load_u64());

        let tag = 1u64 << (63 - prefix_len);
        let prefix = (prefix_without_tag & !((tag << 1).wrapping_sub(1))) | tag;
        match Self::new(workchain, prefix) {
            Some(shard) => Ok(shard),
            None => Err(Error::InvalidData),
        }
    }
}

impl serde::Serialize for ShardIdent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.workchain, self.prefix).serialize(serializer)
        }
    }
}

impl<'de> serde::Deserialize<'de> for ShardIdent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let (workchain, prefix) = if deserializer.is_human_readable() {
            let s = ok!(<std::borrow::Cow<'de, str>>::deserialize(deserializer));
            let Some((workchain, prefix)) = s.split_once(':') else {
                return Err(Error::custom("expected `workchain:prefix`"));
            };
            match (workchain.parse::<i32>(), u64::from_str_radix(prefix, 16)) {
                (Ok(workchain), Ok(prefix)) => (workchain, prefix),
                _ => return Err(Error::custom("invalid shard ident")),
            }
        } else {
            ok!(<(i32, u64)>::deserialize(deserializer))
        };

        match Self::new(workchain, prefix) {
            Some(shard) => Ok(shard),
            None => Err(Error::custom("invalid shard prefix")),
        }
    }
}
