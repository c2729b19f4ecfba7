//! Chain families and per-family address representations.

use std::str::FromStr;

use crate::error::{CodecError, CodecErrorKind};
use crate::models::StdAddr;

/// A family of chains which share the address format and the extra args layout.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ChainFamily {
    /// Ethereum virtual machine.
    Evm,
    /// Solana virtual machine.
    Svm,
    Aptos,
    Sui,
    Ton,
}

impl ChainFamily {
    /// All known chain families.
    pub const ALL: [Self; 5] = [Self::Evm, Self::Svm, Self::Aptos, Self::Sui, Self::Ton];

    /// Returns a 4-byte family selector used in the fee quoter configs.
    pub const fn selector(self) -> u32 {
        match self {
            Self::Evm => 0x2812d52c,
            Self::Svm => 0x1e10bdc4,
            Self::Aptos => 0xac77ffec,
            Self::Sui => 0xc4e05953,
            Self::Ton => 0x647e2ba9,
        }
    }

    /// Finds a chain family by its 4-byte selector.
    pub fn from_selector(selector: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.selector() == selector)
    }

    /// Returns the length of the cross-chain address representation in bytes.
    pub const fn address_len(self) -> usize {
        match self {
            Self::Evm => 20,
            Self::Svm | Self::Aptos | Self::Sui => 32,
            Self::Ton => StdAddr::RAW_LEN,
        }
    }

    /// Returns a short lowercase family name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Evm => "evm",
            Self::Svm => "solana",
            Self::Aptos => "aptos",
            Self::Sui => "sui",
            Self::Ton => "ton",
        }
    }
}

impl std::fmt::Display for ChainFamily {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChainFamily {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                CodecError::new(
                    CodecErrorKind::TypeMismatch,
                    format!("unknown chain family `{s}`"),
                )
            })
    }
}

/// A chain taking part in cross-chain messaging.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ChainDefinition {
    /// EVM compatible chain.
    Evm {
        /// CCIP chain selector.
        selector: u64,
        /// Native chain id.
        chain_id: u64,
    },
    /// Solana virtual machine chain.
    Svm {
        /// CCIP chain selector.
        selector: u64,
    },
    /// Aptos chain.
    Aptos {
        /// CCIP chain selector.
        selector: u64,
    },
    /// Sui chain.
    Sui {
        /// CCIP chain selector.
        selector: u64,
    },
    /// TON chain.
    Ton {
        /// CCIP chain selector.
        selector: u64,
        /// Global id of the network.
        global_id: i32,
    },
}

impl ChainDefinition {
    /// Returns the family of this chain.
    pub const fn chain_family(&self) -> ChainFamily {
        match self {
            Self::Evm { .. } => ChainFamily::Evm,
            Self::Svm { .. } => ChainFamily::Svm,
            Self::Aptos { .. } => ChainFamily::Aptos,
            Self::Sui { .. } => ChainFamily::Sui,
            Self::Ton { .. } => ChainFamily::Ton,
        }
    }

    /// Returns the CCIP chain selector.
    pub const fn selector(&self) -> u64 {
        match self {
            Self::Evm { selector, .. }
            | Self::Svm { selector }
            | Self::Aptos { selector }
            | Self::Sui { selector }
            | Self::Ton { selector, .. } => *selector,
        }
    }

    /// Converts a textual address of this chain into its cross-chain bytes.
    ///
    /// TON addresses are accepted in raw or user-friendly forms, other
    /// families use hex (with an optional `0x` prefix).
    pub fn encode_address(&self, address: &str) -> Result<Vec<u8>, CodecError> {
        let bytes = match self.chain_family() {
            ChainFamily::Ton => {
                let addr = StdAddr::from_str(address)?;
                addr.to_raw_bytes().to_vec()
            }
            _ => {
                let hex_str = address.strip_prefix("0x").unwrap_or(address);
                hex::decode(hex_str).map_err(|e| {
                    CodecError::new(CodecErrorKind::BadAddress, format!("{address}: {e}"))
                })?
            }
        };
        self.check_address_len(&bytes)?;
        Ok(bytes)
    }

    /// Converts cross-chain address bytes into a textual address of this chain.
    pub fn decode_address(&self, bytes: &[u8]) -> Result<String, CodecError> {
        self.check_address_len(bytes)?;
        Ok(match self.chain_family() {
            ChainFamily::Ton => StdAddr::from_raw_bytes(bytes)?.to_string(),
            _ => format!("0x{}", hex::encode(bytes)),
        })
    }

    /// Left-pads cross-chain address bytes of this chain to a 64-byte
    /// on-ramp address used in merkle roots.
    pub fn to_on_ramp_address(&self, bytes: &[u8]) -> Result<super::OnRampAddress, CodecError> {
        self.check_address_len(bytes)?;
        super::OnRampAddress::from_slice(bytes)
    }

    fn check_address_len(&self, bytes: &[u8]) -> Result<(), CodecError> {
        let family = self.chain_family();
        let expected = family.address_len();
        if bytes.len() == expected {
            Ok(())
        } else {
            Err(CodecError::new(
                CodecErrorKind::BadAddress,
                format!(
                    "expected {expected} bytes of {family} address, got {}",
                    bytes.len()
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::HashBytes;

    #[test]
    fn family_selectors() {
        for family in ChainFamily::ALL {
            assert_eq!(ChainFamily::from_selector(family.selector()), Some(family));
            assert_eq!(family.name().parse::<ChainFamily>().unwrap(), family);
        }
        assert_eq!(ChainFamily::Evm.selector(), 0x2812d52c);
        assert_eq!(ChainFamily::from_selector(0), None);
    }

    #[test]
    fn address_conversion() {
        let evm = ChainDefinition::Evm {
            selector: 5009297550715157269,
            chain_id: 1,
        };
        assert_eq!(evm.chain_family(), ChainFamily::Evm);
        assert_eq!(evm.selector(), 5009297550715157269);

        let raw = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
        let bytes = evm.encode_address(raw).unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(evm.decode_address(&bytes).unwrap(), raw);

        let err = evm.encode_address("0x1234").unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::BadAddress);

        let ton = ChainDefinition::Ton {
            selector: 13879075125137744094,
            global_id: -239,
        };
        let addr = StdAddr::new(0, HashBytes([0x42; 32]));
        let bytes = ton.encode_address(&addr.to_string()).unwrap();
        assert_eq!(bytes, addr.to_raw_bytes());
        assert_eq!(ton.decode_address(&bytes).unwrap(), addr.to_string());

        let err = ton.decode_address(&bytes[1..]).unwrap_err();
        assert_eq!(err.kind, CodecErrorKind::BadAddress);

        let on_ramp = evm.to_on_ramp_address(&evm.encode_address(raw).unwrap()).unwrap();
        assert!(on_ramp.as_bytes()[..44].iter().all(|b| *b == 0));
        assert_eq!(&on_ramp.as_bytes()[44..], bytes_of(raw).as_slice());
    }

    fn bytes_of(s: &str) -> Vec<u8> {
        hex::decode(s.trim_start_matches("0x")).unwrap()
    }
}
