//! Off-ramp and on-ramp configs.

use crate::cell::{CellBuilder, CellSlice, Load, Store};
use crate::error::Error;
use crate::models::StdAddr;
use crate::snake::{load_bytes_ref, store_bytes_ref};

/// Immutable off-ramp config.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OffRampStaticConfig {
    /// Selector of the chain where the off-ramp is deployed.
    pub chain_selector: u64,
    pub rmn_remote: StdAddr,
    pub token_admin_registry: StdAddr,
    pub nonce_manager: StdAddr,
}

impl Store for OffRampStaticConfig {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.chain_selector));
        ok!(self.rmn_remote.store_into(builder));
        ok!(self.token_admin_registry.store_into(builder));
        self.nonce_manager.store_into(builder)
    }
}

impl<'a> Load<'a> for OffRampStaticConfig {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            chain_selector: ok!(slice.load_u64()),
            rmn_remote: ok!(StdAddr::load_from(slice)),
            token_admin_registry: ok!(StdAddr::load_from(slice)),
            nonce_manager: ok!(StdAddr::load_from(slice)),
        })
    }
}

/// Mutable off-ramp config.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OffRampDynamicConfig {
    pub fee_quoter: StdAddr,
    /// Delay after which anyone can manually execute a message.
    pub permissionless_execution_threshold_seconds: u32,
    pub message_interceptor: Option<StdAddr>,
}

impl Store for OffRampDynamicConfig {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.fee_quoter.store_into(builder));
        ok!(builder.store_u32(self.permissionless_execution_threshold_seconds));
        self.message_interceptor.store_into(builder)
    }
}

impl<'a> Load<'a> for OffRampDynamicConfig {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            fee_quoter: ok!(StdAddr::load_from(slice)),
            permissionless_execution_threshold_seconds: ok!(slice.load_u32()),
            message_interceptor: ok!(Option::<StdAddr>::load_from(slice)),
        })
    }
}

/// Off-ramp config of a source chain.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SourceChainConfig {
    pub router: StdAddr,
    pub is_enabled: bool,
    /// Next expected sequence number.
    pub min_seq_nr: u64,
    pub is_rmn_verification_disabled: bool,
    /// On-ramp address in the source chain representation.
    pub on_ramp: Vec<u8>,
}

impl Store for SourceChainConfig {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.router.store_into(builder));
        ok!(builder.store_bit(self.is_enabled));
        ok!(builder.store_u64(self.min_seq_nr));
        ok!(builder.store_bit(self.is_rmn_verification_disabled));
        store_bytes_ref(&self.on_ramp, builder).map_err(From::from)
    }
}

impl<'a> Load<'a> for SourceChainConfig {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            router: ok!(StdAddr::load_from(slice)),
            is_enabled: ok!(slice.load_bit()),
            min_seq_nr: ok!(slice.load_u64()),
            is_rmn_verification_disabled: ok!(slice.load_bit()),
            on_ramp: load_bytes_ref(slice)?,
        })
    }
}

/// On-ramp config of a destination chain.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OnRampDestChainConfig {
    /// Last assigned sequence number.
    pub sequence_number: u64,
    pub allowlist_enabled: bool,
    pub router: StdAddr,
}

impl Store for OnRampDestChainConfig {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.sequence_number));
        ok!(builder.store_bit(self.allowlist_enabled));
        self.router.store_into(builder)
    }
}

impl<'a> Load<'a> for OnRampDestChainConfig {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            sequence_number: ok!(slice.load_u64()),
            allowlist_enabled: ok!(slice.load_bit()),
            router: ok!(StdAddr::load_from(slice)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boc::BocRepr;
    use crate::cell::HashBytes;

    fn addr(byte: u8) -> StdAddr {
        StdAddr::new(0, HashBytes([byte; 32]))
    }

    #[test]
    fn offramp_configs() {
        let static_config = OffRampStaticConfig {
            chain_selector: 13879075125137744094,
            rmn_remote: addr(1),
            token_admin_registry: addr(2),
            nonce_manager: addr(3),
        };
        let boc = BocRepr::encode(static_config).unwrap();
        assert_eq!(
            BocRepr::decode::<OffRampStaticConfig, _>(boc).unwrap(),
            static_config
        );

        for message_interceptor in [None, Some(addr(5))] {
            let dynamic_config = OffRampDynamicConfig {
                fee_quoter: addr(4),
                permissionless_execution_threshold_seconds: 3600,
                message_interceptor,
            };
            let boc = BocRepr::encode(dynamic_config).unwrap();
            assert_eq!(
                BocRepr::decode::<OffRampDynamicConfig, _>(boc).unwrap(),
                dynamic_config
            );
        }
    }

    #[test]
    fn source_chain_config() {
        let config = SourceChainConfig {
            router: addr(6),
            is_enabled: true,
            min_seq_nr: 42,
            is_rmn_verification_disabled: false,
            on_ramp: vec![0xaa; 20],
        };
        let boc = BocRepr::encode(&config).unwrap();
        assert_eq!(
            BocRepr::decode::<SourceChainConfig, _>(boc).unwrap(),
            config
        );
    }

    #[test]
    fn on_ramp_dest_chain_config() {
        let config = OnRampDestChainConfig {
            sequence_number: 10,
            allowlist_enabled: false,
            router: addr(7),
        };
        let cell = CellBuilder::build_from(config).unwrap();
        assert_eq!(cell.bit_len(), 64 + 1 + StdAddr::BITS);
        assert_eq!(cell.parse::<OnRampDestChainConfig>().unwrap(), config);
    }
}
