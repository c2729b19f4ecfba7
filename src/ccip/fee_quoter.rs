//! Fee quoter configs and prices.

use super::{ChainFamily, Uint256};
use crate::cell::{CellBuilder, CellSlice, Load, Store};
use crate::dict::Dict;
use crate::error::Error;
use crate::models::StdAddr;
use crate::num::Tokens;

/// Fee quoter config of a destination chain.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct DestChainConfig {
    pub is_enabled: bool,
    pub max_number_of_tokens_per_msg: u16,
    pub max_data_bytes: u32,
    pub max_per_msg_gas_limit: u32,
    pub dest_gas_overhead: u32,
    pub dest_gas_per_payload_byte_base: u8,
    pub dest_gas_per_payload_byte_high: u8,
    pub dest_gas_per_payload_byte_threshold: u16,
    pub dest_data_availability_overhead_gas: u32,
    pub dest_gas_per_data_availability_byte: u16,
    pub dest_data_availability_multiplier_bps: u16,
    pub chain_family_selector: u32,
    pub enforce_out_of_order: bool,
    pub default_token_fee_usd_cents: u16,
    pub default_token_dest_gas_overhead: u32,
    pub default_tx_gas_limit: u32,
    pub gas_multiplier_wei_per_eth: u64,
    pub gas_price_staleness_threshold: u32,
    pub network_fee_usd_cents: u32,
}

impl DestChainConfig {
    /// The number of data bits that the config occupies.
    pub const BITS: u16 = 450;

    /// Returns a known chain family of the destination chain.
    pub fn chain_family(&self) -> Option<ChainFamily> {
        ChainFamily::from_selector(self.chain_family_selector)
    }
}

impl Store for DestChainConfig {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_bit(self.is_enabled));
        ok!(builder.store_u16(self.max_number_of_tokens_per_msg));
        ok!(builder.store_u32(self.max_data_bytes));
        ok!(builder.store_u32(self.max_per_msg_gas_limit));
        ok!(builder.store_u32(self.dest_gas_overhead));
        ok!(builder.store_u8(self.dest_gas_per_payload_byte_base));
        ok!(builder.store_u8(self.dest_gas_per_payload_byte_high));
        ok!(builder.store_u16(self.dest_gas_per_payload_byte_threshold));
        ok!(builder.store_u32(self.dest_data_availability_overhead_gas));
        ok!(builder.store_u16(self.dest_gas_per_data_availability_byte));
        ok!(builder.store_u16(self.dest_data_availability_multiplier_bps));
        ok!(builder.store_u32(self.chain_family_selector));
        ok!(builder.store_bit(self.enforce_out_of_order));
        ok!(builder.store_u16(self.default_token_fee_usd_cents));
        ok!(builder.store_u32(self.default_token_dest_gas_overhead));
        ok!(builder.store_u32(self.default_tx_gas_limit));
        ok!(builder.store_u64(self.gas_multiplier_wei_per_eth));
        ok!(builder.store_u32(self.gas_price_staleness_threshold));
        builder.store_u32(self.network_fee_usd_cents)
    }
}

impl<'a> Load<'a> for DestChainConfig {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            is_enabled: ok!(slice.load_bit()),
            max_number_of_tokens_per_msg: ok!(slice.load_u16()),
            max_data_bytes: ok!(slice.load_u32()),
            max_per_msg_gas_limit: ok!(slice.load_u32()),
            dest_gas_overhead: ok!(slice.load_u32()),
            dest_gas_per_payload_byte_base: ok!(slice.load_u8()),
            dest_gas_per_payload_byte_high: ok!(slice.load_u8()),
            dest_gas_per_payload_byte_threshold: ok!(slice.load_u16()),
            dest_data_availability_overhead_gas: ok!(slice.load_u32()),
            dest_gas_per_data_availability_byte: ok!(slice.load_u16()),
            dest_data_availability_multiplier_bps: ok!(slice.load_u16()),
            chain_family_selector: ok!(slice.load_u32()),
            enforce_out_of_order: ok!(slice.load_bit()),
            default_token_fee_usd_cents: ok!(slice.load_u16()),
            default_token_dest_gas_overhead: ok!(slice.load_u32()),
            default_tx_gas_limit: ok!(slice.load_u32()),
            gas_multiplier_wei_per_eth: ok!(slice.load_u64()),
            gas_price_staleness_threshold: ok!(slice.load_u32()),
            network_fee_usd_cents: ok!(slice.load_u32()),
        })
    }
}

/// Destination chain configs by chain selector.
pub type DestChainConfigs = Dict<u64, DestChainConfig>;

/// USD price with the time of the last update.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct TimestampedPrice {
    /// Unix timestamp of the update in seconds.
    pub timestamp: u64,
    pub value: Uint256,
}

impl Store for TimestampedPrice {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u64(self.timestamp));
        self.value.store_into(builder)
    }
}

impl<'a> Load<'a> for TimestampedPrice {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            timestamp: ok!(slice.load_u64()),
            value: ok!(Uint256::load_from(slice)),
        })
    }
}

/// Immutable fee quoter config.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeeQuoterStaticConfig {
    pub max_fee_juels_per_msg: Tokens,
    pub link_token: StdAddr,
    pub token_price_staleness_threshold: u64,
}

impl Store for FeeQuoterStaticConfig {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.max_fee_juels_per_msg.store_into(builder));
        ok!(self.link_token.store_into(builder));
        builder.store_u64(self.token_price_staleness_threshold)
    }
}

impl<'a> Load<'a> for FeeQuoterStaticConfig {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            max_fee_juels_per_msg: ok!(Tokens::load_from(slice)),
            link_token: ok!(StdAddr::load_from(slice)),
            token_price_staleness_threshold: ok!(slice.load_u64()),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cell::HashBytes;

    pub(crate) fn evm_config() -> DestChainConfig {
        DestChainConfig {
            is_enabled: true,
            max_number_of_tokens_per_msg: 1,
            max_data_bytes: 30_000,
            max_per_msg_gas_limit: 3_000_000,
            dest_gas_overhead: 300_000,
            dest_gas_per_payload_byte_base: 16,
            dest_gas_per_payload_byte_high: 40,
            dest_gas_per_payload_byte_threshold: 3000,
            dest_data_availability_overhead_gas: 100,
            dest_gas_per_data_availability_byte: 16,
            dest_data_availability_multiplier_bps: 1,
            chain_family_selector: ChainFamily::Evm.selector(),
            enforce_out_of_order: false,
            default_token_fee_usd_cents: 25,
            default_token_dest_gas_overhead: 90_000,
            default_tx_gas_limit: 200_000,
            gas_multiplier_wei_per_eth: 11 * 10u64.pow(17),
            gas_price_staleness_threshold: 90_000,
            network_fee_usd_cents: 10,
        }
    }

    #[test]
    fn dest_chain_config_layout() {
        let config = evm_config();
        let cell = CellBuilder::build_from(config).unwrap();
        assert_eq!(cell.bit_len(), DestChainConfig::BITS);

        let mut slice = cell.as_slice();
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.load_u16().unwrap(), 1);
        assert_eq!(slice.load_u32().unwrap(), 30_000);

        // chain family selector follows the first 209 bits
        assert_eq!(cell.as_slice().get_uint(209, 32).unwrap(), 0x2812d52c);

        let decoded = cell.parse::<DestChainConfig>().unwrap();
        assert_eq!(decoded, config);
        assert_eq!(decoded.chain_family(), Some(ChainFamily::Evm));
    }

    #[test]
    fn dest_chain_configs_dict() {
        let mut configs = DestChainConfigs::new();
        let mut svm = evm_config();
        svm.chain_family_selector = ChainFamily::Svm.selector();
        svm.enforce_out_of_order = true;

        configs.set(5009297550715157269, evm_config()).unwrap();
        configs.set(124615329519749607, svm).unwrap();
        assert_eq!(configs.len().unwrap(), 2);

        let cell = CellBuilder::build_from(&configs).unwrap();
        let parsed = cell.parse::<DestChainConfigs>().unwrap();
        assert_eq!(parsed.get(5009297550715157269).unwrap(), Some(evm_config()));
        assert_eq!(parsed.get(124615329519749607).unwrap(), Some(svm));
        assert_eq!(parsed.get(1).unwrap(), None);
    }

    #[test]
    fn prices_and_static_config() {
        let price = TimestampedPrice {
            timestamp: 1_700_000_000,
            value: Uint256::from(2_500u64 * 10u64.pow(15)),
        };
        let cell = CellBuilder::build_from(&price).unwrap();
        assert_eq!(cell.bit_len(), 64 + 256);
        assert_eq!(cell.parse::<TimestampedPrice>().unwrap(), price);

        let config = FeeQuoterStaticConfig {
            max_fee_juels_per_msg: Tokens::new(10u128.pow(20)),
            link_token: StdAddr::new(0, HashBytes([0x77; 32])),
            token_price_staleness_threshold: 86_400,
        };
        let cell = CellBuilder::build_from(&config).unwrap();
        assert_eq!(cell.parse::<FeeQuoterStaticConfig>().unwrap(), config);
    }
}
