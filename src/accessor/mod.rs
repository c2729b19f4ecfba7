//! Read layer over the log poller and contract get-methods.
//!
//! Contracts are bound by name with [`ChainAccessor::sync`]. Binding a ramp
//! also registers log poller filters for its events.

use std::sync::Arc;

use ahash::HashMap;
use parking_lot::RwLock;

use crate::ccip::{
    CCIPMessageSent, CommitReportAccepted, DestChainConfig, Event, ExecutionStateChanged,
    FeeQuoterStaticConfig, OffRampDynamicConfig, OffRampStaticConfig, SeqNumRange,
    SourceChainConfig, TON2AnyTokenTransfer, TimestampedPrice, Uint256,
};
use crate::cell::{Cell, CellBuilder, HashBytes, Load};
use crate::client::{NetworkError, StackEntry, TonClient};
use crate::error::{CodecError, ResultExt};
use crate::logpoller::{
    ByteFilter, ByteOp, Filter, FilterStore, LogStore, Query, QueryError, SortBy, SortDir,
    StoreError,
};
use crate::models::{BlockId, StdAddr};

/// On-ramp contract name.
pub const ON_RAMP: &str = "OnRamp";
/// Off-ramp contract name.
pub const OFF_RAMP: &str = "OffRamp";
/// Fee quoter contract name.
pub const FEE_QUOTER: &str = "FeeQuoter";
/// Router contract name.
pub const ROUTER: &str = "Router";

/// Chain accessor error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccessorError {
    #[error("no bindings for contract {0}")]
    NoBindings(String),
    #[error("network error")]
    Network(#[from] NetworkError),
    #[error("query failed")]
    Query(#[from] QueryError),
    #[error("filter store error")]
    Store(#[from] StoreError),
    #[error("failed to decode the result")]
    Codec(#[from] CodecError),
    #[error("unexpected stack returned by `{method}`: {reason}")]
    UnexpectedStack {
        method: &'static str,
        reason: &'static str,
    },
    #[error("event does not match the query: {0}")]
    InvalidEvent(String),
}

/// A message sent from TON in the form shared by all chain families.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GenericMessage {
    pub message_id: HashBytes,
    pub source_chain_selector: u64,
    pub dest_chain_selector: u64,
    pub sequence_number: u64,
    pub nonce: u64,
    pub sender: StdAddr,
    pub receiver: Vec<u8>,
    pub data: Vec<u8>,
    pub extra_args: Cell,
    pub fee_token: StdAddr,
    pub fee_token_amount: Uint256,
    pub fee_value_juels: Uint256,
    pub token_amounts: Vec<TON2AnyTokenTransfer>,
    pub tx_hash: HashBytes,
    pub tx_lt: u64,
    pub block: BlockId,
}

impl GenericMessage {
    fn new(event: CCIPMessageSent, tx_hash: HashBytes, tx_lt: u64, block: BlockId) -> Self {
        let message = event.message;
        Self {
            message_id: message.header.message_id,
            source_chain_selector: message.header.source_chain_selector,
            dest_chain_selector: event.dest_chain_selector,
            sequence_number: event.sequence_number,
            nonce: message.header.nonce,
            sender: message.sender,
            receiver: message.receiver,
            data: message.data,
            extra_args: message.extra_args,
            fee_token: message.fee_token,
            fee_token_amount: message.fee_token_amount,
            fee_value_juels: message.fee_value_juels,
            token_amounts: message.token_amounts,
            tx_hash,
            tx_lt,
            block,
        }
    }
}

/// Accepted commit report with its origin.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommittedReport {
    pub report: CommitReportAccepted,
    pub tx_timestamp: u32,
    pub tx_lt: u64,
    pub block: BlockId,
}

/// Plugin-facing chain reader.
pub struct ChainAccessor {
    client: Arc<dyn TonClient>,
    filters: Arc<dyn FilterStore>,
    logs: Arc<dyn LogStore>,
    bindings: RwLock<HashMap<String, StdAddr>>,
}

impl ChainAccessor {
    pub fn new(
        client: Arc<dyn TonClient>,
        filters: Arc<dyn FilterStore>,
        logs: Arc<dyn LogStore>,
    ) -> Self {
        Self {
            client,
            filters,
            logs,
            bindings: Default::default(),
        }
    }

    /// Binds the contract name to the address. Repeated calls rebind.
    ///
    /// Binding a ramp registers filters for its events.
    pub fn sync(&self, contract: &str, address: StdAddr) -> Result<(), AccessorError> {
        match contract {
            ON_RAMP => {
                self.register_event::<CCIPMessageSent>(contract, address)?;
            }
            OFF_RAMP => {
                self.register_event::<CommitReportAccepted>(contract, address)?;
                self.register_event::<ExecutionStateChanged>(contract, address)?;
            }
            _ => {}
        }

        let prev = self.bindings.write().insert(contract.to_owned(), address);
        tracing::debug!(contract, %address, ?prev, "bound contract");
        Ok(())
    }

    /// Returns the address bound to the contract name.
    pub fn binding(&self, contract: &str) -> Result<StdAddr, AccessorError> {
        match self.bindings.read().get(contract) {
            Some(address) => Ok(*address),
            None => Err(AccessorError::NoBindings(contract.to_owned())),
        }
    }

    /// Returns messages sent to `dest` with sequence numbers in the range,
    /// ordered by lt.
    pub fn msgs_between_seq_nums(
        &self,
        dest: u64,
        range: SeqNumRange,
    ) -> Result<Vec<GenericMessage>, AccessorError> {
        let on_ramp = ok!(self.binding(ON_RAMP));
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let result = Query::<CCIPMessageSent>::for_event(on_ramp)
            .with_byte_filter(dest_filter(dest))
            .with_byte_filter(ByteFilter::new(
                CCIPMessageSent::SEQUENCE_NUMBER_OFFSET,
                ByteOp::Ge,
                range.start.to_be_bytes(),
            ))
            .with_byte_filter(ByteFilter::new(
                CCIPMessageSent::SEQUENCE_NUMBER_OFFSET,
                ByteOp::Le,
                range.end.to_be_bytes(),
            ))
            .sort_by(SortBy::TxLt, SortDir::Asc)
            .with_limit(usize::try_from(range.len()).unwrap_or(usize::MAX))
            .execute(self.logs.as_ref())?;

        let mut messages = Vec::with_capacity(result.events.len());
        for (log, event) in result.logs.into_iter().zip(result.events) {
            if event.dest_chain_selector != dest || !range.contains(event.sequence_number) {
                return Err(AccessorError::InvalidEvent(format!(
                    "message {} to {} is outside of {range}",
                    event.sequence_number, event.dest_chain_selector
                )));
            }
            messages.push(GenericMessage::new(event, log.tx_hash, log.tx_lt, log.block));
        }

        tracing::debug!(dest, %range, count = messages.len(), "loaded sent messages");
        Ok(messages)
    }

    /// Returns the sequence number of the latest message sent to `dest`,
    /// or `0` if there are none.
    pub fn latest_message_to(&self, dest: u64) -> Result<u64, AccessorError> {
        let on_ramp = ok!(self.binding(ON_RAMP));

        let result = Query::<CCIPMessageSent>::for_event(on_ramp)
            .with_byte_filter(dest_filter(dest))
            .sort_by(SortBy::TxLt, SortDir::Desc)
            .with_limit(1)
            .execute(self.logs.as_ref())?;

        Ok(result
            .events
            .first()
            .map(|event| event.sequence_number)
            .unwrap_or_default())
    }

    /// Returns commit reports accepted at or after the timestamp.
    pub fn commit_reports_gte_timestamp(
        &self,
        timestamp: u32,
        limit: usize,
    ) -> Result<Vec<CommittedReport>, AccessorError> {
        let off_ramp = ok!(self.binding(OFF_RAMP));

        let result = Query::<CommitReportAccepted>::for_event(off_ramp)
            .sort_by(SortBy::TxLt, SortDir::Asc)
            .execute(self.logs.as_ref())?;

        let reports = result
            .logs
            .into_iter()
            .zip(result.events)
            .filter(|(log, _)| log.tx_timestamp >= timestamp)
            .take(if limit > 0 { limit } else { usize::MAX })
            .map(|(log, report)| CommittedReport {
                report,
                tx_timestamp: log.tx_timestamp,
                tx_lt: log.tx_lt,
                block: log.block,
            })
            .collect();
        Ok(reports)
    }

    /// Returns sorted sequence numbers of messages from `source` which
    /// reached a final execution state.
    pub fn executed_messages(
        &self,
        source: u64,
        range: SeqNumRange,
    ) -> Result<Vec<u64>, AccessorError> {
        let off_ramp = ok!(self.binding(OFF_RAMP));
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let result = Query::<ExecutionStateChanged>::for_event(off_ramp)
            .with_byte_filter(ByteFilter::new(
                ExecutionStateChanged::SOURCE_CHAIN_SELECTOR_OFFSET,
                ByteOp::Eq,
                source.to_be_bytes(),
            ))
            .with_byte_filter(ByteFilter::new(
                ExecutionStateChanged::SEQUENCE_NUMBER_OFFSET,
                ByteOp::Ge,
                range.start.to_be_bytes(),
            ))
            .with_byte_filter(ByteFilter::new(
                ExecutionStateChanged::SEQUENCE_NUMBER_OFFSET,
                ByteOp::Le,
                range.end.to_be_bytes(),
            ))
            .with_typed_filter(|event| event.state.is_final())
            .execute(self.logs.as_ref())?;

        let mut seq_nums = result
            .events
            .iter()
            .map(|event| event.sequence_number)
            .collect::<Vec<_>>();
        seq_nums.sort_unstable();
        seq_nums.dedup();
        Ok(seq_nums)
    }

    /// Returns the USD price of the token from the fee quoter.
    pub async fn get_token_price_usd(
        &self,
        token: &StdAddr,
    ) -> Result<TimestampedPrice, AccessorError> {
        const METHOD: &str = "getTokenPriceUsd";

        let token = CellBuilder::build_from(token).context("token address")?;
        let stack = ok!(self.run(FEE_QUOTER, METHOD, vec![StackEntry::Slice(token)]).await);

        let unexpected = |reason| AccessorError::UnexpectedStack {
            method: METHOD,
            reason,
        };
        let [timestamp, value] = stack.as_slice() else {
            return Err(unexpected("expected two entries"));
        };
        let timestamp = timestamp
            .as_u64()
            .ok_or_else(|| unexpected("invalid timestamp"))?;
        let value = value
            .as_int()
            .and_then(|value| value.to_biguint())
            .filter(|value| value.bits() <= 256)
            .ok_or_else(|| unexpected("invalid price"))?;

        Ok(TimestampedPrice {
            timestamp,
            value: Uint256(value),
        })
    }

    /// Returns the fee quoter config of the destination chain.
    pub async fn get_fee_quoter_dest_chain_config(
        &self,
        dest: u64,
    ) -> Result<DestChainConfig, AccessorError> {
        self.run_parse(FEE_QUOTER, "getDestChainConfig", vec![StackEntry::from(dest)])
            .await
    }

    pub async fn get_fee_quoter_static_config(
        &self,
    ) -> Result<FeeQuoterStaticConfig, AccessorError> {
        self.run_parse(FEE_QUOTER, "getStaticConfig", Vec::new())
            .await
    }

    pub async fn get_offramp_static_config(&self) -> Result<OffRampStaticConfig, AccessorError> {
        self.run_parse(OFF_RAMP, "getStaticConfig", Vec::new()).await
    }

    pub async fn get_offramp_dynamic_config(
        &self,
    ) -> Result<OffRampDynamicConfig, AccessorError> {
        self.run_parse(OFF_RAMP, "getDynamicConfig", Vec::new()).await
    }

    /// Returns the off-ramp config of the source chain.
    pub async fn get_source_chain_config(
        &self,
        source: u64,
    ) -> Result<SourceChainConfig, AccessorError> {
        self.run_parse(
            OFF_RAMP,
            "getSourceChainConfig",
            vec![StackEntry::from(source)],
        )
        .await
    }

    fn register_event<T: Event>(&self, contract: &str, address: StdAddr) -> Result<(), StoreError> {
        let name = format!("{contract}:{}", T::NAME);
        let filter = Filter::new(name, address, T::topic()).with_event_name(T::NAME);
        self.filters.register(filter).map(|_| ())
    }

    async fn run(
        &self,
        contract: &str,
        method: &'static str,
        args: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, AccessorError> {
        let address = ok!(self.binding(contract));
        tracing::trace!(contract, %address, method, "running get-method");
        Ok(self.client.run_get_method(&address, method, args).await?)
    }

    async fn run_parse<T>(
        &self,
        contract: &str,
        method: &'static str,
        args: Vec<StackEntry>,
    ) -> Result<T, AccessorError>
    where
        for<'a> T: Load<'a>,
    {
        let stack = ok!(self.run(contract, method, args).await);
        match stack.first().and_then(StackEntry::parse::<T>) {
            Some(res) => Ok(res.context(method)?),
            None => Err(AccessorError::UnexpectedStack {
                method,
                reason: "expected a cell",
            }),
        }
    }
}

fn dest_filter(dest: u64) -> ByteFilter {
    ByteFilter::new(
        CCIPMessageSent::DEST_CHAIN_SELECTOR_OFFSET,
        ByteOp::Eq,
        dest.to_be_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::ccip::{
        ExtraArgs, GenericExtraArgsV2, MerkleRoot, MessageExecutionState, OnRampAddress,
        RampMessageHeader, TON2AnyRampMessage,
    };
    use crate::client::MockChain;
    use crate::logpoller::{InMemoryFilterStore, InMemoryLogStore, LogPoller, PollerConfig};

    const DEST_A: u64 = 5009297550715157269;
    const DEST_B: u64 = 4949039107694359620;
    const SOURCE: u64 = 16015286601757825753;

    fn addr(byte: u8) -> StdAddr {
        StdAddr::new(0, HashBytes([byte; 32]))
    }

    struct Env {
        chain: MockChain,
        poller: LogPoller,
        accessor: ChainAccessor,
    }

    impl Env {
        fn new() -> Self {
            let chain = MockChain::new();
            let filters = Arc::new(InMemoryFilterStore::new());
            let logs = Arc::new(InMemoryLogStore::default());
            let poller = LogPoller::new(
                Arc::new(chain.clone()),
                filters.clone(),
                logs.clone(),
                PollerConfig::default(),
            );
            let accessor = ChainAccessor::new(Arc::new(chain.clone()), filters, logs);
            Self {
                chain,
                poller,
                accessor,
            }
        }

        async fn emit<T: Event + crate::cell::Store>(&mut self, contract: &StdAddr, events: &[T]) {
            let events = events
                .iter()
                .map(|event| (T::topic(), CellBuilder::build_from(event).unwrap()))
                .collect();
            self.chain.add_transaction(contract, events);
            self.chain.push_master_block();
            self.poller
                .process_tick(&CancellationToken::new())
                .await
                .unwrap();
        }
    }

    fn message_sent(dest: u64, seq: u64) -> CCIPMessageSent {
        let extra_args = ExtraArgs::Generic(GenericExtraArgsV2 {
            gas_limit: Some(Uint256::from(200_000u64)),
            allow_out_of_order_execution: false,
        });
        CCIPMessageSent {
            dest_chain_selector: dest,
            sequence_number: seq,
            message: TON2AnyRampMessage {
                header: RampMessageHeader {
                    message_id: HashBytes([seq as u8; 32]),
                    source_chain_selector: SOURCE,
                    dest_chain_selector: dest,
                    sequence_number: seq,
                    nonce: 0,
                },
                sender: addr(0x10),
                receiver: vec![0xab; 20],
                data: b"ping".to_vec(),
                extra_args: CellBuilder::build_from(&extra_args).unwrap(),
                token_amounts: Vec::new(),
                fee_token: addr(0x30),
                fee_token_amount: Uint256::from(1_000u64),
                fee_value_juels: Uint256::from(2_000u64),
            },
        }
    }

    #[tokio::test]
    async fn sent_messages() {
        let mut env = Env::new();
        let on_ramp = addr(1);

        assert!(matches!(
            env.accessor.latest_message_to(DEST_A),
            Err(AccessorError::NoBindings(_))
        ));
        env.accessor.sync(ON_RAMP, on_ramp).unwrap();
        assert_eq!(env.accessor.latest_message_to(DEST_A).unwrap(), 0);

        env.emit(&on_ramp, &[message_sent(DEST_A, 1), message_sent(DEST_B, 1)])
            .await;
        env.emit(&on_ramp, &[message_sent(DEST_A, 2), message_sent(DEST_A, 3)])
            .await;
        env.emit(&on_ramp, &[message_sent(DEST_A, 4), message_sent(DEST_B, 2)])
            .await;

        let messages = env
            .accessor
            .msgs_between_seq_nums(DEST_A, SeqNumRange::new(2, 10))
            .unwrap();
        let seq_nums = messages
            .iter()
            .map(|m| m.sequence_number)
            .collect::<Vec<_>>();
        assert_eq!(seq_nums, [2, 3, 4]);
        assert!(messages.windows(2).all(|w| w[0].tx_lt <= w[1].tx_lt));
        assert!(messages.iter().all(|m| m.dest_chain_selector == DEST_A));
        assert_eq!(messages[0].message_id, HashBytes([2; 32]));
        assert_eq!(messages[0].data, b"ping");

        let messages = env
            .accessor
            .msgs_between_seq_nums(DEST_B, SeqNumRange::new(1, 1))
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sequence_number, 1);

        assert!(env
            .accessor
            .msgs_between_seq_nums(DEST_A, SeqNumRange::new(5, 4))
            .unwrap()
            .is_empty());

        assert_eq!(env.accessor.latest_message_to(DEST_A).unwrap(), 4);
        assert_eq!(env.accessor.latest_message_to(DEST_B).unwrap(), 2);
        assert_eq!(env.accessor.latest_message_to(1).unwrap(), 0);

        // Rebinding switches the source of messages
        env.accessor.sync(ON_RAMP, addr(2)).unwrap();
        assert_eq!(env.accessor.binding(ON_RAMP).unwrap(), addr(2));
        assert_eq!(env.accessor.latest_message_to(DEST_A).unwrap(), 0);
    }

    #[tokio::test]
    async fn shared_event_filters() {
        let mut env = Env::new();
        let on_ramp = addr(1);
        env.accessor.sync(ON_RAMP, on_ramp).unwrap();
        env.poller
            .filters()
            .register(Filter::new(
                "plugin-b",
                on_ramp,
                CCIPMessageSent::topic(),
            ))
            .unwrap();

        env.emit(&on_ramp, &[message_sent(DEST_A, 1)]).await;
        env.emit(&on_ramp, &[message_sent(DEST_A, 2)]).await;

        let messages = env
            .accessor
            .msgs_between_seq_nums(DEST_A, SeqNumRange::new(1, 5))
            .unwrap();
        let seq_nums = messages
            .iter()
            .map(|m| m.sequence_number)
            .collect::<Vec<_>>();
        assert_eq!(seq_nums, [1, 2]);

        let messages = env
            .accessor
            .msgs_between_seq_nums(DEST_A, SeqNumRange::new(1, 2))
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(env.accessor.latest_message_to(DEST_A).unwrap(), 2);
    }

    #[tokio::test]
    async fn off_ramp_events() {
        let mut env = Env::new();
        let off_ramp = addr(3);
        env.accessor.sync(OFF_RAMP, off_ramp).unwrap();

        let root = |min, max| MerkleRoot {
            source_chain_selector: SOURCE,
            on_ramp_address: OnRampAddress::ZERO,
            min_seq_nr: min,
            max_seq_nr: max,
            merkle_root: HashBytes([min as u8; 32]),
        };
        let report = |min, max| CommitReportAccepted {
            merkle_roots: vec![root(min, max)],
            price_updates: None,
        };
        env.emit(&off_ramp, &[report(1, 5)]).await;
        env.emit(&off_ramp, &[report(6, 8)]).await;

        let reports = env.accessor.commit_reports_gte_timestamp(0, 0).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].report.merkle_roots[0].min_seq_nr, 1);
        assert!(reports[0].tx_lt < reports[1].tx_lt);

        let reports = env.accessor.commit_reports_gte_timestamp(0, 1).unwrap();
        assert_eq!(reports.len(), 1);
        let reports = env
            .accessor
            .commit_reports_gte_timestamp(u32::MAX, 0)
            .unwrap();
        assert!(reports.is_empty());

        let state_changed = |seq, state| ExecutionStateChanged {
            source_chain_selector: SOURCE,
            sequence_number: seq,
            message_id: HashBytes([seq as u8; 32]),
            message_hash: HashBytes::ZERO,
            state,
        };
        env.emit(
            &off_ramp,
            &[
                state_changed(1, MessageExecutionState::InProgress),
                state_changed(1, MessageExecutionState::Success),
                state_changed(2, MessageExecutionState::Failure),
                state_changed(3, MessageExecutionState::InProgress),
                state_changed(7, MessageExecutionState::Success),
            ],
        )
        .await;

        let executed = env
            .accessor
            .executed_messages(SOURCE, SeqNumRange::new(1, 5))
            .unwrap();
        assert_eq!(executed, [1, 2]);
        assert!(env
            .accessor
            .executed_messages(1, SeqNumRange::new(1, 5))
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn get_methods() {
        let env = Env::new();
        let fee_quoter = addr(4);
        let token = addr(5);

        assert!(matches!(
            env.accessor.get_token_price_usd(&token).await,
            Err(AccessorError::NoBindings(_))
        ));
        env.accessor.sync(FEE_QUOTER, fee_quoter).unwrap();

        env.chain
            .set_get_method(&fee_quoter, "getTokenPriceUsd", move |args| {
                let token_arg = args[0].parse::<StdAddr>().unwrap().unwrap();
                assert_eq!(token_arg, token);
                Ok(vec![
                    StackEntry::from(1_700_000_000u64),
                    StackEntry::Int(BigInt::from(10u64).pow(18)),
                ])
            });
        let price = env.accessor.get_token_price_usd(&token).await.unwrap();
        assert_eq!(price.timestamp, 1_700_000_000);
        assert_eq!(price.value, Uint256::from(10u64.pow(18)));

        let config = DestChainConfig {
            is_enabled: true,
            max_data_bytes: 30_000,
            chain_family_selector: crate::ccip::ChainFamily::Evm.selector(),
            ..Default::default()
        };
        let config_cell = CellBuilder::build_from(config).unwrap();
        env.chain
            .set_get_method(&fee_quoter, "getDestChainConfig", move |args| {
                match args[0].as_u64() {
                    Some(DEST_A) => Ok(vec![StackEntry::Cell(config_cell.clone())]),
                    _ => Err(NetworkError::VmError { exit_code: 404 }),
                }
            });
        let loaded = env
            .accessor
            .get_fee_quoter_dest_chain_config(DEST_A)
            .await
            .unwrap();
        assert_eq!(loaded, config);
        assert!(matches!(
            env.accessor.get_fee_quoter_dest_chain_config(DEST_B).await,
            Err(AccessorError::Network(NetworkError::VmError { exit_code: 404 }))
        ));

        // Unknown get-method
        assert!(matches!(
            env.accessor.get_fee_quoter_static_config().await,
            Err(AccessorError::Network(NetworkError::VmError { exit_code: 11 }))
        ));
    }

    #[tokio::test]
    async fn malformed_get_method_results() {
        let env = Env::new();
        let fee_quoter = addr(4);
        let off_ramp = addr(6);
        env.accessor.sync(FEE_QUOTER, fee_quoter).unwrap();
        env.accessor.sync(OFF_RAMP, off_ramp).unwrap();

        env.chain
            .set_get_method(&fee_quoter, "getTokenPriceUsd", |_| {
                Ok(vec![StackEntry::Int(BigInt::from(-1))])
            });
        assert!(matches!(
            env.accessor.get_token_price_usd(&addr(5)).await,
            Err(AccessorError::UnexpectedStack { .. })
        ));

        env.chain
            .set_get_method(&off_ramp, "getStaticConfig", |_| Ok(vec![StackEntry::Null]));
        assert!(matches!(
            env.accessor.get_offramp_static_config().await,
            Err(AccessorError::UnexpectedStack { .. })
        ));

        env.chain.set_get_method(&off_ramp, "getDynamicConfig", |_| {
            Ok(vec![StackEntry::Cell(Cell::empty_cell())])
        });
        assert!(matches!(
            env.accessor.get_offramp_dynamic_config().await,
            Err(AccessorError::Codec(_))
        ));

        let config = SourceChainConfig {
            router: addr(7),
            is_enabled: true,
            min_seq_nr: 1,
            is_rmn_verification_disabled: false,
            on_ramp: vec![0x11; 20],
        };
        let config_cell = CellBuilder::build_from(&config).unwrap();
        env.chain
            .set_get_method(&off_ramp, "getSourceChainConfig", move |_| {
                Ok(vec![StackEntry::Slice(config_cell.clone())])
            });
        assert_eq!(
            env.accessor.get_source_chain_config(SOURCE).await.unwrap(),
            config
        );
    }
}
