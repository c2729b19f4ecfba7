//! Transaction models.

use crate::cell::*;
use crate::dict::Dict;
use crate::error::Error;
use crate::num::*;

use crate::models::message::{CurrencyCollection, Message};

pub use self::phases::*;

mod phases;

#[cfg(test)]
mod tests;

/// Blockchain transaction.
///
/// ```text
/// transaction$0111 account_addr:bits256 lt:uint64
///   prev_trans_hash:bits256 prev_trans_lt:uint64 now:uint32
///   outmsg_cnt:uint15 orig_status:AccountStatus end_status:AccountStatus
///   ^[ in_msg:(Maybe ^(Message Any)) out_msgs:(HashmapE 15 ^(Message Any)) ]
///   total_fees:CurrencyCollection state_update:^(HASH_UPDATE Account)
///   description:^TransactionDescr = Transaction;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transaction {
    /// Account on which this transaction was produced.
    pub account: HashBytes,
    /// Logical time when the transaction was created.
    pub lt: u64,
    /// The hash of the previous transaction on the same account.
    pub prev_trans_hash: HashBytes,
    /// The logical time of the previous transaction on the same account.
    pub prev_trans_lt: u64,
    /// Unix timestamp when the transaction was created.
    pub now: u32,
    /// The number of outgoing messages.
    pub out_msg_count: Uint15,
    /// Account status before this transaction.
    pub orig_status: AccountStatus,
    /// Account status after this transaction.
    pub end_status: AccountStatus,
    /// Optional incoming message.
    pub in_msg: Option<Cell>,
    /// Outgoing messages, in order by lt.
    pub out_msgs: Dict<Uint15, Cell>,
    /// Total transaction fees (including extra fwd fees).
    pub total_fees: CurrencyCollection,
    /// Account state hashes.
    pub state_update: HashUpdate,
    /// Detailed transaction info.
    pub info: TxInfo,
}

impl Transaction {
    const TAG: u8 = 0b0111;

    /// Tries to load the incoming message, if present.
    pub fn load_in_msg(&self) -> Result<Option<Message>, Error> {
        match &self.in_msg {
            Some(in_msg) => in_msg.parse::<Message>().map(Some),
            None => Ok(None),
        }
    }

    /// Tries to load all outgoing messages in order by lt.
    pub fn load_out_msgs(&self) -> Result<Vec<Message>, Error> {
        let mut result = Vec::new();
        for entry in self.out_msgs.iter() {
            let (_, cell) = ok!(entry);
            result.push(ok!(cell.parse::<Message>()));
        }
        Ok(result)
    }

    /// Computes the fee breakdown of this transaction.
    pub fn fees(&self) -> TxFees {
        TxFees::compute(self.total_fees.tokens, &self.info)
    }
}

impl Store for Transaction {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let messages = {
            let mut builder = CellBuilder::new();
            ok!(self.in_msg.store_into(&mut builder));
            ok!(self.out_msgs.store_into(&mut builder));
            ok!(builder.build())
        };

        ok!(builder.store_small_uint(Self::TAG, 4));
        ok!(builder.store_u256(&self.account));
        ok!(builder.store_u64(self.lt));
        ok!(builder.store_u256(&self.prev_trans_hash));
        ok!(builder.store_u64(self.prev_trans_lt));
        ok!(builder.store_u32(self.now));
        ok!(self.out_msg_count.store_into(builder));
        ok!(self.orig_status.store_into(builder));
        ok!(self.end_status.store_into(builder));
        ok!(builder.store_reference(messages));
        ok!(self.total_fees.store_into(builder));
        ok!(builder.store_reference(ok!(CellBuilder::build_from(self.state_update))));
        builder.store_reference(ok!(CellBuilder::build_from(&self.info)))
    }
}

impl<'a> Load<'a> for Transaction {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match slice.load_small_uint(4) {
            Ok(Self::TAG) => {}
            Ok(_) => return Err(Error::InvalidTag),
            Err(e) => return Err(e),
        }

        let (in_msg, out_msgs) = {
            let slice = &mut ok!(slice.get_reference_as_slice(0));
            let in_msg = ok!(Option::<Cell>::load_from(slice));
            let out_msgs = ok!(Dict::load_from(slice));
            (in_msg, out_msgs)
        };
        ok!(slice.skip_first(0, 1));

        Ok(Self {
            account: ok!(slice.load_u256()),
            lt: ok!(slice.load_u64()),
            prev_trans_hash: ok!(slice.load_u256()),
            prev_trans_lt: ok!(slice.load_u64()),
            now: ok!(slice.load_u32()),
            out_msg_count: ok!(Uint15::load_from(slice)),
            orig_status: ok!(AccountStatus::load_from(slice)),
            end_status: ok!(AccountStatus::load_from(slice)),
            in_msg,
            out_msgs,
            total_fees: ok!(CurrencyCollection::load_from(slice)),
            state_update: ok!(ok!(slice.load_reference()).parse::<HashUpdate>()),
            info: ok!(ok!(slice.load_reference()).parse::<TxInfo>()),
        })
    }
}

/// Account status.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum AccountStatus {
    /// Account exists but has not yet been deployed.
    #[default]
    Uninit = 0b00,
    /// Account exists but has been frozen.
    Frozen = 0b01,
    /// Account exists and has been deployed.
    Active = 0b10,
    /// Account does not exist.
    NotExists = 0b11,
}

impl Store for AccountStatus {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_small_uint(*self as u8, 2)
    }
}

impl<'a> Load<'a> for AccountStatus {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(match ok!(slice.load_small_uint(2)) {
            0b00 => Self::Uninit,
            0b01 => Self::Frozen,
            0b10 => Self::Active,
            _ => Self::NotExists,
        })
    }
}

/// Detailed transaction info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TxInfo {
    /// Ordinary transaction info.
    Ordinary(OrdinaryTxInfo),
    /// Tick-tock transaction info.
    TickTock(TickTockTxInfo),
}

impl TxInfo {
    /// Returns `true` if the transaction was reverted.
    pub fn is_aborted(&self) -> bool {
        match self {
            Self::Ordinary(info) => info.aborted,
            Self::TickTock(info) => info.aborted,
        }
    }
}

impl Store for TxInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::Ordinary(info) => {
                ok!(builder.store_small_uint(0b0000, 4));
                info.store_into(builder)
            }
            Self::TickTock(info) => {
                ok!(builder.store_small_uint(0b001, 3));
                info.store_into(builder)
            }
        }
    }
}

impl<'a> Load<'a> for TxInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let tag_part = ok!(slice.load_small_uint(3));
        Ok(if tag_part == 0b001 {
            Self::TickTock(ok!(TickTockTxInfo::load_from(slice)))
        } else if tag_part == 0b000 && !ok!(slice.load_bit()) {
            Self::Ordinary(ok!(OrdinaryTxInfo::load_from(slice)))
        } else {
            return Err(Error::InvalidTag);
        })
    }
}

/// Ordinary transaction info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OrdinaryTxInfo {
    /// Whether the credit phase was executed first
    /// (usually set when incoming message has `bounce: false`).
    pub credit_first: bool,
    /// Storage phase info.
    ///
    /// Skipped if the account did not exist prior to execution.
    pub storage_phase: Option<StoragePhase>,
    /// Credit phase info.
    ///
    /// Skipped if the incoming message is external.
    pub credit_phase: Option<CreditPhase>,
    /// Compute phase info.
    pub compute_phase: ComputePhase,
    /// Action phase info.
    ///
    /// Skipped if the transaction was aborted at the compute phase.
    pub action_phase: Option<ActionPhase>,
    /// Whether the transaction was reverted.
    pub aborted: bool,
    /// Bounce phase info.
    ///
    /// Only present if the incoming message had `bounce: true` and
    /// the compute phase failed.
    pub bounce_phase: Option<BouncePhase>,
    /// Whether the account was destroyed during this transaction.
    pub destroyed: bool,
}

impl Store for OrdinaryTxInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let action_phase = match &self.action_phase {
            Some(action_phase) => Some(ok!(CellBuilder::build_from(action_phase))),
            None => None,
        };

        ok!(builder.store_bit(self.credit_first));
        ok!(self.storage_phase.store_into(builder));
        ok!(self.credit_phase.store_into(builder));
        ok!(self.compute_phase.store_into(builder));
        ok!(action_phase.store_into(builder));
        ok!(builder.store_bit(self.aborted));
        ok!(self.bounce_phase.store_into(builder));
        builder.store_bit(self.destroyed)
    }
}

impl<'a> Load<'a> for OrdinaryTxInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            credit_first: ok!(slice.load_bit()),
            storage_phase: ok!(Option::<StoragePhase>::load_from(slice)),
            credit_phase: ok!(Option::<CreditPhase>::load_from(slice)),
            compute_phase: ok!(ComputePhase::load_from(slice)),
            action_phase: match ok!(Option::<Cell>::load_from(slice)) {
                Some(cell) => Some(ok!(cell.parse::<ActionPhase>())),
                None => None,
            },
            aborted: ok!(slice.load_bit()),
            bounce_phase: ok!(Option::<BouncePhase>::load_from(slice)),
            destroyed: ok!(slice.load_bit()),
        })
    }
}

/// Tick-tock transaction info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TickTockTxInfo {
    /// Tick-tock transaction execution edge.
    pub kind: TickTock,
    /// Storage phase info.
    pub storage_phase: StoragePhase,
    /// Compute phase info.
    pub compute_phase: ComputePhase,
    /// Action phase info.
    ///
    /// Skipped if the transaction was aborted at the compute phase.
    pub action_phase: Option<ActionPhase>,
    /// Whether the transaction was reverted.
    pub aborted: bool,
    /// Whether the account was destroyed during this transaction.
    pub destroyed: bool,
}

impl Store for TickTockTxInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let action_phase = match &self.action_phase {
            Some(action_phase) => Some(ok!(CellBuilder::build_from(action_phase))),
            None => None,
        };

        let flags = ((self.aborted as u8) << 1) | (self.destroyed as u8);

        ok!(builder.store_bit(self.kind == TickTock::Tock));
        ok!(self.storage_phase.store_into(builder));
        ok!(self.compute_phase.store_into(builder));
        ok!(action_phase.store_into(builder));
        builder.store_small_uint(flags, 2)
    }
}

impl<'a> Load<'a> for TickTockTxInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let kind = if ok!(slice.load_bit()) {
            TickTock::Tock
        } else {
            TickTock::Tick
        };
        let storage_phase = ok!(StoragePhase::load_from(slice));
        let compute_phase = ok!(ComputePhase::load_from(slice));
        let action_phase = match ok!(Option::<Cell>::load_from(slice)) {
            Some(cell) => Some(ok!(cell.parse::<ActionPhase>())),
            None => None,
        };
        let flags = ok!(slice.load_small_uint(2));

        Ok(Self {
            kind,
            storage_phase,
            compute_phase,
            action_phase,
            aborted: flags & 0b10 != 0,
            destroyed: flags & 0b01 != 0,
        })
    }
}

/// Tick-tock transaction execution edge.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TickTock {
    /// Start of the block.
    Tick = 0,
    /// End of the block.
    Tock = 1,
}

/// Account state hash update.
///
/// ```text
/// update_hashes#72 {X:Type} old_hash:bits256 new_hash:bits256 = HASH_UPDATE X;
/// ```
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct HashUpdate {
    /// Old account state hash.
    pub old: HashBytes,
    /// New account state hash.
    pub new: HashBytes,
}

impl HashUpdate {
    const TAG: u8 = 0x72;
}

impl Store for HashUpdate {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u8(Self::TAG));
        ok!(builder.store_u256(&self.old));
        builder.store_u256(&self.new)
    }
}

impl<'a> Load<'a> for HashUpdate {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_u8()) != Self::TAG {
            return Err(Error::InvalidTag);
        }
        Ok(Self {
            old: ok!(slice.load_u256()),
            new: ok!(slice.load_u256()),
        })
    }
}

/// Fee breakdown of a single transaction.
///
/// Phases are taken from the transaction description; whatever part of the
/// total fees is not explained by them is kept in [`TxFees::unaccounted`].
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct TxFees {
    /// Total fees charged by the transaction.
    pub total: Tokens,
    /// Storage phase fees.
    pub storage: Tokens,
    /// Compute phase gas fees.
    pub compute: Tokens,
    /// Action phase fees.
    pub action: Tokens,
    /// Forwarding fees of the outgoing messages.
    pub forward: Tokens,
    /// Bounce phase message fees.
    pub bounce: Tokens,
    /// Residual of `total` after subtracting all known components.
    ///
    /// Can be negative when a part of forwarding fees was charged from
    /// the outgoing message value instead of the account balance.
    // TODO: attribute the residual to the import fee of the inbound
    // external message once it is loaded alongside the description.
    pub unaccounted: i128,
}

impl TxFees {
    /// Derives the fee breakdown from the transaction description.
    pub fn compute(total: Tokens, info: &TxInfo) -> Self {
        let mut fees = Self {
            total,
            ..Default::default()
        };

        let (storage_phase, compute_phase, action_phase) = match info {
            TxInfo::Ordinary(info) => {
                if let Some(BouncePhase::Executed(phase)) = &info.bounce_phase {
                    fees.bounce = phase.msg_fees;
                }
                (
                    info.storage_phase.as_ref(),
                    &info.compute_phase,
                    info.action_phase.as_ref(),
                )
            }
            TxInfo::TickTock(info) => (
                Some(&info.storage_phase),
                &info.compute_phase,
                info.action_phase.as_ref(),
            ),
        };

        if let Some(phase) = storage_phase {
            fees.storage = phase.storage_fees_collected;
        }
        fees.compute = compute_phase.gas_fees();
        if let Some(phase) = action_phase {
            fees.action = phase.total_action_fees.unwrap_or_default();
            fees.forward = phase.total_fwd_fees.unwrap_or_default();
        }

        let known = fees.storage.into_inner() as i128
            + fees.compute.into_inner() as i128
            + fees.action.into_inner() as i128
            + fees.bounce.into_inner() as i128;
        fees.unaccounted = total.into_inner() as i128 - known;
        fees
    }
}
