use crate::cell::*;
use crate::error::Error;
use crate::num::*;

use crate::models::message::CurrencyCollection;

/// Storage phase info.
///
/// At this phase account pays for storing its state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StoragePhase {
    /// Amount of tokens collected for storing this contract for some time.
    pub storage_fees_collected: Tokens,
    /// Amount of tokens which this account owes to the network
    /// (if there was not enough balance to pay storage fee).
    pub storage_fees_due: Option<Tokens>,
    /// Account status change during execution of this phase.
    pub status_change: AccountStatusChange,
}

impl Store for StoragePhase {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.storage_fees_collected.store_into(builder));
        ok!(self.storage_fees_due.store_into(builder));
        self.status_change.store_into(builder)
    }
}

impl<'a> Load<'a> for StoragePhase {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            storage_fees_collected: ok!(Tokens::load_from(slice)),
            storage_fees_due: ok!(Option::<Tokens>::load_from(slice)),
            status_change: ok!(AccountStatusChange::load_from(slice)),
        })
    }
}

/// Credit phase info.
///
/// At this phase message balance is added to the account balance.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CreditPhase {
    /// Amount of tokens paid for the debt.
    pub due_fees_collected: Option<Tokens>,
    /// Amount of tokens added to the account balance from the remaining
    /// message balance.
    pub credit: CurrencyCollection,
}

impl Store for CreditPhase {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.due_fees_collected.store_into(builder));
        self.credit.store_into(builder)
    }
}

impl<'a> Load<'a> for CreditPhase {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            due_fees_collected: ok!(Option::<Tokens>::load_from(slice)),
            credit: ok!(CurrencyCollection::load_from(slice)),
        })
    }
}

/// Compute phase info.
///
/// At this phase the VM is executed to produce a list of actions.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ComputePhase {
    /// Compute phase was skipped.
    Skipped(ComputePhaseSkipReason),
    /// Compute phase was executed.
    Executed(ExecutedComputePhase),
}

impl ComputePhase {
    /// Returns gas fees if the phase was executed.
    pub fn gas_fees(&self) -> Tokens {
        match self {
            Self::Skipped(_) => Tokens::ZERO,
            Self::Executed(phase) => phase.gas_fees,
        }
    }
}

impl Store for ComputePhase {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::Skipped(reason) => {
                ok!(builder.store_bit_zero());
                reason.store_into(builder)
            }
            Self::Executed(phase) => {
                let cell = {
                    let mut builder = CellBuilder::new();
                    ok!(phase.gas_used.store_into(&mut builder));
                    ok!(phase.gas_limit.store_into(&mut builder));
                    ok!(phase.gas_credit.store_into(&mut builder));
                    ok!(builder.store_u8(phase.mode as u8));
                    ok!(builder.store_u32(phase.exit_code as u32));
                    ok!(phase.exit_arg.store_into(&mut builder));
                    ok!(builder.store_u32(phase.vm_steps));
                    ok!(builder.store_u256(&phase.vm_init_state_hash));
                    ok!(builder.store_u256(&phase.vm_final_state_hash));
                    ok!(builder.build())
                };

                let flags = 0b1000u8
                    | ((phase.success as u8) << 2)
                    | ((phase.msg_state_used as u8) << 1)
                    | (phase.account_activated as u8);
                ok!(builder.store_small_uint(flags, 4));
                ok!(phase.gas_fees.store_into(builder));
                builder.store_reference(cell)
            }
        }
    }
}

impl<'a> Load<'a> for ComputePhase {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if !ok!(slice.load_bit()) {
            return Ok(Self::Skipped(ok!(ComputePhaseSkipReason::load_from(slice))));
        }

        let flags = ok!(slice.load_small_uint(3));
        let gas_fees = ok!(Tokens::load_from(slice));

        let slice = &mut ok!(slice.load_reference_as_slice());
        Ok(Self::Executed(ExecutedComputePhase {
            success: flags & 0b100 != 0,
            msg_state_used: flags & 0b010 != 0,
            account_activated: flags & 0b001 != 0,
            gas_fees,
            gas_used: ok!(VarUint56::load_from(slice)),
            gas_limit: ok!(VarUint56::load_from(slice)),
            gas_credit: ok!(Option::<VarUint24>::load_from(slice)),
            mode: ok!(slice.load_u8()) as i8,
            exit_code: ok!(slice.load_u32()) as i32,
            exit_arg: ok!(Option::<i32>::load_from(slice)),
            vm_steps: ok!(slice.load_u32()),
            vm_init_state_hash: ok!(slice.load_u256()),
            vm_final_state_hash: ok!(slice.load_u256()),
        }))
    }
}

/// Executed compute phase info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExecutedComputePhase {
    /// Whether the execution was successful.
    pub success: bool,
    /// Whether the `init` from the incoming message was used.
    pub msg_state_used: bool,
    /// Whether the account state changed to `Active` during this phase.
    pub account_activated: bool,
    /// Total amount of tokens spent to execute this phase.
    pub gas_fees: Tokens,
    /// Amount of gas used by the VM to execute this phase.
    pub gas_used: VarUint56,
    /// Max gas amount which could be used.
    pub gas_limit: VarUint56,
    /// Max gas amount which could be used before accepting this transaction.
    pub gas_credit: Option<VarUint24>,
    /// Execution mode.
    pub mode: i8,
    /// VM exit code.
    pub exit_code: i32,
    /// Additional VM exit argument.
    pub exit_arg: Option<i32>,
    /// The number of VM steps it took to complete this phase.
    pub vm_steps: u32,
    /// Hash of the initial state of the VM.
    pub vm_init_state_hash: HashBytes,
    /// Hash of the VM state after executing this phase.
    pub vm_final_state_hash: HashBytes,
}

/// Enum with reasons for skipping compute phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComputePhaseSkipReason {
    /// Contract doesn't have state to execute.
    NoState = 0b00,
    /// Contract state is invalid.
    BadState = 0b01,
    /// Not enough gas to execute compute phase.
    NoGas = 0b10,
    /// Account was suspended by the config.
    Suspended = 0b11,
}

impl Store for ComputePhaseSkipReason {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_small_uint(*self as u8, 2)
    }
}

impl<'a> Load<'a> for ComputePhaseSkipReason {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(match ok!(slice.load_small_uint(2)) {
            0b00 => Self::NoState,
            0b01 => Self::BadState,
            0b10 => Self::NoGas,
            _ => Self::Suspended,
        })
    }
}

/// Action phase info.
///
/// At this phase the list of actions from the compute phase
/// is converted into updates and outgoing messages.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActionPhase {
    /// Whether the execution was successful.
    pub success: bool,
    /// Whether the action list was valid.
    pub valid: bool,
    /// There were no funds to create an outgoing message.
    pub no_funds: bool,
    /// Account status change during execution of this phase.
    pub status_change: AccountStatusChange,
    /// Total forwarding fee for outgoing messages.
    pub total_fwd_fees: Option<Tokens>,
    /// Total fees for processing all actions.
    pub total_action_fees: Option<Tokens>,
    /// Result code of the phase.
    pub result_code: i32,
    /// Optional result argument of the phase.
    pub result_arg: Option<i32>,
    /// The total number of processed actions.
    pub total_actions: u16,
    /// The number of special actions (`ReserveCurrency`, `SetCode`, `ChangeLibrary`, copyleft).
    pub special_actions: u16,
    /// The number of skipped actions.
    pub skipped_actions: u16,
    /// The number of outgoing messages created by the compute phase.
    pub messages_created: u16,
    /// The hash of the actions list.
    pub action_list_hash: HashBytes,
    /// The total number of unique cells (bits / refs) of produced messages.
    pub total_message_size: StorageUsedShort,
}

impl Store for ActionPhase {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let flags = ((self.success as u8) << 2) | ((self.valid as u8) << 1) | self.no_funds as u8;
        let counts = ((self.total_actions as u64) << 48)
            | ((self.special_actions as u64) << 32)
            | ((self.skipped_actions as u64) << 16)
            | self.messages_created as u64;

        ok!(builder.store_small_uint(flags, 3));
        ok!(self.status_change.store_into(builder));
        ok!(self.total_fwd_fees.store_into(builder));
        ok!(self.total_action_fees.store_into(builder));
        ok!(builder.store_u32(self.result_code as u32));
        ok!(self.result_arg.store_into(builder));
        ok!(builder.store_u64(counts));
        ok!(builder.store_u256(&self.action_list_hash));
        self.total_message_size.store_into(builder)
    }
}

impl<'a> Load<'a> for ActionPhase {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let flags = ok!(slice.load_small_uint(3));

        let status_change = ok!(AccountStatusChange::load_from(slice));
        let total_fwd_fees = ok!(Option::<Tokens>::load_from(slice));
        let total_action_fees = ok!(Option::<Tokens>::load_from(slice));
        let result_code = ok!(slice.load_u32()) as i32;
        let result_arg = ok!(Option::<i32>::load_from(slice));

        let counts = ok!(slice.load_u64());

        Ok(Self {
            success: flags & 0b100 != 0,
            valid: flags & 0b010 != 0,
            no_funds: flags & 0b001 != 0,
            status_change,
            total_fwd_fees,
            total_action_fees,
            result_code,
            result_arg,
            total_actions: (counts >> 48) as u16,
            special_actions: (counts >> 32) as u16,
            skipped_actions: (counts >> 16) as u16,
            messages_created: counts as u16,
            action_list_hash: ok!(slice.load_u256()),
            total_message_size: ok!(StorageUsedShort::load_from(slice)),
        })
    }
}

/// Bounce phase info.
///
/// At this stage some funds are returned back to the sender.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BouncePhase {
    /// Default phase state.
    NegativeFunds,
    /// There were not enough funds to execute this phase.
    NoFunds(NoFundsBouncePhase),
    /// Bounce phase was executed.
    Executed(ExecutedBouncePhase),
}

impl Store for BouncePhase {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::NegativeFunds => builder.store_small_uint(0b00, 2),
            Self::NoFunds(phase) => {
                ok!(builder.store_small_uint(0b01, 2));
                ok!(phase.msg_size.store_into(builder));
                phase.req_fwd_fees.store_into(builder)
            }
            Self::Executed(phase) => {
                ok!(builder.store_bit_one());
                ok!(phase.msg_size.store_into(builder));
                ok!(phase.msg_fees.store_into(builder));
                phase.fwd_fees.store_into(builder)
            }
        }
    }
}

impl<'a> Load<'a> for BouncePhase {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(if ok!(slice.load_bit()) {
            Self::Executed(ExecutedBouncePhase {
                msg_size: ok!(StorageUsedShort::load_from(slice)),
                msg_fees: ok!(Tokens::load_from(slice)),
                fwd_fees: ok!(Tokens::load_from(slice)),
            })
        } else if ok!(slice.load_bit()) {
            Self::NoFunds(NoFundsBouncePhase {
                msg_size: ok!(StorageUsedShort::load_from(slice)),
                req_fwd_fees: ok!(Tokens::load_from(slice)),
            })
        } else {
            Self::NegativeFunds
        })
    }
}

/// Skipped bounce phase info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NoFundsBouncePhase {
    /// The total number of unique cells (bits / refs) of the bounced message.
    pub msg_size: StorageUsedShort,
    /// Required amount of tokens to send the bounced message.
    pub req_fwd_fees: Tokens,
}

/// Executed bounce phase info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExecutedBouncePhase {
    /// The total number of unique cells (bits / refs) of the bounced message.
    pub msg_size: StorageUsedShort,
    /// The part of fees which go to the validators.
    pub msg_fees: Tokens,
    /// Message forwarding fee.
    pub fwd_fees: Tokens,
}

/// Account status change during transaction execution.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AccountStatusChange {
    /// Account status has not changed.
    Unchanged = 0b0,
    /// Account has been frozen.
    Frozen = 0b10,
    /// Account deleted.
    Deleted = 0b11,
}

impl Store for AccountStatusChange {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if *self == Self::Unchanged {
            builder.store_bit_zero()
        } else {
            builder.store_small_uint(*self as u8, 2)
        }
    }
}

impl<'a> Load<'a> for AccountStatusChange {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(if !ok!(slice.load_bit()) {
            Self::Unchanged
        } else if ok!(slice.load_bit()) {
            Self::Deleted
        } else {
            Self::Frozen
        })
    }
}

/// Amount of unique cells and bits.
///
/// ```text
/// storage_used_short$_ cells:(VarUInteger 7) bits:(VarUInteger 7) = StorageUsedShort;
/// ```
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct StorageUsedShort {
    /// Amount of unique cells.
    pub cells: VarUint56,
    /// The total number of bits in unique cells.
    pub bits: VarUint56,
}

impl Store for StorageUsedShort {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(self.cells.store_into(builder));
        self.bits.store_into(builder)
    }
}

impl<'a> Load<'a> for StorageUsedShort {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            cells: ok!(VarUint56::load_from(slice)),
            bits: ok!(VarUint56::load_from(slice)),
        })
    }
}
