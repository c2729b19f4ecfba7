use super::*;
use crate::models::message::{ExtOutMsgInfo, MessageLayout, MsgInfo};
use crate::models::{ExtAddr, StdAddr};
use crate::prelude::{Boc, Cell, CellBuilder};

fn event_message(index: u8, lt: u64) -> Cell {
    let message = Message {
        info: MsgInfo::ExtOut(ExtOutMsgInfo {
            src: StdAddr::new(0, HashBytes([0x11; 32])).into(),
            dst: ExtAddr::new(256, vec![index; 32]),
            created_lt: lt,
            created_at: 1700000000,
        }),
        init: None,
        body: CellBuilder::build_from(index as u32).unwrap(),
        layout: MessageLayout::plain(),
    };
    CellBuilder::build_from(&message).unwrap()
}

fn executed_compute_phase(gas_fees: u128) -> ComputePhase {
    ComputePhase::Executed(ExecutedComputePhase {
        success: true,
        msg_state_used: false,
        account_activated: false,
        gas_fees: Tokens::new(gas_fees),
        gas_used: VarUint56::new(5000),
        gas_limit: VarUint56::new(1_000_000),
        gas_credit: Some(VarUint24::new(10_000)),
        mode: 0,
        exit_code: 0,
        exit_arg: None,
        vm_steps: 120,
        vm_init_state_hash: HashBytes::ZERO,
        vm_final_state_hash: HashBytes::ZERO,
    })
}

fn sample_tx(out_count: u16) -> Transaction {
    let mut out_msgs = Dict::new();
    for i in 0..out_count {
        out_msgs
            .set(Uint15::new(i), event_message(i as u8, 1001 + i as u64))
            .unwrap();
    }

    Transaction {
        account: HashBytes([0x11; 32]),
        lt: 1000,
        prev_trans_hash: HashBytes([0x22; 32]),
        prev_trans_lt: 900,
        now: 1700000000,
        out_msg_count: Uint15::new(out_count),
        orig_status: AccountStatus::Active,
        end_status: AccountStatus::Active,
        in_msg: None,
        out_msgs,
        total_fees: CurrencyCollection::new(1_500_000),
        state_update: HashUpdate {
            old: HashBytes([0x01; 32]),
            new: HashBytes([0x02; 32]),
        },
        info: TxInfo::Ordinary(OrdinaryTxInfo {
            credit_first: true,
            storage_phase: Some(StoragePhase {
                storage_fees_collected: Tokens::new(100_000),
                storage_fees_due: None,
                status_change: AccountStatusChange::Unchanged,
            }),
            credit_phase: None,
            compute_phase: executed_compute_phase(1_000_000),
            action_phase: Some(ActionPhase {
                success: true,
                valid: true,
                no_funds: false,
                status_change: AccountStatusChange::Unchanged,
                total_fwd_fees: Some(Tokens::new(600_000)),
                total_action_fees: Some(Tokens::new(200_000)),
                result_code: 0,
                result_arg: None,
                total_actions: out_count,
                special_actions: 0,
                skipped_actions: 0,
                messages_created: out_count,
                action_list_hash: HashBytes([0x33; 32]),
                total_message_size: StorageUsedShort {
                    cells: VarUint56::new(out_count as u64),
                    bits: VarUint56::new(1234),
                },
            }),
            aborted: false,
            bounce_phase: None,
            destroyed: false,
        }),
    }
}

fn check_tx(tx: &Transaction) -> Cell {
    let cell = CellBuilder::build_from(tx).unwrap();
    let boc = Boc::encode(&cell);
    let decoded = Boc::decode(boc).unwrap();
    assert_eq!(decoded, cell);

    let parsed = decoded.parse::<Transaction>().unwrap();
    assert_eq!(&parsed, tx);

    let out_msgs = parsed.load_out_msgs().unwrap();
    assert_eq!(out_msgs.len(), tx.out_msg_count.into_inner() as usize);
    for (i, msg) in out_msgs.iter().enumerate() {
        let (info, body) = msg.as_ext_out().unwrap();
        assert_eq!(info.created_lt, 1001 + i as u64);
        assert_eq!(body.parse::<u32>().unwrap(), i as u32);
    }

    assert_eq!(CellBuilder::build_from(&parsed).unwrap(), cell);
    cell
}

#[test]
fn ordinary_tx_without_outgoing() {
    let tx = sample_tx(0);
    check_tx(&tx);
    assert!(tx.load_in_msg().unwrap().is_none());
}

#[test]
fn ordinary_tx_with_outgoing() {
    check_tx(&sample_tx(5));
}

#[test]
fn tick_tock_tx() {
    let mut tx = sample_tx(1);
    tx.info = TxInfo::TickTock(TickTockTxInfo {
        kind: TickTock::Tock,
        storage_phase: StoragePhase {
            storage_fees_collected: Tokens::ZERO,
            storage_fees_due: Some(Tokens::new(10)),
            status_change: AccountStatusChange::Frozen,
        },
        compute_phase: ComputePhase::Skipped(ComputePhaseSkipReason::NoGas),
        action_phase: None,
        aborted: true,
        destroyed: false,
    });
    check_tx(&tx);
    assert!(tx.info.is_aborted());
}

#[test]
fn fee_breakdown() {
    let tx = sample_tx(2);
    let fees = tx.fees();
    assert_eq!(fees.total, Tokens::new(1_500_000));
    assert_eq!(fees.storage, Tokens::new(100_000));
    assert_eq!(fees.compute, Tokens::new(1_000_000));
    assert_eq!(fees.action, Tokens::new(200_000));
    assert_eq!(fees.forward, Tokens::new(600_000));
    assert_eq!(fees.unaccounted, 200_000);

    let mut tx = tx;
    tx.total_fees = CurrencyCollection::new(1_000_000);
    assert_eq!(tx.fees().unaccounted, -300_000);
}
