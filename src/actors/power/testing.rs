// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::sector::StoragePower;
use crate::utils::MessageAccumulator;
use num_traits::Signed as _;

use super::{FIRST_MINER_ID, State};

/// Checks internal invariants of power state
pub fn check_state_invariants(state: &State) -> MessageAccumulator {
    let acc = MessageAccumulator::default();

    let mut sum = StoragePower::default();
    for (id, entry) in state.entries() {
        let acc = acc.with_prefix(format!("miner {id}: "));
        acc.require(
            !entry.active_power.is_negative(),
            format!("active power is negative {}", entry.active_power),
        );
        acc.require(
            !entry.inactive_power.is_negative(),
            format!("inactive power is negative {}", entry.inactive_power),
        );
        acc.require(
            !entry.available_balance.is_negative(),
            format!("available balance is negative {}", entry.available_balance),
        );
        acc.require(
            !entry.locked_pledge_collateral.is_negative(),
            format!(
                "locked pledge collateral is negative {}",
                entry.locked_pledge_collateral
            ),
        );
        acc.require(state.info(id).is_some(), "entry without miner info");
        acc.require(
            (FIRST_MINER_ID..state.next_miner_id()).contains(&id),
            format!("id outside allocated range {FIRST_MINER_ID}..{}", state.next_miner_id()),
        );
        sum += entry.total_power();
    }

    acc.require(
        &sum == state.total_power(),
        format!(
            "total power {} does not match sum of entries {sum}",
            state.total_power()
        ),
    );

    for (miner, epoch) in state.slashed_consensus_faults() {
        acc.require(
            *miner < state.next_miner_id(),
            format!("slashed fault of unallocated miner {miner} at epoch {epoch}"),
        );
    }

    acc
}
