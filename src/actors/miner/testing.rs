// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeSet;

use crate::shim::sector::SectorNumber;
use crate::utils::MessageAccumulator;

use super::State;

/// Checks internal invariants of miner state
pub fn check_state_invariants(state: &State) -> MessageAccumulator {
    let acc = MessageAccumulator::default();

    let sectors: BTreeSet<SectorNumber> = state.sectors.keys().copied().collect();
    let statuses: BTreeSet<SectorNumber> = state.sector_states.keys().copied().collect();
    acc.require(
        sectors == statuses,
        format!("sectors {sectors:?} do not match sector states {statuses:?}"),
    );

    for (sector, status) in &state.sector_states {
        let acc = acc.with_prefix(format!("sector {sector}: "));
        acc.require(
            state.proving_set.contains(*sector) == status.state.is_proving(),
            format!(
                "{} sector proving set membership is {}",
                status.state,
                state.proving_set.contains(*sector)
            ),
        );
    }
    for sector in state.proving_set.iter() {
        acc.require(
            state.sector_states.contains_key(&sector),
            format!("proving set holds cleared sector {sector}"),
        );
    }

    let mut queued = BTreeSet::new();
    for (epoch, sector) in state.expiration_queue.entries() {
        let acc = acc.with_prefix(format!("sector {sector}: "));
        acc.require(queued.insert(sector), "queued for expiration more than once");
        match state.sectors.get(&sector) {
            Some(info) => acc.require(
                info.expiration == epoch,
                format!("queued at {epoch} but expires at {}", info.expiration),
            ),
            None => acc.add(format!("cleared sector queued for expiration at {epoch}")),
        }
    }
    acc.require(
        queued == sectors,
        format!("expiration queue {queued:?} does not cover sectors {sectors:?}"),
    );

    acc
}
