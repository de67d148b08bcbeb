// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use super::bitfield_queue::{ExpirationQueue, ProvingSet};
use crate::actors::Policy;
use crate::shim::{
    ActorID, clock::ChainEpoch, deal::DealID, sector::SectorNumber, sector::StoragePower,
};
use cid::Cid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealCommitment {
    pub unsealed_cid: Cid,
    pub sealed_cid: Cid,
    pub deal_ids: Vec<DealID>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorOnChainInfo {
    pub sector_number: SectorNumber,
    pub seal_commitment: SealCommitment,
    pub expiration: ChainEpoch,
}

/// Cleared sectors are not represented; they are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum SectorState {
    Committed,
    Active,
    Recovering,
    Failing,
}

impl SectorState {
    /// Whether a sector in this state owes a proof this period.
    pub fn is_proving(self) -> bool {
        !matches!(self, SectorState::Failing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorStatus {
    pub state: SectorState,
    /// Consecutive proving periods the sector has been faulty.
    pub fault_count: u64,
}

/// Sector state of one miner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub sectors: BTreeMap<SectorNumber, SectorOnChainInfo>,
    pub sector_states: BTreeMap<SectorNumber, SectorStatus>,
    pub proving_set: ProvingSet,
    pub expiration_queue: ExpirationQueue,
    /// Proving period in which a PoSt was last accepted.
    pub last_post_period: Option<ChainEpoch>,
    /// Proving period last closed by cron.
    pub last_cron_period: Option<ChainEpoch>,
}

impl State {
    pub fn sector(&self, sector: SectorNumber) -> Option<&SectorOnChainInfo> {
        self.sectors.get(&sector)
    }

    pub fn status(&self, sector: SectorNumber) -> Option<SectorStatus> {
        self.sector_states.get(&sector).copied()
    }

    pub fn count_in(&self, state: SectorState) -> usize {
        self.sector_states
            .values()
            .filter(|status| status.state == state)
            .count()
    }

    /// Sectors in `state`, in ascending order.
    pub fn sectors_in(&self, state: SectorState) -> Vec<SectorNumber> {
        self.sector_states
            .iter()
            .filter(|(_, status)| status.state == state)
            .map(|(sector, _)| *sector)
            .collect()
    }

    pub fn deal_ids(&self, sectors: &[SectorNumber]) -> Vec<DealID> {
        sectors
            .iter()
            .filter_map(|sector| self.sectors.get(sector))
            .flat_map(|info| info.seal_commitment.deal_ids.iter().copied())
            .collect()
    }

    /// Absolute `(active, inactive)` power implied by the sector states.
    pub fn power(&self, policy: &Policy) -> (StoragePower, StoragePower) {
        let active = self.count_in(SectorState::Active);
        let inactive = self.sector_states.len() - active;
        (
            policy.power_for_sectors(active),
            policy.power_for_sectors(inactive),
        )
    }

    pub(super) fn add_sector(&mut self, info: SectorOnChainInfo) {
        let sector = info.sector_number;
        self.expiration_queue.add(info.expiration, sector);
        self.proving_set.insert(sector);
        self.sector_states.insert(
            sector,
            SectorStatus {
                state: SectorState::Committed,
                fault_count: 0,
            },
        );
        self.sectors.insert(sector, info);
    }

    /// Moves a live sector to `state`, keeping proving set membership in step.
    pub(super) fn set_state(&mut self, sector: SectorNumber, state: SectorState, fault_count: u64) {
        self.sector_states
            .insert(sector, SectorStatus { state, fault_count });
        if state.is_proving() {
            self.proving_set.insert(sector);
        } else {
            self.proving_set.remove(sector);
        }
    }

    /// Deletes a sector and all its bookkeeping. Returns its info.
    pub(super) fn clear_sector(&mut self, sector: SectorNumber) -> Option<SectorOnChainInfo> {
        let info = self.sectors.remove(&sector)?;
        self.sector_states.remove(&sector);
        self.proving_set.remove(sector);
        self.expiration_queue.remove(info.expiration, sector);
        Some(info)
    }
}

/// Entropy binding randomness draws to one miner.
pub(super) fn miner_entropy(miner: ActorID) -> [u8; 8] {
    miner.to_be_bytes()
}
