// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::actors::ConsensusFaultType;
use crate::fil_cns::ConsensusFaultProof;
use crate::shim::{ActorID, address::Address, sector::StoragePower};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMinerParams {
    pub owner: Address,
    pub worker: Address,
    pub peer_id: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConsensusFaultParams {
    /// Receives the bounty.
    pub slasher: Address,
    pub fault_type: ConsensusFaultType,
    pub proof: ConsensusFaultProof,
}

/// Absolute power of a miner as computed from its sector states. Only the
/// sector lifecycle can build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerReport {
    pub(in crate::actors) miner: ActorID,
    pub(in crate::actors) active_power: StoragePower,
    pub(in crate::actors) inactive_power: StoragePower,
}

impl PowerReport {
    pub(in crate::actors) fn new(
        miner: ActorID,
        active_power: StoragePower,
        inactive_power: StoragePower,
    ) -> Self {
        Self {
            miner,
            active_power,
            inactive_power,
        }
    }

    pub fn miner(&self) -> ActorID {
        self.miner
    }

    pub fn active_power(&self) -> &StoragePower {
        &self.active_power
    }

    pub fn inactive_power(&self) -> &StoragePower {
        &self.inactive_power
    }
}
