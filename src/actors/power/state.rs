// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::{BTreeMap, BTreeSet};

use crate::actor_error;
use crate::actors::{ActorError, Policy};
use crate::shim::{
    ActorID, address::Address, clock::ChainEpoch, econ::TokenAmount, sector::StoragePower,
};
use num_traits::{Signed as _, Zero as _};

/// First ID handed out to a registered miner.
pub const FIRST_MINER_ID: ActorID = 1000;

/// Power and collateral of one registered miner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PowerEntry {
    /// Power of sectors that proved in their last proving period.
    pub active_power: StoragePower,
    /// Power of committed, recovering and failing sectors.
    pub inactive_power: StoragePower,
    pub available_balance: TokenAmount,
    pub locked_pledge_collateral: TokenAmount,
}

impl PowerEntry {
    pub fn total_power(&self) -> StoragePower {
        &self.active_power + &self.inactive_power
    }

    pub fn total_balance(&self) -> TokenAmount {
        &self.available_balance + &self.locked_pledge_collateral
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerInfo {
    pub owner: Address,
    /// Key the miner signs tickets and election proofs with.
    pub worker: Address,
    pub peer_id: Vec<u8>,
}

/// The power ledger.
#[derive(Debug, Clone, PartialEq, Eq, smart_default::SmartDefault)]
pub struct State {
    entries: BTreeMap<ActorID, PowerEntry>,
    info: BTreeMap<ActorID, MinerInfo>,
    /// Sum of active and inactive power over all entries.
    total_power: StoragePower,
    #[default(FIRST_MINER_ID)]
    next_miner_id: ActorID,
    /// Consensus faults already punished, keyed by offender and fault epoch.
    slashed_consensus_faults: BTreeSet<(ActorID, ChainEpoch)>,
}

impl State {
    pub fn total_power(&self) -> &StoragePower {
        &self.total_power
    }

    pub fn entry(&self, miner: ActorID) -> Option<&PowerEntry> {
        self.entries.get(&miner)
    }

    pub fn info(&self, miner: ActorID) -> Option<&MinerInfo> {
        self.info.get(&miner)
    }

    pub fn miner_count(&self) -> usize {
        self.entries.len()
    }

    /// Registered miners in ascending ID order.
    pub fn miners(&self) -> impl Iterator<Item = ActorID> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (ActorID, &PowerEntry)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn is_slashed(&self, miner: ActorID, epoch: ChainEpoch) -> bool {
        self.slashed_consensus_faults.contains(&(miner, epoch))
    }

    pub(super) fn slashed_consensus_faults(&self) -> &BTreeSet<(ActorID, ChainEpoch)> {
        &self.slashed_consensus_faults
    }

    pub(super) fn next_miner_id(&self) -> ActorID {
        self.next_miner_id
    }

    fn entry_mut(&mut self, miner: ActorID) -> Result<&mut PowerEntry, ActorError> {
        self.entries
            .get_mut(&miner)
            .ok_or_else(|| actor_error!(not_found; "miner {} is not registered", miner))
    }

    /// Registers a zero-initialized entry under a fresh ID.
    pub fn register_miner(&mut self, info: MinerInfo) -> ActorID {
        let id = self.next_miner_id;
        self.next_miner_id += 1;
        self.entries.insert(id, PowerEntry::default());
        self.info.insert(id, info);
        id
    }

    /// Deletes the entry of a miner without power and returns it.
    pub fn remove_miner(&mut self, miner: ActorID) -> Result<(PowerEntry, MinerInfo), ActorError> {
        let entry = self.entry_mut(miner)?;
        if !entry.total_power().is_zero() {
            return Err(actor_error!(
                invalid_state_transition;
                "power still remains for miner {}: {}",
                miner,
                entry.total_power()
            ));
        }
        let entry = self
            .entries
            .remove(&miner)
            .ok_or_else(|| actor_error!(illegal_state; "entry of miner {} vanished", miner))?;
        let info = self
            .info
            .remove(&miner)
            .ok_or_else(|| actor_error!(illegal_state; "miner {} has no info", miner))?;
        Ok((entry, info))
    }

    pub fn add_balance(&mut self, miner: ActorID, amount: &TokenAmount) -> Result<(), ActorError> {
        if amount.is_negative() {
            return Err(actor_error!(invalid_input; "cannot add negative amount {}", amount));
        }
        let entry = self.entry_mut(miner)?;
        entry.available_balance += amount;
        Ok(())
    }

    pub fn withdraw_balance(
        &mut self,
        miner: ActorID,
        amount: &TokenAmount,
    ) -> Result<(), ActorError> {
        if amount.is_negative() {
            return Err(actor_error!(invalid_input; "cannot withdraw negative amount {}", amount));
        }
        let entry = self.entry_mut(miner)?;
        if amount > &entry.available_balance {
            return Err(actor_error!(
                insufficient_funds;
                "cannot withdraw {} from available balance {}",
                amount,
                entry.available_balance
            ));
        }
        entry.available_balance -= amount;
        Ok(())
    }

    /// Locks enough of the available balance that the locked collateral backs
    /// the miner's power plus `additional_power`. Returns the amount moved.
    pub fn ensure_pledge_collateral(
        &mut self,
        policy: &Policy,
        miner: ActorID,
        additional_power: &StoragePower,
    ) -> Result<TokenAmount, ActorError> {
        let entry = self.entry_mut(miner)?;
        let required = policy.pledge_requirement(&(entry.total_power() + additional_power));
        if entry.locked_pledge_collateral >= required {
            return Ok(TokenAmount::default());
        }
        let available = entry.total_balance();
        if available < required {
            return Err(ActorError::InsufficientPledgeCollateral {
                miner,
                required,
                available,
            });
        }
        let shortfall = &required - &entry.locked_pledge_collateral;
        entry.available_balance -= &shortfall;
        entry.locked_pledge_collateral = required;
        Ok(shortfall)
    }

    /// Removes up to `amount` of locked collateral, floored at zero. Returns
    /// the amount actually removed.
    pub fn slash_pledge_collateral(
        &mut self,
        miner: ActorID,
        amount: &TokenAmount,
    ) -> Result<TokenAmount, ActorError> {
        if amount.is_negative() {
            return Err(actor_error!(invalid_input; "cannot slash negative amount {}", amount));
        }
        let entry = self.entry_mut(miner)?;
        let slashed = amount.clone().min(entry.locked_pledge_collateral.clone());
        entry.locked_pledge_collateral -= &slashed;
        Ok(slashed)
    }

    /// Records that the fault of `miner` at `epoch` has been punished.
    /// Fails if it already was.
    pub fn record_consensus_fault(
        &mut self,
        miner: ActorID,
        epoch: ChainEpoch,
    ) -> Result<(), ActorError> {
        if !self.slashed_consensus_faults.insert((miner, epoch)) {
            return Err(ActorError::AlreadySlashed { miner, epoch });
        }
        Ok(())
    }

    /// Overwrites the power of `miner`, keeping the total in step. Returns the
    /// change in active power.
    pub(in crate::actors) fn set_power(
        &mut self,
        miner: ActorID,
        active_power: StoragePower,
        inactive_power: StoragePower,
    ) -> Result<StoragePower, ActorError> {
        if active_power.is_negative() || inactive_power.is_negative() {
            return Err(actor_error!(
                illegal_state;
                "negative power reported for miner {}: active {}, inactive {}",
                miner,
                active_power,
                inactive_power
            ));
        }
        let entry = self.entry_mut(miner)?;
        let old_total = entry.total_power();
        let active_delta = &active_power - &entry.active_power;
        entry.active_power = active_power;
        entry.inactive_power = inactive_power;
        let new_total = entry.total_power();
        self.total_power += new_total - old_total;
        Ok(active_delta)
    }
}
