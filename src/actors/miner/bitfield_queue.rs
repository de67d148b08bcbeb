// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::BTreeMap;

use crate::shim::{clock::ChainEpoch, sector::SectorNumber};
use fvm_ipld_bitfield::BitField;

/// Sectors owed a proof this proving period.
#[derive(Debug, Clone, Default)]
pub struct ProvingSet(BitField);

impl PartialEq for ProvingSet {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for ProvingSet {}

impl ProvingSet {
    pub fn insert(&mut self, sector: SectorNumber) {
        self.0.set(sector);
    }

    pub fn remove(&mut self, sector: SectorNumber) {
        self.0.unset(sector);
    }

    pub fn contains(&self, sector: SectorNumber) -> bool {
        self.0.get(sector)
    }

    pub fn iter(&self) -> impl Iterator<Item = SectorNumber> + '_ {
        self.0.iter()
    }

    pub fn len(&self) -> u64 {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bitfield(&self) -> &BitField {
        &self.0
    }

    /// Whether `sectors` holds exactly the sectors of this set.
    pub fn matches(&self, sectors: &BitField) -> bool {
        self.0.iter().eq(sectors.iter())
    }
}

/// Sector numbers bucketed by the epoch they expire at.
#[derive(Debug, Clone, Default)]
pub struct ExpirationQueue(BTreeMap<ChainEpoch, BitField>);

impl PartialEq for ExpirationQueue {
    fn eq(&self, other: &Self) -> bool {
        self.entries().eq(other.entries())
    }
}

impl Eq for ExpirationQueue {}

impl ExpirationQueue {
    /// Adds a sector to the queue entry for an epoch.
    pub fn add(&mut self, epoch: ChainEpoch, sector: SectorNumber) {
        self.0.entry(epoch).or_default().set(sector);
    }

    /// Removes a sector from the entry for an epoch, dropping the entry once
    /// empty. Returns whether the sector was queued there.
    pub fn remove(&mut self, epoch: ChainEpoch, sector: SectorNumber) -> bool {
        let Some(bitfield) = self.0.get_mut(&epoch) else {
            return false;
        };
        let present = bitfield.get(sector);
        bitfield.unset(sector);
        if bitfield.is_empty() {
            self.0.remove(&epoch);
        }
        present
    }

    /// Removes and returns all values with keys less than or equal to until.
    pub fn pop_until(&mut self, until: ChainEpoch) -> BitField {
        let mut popped_values = BitField::new();
        let popped_keys: Vec<ChainEpoch> = self.0.range(..=until).map(|(epoch, _)| *epoch).collect();
        for epoch in popped_keys {
            if let Some(bitfield) = self.0.remove(&epoch) {
                popped_values |= &bitfield;
            }
        }
        popped_values
    }

    /// Queued `(epoch, sector)` pairs in epoch order.
    pub fn entries(&self) -> impl Iterator<Item = (ChainEpoch, SectorNumber)> + '_ {
        self.0
            .iter()
            .flat_map(|(epoch, bitfield)| bitfield.iter().map(move |sector| (*epoch, sector)))
    }

    /// Total number of queued sectors.
    pub fn len(&self) -> u64 {
        self.0.values().map(BitField::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
