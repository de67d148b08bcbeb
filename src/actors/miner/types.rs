// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{clock::ChainEpoch, deal::DealID, sector::SectorNumber};
use cid::Cid;
use fvm_ipld_bitfield::BitField;

/// Largest sector number a miner may commit.
pub const MAX_SECTOR_NUMBER: SectorNumber = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSectorParams {
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub unsealed_cid: Cid,
    pub deal_ids: Vec<DealID>,
    pub expiration: ChainEpoch,
    pub proof: Vec<u8>,
}

/// A proof of spacetime over the sectors in `proved`.
#[derive(Debug, Clone)]
pub struct PoStSubmission {
    pub proved: BitField,
    pub proof: Vec<u8>,
}
