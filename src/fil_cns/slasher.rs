// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks::{CachingBlockHeader, RawBlockHeader};
use crate::shim::{address::Address, clock::ChainEpoch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConsensusFaultKind {
    /// Two blocks at the same epoch.
    DoubleForkMining,
    /// Two blocks on the same parents at different epochs.
    TimeOffsetMining,
    /// A block that ignored the miner's own block on the parent epoch.
    ParentGrinding,
}

/// Two blocks signed by the same miner, plus the parent of `block_b` when
/// proving parent grinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusFaultProof {
    pub block_a: RawBlockHeader,
    pub block_b: RawBlockHeader,
    pub witness: Option<RawBlockHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusFault {
    pub offender: Address,
    /// Earlier epoch of the two blocks, so that either order of the same
    /// evidence names the same fault. Faults are punished once per offender
    /// and epoch.
    pub epoch: ChainEpoch,
    pub kind: ConsensusFaultKind,
}

/// Finds the consensus fault shown by two headers from one miner.
pub fn check_consensus_fault(
    proof: &ConsensusFaultProof,
) -> Result<Option<ConsensusFault>, String> {
    let block_a = CachingBlockHeader::new(proof.block_a.clone()).map_err(|e| e.to_string())?;
    let block_b = CachingBlockHeader::new(proof.block_b.clone()).map_err(|e| e.to_string())?;

    if block_a.miner_address != block_b.miner_address {
        return Err(format!(
            "blocks mined by different miners: {} and {}",
            block_a.miner_address, block_b.miner_address
        ));
    }
    if block_a.cid() == block_b.cid() {
        return Err("no consensus fault: blocks are identical".into());
    }

    let fault = |kind: ConsensusFaultKind| -> Result<Option<ConsensusFault>, String> {
        Ok(Some(ConsensusFault {
            offender: block_b.miner_address,
            epoch: block_a.epoch.min(block_b.epoch),
            kind,
        }))
    };

    // Double-fork mining check
    if block_a.epoch == block_b.epoch {
        return fault(ConsensusFaultKind::DoubleForkMining);
    }

    // Time-offset mining check
    if block_a.parents == block_b.parents {
        return fault(ConsensusFaultKind::TimeOffsetMining);
    }

    // Parent-grinding check
    if let Some(witness) = &proof.witness {
        let block_c = CachingBlockHeader::new(witness.clone()).map_err(|e| e.to_string())?;
        if block_a.parents == block_c.parents
            && block_a.epoch == block_c.epoch
            && block_b.parents.contains(block_c.cid())
            && !block_b.parents.contains(block_a.cid())
        {
            return fault(ConsensusFaultKind::ParentGrinding);
        }
    }

    Ok(None)
}
