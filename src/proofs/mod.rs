// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Verification oracles for seals, proofs of spacetime, VRF outputs and
//! consensus fault evidence.

use crate::blocks::{RawBlockHeader, VRFProof};
use crate::fil_cns::{ConsensusFault, ConsensusFaultProof};
use crate::shim::{
    ActorID, address::Address, crypto::verify_bls_sig, deal::DealID, sector::SectorNumber,
};
use crate::utils::encoding::blake2b_256;
use cid::Cid;

/// Everything a seal verifier needs to check one sector commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealVerifyInfo {
    pub miner: ActorID,
    pub sector_number: SectorNumber,
    pub sealed_cid: Cid,
    pub unsealed_cid: Cid,
    pub deal_ids: Vec<DealID>,
    /// Chain randomness at the seal lookback.
    pub randomness: [u8; 32],
    pub proof: Vec<u8>,
}

/// One challenge per sector being proved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoStChallenge {
    pub sector_number: SectorNumber,
    pub challenge: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoStChallenges {
    pub randomness: [u8; 32],
    pub challenges: Vec<PoStChallenge>,
}

impl PoStChallenges {
    /// Derives `blake2b(randomness ‖ sector number)` for every sector in
    /// `sectors`, in iteration order.
    pub fn generate(randomness: [u8; 32], sectors: impl IntoIterator<Item = SectorNumber>) -> Self {
        let challenges = sectors
            .into_iter()
            .map(|sector_number| {
                let mut preimage = Vec::with_capacity(40);
                preimage.extend_from_slice(&randomness);
                preimage.extend_from_slice(&sector_number.to_be_bytes());
                PoStChallenge {
                    sector_number,
                    challenge: blake2b_256(&preimage),
                }
            })
            .collect();
        Self {
            randomness,
            challenges,
        }
    }

    pub fn sector_numbers(&self) -> impl Iterator<Item = SectorNumber> + '_ {
        self.challenges.iter().map(|c| c.sector_number)
    }
}

/// External proof checking. Implementations must be pure: the same inputs
/// always give the same verdict.
pub trait ProofVerifier: Send + Sync {
    fn verify_seal(&self, info: &SealVerifyInfo) -> bool;

    fn verify_post(&self, challenges: &PoStChallenges, proof: &[u8]) -> bool;

    /// Checks that `proof` is the worker's VRF output over `input`. VRF
    /// outputs are BLS signatures.
    fn verify_vrf(&self, worker: &Address, input: &[u8], proof: &VRFProof) -> Result<(), String> {
        verify_bls_sig(proof.as_bytes(), input, worker)
    }

    /// Checks that `header` carries the worker's signature over its signing
    /// bytes.
    fn verify_block_signature(&self, header: &RawBlockHeader, worker: &Address) -> Result<(), String> {
        header
            .verify_signature_against(worker)
            .map_err(|e| e.to_string())
    }

    /// Returns the fault proven by `proof`, `None` if the evidence shows no
    /// fault, or an error when the evidence is malformed. Both blocks must be
    /// signed by `worker`, the worker key of the accused miner.
    fn verify_consensus_fault(
        &self,
        proof: &ConsensusFaultProof,
        worker: &Address,
    ) -> Result<Option<ConsensusFault>, String> {
        self.verify_block_signature(&proof.block_a, worker)?;
        self.verify_block_signature(&proof.block_b, worker)?;
        crate::fil_cns::check_consensus_fault(proof)
    }
}
