// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::blocks::VRFProof;
use fvm_ipld_encoding::tuple::*;

/// Proof that a miner was elected leader for a round.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Default,
    Serialize_tuple,
    Deserialize_tuple,
    Hash,
    derive_more::Constructor,
)]
pub struct ElectionProof {
    /// Attempt counter the miner iterated to find this proof. Bounded by the
    /// current round to keep proofs live.
    pub election_nonce: u64,
    /// VRF output over the election randomness, block height and nonce.
    pub vrfproof: VRFProof,
}

impl ElectionProof {
    /// The `L = 256` bit election output used by the winner check.
    pub fn output(&self) -> [u8; 32] {
        self.vrfproof.digest()
    }
}
