// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Filecoin-style expected consensus: block admission by storage power.

mod metrics;
mod slasher;
mod validation;

use crate::shim::bigint::BigInt;
use thiserror::Error;

pub use slasher::{ConsensusFault, ConsensusFaultKind, ConsensusFaultProof, check_consensus_fault};
pub use validation::{
    ELECTION_OUTPUT_BITS, election_output_value, election_vrf_input, is_winner, validate_block,
};

/// Reasons a block is rejected, in the order they are checked.
#[derive(Debug, Error, PartialEq, Eq, Clone, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConsensusError {
    #[error("Block miner {0} has no power")]
    NotAValidMiner(String),
    #[error("Parent weight doesn't match: {header} (header), {computed} (computed)")]
    InvalidParentWeight { header: BigInt, computed: BigInt },
    #[error("Invalid ticket: {0}")]
    InvalidTicket(String),
    #[error("Invalid election proof: {0}")]
    InvalidElectionProof(String),
    #[error("Block is not a winner")]
    NotAWinner,
    #[error("Chain lookup failed: {0}")]
    Chain(String),
}

#[cfg(test)]
mod tests;
