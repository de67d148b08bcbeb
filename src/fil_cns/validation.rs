// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::ConsensusError;
use super::metrics::{BLOCK_VALIDATION_FAILURE, BLOCK_VALIDATION_TIME, ReasonLabel};
use crate::actors::{Policy, power};
use crate::blocks::{CachingBlockHeader, ElectionProof};
use crate::chain::{ChainView, DomainSeparationTag};
use crate::metrics::HistogramTimerExt as _;
use crate::proofs::ProofVerifier;
use crate::shim::{ActorID, address::Address, bigint::BigInt, clock::ChainEpoch};
use num_traits::Zero as _;
use tracing::{trace, warn};

/// Width `L` of the election output.
pub const ELECTION_OUTPUT_BITS: usize = 256;

/// Validates a block against one snapshot of the power ledger. Checks run in
/// order and stop at the first failure. Nothing is mutated.
pub fn validate_block(
    chain: &dyn ChainView,
    verifier: &dyn ProofVerifier,
    policy: &Policy,
    power: &power::State,
    header: &CachingBlockHeader,
) -> Result<(), ConsensusError> {
    let _timer = BLOCK_VALIDATION_TIME.start_timer();
    trace!(
        "Validating block: epoch = {}, weight = {}, key = {}",
        header.epoch,
        header.weight,
        header.cid(),
    );
    validate_block_inner(chain, verifier, policy, power, header).inspect_err(|e| {
        warn!("rejected block {} at epoch {}: {e}", header.cid(), header.epoch);
        BLOCK_VALIDATION_FAILURE
            .get_or_create(&ReasonLabel::new(e.into()))
            .inc();
    })
}

fn validate_block_inner(
    chain: &dyn ChainView,
    verifier: &dyn ProofVerifier,
    policy: &Policy,
    power: &power::State,
    header: &CachingBlockHeader,
) -> Result<(), ConsensusError> {
    let miner = header.miner_address;

    // Miner power check
    let (miner_id, worker, miner_power) = validate_miner(power, &miner)?;

    // Parent weight calculation check
    let parent = chain
        .load_tipset(&header.parents)
        .map_err(|e| ConsensusError::Chain(e.to_string()))?;
    let computed = chain
        .weight(&parent)
        .map_err(|e| ConsensusError::Chain(format!("Error calculating weight: {e}")))?;
    if header.weight != computed {
        return Err(ConsensusError::InvalidParentWeight {
            header: header.weight.clone(),
            computed,
        });
    }

    let miner_entropy = fvm_ipld_encoding::to_vec(&miner)
        .map_err(|e| ConsensusError::Chain(format!("failed to encode miner address: {e}")))?;

    // Ticket check
    let ticket = header
        .ticket
        .as_ref()
        .ok_or_else(|| ConsensusError::InvalidTicket("block without ticket".into()))?;
    let ticket_input = draw(
        chain,
        DomainSeparationTag::TicketProduction,
        header.epoch - policy.ticket_lookback,
        &miner_entropy,
    )?;
    verifier
        .verify_vrf(&worker, &ticket_input, &ticket.vrfproof)
        .map_err(ConsensusError::InvalidTicket)?;

    // Election proof checks
    let election_proof = header.election_proof.as_ref().ok_or_else(|| {
        ConsensusError::InvalidElectionProof("block without election proof".into())
    })?;
    let current_round = chain
        .current_round()
        .map_err(|e| ConsensusError::Chain(e.to_string()))?;
    check_election_liveness(header.epoch, election_proof.election_nonce, current_round)?;
    let seed = draw(
        chain,
        DomainSeparationTag::ElectionProofProduction,
        header.epoch - policy.election_lookback,
        &miner_entropy,
    )?;
    let election_input = election_vrf_input(&seed, header.epoch, election_proof.election_nonce);
    verifier
        .verify_vrf(&worker, &election_input, &election_proof.vrfproof)
        .map_err(ConsensusError::InvalidElectionProof)?;

    // Winner check
    if !is_winner(
        &miner_power,
        power.total_power(),
        &election_output_value(election_proof),
    ) {
        return Err(ConsensusError::NotAWinner);
    }

    trace!("block from miner {miner_id} at epoch {} is valid", header.epoch);
    Ok(())
}

fn validate_miner(
    power: &power::State,
    miner: &Address,
) -> Result<(ActorID, Address, BigInt), ConsensusError> {
    let not_valid = || ConsensusError::NotAValidMiner(miner.to_string());
    let id = miner.id().map_err(|_| not_valid())?;
    let entry = power.entry(id).ok_or_else(not_valid)?;
    let miner_power = entry.total_power();
    if miner_power.is_zero() {
        return Err(not_valid());
    }
    let worker = power.info(id).ok_or_else(not_valid)?.worker;
    Ok((id, worker, miner_power))
}

fn draw(
    chain: &dyn ChainView,
    tag: DomainSeparationTag,
    epoch: ChainEpoch,
    entropy: &[u8],
) -> Result<[u8; 32], ConsensusError> {
    chain
        .randomness_at_epoch(tag, epoch, entropy)
        .map_err(|e| ConsensusError::Chain(format!("Drawing chain randomness failed: {e}")))
}

/// Rejects proofs whose height plus nonce run past the next round.
fn check_election_liveness(
    height: ChainEpoch,
    nonce: u64,
    current_round: ChainEpoch,
) -> Result<(), ConsensusError> {
    let live = i64::try_from(nonce)
        .ok()
        .and_then(|nonce| height.checked_add(nonce))
        .is_some_and(|reach| reach <= current_round + 1);
    if !live {
        return Err(ConsensusError::InvalidElectionProof(format!(
            "height {height} plus nonce {nonce} exceeds round {}",
            current_round + 1
        )));
    }
    Ok(())
}

/// VRF input of an election attempt: `seed ‖ height ‖ nonce`, big-endian.
pub fn election_vrf_input(seed: &[u8; 32], height: ChainEpoch, nonce: u64) -> Vec<u8> {
    let mut input = Vec::with_capacity(48);
    input.extend_from_slice(seed);
    input.extend_from_slice(&height.to_be_bytes());
    input.extend_from_slice(&nonce.to_be_bytes());
    input
}

/// The proof's output read as an unsigned big-endian integer in `[0, 2^L)`.
pub fn election_output_value(proof: &ElectionProof) -> BigInt {
    BigInt::from_bytes_be(num_bigint::Sign::Plus, &proof.output())
}

/// A miner wins iff `miner_power × 2^L < output × total_power`, so that its
/// chance per round equals its share of network power.
pub fn is_winner(miner_power: &BigInt, total_power: &BigInt, output: &BigInt) -> bool {
    (miner_power << ELECTION_OUTPUT_BITS) < output * total_power
}
