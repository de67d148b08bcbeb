// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::actors::miner::CommitSectorParams;
use crate::actors::power::{self, CreateMinerParams};
use crate::actors::{Policy, Runtime as _};
use crate::blocks::{
    CachingBlockHeader, ElectionProof, RawBlockHeader, Ticket, Tipset, VRFProof,
};
use crate::chain::{ChainView, DomainSeparationTag, MemoryChain};
use crate::context::Context;
use crate::fil_cns::election_vrf_input;
use crate::proofs::{PoStChallenges, ProofVerifier, SealVerifyInfo};
use crate::shim::{
    ActorID, address::Address, clock::ChainEpoch, crypto::Signature, econ::TokenAmount,
    sector::SectorNumber,
};
use crate::utils::encoding::blake2b_256;
use cid::Cid;
use fvm_ipld_bitfield::BitField;
use multihash_codetable::Code;
use multihash_derive::MultihashDigest as _;

pub type TestContext = Context<MemoryChain, MockVerifier>;

/// Verifier with switchable seal and PoSt verdicts. VRF proofs are accepted
/// iff they equal [`mock_vrf`] of the worker and input.
#[derive(Debug)]
pub struct MockVerifier {
    seal_ok: AtomicBool,
    post_ok: AtomicBool,
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self {
            seal_ok: AtomicBool::new(true),
            post_ok: AtomicBool::new(true),
        }
    }
}

impl MockVerifier {
    pub fn set_seal_ok(&self, ok: bool) {
        self.seal_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_post_ok(&self, ok: bool) {
        self.post_ok.store(ok, Ordering::SeqCst);
    }
}

impl ProofVerifier for MockVerifier {
    fn verify_seal(&self, _info: &SealVerifyInfo) -> bool {
        self.seal_ok.load(Ordering::SeqCst)
    }

    fn verify_post(&self, _challenges: &PoStChallenges, _proof: &[u8]) -> bool {
        self.post_ok.load(Ordering::SeqCst)
    }

    fn verify_block_signature(&self, header: &RawBlockHeader, worker: &Address) -> Result<(), String> {
        let signing_bytes = header.signing_bytes().map_err(|e| e.to_string())?;
        match &header.signature {
            Some(signature) if signature.bytes == mock_vrf(worker, &signing_bytes).0 => Ok(()),
            Some(_) => Err(format!("bad mock signature for worker {worker}")),
            None => Err("Signature is nil in header".into()),
        }
    }

    fn verify_vrf(&self, worker: &Address, input: &[u8], proof: &VRFProof) -> Result<(), String> {
        if *proof == mock_vrf(worker, input) {
            Ok(())
        } else {
            Err(format!("bad mock VRF proof for worker {worker}"))
        }
    }
}

pub fn mock_vrf(worker: &Address, input: &[u8]) -> VRFProof {
    let mut preimage = worker.to_bytes();
    preimage.extend_from_slice(input);
    VRFProof::new(blake2b_256(&preimage).to_vec())
}

/// Signs `header` the way [`MockVerifier`] expects `worker` to.
pub fn mock_sign(mut header: RawBlockHeader, worker: &Address) -> RawBlockHeader {
    let signing_bytes = header.signing_bytes().unwrap();
    header.signature = Some(Signature::new_bls(mock_vrf(worker, &signing_bytes).0));
    header
}

pub fn ticket_for_epoch(epoch: ChainEpoch) -> Ticket {
    Ticket::new(VRFProof::new(format!("ticket-{epoch}").into_bytes()))
}

/// A chain with one block per epoch from genesis to `head`, skipping the
/// `null_rounds`.
pub fn linear_chain(head: ChainEpoch, null_rounds: &[ChainEpoch]) -> MemoryChain {
    let chain = MemoryChain::new(chain_tipset(None, 0));
    for epoch in 1..=head {
        if !null_rounds.contains(&epoch) {
            extend_chain(&chain, epoch);
        }
    }
    chain
}

/// Puts a block at `epoch` on top of the current head.
pub fn extend_chain(chain: &MemoryChain, epoch: ChainEpoch) {
    let parent = chain.head_tipset().unwrap();
    chain.put_tipset(chain_tipset(Some((chain, &parent)), epoch));
}

fn chain_tipset(parent: Option<(&MemoryChain, &Tipset)>, epoch: ChainEpoch) -> Tipset {
    let (parents, weight) = match parent {
        Some((chain, parent)) => (parent.key().clone(), chain.weight(parent).unwrap()),
        None => Default::default(),
    };
    let header = RawBlockHeader {
        miner_address: Address::new_id(1),
        ticket: Some(ticket_for_epoch(epoch)),
        election_proof: None,
        parents,
        weight,
        epoch,
        timestamp: 30 * epoch as u64,
        signature: None,
    };
    Tipset::new(vec![CachingBlockHeader::new(header).unwrap()]).unwrap()
}

/// A block on top of the chain head mined by `miner`, with a ticket and an
/// election proof that pass mock VRF verification under `policy`.
pub fn mined_block(
    chain: &MemoryChain,
    policy: &Policy,
    miner: ActorID,
    worker: &Address,
    election_nonce: u64,
) -> RawBlockHeader {
    let parent = chain.head_tipset().unwrap();
    let epoch = parent.epoch() + 1;
    let miner_address = Address::new_id(miner);
    let entropy = fvm_ipld_encoding::to_vec(&miner_address).unwrap();

    let ticket_input = chain
        .randomness_at_epoch(
            DomainSeparationTag::TicketProduction,
            epoch - policy.ticket_lookback,
            &entropy,
        )
        .unwrap();
    let seed = chain
        .randomness_at_epoch(
            DomainSeparationTag::ElectionProofProduction,
            epoch - policy.election_lookback,
            &entropy,
        )
        .unwrap();
    let election_input = election_vrf_input(&seed, epoch, election_nonce);

    RawBlockHeader {
        miner_address,
        ticket: Some(Ticket::new(mock_vrf(worker, &ticket_input))),
        election_proof: Some(ElectionProof::new(
            election_nonce,
            mock_vrf(worker, &election_input),
        )),
        parents: parent.key().clone(),
        weight: chain.weight(&parent).unwrap(),
        epoch,
        timestamp: 30 * epoch as u64,
        signature: None,
    }
}

/// Small numbers that keep expectations readable: sectors of 10 bytes, one
/// attoFIL of pledge per byte and proving periods of 10 epochs.
pub fn test_policy() -> Policy {
    Policy {
        sector_size: 10,
        pledge_numerator: 1,
        pledge_denominator: 1,
        declared_fault_slash_rate: 1,
        detected_fault_slash_rate: 2,
        terminated_fault_slash_rate: 3,
        consensus_fault_reporter_share_numerator: 1,
        consensus_fault_reporter_share_denominator: 4,
        max_consecutive_faults: 3,
        proving_period: 10,
        surprise_challenge_frequency: 10,
        ticket_lookback: 1,
        election_lookback: 2,
        seal_randomness_lookback: 3,
        post_challenge_lookback: 1,
        max_proof_size: 16,
    }
}

/// A context over a chain whose head is at `head`.
pub fn test_context(head: ChainEpoch) -> TestContext {
    Context::new(test_policy(), linear_chain(head, &[]), MockVerifier::default()).unwrap()
}

pub fn owner() -> Address {
    Address::new_id(100)
}

pub fn worker() -> Address {
    Address::new_id(101)
}

/// Registers a miner and deposits `balance` attoFIL.
pub fn create_miner(ctx: &TestContext, balance: u64) -> ActorID {
    let id = power::Actor::create_miner(
        ctx,
        CreateMinerParams {
            owner: owner(),
            worker: worker(),
            peer_id: b"peer".to_vec(),
        },
    )
    .unwrap();
    if balance > 0 {
        power::Actor::add_balance(ctx, id, TokenAmount::from_atto(balance)).unwrap();
    }
    id
}

pub fn test_cid(seed: &[u8]) -> Cid {
    Cid::new_v1(fvm_ipld_encoding::DAG_CBOR, Code::Blake2b256.digest(seed))
}

pub fn commit_params(sector_number: SectorNumber, expiration: ChainEpoch) -> CommitSectorParams {
    CommitSectorParams {
        sector_number,
        sealed_cid: test_cid(format!("sealed-{sector_number}").as_bytes()),
        unsealed_cid: test_cid(format!("unsealed-{sector_number}").as_bytes()),
        deal_ids: vec![sector_number * 100, sector_number * 100 + 1],
        expiration,
        proof: vec![1; 8],
    }
}

pub fn bitfield(sectors: &[SectorNumber]) -> BitField {
    let mut bf = BitField::new();
    for &sector in sectors {
        bf.set(sector);
    }
    bf
}

/// Head epoch of the context's chain.
pub fn head_epoch(ctx: &TestContext) -> ChainEpoch {
    ctx.curr_epoch().unwrap()
}
