// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::metrics::{BLOCK_VALIDATION_FAILURE, ReasonLabel};
use super::*;
use crate::actors::{Runtime as _, miner, power};
use crate::blocks::{CachingBlockHeader, RawBlockHeader, Ticket, TipsetKey, VRFProof};
use crate::chain::ChainView as _;
use crate::proofs::{PoStChallenges, ProofVerifier, SealVerifyInfo};
use crate::shim::{ActorID, address::Address, bigint::BigInt, crypto::Signature};
use crate::test_utils::{
    TestContext, commit_params, create_miner, mined_block, mock_vrf, test_cid, test_context,
    ticket_for_epoch, worker,
};
use num_traits::One as _;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;
use rstest::rstest;

fn two_pow_l() -> BigInt {
    BigInt::one() << ELECTION_OUTPUT_BITS
}

#[rstest]
#[case::below_threshold(-1, false)]
#[case::at_threshold(0, false)]
#[case::above_threshold(1, true)]
fn winner_boundary_at_one_tenth(#[case] offset: i64, #[case] wins: bool) {
    let output = two_pow_l() / 10 + offset;
    assert_eq!(
        is_winner(&BigInt::from(100), &BigInt::from(1000), &output),
        wins
    );
}

#[test]
fn winner_extremes() {
    let total = BigInt::from(1000);
    let max_output = two_pow_l() - 1;
    assert!(!is_winner(&total, &total, &max_output));
    assert!(!is_winner(&BigInt::from(1), &total, &BigInt::from(0)));
    assert!(is_winner(&BigInt::from(0), &total, &BigInt::from(1)));
}

#[quickcheck]
fn election_output_fits_in_l_bits(proof: VRFProof, nonce: u64) {
    let value = election_output_value(&crate::blocks::ElectionProof::new(nonce, proof));
    assert!(value >= BigInt::from(0));
    assert!(value < two_pow_l());
}

/// A small miner next to one with 999 times its power.
fn election_context() -> (TestContext, ActorID, ActorID) {
    let ctx = test_context(20);
    let small = create_miner(&ctx, 100);
    miner::Actor::commit_sector(&ctx, small, commit_params(1, 1_000)).unwrap();
    let large = create_miner(&ctx, 100_000);
    for sector in 0..999 {
        miner::Actor::commit_sector(&ctx, large, commit_params(sector, 1_000)).unwrap();
    }
    (ctx, small, large)
}

fn validate(ctx: &TestContext, raw: RawBlockHeader) -> Result<(), ConsensusError> {
    ctx.validate_block(&CachingBlockHeader::new(raw).unwrap())
}

/// The expected verdict of the winner check for a block that passes every
/// other check.
fn expected_verdict(ctx: &TestContext, raw: &RawBlockHeader) -> Result<(), ConsensusError> {
    let st = ctx.power_snapshot();
    let miner = raw.miner_address.id().unwrap();
    let output = election_output_value(raw.election_proof.as_ref().unwrap());
    if is_winner(
        &st.entry(miner).unwrap().total_power(),
        st.total_power(),
        &output,
    ) {
        Ok(())
    } else {
        Err(ConsensusError::NotAWinner)
    }
}

#[test]
fn block_from_small_miner_is_validated() {
    let (ctx, small, large) = election_context();
    let chain = ctx.chain_view();
    let policy = ctx.policy();
    assert_eq!(
        ctx.power_snapshot().total_power(),
        &BigInt::from(10 * 1_000)
    );

    // Liveness allows nonces 0 and 1 on top of the head.
    let raws: Vec<_> = (0..=1)
        .map(|nonce| mined_block(chain, policy, small, &worker(), nonce))
        .collect();
    for raw in &raws {
        assert_eq!(validate(&ctx, raw.clone()), expected_verdict(&ctx, raw));
    }
    assert!(
        raws.iter().any(|raw| validate(&ctx, raw.clone()).is_ok()),
        "a miner with 0.1% of the power wins with either nonce"
    );

    let raw = mined_block(chain, policy, large, &worker(), 0);
    assert_eq!(validate(&ctx, raw.clone()), expected_verdict(&ctx, &raw));
}

#[test]
fn validation_is_pure() {
    let (ctx, small, _) = election_context();
    let raw = mined_block(ctx.chain_view(), ctx.policy(), small, &worker(), 0);
    let ledger = ctx.power_snapshot();

    let first = validate(&ctx, raw.clone());
    let second = validate(&ctx, raw);
    assert_eq!(first, second);
    assert_eq!(ctx.power_snapshot().version(), ledger.version());
}

#[test]
fn rejection_reasons() {
    let (ctx, small, _) = election_context();
    let chain = ctx.chain_view();
    let policy = ctx.policy();
    let good = mined_block(chain, policy, small, &worker(), 0);

    // Unregistered and powerless miners.
    let unknown = mined_block(chain, policy, 5_000, &worker(), 0);
    assert!(matches!(
        validate(&ctx, unknown),
        Err(ConsensusError::NotAValidMiner(_))
    ));
    let idle = create_miner(&ctx, 0);
    let powerless = mined_block(chain, policy, idle, &worker(), 0);
    assert!(matches!(
        validate(&ctx, powerless),
        Err(ConsensusError::NotAValidMiner(_))
    ));

    let mut heavy = good.clone();
    heavy.weight += BigInt::from(1);
    assert!(matches!(
        validate(&ctx, heavy),
        Err(ConsensusError::InvalidParentWeight { .. })
    ));

    let mut forged = good.clone();
    forged.ticket = Some(ticket_for_epoch(21));
    assert!(matches!(
        validate(&ctx, forged),
        Err(ConsensusError::InvalidTicket(_))
    ));
    let mut ticketless = good.clone();
    ticketless.ticket = None;
    assert!(matches!(
        validate(&ctx, ticketless),
        Err(ConsensusError::InvalidTicket(_))
    ));

    // A ticket signed by someone else's key.
    let stranger = Address::new_id(999);
    let foreign = mined_block(chain, policy, small, &stranger, 0);
    assert!(matches!(
        validate(&ctx, foreign),
        Err(ConsensusError::InvalidTicket(_))
    ));

    let mut bad_proof = good.clone();
    if let Some(proof) = bad_proof.election_proof.as_mut() {
        proof.vrfproof = mock_vrf(&worker(), b"something else");
    }
    assert!(matches!(
        validate(&ctx, bad_proof),
        Err(ConsensusError::InvalidElectionProof(_))
    ));

    // Head is at 20, so height 21 plus nonce 2 is past round 22.
    let stale = mined_block(chain, policy, small, &worker(), 2);
    assert!(matches!(
        validate(&ctx, stale),
        Err(ConsensusError::InvalidElectionProof(_))
    ));

    let mut orphan = good;
    orphan.parents = TipsetKey::new(vec![test_cid(b"nowhere")]);
    assert!(matches!(
        validate(&ctx, orphan),
        Err(ConsensusError::Chain(_))
    ));

    assert!(
        BLOCK_VALIDATION_FAILURE
            .get_or_create(&ReasonLabel::new("invalid_ticket"))
            .get()
            >= 3
    );
}

#[test]
fn failure_reasons_are_snake_case() {
    let reasons: Vec<&'static str> = [
        ConsensusError::NotAValidMiner("t01000".into()),
        ConsensusError::InvalidParentWeight {
            header: BigInt::from(1),
            computed: BigInt::from(2),
        },
        ConsensusError::InvalidTicket(String::new()),
        ConsensusError::InvalidElectionProof(String::new()),
        ConsensusError::NotAWinner,
    ]
    .iter()
    .map(Into::into)
    .collect();
    assert_eq!(
        reasons,
        vec![
            "not_a_valid_miner",
            "invalid_parent_weight",
            "invalid_ticket",
            "invalid_election_proof",
            "not_a_winner"
        ]
    );
}

#[test]
fn block_validation_uses_one_ledger_snapshot() {
    let (ctx, small, _) = election_context();
    let raw = mined_block(ctx.chain_view(), ctx.policy(), small, &worker(), 0);
    let header = CachingBlockHeader::new(raw).unwrap();
    let snapshot = ctx.power_snapshot();
    let verdict = validate_block(
        ctx.chain_view(),
        ctx.proof_verifier(),
        ctx.policy(),
        &snapshot,
        &header,
    );

    // Later ledger changes do not affect a verdict taken on the old snapshot.
    power::Actor::remove_miner(&ctx, create_miner(&ctx, 0)).unwrap();
    assert_eq!(
        validate_block(
            ctx.chain_view(),
            ctx.proof_verifier(),
            ctx.policy(),
            &snapshot,
            &header
        ),
        verdict
    );
}

fn header(miner: u64, epoch: i64, parents: TipsetKey, ticket: u8) -> RawBlockHeader {
    RawBlockHeader {
        miner_address: Address::new_id(miner),
        ticket: Some(Ticket::new(VRFProof::new(vec![ticket; 4]))),
        election_proof: None,
        parents,
        weight: BigInt::from(epoch),
        epoch,
        timestamp: 0,
        signature: None,
    }
}

fn key_of(raw: &RawBlockHeader) -> TipsetKey {
    TipsetKey::new(vec![*CachingBlockHeader::new(raw.clone()).unwrap().cid()])
}

fn fault_kind(
    block_a: RawBlockHeader,
    block_b: RawBlockHeader,
    witness: Option<RawBlockHeader>,
) -> Result<Option<ConsensusFaultKind>, String> {
    Ok(check_consensus_fault(&ConsensusFaultProof {
        block_a,
        block_b,
        witness,
    })?
    .map(|fault| fault.kind))
}

#[test]
fn consensus_faults_are_detected() {
    let root = TipsetKey::new(vec![test_cid(b"root")]);
    let other = TipsetKey::new(vec![test_cid(b"other")]);

    assert_eq!(
        fault_kind(header(1000, 5, root.clone(), 1), header(1000, 5, other.clone(), 2), None),
        Ok(Some(ConsensusFaultKind::DoubleForkMining))
    );
    assert_eq!(
        fault_kind(header(1000, 5, root.clone(), 1), header(1000, 6, root.clone(), 2), None),
        Ok(Some(ConsensusFaultKind::TimeOffsetMining))
    );

    // Block B builds on C, a sibling of A, while ignoring A.
    let block_a = header(1000, 5, root.clone(), 1);
    let block_c = header(1001, 5, root.clone(), 3);
    let block_b = header(1000, 6, key_of(&block_c), 2);
    assert_eq!(
        fault_kind(block_a.clone(), block_b.clone(), Some(block_c.clone())),
        Ok(Some(ConsensusFaultKind::ParentGrinding))
    );
    assert_eq!(fault_kind(block_a.clone(), block_b, None), Ok(None));

    // Including A is honest.
    let honest = header(
        1000,
        6,
        TipsetKey::new(vec![
            *CachingBlockHeader::new(block_a.clone()).unwrap().cid(),
            *CachingBlockHeader::new(block_c.clone()).unwrap().cid(),
        ]),
        2,
    );
    assert_eq!(fault_kind(block_a.clone(), honest, Some(block_c)), Ok(None));

    assert!(fault_kind(block_a.clone(), block_a.clone(), None).is_err());
    assert!(fault_kind(block_a, header(1001, 5, other, 2), None).is_err());
}

struct BlsVerifier;

impl ProofVerifier for BlsVerifier {
    fn verify_seal(&self, _info: &SealVerifyInfo) -> bool {
        true
    }

    fn verify_post(&self, _challenges: &PoStChallenges, _proof: &[u8]) -> bool {
        true
    }
}

#[test]
fn vrf_proofs_are_bls_signatures() {
    use bls_signatures::Serialize as _;
    use rand::SeedableRng as _;

    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0x5eed);
    let key = bls_signatures::PrivateKey::generate(&mut rng);
    let worker = Address::new_bls(&key.public_key().as_bytes()).unwrap();
    let input = b"ticket randomness";
    let proof = VRFProof::new(key.sign(input).as_bytes());

    assert_eq!(BlsVerifier.verify_vrf(&worker, input, &proof), Ok(()));
    assert!(
        BlsVerifier
            .verify_vrf(&worker, b"other randomness", &proof)
            .is_err()
    );
    let other = bls_signatures::PrivateKey::generate(&mut rng);
    let other_worker = Address::new_bls(&other.public_key().as_bytes()).unwrap();
    assert!(BlsVerifier.verify_vrf(&other_worker, input, &proof).is_err());
}

fn bls_sign(mut header: RawBlockHeader, key: &bls_signatures::PrivateKey) -> RawBlockHeader {
    use bls_signatures::Serialize as _;

    let signature = key.sign(header.signing_bytes().unwrap());
    header.signature = Some(Signature::new_bls(signature.as_bytes()));
    header
}

#[test]
fn fault_evidence_must_be_signed_by_the_worker() {
    use bls_signatures::Serialize as _;
    use rand::SeedableRng as _;

    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
    let key = bls_signatures::PrivateKey::generate(&mut rng);
    let worker = Address::new_bls(&key.public_key().as_bytes()).unwrap();
    let other = bls_signatures::PrivateKey::generate(&mut rng);

    let root = TipsetKey::new(vec![test_cid(b"root")]);
    let other_root = TipsetKey::new(vec![test_cid(b"other")]);
    let block_a = header(1000, 5, root, 1);
    let block_b = header(1000, 5, other_root, 2);
    let evidence = |a: RawBlockHeader, b: RawBlockHeader| ConsensusFaultProof {
        block_a: a,
        block_b: b,
        witness: None,
    };

    let signed = evidence(bls_sign(block_a.clone(), &key), bls_sign(block_b.clone(), &key));
    assert_eq!(
        BlsVerifier
            .verify_consensus_fault(&signed, &worker)
            .map(|fault| fault.map(|f| f.kind)),
        Ok(Some(ConsensusFaultKind::DoubleForkMining))
    );

    let unsigned = evidence(block_a.clone(), block_b.clone());
    assert!(BlsVerifier.verify_consensus_fault(&unsigned, &worker).is_err());
    let half_signed = evidence(bls_sign(block_a.clone(), &key), block_b.clone());
    assert!(BlsVerifier.verify_consensus_fault(&half_signed, &worker).is_err());
    let wrong_key = evidence(bls_sign(block_a, &other), bls_sign(block_b, &other));
    assert!(BlsVerifier.verify_consensus_fault(&wrong_key, &worker).is_err());

    // Changing a signed header invalidates its signature.
    let mut tampered = signed;
    tampered.block_b.timestamp += 1;
    assert!(BlsVerifier.verify_consensus_fault(&tampered, &worker).is_err());
}

#[test]
fn fault_epoch_does_not_depend_on_block_order() {
    let root = TipsetKey::new(vec![test_cid(b"root")]);
    let early = header(1000, 5, root.clone(), 1);
    let late = header(1000, 6, root, 2);
    let epoch_of = |a: &RawBlockHeader, b: &RawBlockHeader| {
        check_consensus_fault(&ConsensusFaultProof {
            block_a: a.clone(),
            block_b: b.clone(),
            witness: None,
        })
        .unwrap()
        .map(|fault| fault.epoch)
    };
    assert_eq!(epoch_of(&early, &late), Some(5));
    assert_eq!(epoch_of(&late, &early), Some(5));
}

#[test]
fn chain_view_current_round_follows_head() {
    let ctx = test_context(7);
    assert_eq!(ctx.chain_view().current_round().unwrap(), 8);
}
