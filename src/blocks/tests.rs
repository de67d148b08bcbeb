// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::*;
use crate::shim::{address::Address, bigint::BigInt};
use crate::test_utils::{test_cid, ticket_for_epoch};
use quickcheck_macros::quickcheck;

fn header(miner: u64, ticket: Ticket) -> RawBlockHeader {
    RawBlockHeader {
        miner_address: Address::new_id(miner),
        ticket: Some(ticket),
        election_proof: None,
        parents: TipsetKey::new(vec![test_cid(b"parent")]),
        weight: BigInt::from(7),
        epoch: 3,
        timestamp: 90,
        signature: None,
    }
}

fn cached(raw: RawBlockHeader) -> CachingBlockHeader {
    CachingBlockHeader::new(raw).unwrap()
}

#[test]
fn cid_is_content_addressed() {
    let a = cached(header(1000, ticket_for_epoch(3)));
    let b = cached(header(1000, ticket_for_epoch(3)));
    let c = cached(header(1001, ticket_for_epoch(3)));
    assert_eq!(a.cid(), b.cid());
    assert_ne!(a.cid(), c.cid());
    assert_eq!(a.cid(), &a.car_block().unwrap().0);
}

#[test]
fn tipset_orders_blocks_by_ticket() {
    let blocks: Vec<_> = (0..4)
        .map(|i| cached(header(1000 + i, ticket_for_epoch(i as i64))))
        .collect();
    let ts = Tipset::new(blocks.clone()).unwrap();
    let min = blocks
        .iter()
        .min_by_key(|b| b.ticket.as_ref().map(|t| t.vrfproof.digest()))
        .unwrap();

    assert_eq!(ts.len(), 4);
    assert_eq!(ts.epoch(), 3);
    assert_eq!(ts.min_ticket_block().cid(), min.cid());
    assert_eq!(ts.key().cids()[0], *min.cid());
    assert!(blocks.iter().all(|b| ts.key().contains(b.cid())));

    // Input order does not matter.
    let mut reversed = blocks;
    reversed.reverse();
    assert_eq!(Tipset::new(reversed).unwrap().key(), ts.key());
}

#[test]
fn tipset_rejects_inconsistent_blocks() {
    assert_eq!(Tipset::new(vec![]), Err(Error::NoBlocks));

    let a = header(1000, ticket_for_epoch(1));
    let mut other_epoch = header(1001, ticket_for_epoch(2));
    other_epoch.epoch = 4;
    assert!(matches!(
        Tipset::new(vec![cached(a.clone()), cached(other_epoch)]),
        Err(Error::InvalidTipset(_))
    ));

    let mut other_weight = header(1001, ticket_for_epoch(2));
    other_weight.weight = BigInt::from(8);
    assert!(matches!(
        Tipset::new(vec![cached(a.clone()), cached(other_weight)]),
        Err(Error::InvalidTipset(_))
    ));

    let same_miner = header(1000, ticket_for_epoch(2));
    assert!(matches!(
        Tipset::new(vec![cached(a), cached(same_miner)]),
        Err(Error::InvalidTipset(_))
    ));
}

#[quickcheck]
fn election_output_is_proof_digest(proof: VRFProof, nonce: u64) {
    let election_proof = ElectionProof::new(nonce, proof.clone());
    assert_eq!(election_proof.output(), proof.digest());
}
