// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use super::{CachingBlockHeader, Error, Ticket};
use crate::shim::{bigint::BigInt, clock::ChainEpoch};
use cid::Cid;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

/// A set of CIDs forming a unique key for a Tipset.
/// Equal keys will have equivalent iteration order, but note that the CIDs are
/// *not* maintained in the same order as the canonical iteration order of
/// blocks in a tipset (which is by ticket)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TipsetKey(Vec<Cid>);

impl TipsetKey {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self(cids)
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.0.contains(cid)
    }

    pub fn cids(&self) -> &[Cid] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Cid>> for TipsetKey {
    fn from(cids: Vec<Cid>) -> Self {
        Self(cids)
    }
}

impl fmt::Display for TipsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

/// An immutable set of blocks at the same height with the same parent set.
/// Blocks in a tipset are canonically ordered by ticket size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tipset {
    headers: Vec<CachingBlockHeader>,
    key: TipsetKey,
}

impl Tipset {
    /// Builds a new Tipset from a collection of blocks.
    /// A valid tipset contains a non-empty collection of blocks that have
    /// distinct miners and all specify identical epoch, parents and weight.
    pub fn new(mut headers: Vec<CachingBlockHeader>) -> Result<Self, Error> {
        let first = headers.first().ok_or(Error::NoBlocks)?;
        let (epoch, parents, weight) = (first.epoch, first.parents.clone(), first.weight.clone());

        for header in headers.iter().skip(1) {
            if header.epoch != epoch {
                return Err(Error::InvalidTipset("epochs are not equal".into()));
            }
            if header.parents != parents {
                return Err(Error::InvalidTipset("parent cids are not equal".into()));
            }
            if header.weight != weight {
                return Err(Error::InvalidTipset("weights are not equal".into()));
            }
        }
        if !headers.iter().map(|h| h.miner_address).all_unique() {
            return Err(Error::InvalidTipset("miner_addresses are not distinct".into()));
        }

        headers.sort_by_cached_key(|h| h.tipset_sort_key());
        let key = TipsetKey::new(headers.iter().map(|h| *h.cid()).collect());
        Ok(Self { headers, key })
    }

    pub fn epoch(&self) -> ChainEpoch {
        self.min_ticket_block().epoch
    }

    pub fn block_headers(&self) -> &[CachingBlockHeader] {
        &self.headers
    }

    pub fn key(&self) -> &TipsetKey {
        &self.key
    }

    pub fn parents(&self) -> &TipsetKey {
        &self.min_ticket_block().parents
    }

    /// Weight of the parent tipset, as declared by the blocks.
    pub fn parent_weight(&self) -> &BigInt {
        &self.min_ticket_block().weight
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns the smallest ticket of all blocks in the tipset
    pub fn min_ticket(&self) -> Option<&Ticket> {
        self.min_ticket_block().ticket.as_ref()
    }

    /// Returns the block with the smallest ticket of all blocks in the tipset
    pub fn min_ticket_block(&self) -> &CachingBlockHeader {
        // `new` rejects empty header sets
        &self.headers[0]
    }
}
