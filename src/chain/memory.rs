// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;
use std::sync::Arc;

use super::ChainView;
use crate::blocks::{Tipset, TipsetKey};
use crate::shim::bigint::BigInt;
use anyhow::Context as _;
use parking_lot::RwLock;

/// Tipsets kept in memory, keyed by [`TipsetKey`].
#[derive(Debug, Default)]
pub struct MemoryChain {
    tipsets: RwLock<HashMap<TipsetKey, Arc<Tipset>>>,
    head: RwLock<Option<Arc<Tipset>>>,
}

impl MemoryChain {
    pub fn new(genesis: Tipset) -> Self {
        let chain = Self::default();
        chain.put_tipset(genesis);
        chain
    }

    /// Stores `ts` and makes it the head if it is heavier than, or as heavy as
    /// and higher than, the current head.
    pub fn put_tipset(&self, ts: Tipset) -> Arc<Tipset> {
        let ts = Arc::new(ts);
        self.tipsets.write().insert(ts.key().clone(), ts.clone());
        let mut head = self.head.write();
        let replace = match head.as_ref() {
            None => true,
            Some(current) => {
                (Self::chain_weight(&ts), ts.epoch())
                    >= (Self::chain_weight(current), current.epoch())
            }
        };
        if replace {
            *head = Some(ts.clone());
        }
        ts
    }

    /// Parent weight plus one per block in the tipset.
    fn chain_weight(ts: &Tipset) -> BigInt {
        ts.parent_weight() + BigInt::from(ts.len())
    }
}

impl ChainView for MemoryChain {
    fn head_tipset(&self) -> anyhow::Result<Arc<Tipset>> {
        self.head.read().clone().context("chain has no head tipset")
    }

    fn load_tipset(&self, key: &TipsetKey) -> anyhow::Result<Arc<Tipset>> {
        self.tipsets
            .read()
            .get(key)
            .cloned()
            .with_context(|| format!("tipset {key} not found"))
    }

    fn weight(&self, ts: &Tipset) -> anyhow::Result<BigInt> {
        Ok(Self::chain_weight(ts))
    }
}
