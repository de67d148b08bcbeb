// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Read access to chain history and the randomness derived from it.

mod memory;

pub use memory::MemoryChain;

use std::io::Write as _;
use std::sync::Arc;

use crate::blocks::{Tipset, TipsetKey};
use crate::shim::{bigint::BigInt, clock::ChainEpoch};
use crate::utils::encoding::blake2b_256;
use anyhow::{Context as _, bail};
use blake2b_simd::Params;
use byteorder::{BigEndian, WriteBytesExt};

/// Purpose tags mixed into every randomness draw so that values drawn for one
/// use can never be replayed for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[repr(i64)]
pub enum DomainSeparationTag {
    TicketProduction = 1,
    ElectionProofProduction = 2,
    PoStChallengeSeed = 4,
    SealRandomness = 5,
    SurpriseSampling = 11,
}

/// Chain collaborator consumed by the consensus core.
pub trait ChainView: Send + Sync {
    fn head_tipset(&self) -> anyhow::Result<Arc<Tipset>>;

    fn load_tipset(&self, key: &TipsetKey) -> anyhow::Result<Arc<Tipset>>;

    /// Chain weight of `ts`. Opaque to the consensus core.
    fn weight(&self, ts: &Tipset) -> anyhow::Result<BigInt>;

    fn head_epoch(&self) -> anyhow::Result<ChainEpoch> {
        Ok(self.head_tipset()?.epoch())
    }

    /// The round blocks are currently being produced for.
    fn current_round(&self) -> anyhow::Result<ChainEpoch> {
        Ok(self.head_epoch()? + 1)
    }

    /// Nearest tipset at or before `epoch`, found by walking parent links back
    /// from the head. Negative epochs resolve to genesis.
    fn tipset_at_epoch(&self, epoch: ChainEpoch) -> anyhow::Result<Arc<Tipset>> {
        let mut ts = self.head_tipset()?;
        if epoch > ts.epoch() {
            bail!("cannot draw randomness from the future");
        }
        let search_height = epoch.max(0);
        while ts.epoch() > search_height {
            if ts.parents().is_empty() {
                break;
            }
            ts = self
                .load_tipset(ts.parents())
                .with_context(|| format!("failed to load parents of tipset at {}", ts.epoch()))?;
        }
        Ok(ts)
    }

    /// 32 bytes of randomness from the ticket chain at `epoch`.
    fn randomness_at_epoch(
        &self,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> anyhow::Result<[u8; 32]> {
        let ts = self.tipset_at_epoch(epoch)?;
        draw_randomness(
            ts.min_ticket()
                .context("No ticket exists for block")?
                .vrfproof
                .as_bytes(),
            tag as i64,
            epoch,
            entropy,
        )
    }
}

/// Computes a pseudo random 32 byte `Vec`.
pub fn draw_randomness(
    rbase: &[u8],
    pers: i64,
    round: ChainEpoch,
    entropy: &[u8],
) -> anyhow::Result<[u8; 32]> {
    let mut state = Params::new().hash_length(32).to_state();
    state.write_i64::<BigEndian>(pers)?;
    let vrf_digest = blake2b_256(rbase);
    state.write_all(&vrf_digest)?;
    state.write_i64::<BigEndian>(round)?;
    state.write_all(entropy)?;
    let mut ret = [0u8; 32];
    ret.clone_from_slice(state.finalize().as_bytes());
    Ok(ret)
}
