// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::Arc;

use super::{ActorError, Effect, Policy, miner, power};
use crate::chain::{ChainView, DomainSeparationTag};
use crate::proofs::ProofVerifier;
use crate::shim::{ActorID, clock::ChainEpoch};
use crate::state::StateHandle;

/// Everything an actor operation may touch. Actors hold no state of their
/// own; all of it is reached through the runtime.
pub trait Runtime {
    fn policy(&self) -> &Policy;

    fn chain(&self) -> &dyn ChainView;

    fn verifier(&self) -> &dyn ProofVerifier;

    /// The process-wide power ledger.
    fn power(&self) -> &StateHandle<power::State>;

    /// Sector state of a registered miner.
    fn miner(&self, id: ActorID) -> Result<Arc<StateHandle<miner::State>>, ActorError>;

    fn create_miner_state(&self, id: ActorID, state: miner::State);

    fn delete_miner_state(&self, id: ActorID);

    /// Queues an outbound message. Only call after the change that caused it
    /// has been published.
    fn send(&self, effect: Effect);

    fn send_all(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.send(effect);
        }
    }

    /// Epoch at which the running operation executes.
    fn curr_epoch(&self) -> Result<ChainEpoch, ActorError> {
        self.chain()
            .head_epoch()
            .map_err(|e| ActorError::illegal_state(format!("failed to get head epoch: {e}")))
    }

    fn get_randomness(
        &self,
        tag: DomainSeparationTag,
        epoch: ChainEpoch,
        entropy: &[u8],
    ) -> Result<[u8; 32], ActorError> {
        self.chain()
            .randomness_at_epoch(tag, epoch, entropy)
            .map_err(|e| {
                ActorError::illegal_state(format!(
                    "failed to draw {tag} randomness at {epoch}: {e}"
                ))
            })
    }
}
