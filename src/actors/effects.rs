// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{
    ActorID, address::Address, clock::ChainEpoch, deal::DealID, econ::TokenAmount,
    sector::StoragePower,
};
use num_traits::Zero as _;
use parking_lot::Mutex;

/// Fire-and-forget messages to components outside the consensus core. They
/// are only emitted after the state change that caused them was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Change of a miner's active, collateral-backed power.
    UpdatePower {
        miner: ActorID,
        delta: StoragePower,
    },
    SlashStorageDealCollateral {
        miner: ActorID,
        deal_ids: Vec<DealID>,
    },
    SettleExpiredDeals {
        miner: ActorID,
        deal_ids: Vec<DealID>,
    },
    ProcessStorageDealsPayment {
        miner: ActorID,
        deal_ids: Vec<DealID>,
    },
    PublishStorageDeals {
        miner: ActorID,
        deal_ids: Vec<DealID>,
    },
    SurpriseChallenge {
        miner: ActorID,
        epoch: ChainEpoch,
    },
    BurnFunds {
        amount: TokenAmount,
    },
    SendFunds {
        to: Address,
        amount: TokenAmount,
    },
}

impl Effect {
    /// Deal effects with no deals are not worth sending.
    pub fn is_noop(&self) -> bool {
        match self {
            Effect::SlashStorageDealCollateral { deal_ids, .. }
            | Effect::SettleExpiredDeals { deal_ids, .. }
            | Effect::ProcessStorageDealsPayment { deal_ids, .. }
            | Effect::PublishStorageDeals { deal_ids, .. } => deal_ids.is_empty(),
            Effect::UpdatePower { delta, .. } => delta.is_zero(),
            Effect::BurnFunds { amount } | Effect::SendFunds { amount, .. } => amount.is_zero(),
            Effect::SurpriseChallenge { .. } => false,
        }
    }
}

/// Queue of effects awaiting delivery.
#[derive(Debug, Default)]
pub struct Outbox {
    effects: Mutex<Vec<Effect>>,
}

impl Outbox {
    pub fn push(&self, effect: Effect) {
        if !effect.is_noop() {
            self.effects.lock().push(effect);
        }
    }

    pub fn extend(&self, effects: impl IntoIterator<Item = Effect>) {
        let mut queue = self.effects.lock();
        queue.extend(effects.into_iter().filter(|e| !e.is_noop()));
    }

    /// Removes and returns every queued effect in emission order.
    pub fn drain(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.effects.lock())
    }

    pub fn len(&self) -> usize {
        self.effects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.lock().is_empty()
    }
}
