// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The object every operation runs against: policy, collaborators, the power
//! ledger, one sector state per miner and the outbox. Operations are reached
//! through [`Context::invoke`] with an [`Invocation`] naming the method and
//! carrying its arguments.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::actor_error;
use crate::actors::{
    ActorError, ConsensusFaultType, Effect, Outbox, Policy, Runtime,
    miner::{self, CommitSectorParams, PoStSubmission},
    power::{self, CreateMinerParams, ReportConsensusFaultParams},
};
use crate::blocks::CachingBlockHeader;
use crate::chain::ChainView;
use crate::fil_cns::{self, ConsensusError};
use crate::proofs::ProofVerifier;
use crate::shim::{ActorID, clock::ChainEpoch, econ::TokenAmount, sector::StoragePower};
use crate::state::{Snapshot, StateHandle};
use anyhow::Context as _;
use fvm_ipld_bitfield::BitField;
use parking_lot::RwLock;
use tracing::debug;

pub struct Context<C, V> {
    policy: Policy,
    chain: C,
    verifier: V,
    power: StateHandle<power::State>,
    miners: RwLock<BTreeMap<ActorID, Arc<StateHandle<miner::State>>>>,
    outbox: Outbox,
}

impl<C: ChainView, V: ProofVerifier> Context<C, V> {
    /// Fails if `policy` does not pass [`Policy::validate`].
    pub fn new(policy: Policy, chain: C, verifier: V) -> anyhow::Result<Self> {
        policy.validate().context("invalid policy")?;
        Ok(Self {
            policy,
            chain,
            verifier,
            power: StateHandle::default(),
            miners: RwLock::new(BTreeMap::new()),
            outbox: Outbox::default(),
        })
    }

    pub fn chain_view(&self) -> &C {
        &self.chain
    }

    pub fn proof_verifier(&self) -> &V {
        &self.verifier
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Takes every queued effect, oldest first.
    pub fn drain_effects(&self) -> Vec<Effect> {
        self.outbox.drain()
    }

    pub fn power_snapshot(&self) -> Snapshot<power::State> {
        self.power.snapshot()
    }

    pub fn miner_snapshot(&self, miner: ActorID) -> Result<Snapshot<miner::State>, ActorError> {
        Ok(self.miner(miner)?.snapshot())
    }

    /// Validates `header` against a single snapshot of the power ledger.
    pub fn validate_block(&self, header: &CachingBlockHeader) -> Result<(), ConsensusError> {
        let power = self.power.snapshot();
        fil_cns::validate_block(&self.chain, &self.verifier, &self.policy, &power, header)
    }

    pub fn invoke(&self, invocation: Invocation) -> Result<InvocationReturn, ActorError> {
        match invocation {
            Invocation::Power(method) => {
                debug!("invoking power method {}", <&'static str>::from(&method));
                self.invoke_power(method)
            }
            Invocation::Miner { miner, method } => {
                debug!(
                    "invoking miner {miner} method {}",
                    <&'static str>::from(&method)
                );
                self.invoke_miner(miner, method)?;
                Ok(InvocationReturn::None)
            }
        }
    }

    fn invoke_power(&self, method: PowerMethod) -> Result<InvocationReturn, ActorError> {
        use InvocationReturn as R;
        use crate::actors::power::Actor;

        match method {
            PowerMethod::CreateMiner(params) => Actor::create_miner(self, params).map(R::MinerId),
            PowerMethod::RemoveMiner(miner) => Actor::remove_miner(self, miner).map(|()| R::None),
            PowerMethod::AddBalance { miner, amount } => {
                Actor::add_balance(self, miner, amount).map(|()| R::None)
            }
            PowerMethod::WithdrawBalance { miner, amount } => {
                Actor::withdraw_balance(self, miner, amount).map(|()| R::None)
            }
            PowerMethod::GetTotalPower => Ok(R::Power(Actor::get_total_power(self))),
            PowerMethod::EnsurePledgeCollateralSatisfied(miner) => {
                Actor::ensure_pledge_collateral_satisfied(self, miner).map(|()| R::None)
            }
            PowerMethod::SlashPledgeForStorageFaults {
                miner,
                affected_power,
                fault_type,
            } => Actor::slash_pledge_for_storage_faults(self, miner, &affected_power, fault_type)
                .map(R::Slashed),
            PowerMethod::ReportConsensusFault(params) => {
                Actor::report_consensus_fault(self, params).map(R::Slashed)
            }
            PowerMethod::Surprise(epoch) => Actor::surprise(self, epoch).map(R::Challenged),
        }
    }

    fn invoke_miner(&self, miner: ActorID, method: MinerMethod) -> Result<(), ActorError> {
        use crate::actors::miner::Actor;

        match method {
            MinerMethod::CommitSector(params) => Actor::commit_sector(self, miner, params),
            MinerMethod::SubmitPoSt(submission) => Actor::submit_post(self, miner, submission),
            MinerMethod::DeclareFaults(sectors) => Actor::declare_faults(self, miner, sectors),
            MinerMethod::RecoverFaults(sectors) => Actor::recover_faults(self, miner, sectors),
            MinerMethod::CronAction => Actor::cron_action(self, miner),
        }
    }
}

impl<C: ChainView, V: ProofVerifier> Runtime for Context<C, V> {
    fn policy(&self) -> &Policy {
        &self.policy
    }

    fn chain(&self) -> &dyn ChainView {
        &self.chain
    }

    fn verifier(&self) -> &dyn ProofVerifier {
        &self.verifier
    }

    fn power(&self) -> &StateHandle<power::State> {
        &self.power
    }

    fn miner(&self, id: ActorID) -> Result<Arc<StateHandle<miner::State>>, ActorError> {
        self.miners
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| actor_error!(not_found; "miner {} has no sector state", id))
    }

    fn create_miner_state(&self, id: ActorID, state: miner::State) {
        self.miners
            .write()
            .insert(id, Arc::new(StateHandle::new(state)));
    }

    fn delete_miner_state(&self, id: ActorID) {
        self.miners.write().remove(&id);
    }

    fn send(&self, effect: Effect) {
        self.outbox.push(effect);
    }
}

/// Operations of the power actor reachable from outside the core. Power
/// reports are absent: only the sector lifecycle may file them.
#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum PowerMethod {
    CreateMiner(CreateMinerParams),
    RemoveMiner(ActorID),
    AddBalance {
        miner: ActorID,
        amount: TokenAmount,
    },
    WithdrawBalance {
        miner: ActorID,
        amount: TokenAmount,
    },
    GetTotalPower,
    EnsurePledgeCollateralSatisfied(ActorID),
    SlashPledgeForStorageFaults {
        miner: ActorID,
        affected_power: StoragePower,
        fault_type: ConsensusFaultType,
    },
    ReportConsensusFault(ReportConsensusFaultParams),
    Surprise(ChainEpoch),
}

#[derive(Debug, Clone, strum::IntoStaticStr)]
pub enum MinerMethod {
    CommitSector(CommitSectorParams),
    SubmitPoSt(PoStSubmission),
    DeclareFaults(BitField),
    RecoverFaults(BitField),
    CronAction,
}

#[derive(Debug, Clone)]
pub enum Invocation {
    Power(PowerMethod),
    Miner { miner: ActorID, method: MinerMethod },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationReturn {
    None,
    MinerId(ActorID),
    Power(StoragePower),
    Slashed(TokenAmount),
    Challenged(Vec<ActorID>),
}
