// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Storage power accounting: balances, pledge collateral, slashing and
//! surprise challenges over the power ledger.

mod state;
pub mod testing;
mod types;

pub use self::state::*;
pub use self::types::*;

use crate::actor_error;
use crate::actors::{ActorError, ConsensusFaultType, Effect, Runtime, miner};
use crate::chain::DomainSeparationTag;
use crate::shim::{
    ActorID, address::Address, clock::ChainEpoch, econ::TokenAmount, sector::StoragePower,
};
use num_traits::Signed as _;
use rand::SeedableRng as _;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};

/// Storage Power Actor
pub struct Actor;

impl Actor {
    pub fn create_miner<RT: Runtime>(
        rt: &RT,
        params: CreateMinerParams,
    ) -> Result<ActorID, ActorError> {
        let CreateMinerParams {
            owner,
            worker,
            peer_id,
        } = params;
        let id = rt.power().transaction(|st: &mut State| {
            Ok::<_, ActorError>(st.register_miner(MinerInfo {
                owner,
                worker,
                peer_id,
            }))
        })?;
        rt.create_miner_state(id, miner::State::default());
        info!("created miner {id} owned by {owner}");
        Ok(id)
    }

    /// Deletes a miner without power and returns its remaining funds to the
    /// owner.
    pub fn remove_miner<RT: Runtime>(rt: &RT, miner: ActorID) -> Result<(), ActorError> {
        let (entry, info) = rt
            .power()
            .transaction(|st: &mut State| st.remove_miner(miner))?;
        rt.delete_miner_state(miner);
        info!("removed miner {miner}");
        rt.send(Effect::SendFunds {
            to: info.owner,
            amount: entry.total_balance(),
        });
        Ok(())
    }

    pub fn add_balance<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        amount: TokenAmount,
    ) -> Result<(), ActorError> {
        rt.power()
            .transaction(|st: &mut State| st.add_balance(miner, &amount))
            .inspect_err(|e| warn!("rejected deposit to miner {miner}: {e}"))
    }

    /// Releases `amount` of the available balance to the miner's owner.
    pub fn withdraw_balance<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        amount: TokenAmount,
    ) -> Result<(), ActorError> {
        let owner = rt
            .power()
            .transaction(|st: &mut State| {
                st.withdraw_balance(miner, &amount)?;
                owner_of(st, miner)
            })
            .inspect_err(|e| warn!("rejected withdrawal from miner {miner}: {e}"))?;
        rt.send(Effect::SendFunds { to: owner, amount });
        Ok(())
    }

    pub fn get_total_power<RT: Runtime>(rt: &RT) -> StoragePower {
        rt.power().snapshot().total_power().clone()
    }

    /// Moves available balance into locked collateral until it backs the
    /// miner's current power.
    pub fn ensure_pledge_collateral_satisfied<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
    ) -> Result<(), ActorError> {
        Self::ensure_pledge_for_additional_power(rt, miner, &StoragePower::default())
    }

    /// Same admission rule as [`Actor::ensure_pledge_collateral_satisfied`],
    /// applied to power the miner is about to gain.
    pub(in crate::actors) fn ensure_pledge_for_additional_power<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        additional_power: &StoragePower,
    ) -> Result<(), ActorError> {
        let locked = rt.power().transaction(|st: &mut State| {
            st.ensure_pledge_collateral(rt.policy(), miner, additional_power)
        })?;
        if locked.is_positive() {
            debug!("locked {locked} additional pledge collateral for miner {miner}");
        }
        Ok(())
    }

    /// Burns collateral in proportion to the power affected by a storage
    /// fault. Returns the amount actually slashed.
    pub fn slash_pledge_for_storage_faults<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        affected_power: &StoragePower,
        fault_type: ConsensusFaultType,
    ) -> Result<TokenAmount, ActorError> {
        if affected_power.is_negative() {
            return Err(actor_error!(invalid_input; "negative affected power {}", affected_power));
        }
        let amount = rt.policy().slash_amount(affected_power, fault_type);
        let slashed = rt
            .power()
            .transaction(|st: &mut State| st.slash_pledge_collateral(miner, &amount))?;
        if slashed < amount {
            warn!("miner {miner} had only {slashed} of {amount} collateral to slash for {fault_type} fault");
        }
        debug!("slashed {slashed} from miner {miner} for {fault_type} fault on {affected_power} bytes");
        rt.send(Effect::BurnFunds {
            amount: slashed.clone(),
        });
        Ok(slashed)
    }

    /// Overwrites the miner's power with the absolute values in `report` and
    /// returns the change of active power.
    pub(in crate::actors) fn process_power_report<RT: Runtime>(
        rt: &RT,
        report: PowerReport,
    ) -> Result<StoragePower, ActorError> {
        let PowerReport {
            miner,
            active_power,
            inactive_power,
        } = report;
        rt.power()
            .transaction(|st: &mut State| st.set_power(miner, active_power, inactive_power))
    }

    /// Punishes a proven consensus fault once per offender and epoch, paying a
    /// share of the slashed collateral to the reporter. Returns the amount
    /// slashed.
    pub fn report_consensus_fault<RT: Runtime>(
        rt: &RT,
        params: ReportConsensusFaultParams,
    ) -> Result<TokenAmount, ActorError> {
        let ReportConsensusFaultParams {
            slasher,
            fault_type,
            proof,
        } = params;
        let accused = proof.block_a.miner_address;
        let offender = accused.id().map_err(|e| {
            actor_error!(invalid_input; "offender {} is not an ID address: {}", accused, e)
        })?;
        let worker = rt
            .power()
            .snapshot()
            .info(offender)
            .map(|info| info.worker)
            .ok_or_else(|| actor_error!(not_found; "miner {} is not registered", offender))?;
        let fault = rt
            .verifier()
            .verify_consensus_fault(&proof, &worker)
            .map_err(|e| actor_error!(invalid_proof; "invalid consensus fault evidence: {}", e))?
            .ok_or_else(|| actor_error!(invalid_proof; "evidence shows no consensus fault"))?;

        let policy = rt.policy();
        let slashed = rt.power().transaction(|st: &mut State| {
            let power = st
                .entry(offender)
                .ok_or_else(|| actor_error!(not_found; "miner {} is not registered", offender))?
                .total_power();
            st.record_consensus_fault(offender, fault.epoch)?;
            st.slash_pledge_collateral(offender, &policy.slash_amount(&power, fault_type))
        })?;

        let bounty = policy.reporter_share(&slashed);
        info!(
            "slashed {slashed} from miner {offender} for {} at epoch {}, bounty {bounty} to {slasher}",
            fault.kind, fault.epoch
        );
        rt.send_all(vec![
            Effect::SendFunds {
                to: slasher,
                amount: bounty.clone(),
            },
            Effect::BurnFunds {
                amount: &slashed - &bounty,
            },
        ]);
        Ok(slashed)
    }

    /// Samples miners for surprise PoSt challenges at `epoch`. The sample is a
    /// pure function of the chain randomness at `epoch` and the registered
    /// miners, returned in ascending ID order.
    pub fn surprise<RT: Runtime>(rt: &RT, epoch: ChainEpoch) -> Result<Vec<ActorID>, ActorError> {
        let st = rt.power().snapshot();
        let miners: Vec<ActorID> = st.miners().collect();
        let count = surprise_challenge_count(
            rt.policy().surprise_challenge_frequency,
            miners.len(),
            rt.policy().proving_period,
        );
        if count == 0 {
            return Ok(vec![]);
        }

        let seed = rt.get_randomness(DomainSeparationTag::SurpriseSampling, epoch, &[])?;
        let mut rng = ChaCha20Rng::from_seed(seed);
        let mut sampled: Vec<ActorID> = rand::seq::index::sample(&mut rng, miners.len(), count)
            .into_iter()
            .map(|i| miners[i])
            .collect();
        sampled.sort_unstable();

        info!(
            "surprise challenged {} of {} miners at epoch {epoch}",
            sampled.len(),
            miners.len()
        );
        rt.send_all(
            sampled
                .iter()
                .map(|&miner| Effect::SurpriseChallenge { miner, epoch })
                .collect(),
        );
        Ok(sampled)
    }
}

fn owner_of(st: &State, miner: ActorID) -> Result<Address, ActorError> {
    st.info(miner)
        .map(|info| info.owner)
        .ok_or_else(|| actor_error!(illegal_state; "miner {} has no info", miner))
}

/// `ceil(frequency × miners / proving_period)`, capped at `miners`.
fn surprise_challenge_count(frequency: u64, miners: usize, proving_period: ChainEpoch) -> usize {
    let Ok(period) = u128::try_from(proving_period) else {
        return 0;
    };
    if period == 0 {
        return 0;
    }
    let wanted = (u128::from(frequency) * miners as u128).div_ceil(period);
    usize::try_from(wanted).unwrap_or(miners).min(miners)
}
