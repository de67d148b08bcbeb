// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Per-miner sector lifecycle: commit, prove, fault, recover and expire.
//!
//! Every operation holds the miner's exclusive state handle from the first
//! read until its ledger updates are done, so the lock order is always
//! miner state, then power ledger.

mod bitfield_queue;
mod state;
pub mod testing;
mod types;

pub use self::bitfield_queue::{ExpirationQueue, ProvingSet};
pub use self::state::*;
pub use self::types::*;

use crate::actor_error;
use crate::actors::power::{self, PowerReport};
use crate::actors::{ActorError, ConsensusFaultType, Effect, Policy, Runtime};
use crate::chain::DomainSeparationTag;
use crate::metrics::{SECTOR_TRANSITIONS, values};
use crate::proofs::{PoStChallenges, SealVerifyInfo};
use crate::shim::{ActorID, clock::ChainEpoch, sector::SectorNumber};
use fvm_ipld_bitfield::BitField;
use tracing::{debug, error, info, warn};

/// Storage Miner Actor
pub struct Actor;

/// Ledger updates and outbound messages an operation applies once its new
/// sector state is published.
#[derive(Debug, Default)]
struct Bookkeeping {
    declared: usize,
    detected: usize,
    terminated: usize,
    effects: Vec<Effect>,
}

impl Actor {
    /// Adds a freshly sealed sector. Its power counts as inactive until the
    /// first successful PoSt.
    pub fn commit_sector<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        params: CommitSectorParams,
    ) -> Result<(), ActorError> {
        let handle = rt.miner(miner)?;
        let mut guard = handle.acquire();
        let policy = rt.policy();
        let curr_epoch = rt.curr_epoch()?;
        let st = guard.state();

        let sector_number = params.sector_number;
        if st.sectors.contains_key(&sector_number) {
            let e = actor_error!(invalid_state_transition; "sector {} already committed", sector_number);
            error!("miner {miner}: {e}");
            return Err(e);
        }
        if sector_number > MAX_SECTOR_NUMBER {
            return Err(actor_error!(invalid_input; "sector number {} out of range", sector_number));
        }
        if params.expiration <= curr_epoch {
            return Err(actor_error!(
                invalid_input;
                "sector {} expiration {} must be after current epoch {}",
                sector_number,
                params.expiration,
                curr_epoch
            ));
        }
        check_proof_size(policy, &params.proof)?;

        let randomness = rt.get_randomness(
            DomainSeparationTag::SealRandomness,
            curr_epoch - policy.seal_randomness_lookback,
            &miner_entropy(miner),
        )?;
        let seal = SealVerifyInfo {
            miner,
            sector_number,
            sealed_cid: params.sealed_cid,
            unsealed_cid: params.unsealed_cid,
            deal_ids: params.deal_ids.clone(),
            randomness,
            proof: params.proof,
        };
        if !rt.verifier().verify_seal(&seal) {
            warn!("miner {miner}: seal verification failed for sector {sector_number}");
            return Err(actor_error!(invalid_proof; "seal of sector {} is invalid", sector_number));
        }

        power::Actor::ensure_pledge_for_additional_power(rt, miner, &policy.sector_power())?;

        let mut next = st.clone();
        next.add_sector(SectorOnChainInfo {
            sector_number,
            seal_commitment: SealCommitment {
                unsealed_cid: seal.unsealed_cid,
                sealed_cid: seal.sealed_cid,
                deal_ids: params.deal_ids,
            },
            expiration: params.expiration,
        });
        guard.publish(next)?;
        SECTOR_TRANSITIONS
            .get_or_create(&values::SECTOR_COMMITTED)
            .inc();
        debug!("miner {miner}: committed sector {sector_number}, expires at {}", params.expiration);

        finish(rt, miner, guard.state(), Bookkeeping::default());
        Ok(())
    }

    /// Processes a proof of spacetime for the current proving period.
    ///
    /// Proved sectors activate, failing sectors accrue a fault and due
    /// sectors expire, all against the state as it was before the call. The
    /// proof is always verified first; a valid second submission in a period
    /// that already has a proof is accepted without effect.
    pub fn submit_post<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        submission: PoStSubmission,
    ) -> Result<(), ActorError> {
        let handle = rt.miner(miner)?;
        let mut guard = handle.acquire();
        let policy = rt.policy();
        let curr_epoch = rt.curr_epoch()?;
        let period = policy.proving_period_of(curr_epoch);
        let st = guard.state();

        check_proof_size(policy, &submission.proof)?;
        let randomness = rt.get_randomness(
            DomainSeparationTag::PoStChallengeSeed,
            curr_epoch - policy.post_challenge_lookback,
            &miner_entropy(miner),
        )?;
        let challenges = PoStChallenges::generate(randomness, submission.proved.iter());
        if !rt.verifier().verify_post(&challenges, &submission.proof) {
            warn!("miner {miner}: PoSt verification failed in period {period}");
            return Err(actor_error!(invalid_proof; "PoSt for period {} is invalid", period));
        }

        if st.last_post_period == Some(period) {
            debug!("miner {miner}: proving period {period} already proved");
            return Ok(());
        }
        if st.last_cron_period == Some(period) {
            return Err(actor_error!(invalid_input; "proving period {} already closed", period));
        }

        if !st.proving_set.matches(&submission.proved) {
            let e = actor_error!(
                invalid_state_transition;
                "proved sectors {:?} differ from proving set {:?}",
                submission.proved.iter().collect::<Vec<_>>(),
                st.proving_set.iter().collect::<Vec<_>>()
            );
            error!("miner {miner}: {e}");
            return Err(e);
        }

        let mut next = st.clone();
        let mut book = Bookkeeping::default();

        // Phase 1: proved sectors
        let mut paid = vec![];
        for sector in submission.proved.iter() {
            let status = live_status(st, sector)?;
            match status.state {
                SectorState::Committed | SectorState::Recovering => {
                    next.set_state(sector, SectorState::Active, 0);
                    SECTOR_TRANSITIONS
                        .get_or_create(&values::SECTOR_ACTIVATED)
                        .inc();
                    debug!("miner {miner}: sector {sector} {} -> Active", status.state);
                }
                SectorState::Active => paid.push(sector),
                SectorState::Failing => {
                    return Err(actor_error!(
                        invalid_state_transition;
                        "failing sector {} cannot be proved",
                        sector
                    ));
                }
            }
        }
        book.effects.push(Effect::ProcessStorageDealsPayment {
            miner,
            deal_ids: st.deal_ids(&paid),
        });

        // Phase 2: unproved sectors
        let mut terminated = vec![];
        for sector in st.sectors_in(SectorState::Failing) {
            if record_fault(policy, miner, &mut next, sector, live_status(st, sector)?) {
                terminated.push(sector);
            }
        }
        book.terminated = terminated.len();
        book.effects.push(Effect::SlashStorageDealCollateral {
            miner,
            deal_ids: st.deal_ids(&terminated),
        });

        // Phase 3: expirations
        expire_sectors(miner, &mut next, curr_epoch, &mut book);

        next.last_post_period = Some(period);
        guard.publish(next)?;
        debug!("miner {miner}: accepted PoSt for period {period}");

        finish(rt, miner, guard.state(), book);
        Ok(())
    }

    /// Marks sectors as failing ahead of a missed proof, at the lowest
    /// penalty rate. Declared sectors are never cleared here; the fault limit
    /// is enforced when the next PoSt or cron finds them failing.
    pub fn declare_faults<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        sectors: BitField,
    ) -> Result<(), ActorError> {
        let handle = rt.miner(miner)?;
        let mut guard = handle.acquire();
        let st = guard.state();

        if sectors.is_empty() {
            return Err(actor_error!(invalid_input; "no sectors to declare faulty"));
        }
        let mut declared = vec![];
        for sector in sectors.iter() {
            let status = st
                .status(sector)
                .ok_or_else(|| actor_error!(not_found; "sector {} not found", sector))?;
            if !status.state.is_proving() {
                let e = actor_error!(invalid_state_transition; "sector {} is already failing", sector);
                error!("miner {miner}: {e}");
                return Err(e);
            }
            declared.push((sector, status));
        }

        let mut next = st.clone();
        let mut sector_numbers = Vec::with_capacity(declared.len());
        for (sector, status) in declared {
            fail_sector(miner, &mut next, sector, status);
            sector_numbers.push(sector);
        }
        let book = Bookkeeping {
            declared: sector_numbers.len(),
            effects: vec![Effect::SlashStorageDealCollateral {
                miner,
                deal_ids: st.deal_ids(&sector_numbers),
            }],
            ..Default::default()
        };

        guard.publish(next)?;
        info!("miner {miner}: declared {} faulty sectors", sector_numbers.len());

        finish(rt, miner, guard.state(), book);
        Ok(())
    }

    /// Returns failing sectors to the proving set. Their power comes back
    /// only after the next successful PoSt.
    pub fn recover_faults<RT: Runtime>(
        rt: &RT,
        miner: ActorID,
        sectors: BitField,
    ) -> Result<(), ActorError> {
        let handle = rt.miner(miner)?;
        let mut guard = handle.acquire();
        let st = guard.state();

        if sectors.is_empty() {
            return Err(actor_error!(invalid_input; "no sectors to recover"));
        }
        let mut next = st.clone();
        let mut recovered = vec![];
        for sector in sectors.iter() {
            let status = st
                .status(sector)
                .ok_or_else(|| actor_error!(not_found; "sector {} not found", sector))?;
            if status.state != SectorState::Failing {
                let e = actor_error!(
                    invalid_state_transition;
                    "sector {} is {}, not failing",
                    sector,
                    status.state
                );
                error!("miner {miner}: {e}");
                return Err(e);
            }
            next.set_state(sector, SectorState::Recovering, status.fault_count);
            recovered.push(sector);
        }
        let book = Bookkeeping {
            effects: vec![Effect::PublishStorageDeals {
                miner,
                deal_ids: st.deal_ids(&recovered),
            }],
            ..Default::default()
        };

        guard.publish(next)?;
        SECTOR_TRANSITIONS
            .get_or_create(&values::SECTOR_RECOVERING)
            .inc_by(recovered.len() as u64);
        info!("miner {miner}: recovering {} sectors", recovered.len());

        finish(rt, miner, guard.state(), book);
        Ok(())
    }

    /// Closes a proving period that ended without a PoSt: every sector owing
    /// a proof fails, failing sectors accrue a fault and due sectors expire.
    /// Does nothing for a period that was proved or already closed.
    pub fn cron_action<RT: Runtime>(rt: &RT, miner: ActorID) -> Result<(), ActorError> {
        let handle = rt.miner(miner)?;
        let mut guard = handle.acquire();
        let policy = rt.policy();
        let curr_epoch = rt.curr_epoch()?;
        let period = policy.proving_period_of(curr_epoch);
        let st = guard.state();

        if st.last_post_period == Some(period) || st.last_cron_period == Some(period) {
            debug!("miner {miner}: nothing to do for proving period {period}");
            return Ok(());
        }

        let mut next = st.clone();
        let mut book = Bookkeeping::default();
        let mut terminated = vec![];
        for (&sector, &status) in &st.sector_states {
            let cleared = match status.state {
                SectorState::Failing | SectorState::Recovering => {
                    record_fault(policy, miner, &mut next, sector, status)
                }
                SectorState::Committed | SectorState::Active => {
                    fail_sector(miner, &mut next, sector, status);
                    false
                }
            };
            if cleared {
                terminated.push(sector);
            } else if status.state.is_proving() {
                book.detected += 1;
            }
        }
        book.terminated = terminated.len();
        book.effects.push(Effect::SlashStorageDealCollateral {
            miner,
            deal_ids: st.deal_ids(&terminated),
        });
        expire_sectors(miner, &mut next, curr_epoch, &mut book);

        next.last_cron_period = Some(period);
        guard.publish(next)?;
        if book.detected > 0 {
            warn!("miner {miner}: {} sectors missed PoSt in period {period}", book.detected);
        }

        finish(rt, miner, guard.state(), book);
        Ok(())
    }
}

fn check_proof_size(policy: &Policy, proof: &[u8]) -> Result<(), ActorError> {
    if proof.is_empty() || proof.len() > policy.max_proof_size {
        return Err(actor_error!(
            invalid_input;
            "proof size {} outside 1..={}",
            proof.len(),
            policy.max_proof_size
        ));
    }
    Ok(())
}

fn live_status(st: &State, sector: SectorNumber) -> Result<SectorStatus, ActorError> {
    st.status(sector)
        .ok_or_else(|| actor_error!(illegal_state; "proving set holds unknown sector {}", sector))
}

/// Counts one more consecutive fault against `sector` and clears it once the
/// count exceeds the limit. Returns whether the sector was cleared.
fn record_fault(
    policy: &Policy,
    miner: ActorID,
    next: &mut State,
    sector: SectorNumber,
    prior: SectorStatus,
) -> bool {
    let fault_count = prior.fault_count + 1;
    if fault_count > policy.max_consecutive_faults {
        next.clear_sector(sector);
        SECTOR_TRANSITIONS
            .get_or_create(&values::SECTOR_TERMINATED)
            .inc();
        info!("miner {miner}: sector {sector} cleared after {fault_count} consecutive faults");
        return true;
    }
    fail_sector(miner, next, sector, prior);
    false
}

/// Moves `sector` to Failing with one more consecutive fault.
fn fail_sector(miner: ActorID, next: &mut State, sector: SectorNumber, prior: SectorStatus) {
    let fault_count = prior.fault_count + 1;
    next.set_state(sector, SectorState::Failing, fault_count);
    if prior.state != SectorState::Failing {
        SECTOR_TRANSITIONS
            .get_or_create(&values::SECTOR_FAILED)
            .inc();
    }
    debug!(
        "miner {miner}: sector {sector} {} -> Failing, fault count {fault_count}",
        prior.state
    );
}

fn expire_sectors(
    miner: ActorID,
    next: &mut State,
    curr_epoch: ChainEpoch,
    book: &mut Bookkeeping,
) {
    let expired = next.expiration_queue.pop_until(curr_epoch);
    let mut deal_ids = vec![];
    for sector in expired.iter() {
        if let Some(info) = next.clear_sector(sector) {
            deal_ids.extend(info.seal_commitment.deal_ids);
            SECTOR_TRANSITIONS
                .get_or_create(&values::SECTOR_EXPIRED)
                .inc();
            debug!("miner {miner}: sector {sector} expired at {}", info.expiration);
        }
    }
    book.effects
        .push(Effect::SettleExpiredDeals { miner, deal_ids });
}

/// Reports the miner's power, applies the slashes and sends the effects
/// gathered by an operation whose state is already published. Ledger
/// failures at this point are logged rather than returned.
fn finish<RT: Runtime>(rt: &RT, miner: ActorID, state: &State, book: Bookkeeping) {
    let policy = rt.policy();
    let (active, inactive) = state.power(policy);
    match power::Actor::process_power_report(rt, PowerReport::new(miner, active, inactive)) {
        Ok(delta) => rt.send(Effect::UpdatePower { miner, delta }),
        Err(e) => error!("miner {miner}: failed to report power: {e}"),
    }

    for (fault_type, sectors) in [
        (ConsensusFaultType::Declared, book.declared),
        (ConsensusFaultType::Detected, book.detected),
        (ConsensusFaultType::Terminated, book.terminated),
    ] {
        if sectors == 0 {
            continue;
        }
        if let Err(e) = power::Actor::slash_pledge_for_storage_faults(
            rt,
            miner,
            &policy.power_for_sectors(sectors),
            fault_type,
        ) {
            error!("miner {miner}: failed to slash {sectors} {fault_type} sectors: {e}");
        }
    }

    rt.send_all(book.effects);
}
