// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{bigint::BigInt, clock::ChainEpoch, econ::TokenAmount, sector::StoragePower};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// Severity tiers of storage faults, in increasing order of penalty.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
pub enum ConsensusFaultType {
    /// Reported by the miner ahead of a missed proof.
    Declared,
    /// Found by cron when a proving period closes without a proof.
    Detected,
    /// Sector cleared after too many consecutive faults.
    Terminated,
}

/// Tunable economic and timing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, smart_default::SmartDefault)]
#[serde(default)]
pub struct Policy {
    /// Bytes of storage power credited per sector.
    #[default(32 << 30)]
    pub sector_size: u64,
    /// Pledge requirement in attoFIL per `pledge_denominator` bytes of power.
    #[default(1_000_000_000_000_000_000)]
    pub pledge_numerator: u64,
    #[default(32 << 30)]
    pub pledge_denominator: u64,
    /// Slash rates in attoFIL per byte of affected power.
    #[default(1)]
    pub declared_fault_slash_rate: u64,
    #[default(5)]
    pub detected_fault_slash_rate: u64,
    #[default(10)]
    pub terminated_fault_slash_rate: u64,
    /// Share of a consensus fault slash paid to the reporter.
    #[default(1)]
    pub consensus_fault_reporter_share_numerator: u64,
    #[default(4)]
    pub consensus_fault_reporter_share_denominator: u64,
    /// Consecutive faults tolerated before a sector is cleared.
    #[default(3)]
    pub max_consecutive_faults: u64,
    #[default(2880)]
    pub proving_period: ChainEpoch,
    /// Expected surprise challenges per miner per proving period.
    #[default(1)]
    pub surprise_challenge_frequency: u64,
    #[default(1)]
    pub ticket_lookback: ChainEpoch,
    #[default(300)]
    pub election_lookback: ChainEpoch,
    #[default(900)]
    pub seal_randomness_lookback: ChainEpoch,
    #[default(20)]
    pub post_challenge_lookback: ChainEpoch,
    #[default(192)]
    pub max_proof_size: usize,
}

impl Policy {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.sector_size > 0, "sector size must be positive");
        ensure!(
            self.pledge_denominator > 0,
            "pledge denominator must be positive"
        );
        ensure!(
            self.declared_fault_slash_rate < self.detected_fault_slash_rate
                && self.detected_fault_slash_rate < self.terminated_fault_slash_rate,
            "slash rates must strictly increase from declared to detected to terminated"
        );
        ensure!(
            self.consensus_fault_reporter_share_denominator > 0
                && self.consensus_fault_reporter_share_numerator
                    <= self.consensus_fault_reporter_share_denominator,
            "reporter share must be a fraction in [0, 1]"
        );
        ensure!(self.proving_period > 0, "proving period must be positive");
        ensure!(
            self.ticket_lookback >= 0
                && self.election_lookback >= 0
                && self.seal_randomness_lookback >= 0
                && self.post_challenge_lookback >= 0,
            "lookbacks must not be negative"
        );
        ensure!(self.max_proof_size > 0, "max proof size must be positive");
        Ok(())
    }

    pub fn sector_power(&self) -> StoragePower {
        StoragePower::from(self.sector_size)
    }

    /// Power of `sectors` sectors.
    pub fn power_for_sectors(&self, sectors: usize) -> StoragePower {
        self.sector_power() * BigInt::from(sectors)
    }

    /// Collateral that must be locked to back `power`. Monotonic in `power`.
    pub fn pledge_requirement(&self, power: &StoragePower) -> TokenAmount {
        let denominator = BigInt::from(self.pledge_denominator);
        let scaled = power * BigInt::from(self.pledge_numerator);
        TokenAmount::from_atto((scaled + &denominator - 1) / denominator)
    }

    pub fn slash_rate(&self, fault: ConsensusFaultType) -> u64 {
        match fault {
            ConsensusFaultType::Declared => self.declared_fault_slash_rate,
            ConsensusFaultType::Detected => self.detected_fault_slash_rate,
            ConsensusFaultType::Terminated => self.terminated_fault_slash_rate,
        }
    }

    /// Penalty for `power` affected by a fault of the given tier.
    pub fn slash_amount(&self, power: &StoragePower, fault: ConsensusFaultType) -> TokenAmount {
        TokenAmount::from_atto(power * BigInt::from(self.slash_rate(fault)))
    }

    /// Reporter's cut of a consensus fault slash, rounded down.
    pub fn reporter_share(&self, slashed: &TokenAmount) -> TokenAmount {
        TokenAmount::from_atto(
            slashed.atto() * BigInt::from(self.consensus_fault_reporter_share_numerator)
                / BigInt::from(self.consensus_fault_reporter_share_denominator),
        )
    }

    /// Proving period containing `epoch`.
    pub fn proving_period_of(&self, epoch: ChainEpoch) -> ChainEpoch {
        epoch.div_euclid(self.proving_period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        Policy::default().validate().unwrap();
    }

    #[test]
    fn slash_rates_must_increase() {
        let policy = Policy {
            detected_fault_slash_rate: 1,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn pledge_requirement_rounds_up() {
        let policy = Policy {
            pledge_numerator: 1,
            pledge_denominator: 3,
            ..Default::default()
        };
        assert_eq!(
            policy.pledge_requirement(&StoragePower::from(4)),
            TokenAmount::from_atto(2)
        );
        assert_eq!(
            policy.pledge_requirement(&StoragePower::from(0)),
            TokenAmount::from_atto(0)
        );
    }

    #[test]
    fn reporter_share_rounds_down() {
        let policy = Policy::default();
        assert_eq!(
            policy.reporter_share(&TokenAmount::from_atto(10)),
            TokenAmount::from_atto(2)
        );
    }

    #[test]
    fn proving_period_of_negative_epoch() {
        let policy = Policy {
            proving_period: 10,
            ..Default::default()
        };
        assert_eq!(policy.proving_period_of(-1), -1);
        assert_eq!(policy.proving_period_of(0), 0);
        assert_eq!(policy.proving_period_of(19), 1);
    }
}
