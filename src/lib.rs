// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Storage power consensus core: the per-miner power and collateral ledger,
//! the sector proving state machine that drives it, and block validation by
//! storage-power leader election.

pub mod actors;
pub mod blocks;
pub mod chain;
pub mod cli_shared;
pub mod context;
pub mod fil_cns;
pub mod metrics;
pub mod proofs;
pub mod shim;
pub mod state;
#[cfg(test)]
mod test_utils;
pub mod utils;

pub use actors::{ActorError, Effect, Policy};
pub use cli_shared::Config;
pub use context::{Context, Invocation, InvocationReturn, MinerMethod, PowerMethod};
pub use fil_cns::ConsensusError;
