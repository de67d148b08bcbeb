// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Power accounting and sector lifecycle actors.

mod effects;
mod error;
pub mod miner;
mod policy;
pub mod power;
mod runtime;

pub use effects::{Effect, Outbox};
pub use error::*;
pub use policy::{ConsensusFaultType, Policy};
pub use runtime::Runtime;
