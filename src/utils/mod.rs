// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod encoding;
pub mod io;
pub mod message_accumulator;

pub use message_accumulator::MessageAccumulator;
