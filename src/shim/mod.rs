// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Re-exports of the `fvm_shared` primitives the consensus core is built on, so
//! that the rest of the crate never names a specific `fvm_shared` version.

pub mod address {
    pub use super::fvm_shared_latest::address::{Address, Payload, Protocol};
}

pub mod bigint {
    pub use super::fvm_shared_latest::bigint::{BigInt, bigint_ser};
}

pub mod clock {
    pub use super::fvm_shared_latest::clock::ChainEpoch;
}

pub mod deal {
    pub use super::fvm_shared_latest::deal::DealID;
}

pub mod econ {
    pub use super::fvm_shared_latest::econ::TokenAmount;
}

pub mod error {
    pub use super::fvm_shared_latest::error::ExitCode;
}

pub mod sector {
    pub use super::fvm_shared_latest::sector::{SectorNumber, StoragePower};
}

pub use fvm_shared_latest::ActorID;

pub mod crypto {
    pub use super::fvm_shared_latest::crypto::signature::{Signature, SignatureType};
    pub(crate) use super::fvm_shared_latest::crypto::signature::ops::verify_bls_sig;
}

mod fvm_shared_latest {
    pub use fvm_shared4::*;
}
