// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::shim::{ActorID, clock::ChainEpoch, econ::TokenAmount, error::ExitCode};
use crate::state::StateError;

pub const ERR_INSUFFICIENT_PLEDGE_COLLATERAL: ExitCode = ExitCode::new(32);
pub const ERR_INVALID_PROOF: ExitCode = ExitCode::new(33);
pub const ERR_ALREADY_SLASHED: ExitCode = ExitCode::new(34);
pub const ERR_INVALID_STATE_TRANSITION: ExitCode = ExitCode::new(35);

/// Failure of an actor operation. Every operation returning an error has left
/// all published state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error(
        "insufficient pledge collateral for miner {miner}: required {required}, available {available}"
    )]
    InsufficientPledgeCollateral {
        miner: ActorID,
        required: TokenAmount,
        available: TokenAmount,
    },
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("consensus fault of miner {miner} at epoch {epoch} already slashed")]
    AlreadySlashed { miner: ActorID, epoch: ChainEpoch },
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl ActorError {
    pub fn not_found(msg: String) -> Self {
        Self::NotFound(msg)
    }
    pub fn invalid_input(msg: String) -> Self {
        Self::InvalidInput(msg)
    }
    pub fn insufficient_funds(msg: String) -> Self {
        Self::InsufficientFunds(msg)
    }
    pub fn invalid_proof(msg: String) -> Self {
        Self::InvalidProof(msg)
    }
    pub fn invalid_state_transition(msg: String) -> Self {
        Self::InvalidStateTransition(msg)
    }
    pub fn illegal_state(msg: String) -> Self {
        Self::IllegalState(msg)
    }

    /// Returns the exit code of the error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::NotFound(_) => ExitCode::USR_NOT_FOUND,
            Self::InvalidInput(_) => ExitCode::USR_ILLEGAL_ARGUMENT,
            Self::InsufficientFunds(_) => ExitCode::USR_INSUFFICIENT_FUNDS,
            Self::InsufficientPledgeCollateral { .. } => ERR_INSUFFICIENT_PLEDGE_COLLATERAL,
            Self::InvalidProof(_) => ERR_INVALID_PROOF,
            Self::InvalidStateTransition(_) => ERR_INVALID_STATE_TRANSITION,
            Self::AlreadySlashed { .. } => ERR_ALREADY_SLASHED,
            Self::IllegalState(_) => ExitCode::USR_ILLEGAL_STATE,
        }
    }

    /// Errors that signal caller misuse or corrupted invariants rather than
    /// a rejected request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidStateTransition(_) | Self::IllegalState(_))
    }
}

impl From<StateError> for ActorError {
    fn from(e: StateError) -> Self {
        Self::IllegalState(e.to_string())
    }
}

/// Convenience macro for generating Actor Errors
#[macro_export]
macro_rules! actor_error {
    // Error with only one stringable expression
    ( $code:ident; $msg:expr ) => { $crate::actors::ActorError::$code($msg.to_string()) };

    // String with positional arguments
    ( $code:ident; $msg:literal $(, $ex:expr)+ ) => {
        $crate::actors::ActorError::$code(format!($msg, $($ex,)*))
    };
}
