//! Error taxonomy for the curve engine.
//!
//! Every failure is detected before the engine mutates its own state; the
//! caller resubmits with adjusted parameters, nothing is retried internally.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Failures of the fixed-point kernel.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Intermediate or final value does not fit in 256 bits
    #[error("fixed-point overflow")]
    Overflow,

    /// Subtraction would go below zero
    #[error("fixed-point underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Failures reported by a token collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("account {account} holds {available}, needs {needed}")]
    InsufficientBalance {
        account: Address,
        needed: U256,
        available: U256,
    },

    /// The token refused the operation for its own reasons
    #[error("token rejected operation: {0}")]
    Rejected(String),
}

/// Errors returned by curve initialization, quotes and trades.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurveError {
    #[error("no curve initialized for asset {0}")]
    CurveNotInitialized(Address),

    #[error("curve for asset {0} is already initialized")]
    CurveAlreadyInitialized(Address),

    /// Coefficient or exponent outside the accepted bounds
    #[error("invalid curve parameter: {0}")]
    InvalidCurveParameter(String),

    #[error("amount must be non-zero")]
    ZeroAmount,

    #[error("trade produces zero output")]
    ZeroOutput,

    #[error("slippage exceeded: minimum {minimum}, actual {actual}")]
    SlippageExceeded { minimum: U256, actual: U256 },

    /// Sell request larger than the circulating supply
    #[error("insufficient supply: requested {requested}, available {available}")]
    InsufficientSupply { requested: U256, available: U256 },

    /// Reserve ledger cannot cover a payout
    #[error("insufficient reserves: required {required}, available {available}")]
    InsufficientReserves { required: U256, available: U256 },

    #[error("reentrant call rejected")]
    ReentrantCall,

    #[error("caller {0} is not the owner")]
    Unauthorized(Address),

    #[error("token {0} is not held by the engine")]
    UnsupportedToken(Address),

    #[error("owner cannot be the zero address")]
    ZeroOwner,

    /// Requested trade needs more supply than the search range allows
    #[error("trade exceeds the search ceiling of {ceiling} supply units")]
    SearchCeilingExceeded { ceiling: U256 },

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

pub type CurveResult<T> = Result<T, CurveError>;
