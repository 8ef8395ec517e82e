//! Inverse solver for the buy direction.
//!
//! Buying fixes the reserve paid and asks for the supply it mints, which means
//! inverting `s^(k+1)` in integer arithmetic. There is no closed form for that
//! in fixed point, so the solver bisects over the final supply instead: it
//! looks for the largest `s` whose normalized integral does not exceed the
//! target, which never mints more than the reserve pays for.

use alloy_primitives::U256;
use tracing::debug;

use crate::curve::CurveParams;
use crate::error::{CurveError, CurveResult, MathError};
use crate::math::SCALE;

/// Default width of the search range, in whole tokens
pub const DEFAULT_SEARCH_CEILING_TOKENS: u64 = 1_000_000_000_000;

const ONE: U256 = U256::from_limbs([1u64, 0, 0, 0]);
const TWO: U256 = U256::from_limbs([2u64, 0, 0, 0]);

/// Outcome of one buy-side search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuySolution {
    /// Supply to mint, rounded down
    pub supply_delta: U256,
    /// Integral evaluations spent
    pub iterations: u32,
}

/// Search ceiling in supply units for a ceiling in whole tokens.
pub fn search_ceiling(tokens: u64) -> U256 {
    U256::from(tokens) * SCALE
}

/// Worst-case number of integral evaluations for a given ceiling.
///
/// Bracket expansion and bisection each halve or double a range no wider
/// than the ceiling.
pub fn search_iteration_bound(ceiling: U256) -> u32 {
    2 * (ceiling.bit_len() as u32 + 1)
}

/// Supply minted when `reserve_amount` is paid into a curve at `supply`.
///
/// Candidates are restricted to `[supply, supply + ceiling]`. A target that
/// lies beyond the ceiling is rejected instead of being clamped, since the
/// buyer would otherwise pay the full amount for a truncated mint.
pub fn solve_buy(
    params: &CurveParams,
    supply: U256,
    reserve_amount: U256,
    ceiling: U256,
) -> CurveResult<BuySolution> {
    if reserve_amount.is_zero() {
        return Ok(BuySolution {
            supply_delta: U256::ZERO,
            iterations: 0,
        });
    }

    let linear_estimate = params.normalize_reserve(reserve_amount)?;
    let target = params
        .normalized_integral(supply)?
        .checked_add(linear_estimate)
        .ok_or(MathError::Overflow)?;
    let cap = supply.checked_add(ceiling).ok_or(MathError::Overflow)?;

    // An integral too large for 256 bits is certainly above the target
    let fits = |candidate: U256| -> Result<bool, MathError> {
        match params.normalized_integral(candidate) {
            Ok(value) => Ok(value <= target),
            Err(MathError::Overflow) => Ok(false),
            Err(err) => Err(err),
        }
    };

    match params.normalized_integral(cap) {
        Ok(at_cap) if at_cap < target => {
            return Err(CurveError::SearchCeilingExceeded { ceiling });
        }
        Ok(at_cap) if at_cap == target => {
            return Ok(BuySolution {
                supply_delta: ceiling,
                iterations: 1,
            });
        }
        Ok(_) | Err(MathError::Overflow) => {}
        Err(err) => return Err(err.into()),
    }

    let mut iterations = 1u32;
    let mut low = supply;
    let mut high = supply.saturating_add(linear_estimate.max(ONE)).min(cap);

    // Below one whole token s^k < 1 and the linear estimate undershoots
    while fits(high)? {
        low = high;
        let width = (high - supply).saturating_mul(TWO);
        high = supply.saturating_add(width).min(cap);
        iterations += 1;
    }

    while high - low > ONE {
        let mid = low + (high - low) / TWO;
        if fits(mid)? {
            low = mid;
        } else {
            high = mid;
        }
        iterations += 1;
    }

    debug!(%supply, %reserve_amount, %low, iterations, "buy search converged");

    Ok(BuySolution {
        supply_delta: low.saturating_sub(supply),
        iterations,
    })
}
