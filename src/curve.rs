//! Power-law curve `price(s) = c * s^k` and its antiderivative.
//!
//! The integral is kept in two views: the coefficient-free *normalized*
//! integral `s^(k+1) / (k+1)`, which is the domain the inverse solver searches
//! in, and the *reserve* integral `c * s^(k+1) / (k+1)`, the amount of reserve
//! that must back a supply `s`.

use alloy_primitives::U256;
use crate::error::{CurveError, CurveResult, MathError};
use crate::math::{div_fixed, mul_div, mul_div_up, mul_fixed, power, SCALE};

/// Smallest accepted coefficient (1e-9 reserve per token, scaled)
pub const MIN_COEFFICIENT: U256 = U256::from_limbs([1_000_000_000u64, 0, 0, 0]);

/// Largest accepted exponent (10.0, scaled)
pub const MAX_EXPONENT: U256 = U256::from_limbs([10_000_000_000_000_000_000u64, 0, 0, 0]);

/// Coefficient and exponent of one priced asset's curve.
///
/// Both values are scaled by [`SCALE`]. The exponent is a whole number in
/// `[1, 10]`; construction through [`CurveParams::new`] is the only way to
/// obtain one, so every instance in the engine has passed validation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CurveParams {
    coefficient: U256,
    exponent: U256,
}

impl CurveParams {
    pub fn new(coefficient: U256, exponent: U256) -> CurveResult<Self> {
        if coefficient < MIN_COEFFICIENT {
            return Err(CurveError::InvalidCurveParameter(format!(
                "coefficient {coefficient} below minimum {MIN_COEFFICIENT}"
            )));
        }
        if exponent.is_zero() || exponent > MAX_EXPONENT {
            return Err(CurveError::InvalidCurveParameter(format!(
                "exponent {exponent} outside (0, {MAX_EXPONENT}]"
            )));
        }
        if !(exponent % SCALE).is_zero() {
            return Err(CurveError::InvalidCurveParameter(format!(
                "exponent {exponent} is fractional"
            )));
        }

        Ok(Self {
            coefficient,
            exponent,
        })
    }

    pub fn coefficient(&self) -> U256 {
        self.coefficient
    }

    pub fn exponent(&self) -> U256 {
        self.exponent
    }

    // Bounded by MAX_EXPONENT + SCALE, cannot overflow
    fn exponent_plus_one(&self) -> U256 {
        self.exponent + SCALE
    }

    /// `s^(k+1) / (k+1)`, scaled. Zero at zero supply.
    pub fn normalized_integral(&self, supply: U256) -> Result<U256, MathError> {
        if supply.is_zero() {
            return Ok(U256::ZERO);
        }

        let exponent_plus_one = self.exponent_plus_one();
        mul_div(power(supply, exponent_plus_one)?, SCALE, exponent_plus_one)
    }

    /// Reserve required to back `supply`: `c * s^(k+1) / (k+1)`.
    pub fn reserve_integral(&self, supply: U256) -> Result<U256, MathError> {
        mul_div(self.normalized_integral(supply)?, self.coefficient, SCALE)
    }

    /// Moves a reserve amount into the normalized integral domain (`r / c`).
    pub fn normalize_reserve(&self, reserve_amount: U256) -> Result<U256, MathError> {
        div_fixed(reserve_amount, self.coefficient)
    }

    /// Marginal price `k * c * s^(k-1)` at `supply`; `c` at zero supply.
    pub fn marginal_price(&self, supply: U256) -> Result<U256, MathError> {
        if supply.is_zero() {
            return Ok(self.coefficient);
        }

        let degree = self.exponent / SCALE;
        let slope = power(supply, self.exponent - SCALE)?;
        mul_fixed(self.coefficient, slope)?
            .checked_mul(degree)
            .ok_or(MathError::Overflow)
    }

    /// Reserve released by burning `amount` out of `supply`, rounded down.
    pub fn sell_return(&self, supply: U256, amount: U256) -> CurveResult<U256> {
        if amount > supply {
            return Err(CurveError::InsufficientSupply {
                requested: amount,
                available: supply,
            });
        }

        let upper = self.normalized_integral(supply)?;
        let lower = self.normalized_integral(supply - amount)?;
        let delta = upper.checked_sub(lower).ok_or(MathError::Underflow)?;
        Ok(mul_div(delta, self.coefficient, SCALE)?)
    }

    /// Reserve needed to mint exactly `amount` on top of `supply`, rounded up.
    pub fn buy_cost(&self, supply: U256, amount: U256) -> CurveResult<U256> {
        let new_supply = supply.checked_add(amount).ok_or(MathError::Overflow)?;

        let upper = self.normalized_integral(new_supply)?;
        let lower = self.normalized_integral(supply)?;
        let delta = upper.checked_sub(lower).ok_or(MathError::Underflow)?;
        Ok(mul_div_up(delta, self.coefficient, SCALE)?)
    }
}
