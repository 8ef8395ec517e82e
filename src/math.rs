//! Fixed-point kernel.
//!
//! Every value is an unsigned integer carrying a real number scaled by
//! [`SCALE`]. Products are computed in 256 bits and fail with
//! [`MathError::Overflow`] instead of saturating or wrapping.

use alloy_primitives::U256;

use crate::error::MathError;

// Scaling factor for fixed-point math (10^18)
pub const SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);
const TWO_SCALE: U256 = U256::from_limbs([2_000_000_000_000_000_000u64, 0, 0, 0]);

/// `floor(a * b / denominator)`.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() || b.is_zero() {
        return Ok(U256::ZERO);
    }

    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    Ok(product / denominator)
}

/// `ceil(a * b / denominator)`, for amounts the engine must never under-charge.
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    if a.is_zero() || b.is_zero() {
        return Ok(U256::ZERO);
    }

    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product / denominator;
    if (product % denominator).is_zero() {
        Ok(quotient)
    } else {
        quotient.checked_add(U256::from(1u64)).ok_or(MathError::Overflow)
    }
}

/// `a * b` where both operands are scaled.
pub fn mul_fixed(a: U256, b: U256) -> Result<U256, MathError> {
    mul_div(a, b, SCALE)
}

/// `a / b` where both operands are scaled.
pub fn div_fixed(a: U256, b: U256) -> Result<U256, MathError> {
    mul_div(a, SCALE, b)
}

/// `base ^ exponent` with both operands scaled.
///
/// Only the integer part of `exponent / SCALE` is honoured; fractional
/// exponents are not supported and curve parameters are validated so they
/// never reach this function.
pub fn power(base: U256, exponent: U256) -> Result<U256, MathError> {
    if exponent.is_zero() {
        return Ok(SCALE);
    }
    if exponent == SCALE {
        return Ok(base);
    }
    if exponent == TWO_SCALE {
        return mul_fixed(base, base);
    }

    power_by_squaring(base, exponent / SCALE)
}

fn power_by_squaring(mut base: U256, mut n: U256) -> Result<U256, MathError> {
    let mut result = SCALE;
    while !n.is_zero() {
        if n.bit(0) {
            result = mul_fixed(result, base)?;
        }
        n >>= 1usize;
        // the square after the highest bit is never used
        if !n.is_zero() {
            base = mul_fixed(base, base)?;
        }
    }
    Ok(result)
}
