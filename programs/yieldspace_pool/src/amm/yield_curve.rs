//! # YieldSpace Curve
//!
//! Pricing for a pool of base asset against a zero-coupon fyToken that
//! redeems 1:1 for base at maturity.
//!
//! ## The Core Invariant
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                                                              │
//! │                 z^a + y^a = k                                │
//! │                                                              │
//! │   Where:                                                     │
//! │   • z = base reserves                                        │
//! │   • y = fyToken reserves (real balance + LP supply)          │
//! │   • a = 1 - g · ts · t                                       │
//! │   • t = seconds until maturity                               │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Far from maturity `a < 1` and the curve behaves like a constant-product
//! pool, pricing fyToken at a discount. As `t → 0`, `a → 1`, the invariant
//! becomes `z + y = k` and fyToken trades 1:1 with base.
//!
//! ## Solving a Trade
//!
//! Selling `dx` base for fyToken:
//!
//! ```text
//! 1. s = z^a + y^a - (z + dx)^a     (what is left for the fyToken side)
//! 2. y' = s^(1/a)                   (solve the invariant for y)
//! 3. fy_out = y - y' - FLAT_FEE     (pay out the difference)
//! ```
//!
//! The other three quotes are the same walk with the roles swapped.
//!
//! ## Fees
//!
//! The fee `g` scales the time component of the exponent. Trades where base
//! flows into the pool use `g1 < 1`, trades where fyToken flows in use
//! `g2 > 1`. Either way the trader gets a slightly worse price than the
//! fee-less curve.
//!
//! All powers are computed with [`crate::math::pow`], so `z^a` and `y^a` are
//! carried in normalised form; see that module for why the sum can be raised
//! back without denormalising first.

use anchor_lang::prelude::*;

use crate::math::{pow, U256};

/// Errors raised while quoting against the curve
#[error_code]
pub enum CurveError {
    #[msg("YieldMath: Too far from maturity")]
    TooFarFromMaturity,
    #[msg("YieldMath: Too much base in")]
    TooMuchBaseIn,
    #[msg("YieldMath: Too much fyToken in")]
    TooMuchFyTokenIn,
    #[msg("YieldMath: Too much base out")]
    TooMuchBaseOut,
    #[msg("YieldMath: Too much fyToken out")]
    TooMuchFyTokenOut,
    #[msg("YieldMath: Insufficient base reserves")]
    InsufficientBaseReserves,
    #[msg("YieldMath: Insufficient fyToken reserves")]
    InsufficientFyTokenReserves,
    #[msg("YieldMath: Resulting reserves too high")]
    ResultingReserveTooHigh,
    #[msg("YieldMath: Rounding induced error")]
    RoundingInducedError,
    #[msg("YieldMath: Arithmetic overflow")]
    MathOverflow,
}

/// 1.0 in 64.64 fixed point
pub const ONE: u128 = 1 << 64;

/// Absolute amount (18-decimal units) taken from every output and added to
/// every input, so fixed-point rounding always lands in the pool's favour.
pub const FLAT_FEE: u128 = 1_000_000_000_000;

/// YieldSpace quotes
///
/// Every function takes `(base_reserves, fy_token_reserves, amount,
/// time_till_maturity, ts, g)` where `fy_token_reserves` is the *virtual*
/// reserve, `ts` and `g` are 64.64 and `time_till_maturity` is in seconds.
pub struct YieldCurve;

impl YieldCurve {
    /// Curve exponent `a = 1 - g · ts · t` in 64.64.
    ///
    /// Fails with `TooFarFromMaturity` when `g · ts · t ≥ 1`, i.e. when the
    /// exponent would reach zero or go negative.
    pub fn compute_a(time_till_maturity: u128, ts: u128, g: u128) -> Result<u128> {
        let gt = U256::from(g)
            .checked_mul(U256::from(ts))
            .and_then(|v| v.checked_mul(U256::from(time_till_maturity)))
            .ok_or(CurveError::TooFarFromMaturity)?
            >> 64;

        require!(gt < U256::from(ONE), CurveError::TooFarFromMaturity);
        Ok(ONE - gt.low_u128())
    }

    /// fyToken paid out for `base_amount` base sold into the pool.
    ///
    /// `y - (z^a + y^a - (z + dx)^a)^(1/a) - FLAT_FEE`
    pub fn fy_token_out_for_base_in(
        base_reserves: u128,
        fy_token_reserves: u128,
        base_amount: u128,
        time_till_maturity: u128,
        ts: u128,
        g: u128,
    ) -> Result<u128> {
        let a = Self::compute_a(time_till_maturity, ts, g)?;

        let new_base = base_reserves
            .checked_add(base_amount)
            .ok_or(CurveError::TooMuchBaseIn)?;
        let za = stretch(base_reserves, a)?;
        let ya = stretch(fy_token_reserves, a)?;
        let zxa = stretch(new_base, a)?;

        // remaining fyToken side of the invariant; must be representable
        let sum = (U256::from(za) + U256::from(ya))
            .checked_sub(U256::from(zxa))
            .and_then(U256::checked_as_u128)
            .ok_or(CurveError::InsufficientFyTokenReserves)?;

        let new_fy_token = unstretch(sum, a)?;
        pay_out(fy_token_reserves, new_fy_token)
    }

    /// Base paid out for `fy_token_amount` fyToken sold into the pool.
    ///
    /// `z - (z^a + y^a - (y + dy)^a)^(1/a) - FLAT_FEE`
    pub fn base_out_for_fy_token_in(
        base_reserves: u128,
        fy_token_reserves: u128,
        fy_token_amount: u128,
        time_till_maturity: u128,
        ts: u128,
        g: u128,
    ) -> Result<u128> {
        let a = Self::compute_a(time_till_maturity, ts, g)?;

        let new_fy_token = fy_token_reserves
            .checked_add(fy_token_amount)
            .ok_or(CurveError::TooMuchFyTokenIn)?;
        let za = stretch(base_reserves, a)?;
        let ya = stretch(fy_token_reserves, a)?;
        let yxa = stretch(new_fy_token, a)?;

        let sum = (U256::from(za) + U256::from(ya))
            .checked_sub(U256::from(yxa))
            .and_then(U256::checked_as_u128)
            .ok_or(CurveError::InsufficientBaseReserves)?;

        let new_base = unstretch(sum, a)?;
        pay_out(base_reserves, new_base)
    }

    /// fyToken the trader must sell to take `base_amount` base out.
    ///
    /// `(z^a + y^a - (z - dx)^a)^(1/a) - y + FLAT_FEE`
    pub fn fy_token_in_for_base_out(
        base_reserves: u128,
        fy_token_reserves: u128,
        base_amount: u128,
        time_till_maturity: u128,
        ts: u128,
        g: u128,
    ) -> Result<u128> {
        let a = Self::compute_a(time_till_maturity, ts, g)?;

        let new_base = base_reserves
            .checked_sub(base_amount)
            .ok_or(CurveError::TooMuchBaseOut)?;
        let za = stretch(base_reserves, a)?;
        let ya = stretch(fy_token_reserves, a)?;
        let zxa = stretch(new_base, a)?;

        let sum = (U256::from(za) + U256::from(ya))
            .checked_sub(U256::from(zxa))
            .ok_or(CurveError::MathOverflow)?
            .checked_as_u128()
            .ok_or(CurveError::ResultingReserveTooHigh)?;

        let new_fy_token = unstretch(sum, a)?;
        take_in(fy_token_reserves, new_fy_token)
    }

    /// Base the trader must sell to take `fy_token_amount` fyToken out.
    ///
    /// `(z^a + y^a - (y - dy)^a)^(1/a) - z + FLAT_FEE`
    pub fn base_in_for_fy_token_out(
        base_reserves: u128,
        fy_token_reserves: u128,
        fy_token_amount: u128,
        time_till_maturity: u128,
        ts: u128,
        g: u128,
    ) -> Result<u128> {
        let a = Self::compute_a(time_till_maturity, ts, g)?;

        let new_fy_token = fy_token_reserves
            .checked_sub(fy_token_amount)
            .ok_or(CurveError::TooMuchFyTokenOut)?;
        let za = stretch(base_reserves, a)?;
        let ya = stretch(fy_token_reserves, a)?;
        let yxa = stretch(new_fy_token, a)?;

        let sum = (U256::from(za) + U256::from(ya))
            .checked_sub(U256::from(yxa))
            .ok_or(CurveError::MathOverflow)?
            .checked_as_u128()
            .ok_or(CurveError::ResultingReserveTooHigh)?;

        let new_base = unstretch(sum, a)?;
        take_in(base_reserves, new_base)
    }

    /// Pool value per LP share, 1e18 = 1.0.
    ///
    /// Computed as `((z^a + y^a) / 2)^(1/a) / supply`: the size each reserve
    /// would have if the pool were perfectly balanced. Returns 0 for an
    /// empty pool.
    pub fn invariant(
        base_reserves: u128,
        fy_token_reserves: u128,
        total_supply: u128,
        time_till_maturity: u128,
        ts: u128,
        g: u128,
    ) -> Result<u128> {
        if total_supply == 0 {
            return Ok(0);
        }
        let a = Self::compute_a(time_till_maturity, ts, g)?;

        let za = stretch(base_reserves, a)?;
        let ya = stretch(fy_token_reserves, a)?;
        // both terms are below 2^128 so the average is too
        let half = ((U256::from(za) + U256::from(ya)) >> 1).low_u128();
        let balanced = unstretch(half, a)?;

        let value = U256::from(balanced) * U256::from(1_000_000_000_000_000_000u128)
            / U256::from(total_supply);
        Ok(value.checked_as_u128().ok_or(CurveError::MathOverflow)?)
    }
}

/// `x^a` in normalised form. An exponent of exactly one is the identity.
fn stretch(x: u128, a: u128) -> Result<u128> {
    if a == ONE {
        return Ok(x);
    }
    Ok(pow(x, a, ONE).ok_or(CurveError::MathOverflow)?)
}

/// Inverse of [`stretch`]: `s^(1/a)`, removing the normalisation.
fn unstretch(s: u128, a: u128) -> Result<u128> {
    if a == ONE {
        return Ok(s);
    }
    Ok(pow(s, ONE, a).ok_or(CurveError::MathOverflow)?)
}

/// Output leg: the reserve shrank from `reserve` to `solved`.
fn pay_out(reserve: u128, solved: u128) -> Result<u128> {
    let out = reserve
        .checked_sub(solved)
        .ok_or(CurveError::RoundingInducedError)?;
    require!(out >= FLAT_FEE, CurveError::RoundingInducedError);
    Ok(out - FLAT_FEE)
}

/// Input leg: the reserve grew from `reserve` to `solved`.
fn take_in(reserve: u128, solved: u128) -> Result<u128> {
    let amount = solved
        .checked_sub(reserve)
        .ok_or(CurveError::RoundingInducedError)?
        .checked_add(FLAT_FEE)
        .ok_or(CurveError::ResultingReserveTooHigh)?;
    require!(
        reserve.checked_add(amount).is_some(),
        CurveError::ResultingReserveTooHigh
    );
    Ok(amount)
}

// ============================================================================
// TESTS
// ============================================================================
