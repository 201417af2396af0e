//! # Base-Only Liquidity Solver
//!
//! A liquidity provider holding only base can still mint: the pool first
//! sells them some fyToken out of its own reserves, then mints against the
//! remaining base and the fyToken just bought. The amount to buy has to be
//! chosen so the depositor's leftover base/fyToken split matches the pool's
//! post-trade split, otherwise the mint leaves value on the table.
//!
//! There is no closed form, so the amount is bracketed and bisected:
//!
//! ```text
//!   depositor after buying f:   base  = deposit - sold(f)     fy = f
//!   pool after the purchase:    base  = z + sold(f)           fy = y_real - f
//!
//!   surplus(f) = (deposit - sold)·(y_real - f) / (f · (z + sold)) - 1
//!
//!   f too small  → surplus above the band  → raise lo
//!   f too large  → surplus below the band  → lower hi
//! ```
//!
//! The search stops as soon as the surplus lands inside
//! [`SURPLUS_BAND_LOW`, `SURPLUS_BAND_HIGH`], i.e. the depositor keeps
//! between 0.001% and 0.002% more base than the mint consumes. The small
//! positive surplus keeps the on-chain mint from failing on rounding.
//!
//! This runs off-chain: the result is passed to `mint_with_base` as
//! `fy_token_to_buy`. Extreme reserve skews or very short times to maturity
//! can keep the band out of reach, in which case the solver gives up after
//! [`MAX_ITERATIONS`] with `NotConverging`.

use anchor_lang::prelude::*;

use super::YieldCurve;
use crate::math::U256;

#[error_code(offset = 6300)]
pub enum SolverError {
    #[msg("Pool: Bisection did not converge")]
    NotConverging,
}

/// Iteration cap for the bisection
pub const MAX_ITERATIONS: u32 = 100;

/// Lowest accepted surplus, 1e18 = 100%
pub const SURPLUS_BAND_LOW: u128 = 10_000_000_000_000;

/// Highest accepted surplus, 1e18 = 100%
pub const SURPLUS_BAND_HIGH: u128 = 20_000_000_000_000;

const WAD: u128 = 1_000_000_000_000_000_000;

/// Outcome of a successful solve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaseOnlyMint {
    /// fyToken the pool should sell to the depositor before minting
    pub fy_token_to_buy: u128,
    /// Base the purchase costs
    pub base_sold: u128,
}

/// Find how much fyToken a base-only deposit should buy before minting.
///
/// All amounts are in the pool's 18-decimal units. `fy_token_reserves` is the
/// *real* fyToken reserve; the curve is quoted against the virtual one
/// (`fy_token_reserves + total_supply`), priced with the base-in fee `g1`.
pub fn solve_fy_token_to_buy(
    base_reserves: u128,
    fy_token_reserves: u128,
    total_supply: u128,
    base_deposit: u128,
    time_till_maturity: u128,
    ts: u128,
    g1: u128,
) -> Result<BaseOnlyMint> {
    require!(
        fy_token_reserves > 1 && base_deposit > 0,
        SolverError::NotConverging
    );
    let virtual_fy_token = fy_token_reserves
        .checked_add(total_supply)
        .ok_or(SolverError::NotConverging)?;

    let mut lo = 0u128;
    let mut hi = base_deposit
        .saturating_mul(2)
        .min(fy_token_reserves - 1);

    for _ in 0..MAX_ITERATIONS {
        let mid = lo + (hi - lo) / 2;
        if mid == 0 {
            lo = 1;
            continue;
        }

        let sold = match YieldCurve::base_in_for_fy_token_out(
            base_reserves,
            virtual_fy_token,
            mid,
            time_till_maturity,
            ts,
            g1,
        ) {
            Ok(sold) if sold < base_deposit => sold,
            // the purchase alone eats the deposit, or can't be priced
            _ => {
                hi = mid;
                continue;
            }
        };

        // depositor's base:fy against the pool's base:fy, cross-multiplied
        let lhs = U256::from(base_deposit - sold) * U256::from(fy_token_reserves - mid);
        let rhs = U256::from(mid) * (U256::from(base_reserves) + U256::from(sold));
        if lhs < rhs {
            hi = mid;
            continue;
        }

        let surplus = (lhs - rhs) * U256::from(WAD) / rhs;
        if surplus >= U256::from(SURPLUS_BAND_LOW) && surplus <= U256::from(SURPLUS_BAND_HIGH) {
            return Ok(BaseOnlyMint {
                fy_token_to_buy: mid,
                base_sold: sold,
            });
        }
        if surplus > U256::from(SURPLUS_BAND_HIGH) {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    msg!("Base-only mint solver gave up after {} iterations", MAX_ITERATIONS);
    err!(SolverError::NotConverging)
}

// ============================================================================
// TESTS
// ============================================================================
