//! # Automated Market Maker (AMM) Module
//!
//! Pricing for a base / fyToken pool on the **YieldSpace** curve.
//!
//! A fyToken redeems 1:1 for base at maturity, so before maturity it trades
//! at a discount that must shrink to zero as time runs out:
//!
//! ```text
//!            z^a + y^a = k,    a = 1 - g·ts·t
//!
//!   price of fyToken (in base)
//!     1 ┤                                   ●  maturity: a = 1, z + y = k
//!       │                        ●
//!       │              ●
//!       │      ●
//!       │  ●
//!       └──────────────────────────────────▶ time
//! ```
//!
//! - [`yield_curve`]: the four trade quotes and the invariant
//! - [`liquidity_solver`]: off-chain bisection for base-only liquidity

pub mod liquidity_solver;
pub mod yield_curve;

pub use liquidity_solver::*;
pub use yield_curve::*;
