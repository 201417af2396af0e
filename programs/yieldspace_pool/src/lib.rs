//! # YieldSpace Pool: Fixed-Rate Lending on Solana
//!
//! An automated market maker between a base token and a fyToken that
//! redeems 1:1 for base at a fixed maturity.
//!
//! ## Overview
//!
//! Prices follow the YieldSpace invariant `z^a + y^a = k`, where the
//! exponent moves towards 1 as maturity approaches, so the fyToken discount
//! (the implied interest rate) shrinks to zero on its own. Liquidity
//! providers hold shares of both reserves; the fyToken side is boosted by
//! the share supply to price the pool as a yield-bearing position.
//!
//! ## Layout
//! - `math`: 64.64 fixed-point log2 / pow2 / pow
//! - `amm`: the curve and the base-only liquidity solver
//! - `state`: the pool account and its accounting core
//! - `instructions`: account validation and token movement
//!

use anchor_lang::prelude::*;

pub mod amm;
pub mod instructions;
pub mod math;
pub mod state;

pub use amm::*;
pub use instructions::*;

// Replace with your deployed program ID
declare_id!("YSpLpL7c3nZ1ZqQ9V8nGz3tW4bq2Dq6X9h5YzL1pFyT");

/// YieldSpace pool program
#[program]
pub mod yieldspace_pool {
    use super::*;

    /// Create the pool account and its LP mint (Step 1)
    pub fn initialize_pool(ctx: Context<InitializePool>, maturity: i64) -> Result<()> {
        ctx.accounts.initialize_pool(maturity, &ctx.bumps)
    }

    /// Create the pool's vaults (Step 2)
    pub fn initialize_vaults(ctx: Context<InitializeVaults>) -> Result<()> {
        ctx.accounts.initialize_vaults()
    }

    /// Fold vault balances into the cache and accrue the TWAR
    pub fn sync(ctx: Context<SyncReserves>) -> Result<()> {
        ctx.accounts.sync()
    }

    /// Add base and fyToken in the pool ratio
    pub fn mint(
        ctx: Context<Liquidity>,
        base_in: u64,
        fy_token_in: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        ctx.accounts.mint(base_in, fy_token_in, min_ratio, max_ratio)
    }

    /// Add liquidity with base only
    pub fn mint_with_base(
        ctx: Context<Liquidity>,
        base_in: u64,
        fy_token_to_buy: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        ctx.accounts
            .mint_with_base(base_in, fy_token_to_buy, min_ratio, max_ratio)
    }

    /// Remove liquidity as base and fyToken
    pub fn burn(
        ctx: Context<Liquidity>,
        pool_tokens: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        ctx.accounts.burn(pool_tokens, min_ratio, max_ratio)
    }

    /// Remove liquidity as base only
    pub fn burn_for_base(
        ctx: Context<Liquidity>,
        pool_tokens: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        ctx.accounts.burn_for_base(pool_tokens, min_ratio, max_ratio)
    }

    /// Sell base for fyToken
    pub fn sell_base(ctx: Context<Trade>, base_in: u64, min_fy_token_out: u64) -> Result<u64> {
        ctx.accounts.sell_base(base_in, min_fy_token_out)
    }

    /// Buy base with fyToken
    pub fn buy_base(ctx: Context<Trade>, base_out: u64, max_fy_token_in: u64) -> Result<u64> {
        ctx.accounts.buy_base(base_out, max_fy_token_in)
    }

    /// Sell fyToken for base
    pub fn sell_fy_token(ctx: Context<Trade>, fy_token_in: u64, min_base_out: u64) -> Result<u64> {
        ctx.accounts.sell_fy_token(fy_token_in, min_base_out)
    }

    /// Buy fyToken with base
    pub fn buy_fy_token(ctx: Context<Trade>, fy_token_out: u64, max_base_in: u64) -> Result<u64> {
        ctx.accounts.buy_fy_token(fy_token_out, max_base_in)
    }

    pub fn sell_base_preview(ctx: Context<Preview>, base_in: u64) -> Result<u64> {
        ctx.accounts.sell_base_preview(base_in)
    }

    pub fn buy_base_preview(ctx: Context<Preview>, base_out: u64) -> Result<u64> {
        ctx.accounts.buy_base_preview(base_out)
    }

    pub fn sell_fy_token_preview(ctx: Context<Preview>, fy_token_in: u64) -> Result<u64> {
        ctx.accounts.sell_fy_token_preview(fy_token_in)
    }

    pub fn buy_fy_token_preview(ctx: Context<Preview>, fy_token_out: u64) -> Result<u64> {
        ctx.accounts.buy_fy_token_preview(fy_token_out)
    }

    /// Tune `ts`, `g1` or `g2` (pool authority only)
    pub fn set_parameter(ctx: Context<SetParameter>, name: String, value: u128) -> Result<()> {
        ctx.accounts.set_parameter(name, value)
    }
}
