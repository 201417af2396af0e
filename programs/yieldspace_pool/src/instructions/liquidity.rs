//! Liquidity Provision
//!
//! Providers mint LP shares with base and fyToken in the pool's ratio, or
//! with base only, and burn them for their share of both reserves, or for
//! base only.
//!
//! ## Ratio Bounds
//!
//! Every instruction takes `min_ratio` / `max_ratio`: the accepted range of
//! `base_reserves · 1e18 / fy_token_reserves` at execution. They protect a
//! provider against the pool being pushed around between quote and
//! execution.
//!
//! ## Base-Only Mint
//!
//! `mint_with_base` needs `fy_token_to_buy`, the fyToken the pool sells to
//! the provider out of its own reserves before minting. It is found
//! off-chain with [`crate::amm::solve_fy_token_to_buy`].

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    burn, mint_to, Burn, Mint, MintTo, TokenAccount, TokenInterface,
};

use crate::instructions::{emit_synced, now, pull, push, to_u64};
use crate::state::{Balances, LiquidityOutcome, Pool};

/// Event emitted when liquidity is added or removed, signed from the
/// provider's side
#[event]
pub struct LiquidityChanged {
    pub pool: Pubkey,
    pub provider: Pubkey,
    pub bases: i128,
    pub fy_tokens: i128,
    pub pool_tokens: i128,
}

/// Accounts for minting and burning
#[derive(Accounts)]
pub struct Liquidity<'info> {
    pub provider: Signer<'info>,

    #[account(
        mut,
        seeds = [Pool::SEED, base_mint.key().as_ref(), fy_token_mint.key().as_ref()],
        bump = pool.bump,
        has_one = base_mint,
        has_one = fy_token_mint,
        has_one = lp_mint,
    )]
    pub pool: Box<Account<'info, Pool>>,

    pub base_mint: Box<InterfaceAccount<'info, Mint>>,
    pub fy_token_mint: Box<InterfaceAccount<'info, Mint>>,

    #[account(mut)]
    pub lp_mint: Box<InterfaceAccount<'info, Mint>>,

    #[account(
        mut,
        associated_token::mint = base_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub base_vault: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        mut,
        associated_token::mint = fy_token_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub fy_token_vault: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        mut,
        associated_token::mint = lp_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub lp_vault: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = base_mint,
        token::authority = provider,
    )]
    pub provider_base: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = fy_token_mint,
        token::authority = provider,
    )]
    pub provider_fy_token: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = lp_mint,
        token::authority = provider,
    )]
    pub provider_lp: Box<InterfaceAccount<'info, TokenAccount>>,

    pub token_program: Interface<'info, TokenInterface>,
}

impl<'info> Liquidity<'info> {
    /// Add `base_in` base and up to `fy_token_in` fyToken; returns the LP
    /// tokens minted. fyToken beyond the pool ratio is returned.
    pub fn mint(
        &mut self,
        base_in: u64,
        fy_token_in: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        self.begin()?;
        self.pull(base_in, fy_token_in, 0)?;

        let outcome = self
            .pool
            .mint(self.supply(), self.balances(), min_ratio, max_ratio)?;
        self.settle(outcome)?;
        to_u64(outcome.pool_tokens_minted)
    }

    /// Add base only; the pool sells `fy_token_to_buy` fyToken to the
    /// provider first. Returns the LP tokens minted; unused base is returned.
    pub fn mint_with_base(
        &mut self,
        base_in: u64,
        fy_token_to_buy: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        let now = self.begin()?;
        self.pull(base_in, 0, 0)?;

        let outcome = self.pool.mint_with_base(
            now,
            self.supply(),
            self.balances(),
            fy_token_to_buy as u128,
            min_ratio,
            max_ratio,
        )?;
        self.settle(outcome)?;
        to_u64(outcome.pool_tokens_minted)
    }

    /// Burn `pool_tokens` for base and fyToken; returns the base paid out.
    pub fn burn(&mut self, pool_tokens: u64, min_ratio: u128, max_ratio: u128) -> Result<u64> {
        self.begin()?;
        self.pull(0, 0, pool_tokens)?;

        let outcome = self.pool.burn(
            self.supply(),
            self.lp_vault.amount as u128,
            min_ratio,
            max_ratio,
        )?;
        self.settle(outcome)?;
        to_u64(outcome.base_to_provider)
    }

    /// Burn `pool_tokens` and sell the fyToken share back to the pool;
    /// returns the base paid out.
    pub fn burn_for_base(
        &mut self,
        pool_tokens: u64,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<u64> {
        let now = self.begin()?;
        self.pull(0, 0, pool_tokens)?;

        let outcome = self.pool.burn_for_base(
            now,
            self.supply(),
            self.lp_vault.amount as u128,
            min_ratio,
            max_ratio,
        )?;
        self.settle(outcome)?;
        to_u64(outcome.base_to_provider)
    }

    fn supply(&self) -> u128 {
        self.lp_mint.supply as u128
    }

    fn balances(&self) -> Balances {
        Balances {
            base: self.base_vault.amount as u128,
            fy_token: self.fy_token_vault.amount as u128,
        }
    }

    fn begin(&mut self) -> Result<u32> {
        let now = now()?;
        let (supply, balances) = (self.supply(), self.balances());
        self.pool.sync(now, supply, balances)?;
        Ok(now)
    }

    fn pull(&mut self, base: u64, fy_token: u64, pool_tokens: u64) -> Result<()> {
        pull(
            &self.token_program,
            &self.provider_base,
            &self.base_mint,
            &self.base_vault,
            &self.provider,
            base,
        )?;
        pull(
            &self.token_program,
            &self.provider_fy_token,
            &self.fy_token_mint,
            &self.fy_token_vault,
            &self.provider,
            fy_token,
        )?;
        pull(
            &self.token_program,
            &self.provider_lp,
            &self.lp_mint,
            &self.lp_vault,
            &self.provider,
            pool_tokens,
        )?;

        self.base_vault.reload()?;
        self.fy_token_vault.reload()?;
        self.lp_vault.reload()
    }

    fn settle(&mut self, outcome: LiquidityOutcome) -> Result<()> {
        let pool_seeds = self.pool.signer_seeds();
        let signer_seeds = &[&pool_seeds[..]];

        if outcome.pool_tokens_minted > 0 {
            mint_to(
                CpiContext::new_with_signer(
                    self.token_program.to_account_info(),
                    MintTo {
                        mint: self.lp_mint.to_account_info(),
                        to: self.provider_lp.to_account_info(),
                        authority: self.pool.to_account_info(),
                    },
                    signer_seeds,
                ),
                to_u64(outcome.pool_tokens_minted)?,
            )?;
        }

        if outcome.pool_tokens_burned > 0 {
            burn(
                CpiContext::new_with_signer(
                    self.token_program.to_account_info(),
                    Burn {
                        mint: self.lp_mint.to_account_info(),
                        from: self.lp_vault.to_account_info(),
                        authority: self.pool.to_account_info(),
                    },
                    signer_seeds,
                ),
                to_u64(outcome.pool_tokens_burned)?,
            )?;
        }

        push(
            &self.pool,
            &self.token_program,
            &self.base_vault,
            &self.base_mint,
            &self.provider_base,
            outcome.base_to_provider,
        )?;
        push(
            &self.pool,
            &self.token_program,
            &self.fy_token_vault,
            &self.fy_token_mint,
            &self.provider_fy_token,
            outcome.fy_token_to_provider,
        )?;

        self.base_vault.reload()?;
        self.fy_token_vault.reload()?;
        let balances = self.balances();
        self.pool.refresh(balances);

        msg!(
            "Liquidity: {} base, {} fyToken, {} shares",
            outcome.bases,
            outcome.fy_tokens,
            outcome.pool_tokens
        );

        emit!(LiquidityChanged {
            pool: self.pool.key(),
            provider: self.provider.key(),
            bases: outcome.bases,
            fy_tokens: outcome.fy_tokens,
            pool_tokens: outcome.pool_tokens,
        });
        emit_synced(&self.pool);

        Ok(())
    }
}
