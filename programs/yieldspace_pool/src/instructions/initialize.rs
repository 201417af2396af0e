//! Pool Creation
//!
//! Creating a pool is split into two instructions to stay within the stack
//! limit:
//!
//! Step 1: InitializePool - pool account and LP mint.
//! Step 2: InitializeVaults - base, fyToken and LP vaults owned by the pool.
//!
//! The pool starts empty; the first `mint` sets its size.

use anchor_lang::prelude::*;
use anchor_spl::{
    associated_token::AssociatedToken,
    token_interface::{Mint, TokenAccount, TokenInterface},
};

use crate::state::Pool;

// =============================================================================
// STEP 1: POOL ACCOUNT AND LP MINT
// =============================================================================

/// Event emitted when a pool is created
#[event]
pub struct PoolCreated {
    pub pool: Pubkey,
    pub base_mint: Pubkey,
    pub fy_token_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub maturity: u32,
}

#[derive(Accounts)]
pub struct InitializePool<'info> {
    /// Pays for the accounts and becomes the pool authority
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        init,
        payer = authority,
        space = 8 + Pool::INIT_SPACE,
        seeds = [Pool::SEED, base_mint.key().as_ref(), fy_token_mint.key().as_ref()],
        bump,
    )]
    pub pool: Box<Account<'info, Pool>>,

    pub base_mint: Box<InterfaceAccount<'info, Mint>>,

    pub fy_token_mint: Box<InterfaceAccount<'info, Mint>>,

    /// Liquidity shares, same decimals as base
    #[account(
        init,
        payer = authority,
        mint::decimals = base_mint.decimals,
        mint::authority = pool,
        mint::token_program = token_program,
        seeds = [Pool::LP_MINT_SEED, pool.key().as_ref()],
        bump,
    )]
    pub lp_mint: Box<InterfaceAccount<'info, Mint>>,

    pub token_program: Interface<'info, TokenInterface>,
    pub system_program: Program<'info, System>,
}

impl<'info> InitializePool<'info> {
    pub fn initialize_pool(&mut self, maturity: i64, bumps: &InitializePoolBumps) -> Result<()> {
        let clock = Clock::get()?;

        self.pool.set_inner(Pool::new(
            self.authority.key(),
            self.base_mint.key(),
            self.fy_token_mint.key(),
            self.lp_mint.key(),
            self.base_mint.decimals,
            self.fy_token_mint.decimals,
            maturity,
            clock.unix_timestamp,
            bumps.pool,
            bumps.lp_mint,
        )?);

        msg!("Pool created!");
        msg!("Base: {}", self.base_mint.key());
        msg!("fyToken: {}", self.fy_token_mint.key());
        msg!("Maturity: {}", maturity);

        emit!(PoolCreated {
            pool: self.pool.key(),
            base_mint: self.base_mint.key(),
            fy_token_mint: self.fy_token_mint.key(),
            lp_mint: self.lp_mint.key(),
            maturity: self.pool.maturity,
        });

        Ok(())
    }
}

// =============================================================================
// STEP 2: VAULTS
// =============================================================================

#[derive(Accounts)]
pub struct InitializeVaults<'info> {
    #[account(mut)]
    pub payer: Signer<'info>,

    #[account(
        has_one = base_mint,
        has_one = fy_token_mint,
        has_one = lp_mint,
    )]
    pub pool: Box<Account<'info, Pool>>,

    pub base_mint: Box<InterfaceAccount<'info, Mint>>,
    pub fy_token_mint: Box<InterfaceAccount<'info, Mint>>,
    pub lp_mint: Box<InterfaceAccount<'info, Mint>>,

    #[account(
        init,
        payer = payer,
        associated_token::mint = base_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub base_vault: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        init,
        payer = payer,
        associated_token::mint = fy_token_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub fy_token_vault: Box<InterfaceAccount<'info, TokenAccount>>,

    /// Holds LP tokens returned for burning
    #[account(
        init,
        payer = payer,
        associated_token::mint = lp_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub lp_vault: Box<InterfaceAccount<'info, TokenAccount>>,

    pub token_program: Interface<'info, TokenInterface>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

impl<'info> InitializeVaults<'info> {
    pub fn initialize_vaults(&mut self) -> Result<()> {
        msg!("Vaults ready for pool {}", self.pool.key());
        Ok(())
    }
}
