//! Reserve Sync
//!
//! Tokens sent straight to a vault are not part of the reserves until the
//! next sync. Every mutating instruction syncs first; this instruction lets
//! anyone do it on its own, e.g. to push the TWAR forward.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{Mint, TokenAccount, TokenInterface};

use crate::instructions::now;
use crate::state::{Balances, Pool};

/// Emitted whenever the reserve cache is rewritten
#[event]
pub struct ReservesSynced {
    pub pool: Pubkey,
    pub base_cached: u128,
    pub fy_token_cached: u128,
    pub cumulative_ratio: [u64; 4],
    pub timestamp: u32,
}

pub(crate) fn emit_synced(pool: &Account<Pool>) {
    emit!(ReservesSynced {
        pool: pool.key(),
        base_cached: pool.reserves.base_cached,
        fy_token_cached: pool.reserves.fy_token_cached,
        cumulative_ratio: pool.cumulative_ratio,
        timestamp: pool.reserves.block_timestamp_cached,
    });
}

#[derive(Accounts)]
pub struct SyncReserves<'info> {
    #[account(
        mut,
        has_one = lp_mint,
    )]
    pub pool: Account<'info, Pool>,

    pub lp_mint: InterfaceAccount<'info, Mint>,

    #[account(
        associated_token::mint = pool.base_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub base_vault: InterfaceAccount<'info, TokenAccount>,

    #[account(
        associated_token::mint = pool.fy_token_mint,
        associated_token::authority = pool,
        associated_token::token_program = token_program,
    )]
    pub fy_token_vault: InterfaceAccount<'info, TokenAccount>,

    pub token_program: Interface<'info, TokenInterface>,
}

impl<'info> SyncReserves<'info> {
    pub fn sync(&mut self) -> Result<()> {
        let balances = Balances {
            base: self.base_vault.amount as u128,
            fy_token: self.fy_token_vault.amount as u128,
        };
        self.pool.sync(now()?, self.lp_mint.supply as u128, balances)?;
        emit_synced(&self.pool);
        Ok(())
    }
}
