//! Trade Previews
//!
//! Read-only quotes against the cached reserves, returned as instruction
//! return data. They fail exactly like the trade they preview would,
//! including after maturity.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::Mint;

use crate::instructions::{now, to_u64};
use crate::state::Pool;

#[derive(Accounts)]
pub struct Preview<'info> {
    #[account(has_one = lp_mint)]
    pub pool: Account<'info, Pool>,

    pub lp_mint: InterfaceAccount<'info, Mint>,
}

impl<'info> Preview<'info> {
    /// fyToken obtained for selling `base_in`
    pub fn sell_base_preview(&self, base_in: u64) -> Result<u64> {
        to_u64(self.pool.sell_base_preview(now()?, self.supply(), base_in as u128)?)
    }

    /// fyToken needed to buy `base_out`
    pub fn buy_base_preview(&self, base_out: u64) -> Result<u64> {
        to_u64(self.pool.buy_base_preview(now()?, self.supply(), base_out as u128)?)
    }

    /// Base obtained for selling `fy_token_in`
    pub fn sell_fy_token_preview(&self, fy_token_in: u64) -> Result<u64> {
        to_u64(
            self.pool
                .sell_fy_token_preview(now()?, self.supply(), fy_token_in as u128)?,
        )
    }

    /// Base needed to buy `fy_token_out`
    pub fn buy_fy_token_preview(&self, fy_token_out: u64) -> Result<u64> {
        to_u64(
            self.pool
                .buy_fy_token_preview(now()?, self.supply(), fy_token_out as u128)?,
        )
    }

    fn supply(&self) -> u128 {
        self.lp_mint.supply as u128
    }
}
