//! Instruction handlers for the YieldSpace pool
//!
//! - `initialize` - Create a pool for a base / fyToken pair (two steps)
//! - `sync` - Fold vault balances into the reserve cache, accrue the TWAR
//! - `liquidity` - Mint and burn liquidity shares
//! - `trade` - Sell or buy base and fyToken
//! - `preview` - Quote trades without touching state
//! - `set_parameter` - Tune the curve (pool authority only)
//!
//! Every mutating instruction follows the same order: sync against the
//! current vault balances, pull the caller's tokens in, let the pool core
//! compute the outcome, push tokens out, reload the vaults and refresh the
//! cache from them.

pub mod initialize;
pub mod liquidity;
pub mod preview;
pub mod set_parameter;
pub mod sync;
pub mod trade;

pub use initialize::*;
pub use liquidity::*;
pub use preview::*;
pub use set_parameter::*;
pub use sync::*;
pub use trade::*;

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    transfer_checked, Mint, TokenAccount, TokenInterface, TransferChecked,
};

use crate::state::{Pool, PoolError};

/// Current unix time as the pool stores it
pub(crate) fn now() -> Result<u32> {
    let clock = Clock::get()?;
    u32::try_from(clock.unix_timestamp).map_err(|_| error!(PoolError::Overflow))
}

pub(crate) fn to_u64(amount: u128) -> Result<u64> {
    u64::try_from(amount).map_err(|_| error!(PoolError::Overflow))
}

/// Move `amount` from a user-owned account into a pool vault.
pub(crate) fn pull<'info>(
    token_program: &Interface<'info, TokenInterface>,
    from: &InterfaceAccount<'info, TokenAccount>,
    mint: &InterfaceAccount<'info, Mint>,
    vault: &InterfaceAccount<'info, TokenAccount>,
    owner: &Signer<'info>,
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    transfer_checked(
        CpiContext::new(
            token_program.to_account_info(),
            TransferChecked {
                from: from.to_account_info(),
                mint: mint.to_account_info(),
                to: vault.to_account_info(),
                authority: owner.to_account_info(),
            },
        ),
        amount,
        mint.decimals,
    )
}

/// Move `amount` out of a pool vault, signed by the pool PDA.
pub(crate) fn push<'info>(
    pool: &Account<'info, Pool>,
    token_program: &Interface<'info, TokenInterface>,
    vault: &InterfaceAccount<'info, TokenAccount>,
    mint: &InterfaceAccount<'info, Mint>,
    to: &InterfaceAccount<'info, TokenAccount>,
    amount: u128,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }
    let pool_seeds = pool.signer_seeds();
    let signer_seeds = &[&pool_seeds[..]];

    transfer_checked(
        CpiContext::new_with_signer(
            token_program.to_account_info(),
            TransferChecked {
                from: vault.to_account_info(),
                mint: mint.to_account_info(),
                to: to.to_account_info(),
                authority: pool.to_account_info(),
            },
            signer_seeds,
        ),
        to_u64(amount)?,
        mint.decimals,
    )
}
