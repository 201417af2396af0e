//! Trading
//!
//! Sell or buy base and fyToken against the pool. Sells take an exact input
//! and a minimum output; buys take an exact output and a maximum input, which
//! is pulled in full and the unused part handed back.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{Mint, TokenAccount, TokenInterface};

use crate::instructions::{emit_synced, now, pull, push, to_u64};
use crate::state::{Balances, Pool, TradeOutcome};

/// Event emitted for every trade, signed from the trader's side
#[event]
pub struct TradeExecuted {
    pub pool: Pubkey,
    pub trader: Pubkey,
    pub bases: i128,
    pub fy_tokens: i128,
}

/// Accounts for trading
#[derive(Accounts)]
pub struct Trade<'info> {
    pub trader: Signer<'info>,

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

    /// Read for the LP supply that backs the virtual fyToken reserve
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
        token::mint = base_mint,
        token::authority = trader,
    )]
    pub trader_base: Box<InterfaceAccount<'info, TokenAccount>>,

    #[account(
        mut,
        token::mint = fy_token_mint,
        token::authority = trader,
    )]
    pub trader_fy_token: Box<InterfaceAccount<'info, TokenAccount>>,

    pub token_program: Interface<'info, TokenInterface>,
}

impl<'info> Trade<'info> {
    /// Sell exactly `base_in` for at least `min_fy_token_out` fyToken.
    pub fn sell_base(&mut self, base_in: u64, min_fy_token_out: u64) -> Result<u64> {
        let now = self.begin()?;
        self.pull_base(base_in)?;

        let outcome = self.pool.sell_base(
            now,
            self.supply(),
            self.balances(),
            min_fy_token_out as u128,
        )?;
        self.settle(outcome)
    }

    /// Buy exactly `base_out` for at most `max_fy_token_in` fyToken.
    pub fn buy_base(&mut self, base_out: u64, max_fy_token_in: u64) -> Result<u64> {
        let now = self.begin()?;
        self.pull_fy_token(max_fy_token_in)?;

        let outcome = self.pool.buy_base(
            now,
            self.supply(),
            self.balances(),
            base_out as u128,
            max_fy_token_in as u128,
        )?;
        self.settle(outcome)
    }

    /// Sell exactly `fy_token_in` for at least `min_base_out` base.
    pub fn sell_fy_token(&mut self, fy_token_in: u64, min_base_out: u64) -> Result<u64> {
        let now = self.begin()?;
        self.pull_fy_token(fy_token_in)?;

        let outcome = self.pool.sell_fy_token(
            now,
            self.supply(),
            self.balances(),
            min_base_out as u128,
        )?;
        self.settle(outcome)
    }

    /// Buy exactly `fy_token_out` for at most `max_base_in` base.
    pub fn buy_fy_token(&mut self, fy_token_out: u64, max_base_in: u64) -> Result<u64> {
        let now = self.begin()?;
        self.pull_base(max_base_in)?;

        let outcome = self.pool.buy_fy_token(
            now,
            self.supply(),
            self.balances(),
            fy_token_out as u128,
            max_base_in as u128,
        )?;
        self.settle(outcome)
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

    /// Sync against the vaults before anything moves.
    fn begin(&mut self) -> Result<u32> {
        let now = now()?;
        let (supply, balances) = (self.supply(), self.balances());
        self.pool.sync(now, supply, balances)?;
        Ok(now)
    }

    fn pull_base(&mut self, amount: u64) -> Result<()> {
        pull(
            &self.token_program,
            &self.trader_base,
            &self.base_mint,
            &self.base_vault,
            &self.trader,
            amount,
        )?;
        self.base_vault.reload()
    }

    fn pull_fy_token(&mut self, amount: u64) -> Result<()> {
        pull(
            &self.token_program,
            &self.trader_fy_token,
            &self.fy_token_mint,
            &self.fy_token_vault,
            &self.trader,
            amount,
        )?;
        self.fy_token_vault.reload()
    }

    /// Pay out, refresh the cache from the vaults and report.
    fn settle(&mut self, outcome: TradeOutcome) -> Result<u64> {
        push(
            &self.pool,
            &self.token_program,
            &self.base_vault,
            &self.base_mint,
            &self.trader_base,
            outcome.base_to_trader,
        )?;
        push(
            &self.pool,
            &self.token_program,
            &self.fy_token_vault,
            &self.fy_token_mint,
            &self.trader_fy_token,
            outcome.fy_token_to_trader,
        )?;

        self.base_vault.reload()?;
        self.fy_token_vault.reload()?;
        let balances = self.balances();
        self.pool.refresh(balances);

        msg!("Trade: {} base, {} fyToken", outcome.bases, outcome.fy_tokens);

        emit!(TradeExecuted {
            pool: self.pool.key(),
            trader: self.trader.key(),
            bases: outcome.bases,
            fy_tokens: outcome.fy_tokens,
        });
        emit_synced(&self.pool);

        to_u64(outcome.solved)
    }
}
