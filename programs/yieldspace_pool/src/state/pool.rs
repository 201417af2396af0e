//! YieldSpace Pool State
//!
//! One pool per base / fyToken pair. The account holds the reserve cache,
//! the TWAR accumulator and the curve parameters; the tokens themselves sit
//! in vaults owned by the pool PDA.
//!
//! Every operation here is computed against the cache and the vault balances
//! handed in by the instruction, and returns a complete outcome before
//! anything is written. The instruction then moves the tokens and calls
//! [`Pool::refresh`] with the reloaded balances, so after each instruction
//! the cache equals the vault balances.
//!
//! Amounts are in the tokens' native units. The curve is quoted in 18-decimal
//! units, so amounts are multiplied by `scale_factor` on the way in; outputs
//! are rounded down and inputs rounded up on the way out.

use anchor_lang::prelude::*;

use crate::amm::YieldCurve;
use crate::math::U256;
use crate::state::CurveParameters;

/// Precision of the TWAR accumulator
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Precision of the base / fyToken reserve ratio passed as mint and burn bounds
pub const RATIO_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Tokens with more decimals can't be scaled to the curve's 18-decimal units
pub const MAX_DECIMALS: u8 = 18;

#[error_code(offset = 6100)]
pub enum PoolError {
    #[msg("Pool: Too late")]
    PastMaturity,
    #[msg("Pool: Not enough base obtained")]
    NotEnoughBaseObtained,
    #[msg("Pool: Not enough fyToken obtained")]
    NotEnoughFyTokenObtained,
    #[msg("Pool: Too much base in")]
    TooMuchBaseIn,
    #[msg("Pool: Too much fyToken in")]
    TooMuchFyTokenIn,
    #[msg("Pool: Not enough base in")]
    NotEnoughBaseIn,
    #[msg("Pool: Not enough fyToken in")]
    NotEnoughFyTokenIn,
    #[msg("Pool: Reserves ratio changed")]
    ReservesRatioChanged,
    #[msg("Pool: fyToken reserves too low")]
    FyTokenReservesTooLow,
    #[msg("Pool: Not enough fyToken in the pool")]
    NotEnoughFyTokenInPool,
    #[msg("Pool: Nothing to mint")]
    NothingToMint,
    #[msg("Pool: Nothing to burn")]
    NothingToBurn,
    #[msg("Pool: Maturity must be in the future")]
    InvalidMaturity,
    #[msg("Pool: Base and fyToken must share at most 18 decimals")]
    InvalidDecimals,
    #[msg("Pool: Arithmetic overflow")]
    Overflow,
}

/// Reserve cache, refreshed from the vault balances after every instruction
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, InitSpace, Debug, Default)]
pub struct ReserveSnapshot {
    pub base_cached: u128,
    /// Real fyToken balance; the curve sees this plus the LP supply
    pub fy_token_cached: u128,
    pub block_timestamp_cached: u32,
}

/// Pool account
///
/// Seeds: ["pool", base_mint, fy_token_mint]
#[account]
#[derive(InitSpace, Debug, PartialEq)]
pub struct Pool {
    /// May change the curve parameters
    pub authority: Pubkey,

    pub base_mint: Pubkey,
    pub fy_token_mint: Pubkey,

    /// Liquidity share mint, authority is this pool
    pub lp_mint: Pubkey,

    /// Unix timestamp after which trading stops
    pub maturity: u32,

    /// Decimals shared by base, fyToken and LP tokens
    pub decimals: u8,

    /// `10^(18 - decimals)`
    pub scale_factor: u64,

    pub reserves: ReserveSnapshot,

    /// Σ base/virtual-fyToken · RAY · seconds, as little-endian U256 limbs
    pub cumulative_ratio: [u64; 4],

    pub params: CurveParameters,

    /// PDA bump seed
    pub bump: u8,

    /// LP mint PDA bump seed
    pub lp_mint_bump: u8,
}

/// Vault balances as seen by the pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    pub base: u128,
    pub fy_token: u128,
}

/// Lifecycle of a pool, derived from the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolStatus {
    /// Before maturity: everything allowed
    Active,
    /// At or after maturity: plain mint, burn and sync only
    Matured,
}

/// Result of a trade
///
/// `*_to_trader` are the transfers out of the vaults, including refunds of
/// surplus input. `bases` / `fy_tokens` are the net flows from the trader's
/// side: negative when paid in, positive when received.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeOutcome {
    /// Amount solved by the curve: output for sells, input for buys
    pub solved: u128,
    pub base_to_trader: u128,
    pub fy_token_to_trader: u128,
    pub bases: i128,
    pub fy_tokens: i128,
}

/// Result of a mint or burn, signed from the provider's side like [`TradeOutcome`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidityOutcome {
    pub base_to_provider: u128,
    pub fy_token_to_provider: u128,
    pub pool_tokens_minted: u128,
    pub pool_tokens_burned: u128,
    pub bases: i128,
    pub fy_tokens: i128,
    pub pool_tokens: i128,
}

impl Pool {
    pub const SEED: &'static [u8] = b"pool";
    pub const LP_MINT_SEED: &'static [u8] = b"lp_mint";

    /// Seeds the pool PDA signs vault transfers and LP mint/burns with.
    pub fn signer_seeds(&self) -> [&[u8]; 4] {
        [
            Self::SEED,
            self.base_mint.as_ref(),
            self.fy_token_mint.as_ref(),
            std::slice::from_ref(&self.bump),
        ]
    }

    /// Fresh pool with empty reserves and default curve parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        authority: Pubkey,
        base_mint: Pubkey,
        fy_token_mint: Pubkey,
        lp_mint: Pubkey,
        base_decimals: u8,
        fy_token_decimals: u8,
        maturity: i64,
        now: i64,
        bump: u8,
        lp_mint_bump: u8,
    ) -> Result<Self> {
        require!(maturity > now, PoolError::InvalidMaturity);
        let maturity = u32::try_from(maturity).map_err(|_| error!(PoolError::InvalidMaturity))?;
        let now = u32::try_from(now).map_err(|_| error!(PoolError::InvalidMaturity))?;

        require!(
            base_decimals == fy_token_decimals && base_decimals <= MAX_DECIMALS,
            PoolError::InvalidDecimals
        );

        Ok(Self {
            authority,
            base_mint,
            fy_token_mint,
            lp_mint,
            maturity,
            decimals: base_decimals,
            scale_factor: 10u64.pow((MAX_DECIMALS - base_decimals) as u32),
            reserves: ReserveSnapshot {
                block_timestamp_cached: now,
                ..ReserveSnapshot::default()
            },
            cumulative_ratio: [0; 4],
            params: CurveParameters::default(),
            bump,
            lp_mint_bump,
        })
    }

    pub fn status(&self, now: u32) -> PoolStatus {
        if now < self.maturity {
            PoolStatus::Active
        } else {
            PoolStatus::Matured
        }
    }

    /// Seconds left until maturity; fails once matured.
    pub fn time_till_maturity(&self, now: u32) -> Result<u128> {
        require!(self.status(now) == PoolStatus::Active, PoolError::PastMaturity);
        Ok((self.maturity - now) as u128)
    }

    /// Real fyToken reserve plus LP supply
    pub fn virtual_fy_token_reserves(&self, total_supply: u128) -> Result<u128> {
        Ok(self
            .reserves
            .fy_token_cached
            .checked_add(total_supply)
            .ok_or(PoolError::Overflow)?)
    }

    pub fn cumulative_ratio(&self) -> U256 {
        U256::from_limbs(self.cumulative_ratio)
    }

    // ------------------------------------------------------------------------
    // Reserve cache
    // ------------------------------------------------------------------------

    /// Accumulate the base / virtual fyToken ratio over the time since the
    /// last update, using the reserves that held during that time.
    pub fn accrue(&mut self, now: u32, total_supply: u128) -> Result<()> {
        let elapsed = now.saturating_sub(self.reserves.block_timestamp_cached);
        if elapsed == 0 {
            return Ok(());
        }

        let fy_token_virtual = self.virtual_fy_token_reserves(total_supply)?;
        if fy_token_virtual > 0 {
            let increment = U256::from(self.reserves.base_cached) * U256::from(RAY)
                / U256::from(fy_token_virtual)
                * U256::from(elapsed);
            self.cumulative_ratio = self.cumulative_ratio().saturating_add(increment).to_limbs();
        }
        self.reserves.block_timestamp_cached = now;
        Ok(())
    }

    /// Overwrite the cache with the vault balances.
    pub fn refresh(&mut self, balances: Balances) {
        self.reserves.base_cached = balances.base;
        self.reserves.fy_token_cached = balances.fy_token;
    }

    /// Fold unaccounted balances into the reserves.
    pub fn sync(&mut self, now: u32, total_supply: u128, balances: Balances) -> Result<()> {
        self.accrue(now, total_supply)?;
        self.refresh(balances);
        Ok(())
    }

    /// Tokens sitting in the vaults on top of the cache
    fn deposited(&self, balances: Balances) -> Result<Balances> {
        Ok(Balances {
            base: balances
                .base
                .checked_sub(self.reserves.base_cached)
                .ok_or(PoolError::Overflow)?,
            fy_token: balances
                .fy_token
                .checked_sub(self.reserves.fy_token_cached)
                .ok_or(PoolError::Overflow)?,
        })
    }

    // ------------------------------------------------------------------------
    // Previews
    // ------------------------------------------------------------------------

    /// fyToken obtained for selling `base_in`.
    pub fn sell_base_preview(&self, now: u32, total_supply: u128, base_in: u128) -> Result<u128> {
        let t = self.time_till_maturity(now)?;
        let fy_token_virtual = self.virtual_fy_token_reserves(total_supply)?;

        let fy_token_out = self.from_wad_down(YieldCurve::fy_token_out_for_base_in(
            self.wad(self.reserves.base_cached)?,
            self.wad(fy_token_virtual)?,
            self.wad(base_in)?,
            t,
            self.params.ts,
            self.params.g1,
        )?);

        self.check_fy_token_out(fy_token_virtual, base_in, fy_token_out)?;
        Ok(fy_token_out)
    }

    /// fyToken that must be sold to obtain `base_out`.
    pub fn buy_base_preview(&self, now: u32, total_supply: u128, base_out: u128) -> Result<u128> {
        let t = self.time_till_maturity(now)?;
        let fy_token_virtual = self.virtual_fy_token_reserves(total_supply)?;

        Ok(self.from_wad_up(YieldCurve::fy_token_in_for_base_out(
            self.wad(self.reserves.base_cached)?,
            self.wad(fy_token_virtual)?,
            self.wad(base_out)?,
            t,
            self.params.ts,
            self.params.g2,
        )?))
    }

    /// Base obtained for selling `fy_token_in`.
    pub fn sell_fy_token_preview(
        &self,
        now: u32,
        total_supply: u128,
        fy_token_in: u128,
    ) -> Result<u128> {
        let t = self.time_till_maturity(now)?;
        let fy_token_virtual = self.virtual_fy_token_reserves(total_supply)?;

        Ok(self.from_wad_down(YieldCurve::base_out_for_fy_token_in(
            self.wad(self.reserves.base_cached)?,
            self.wad(fy_token_virtual)?,
            self.wad(fy_token_in)?,
            t,
            self.params.ts,
            self.params.g2,
        )?))
    }

    /// Base that must be sold to obtain `fy_token_out`.
    pub fn buy_fy_token_preview(
        &self,
        now: u32,
        total_supply: u128,
        fy_token_out: u128,
    ) -> Result<u128> {
        let t = self.time_till_maturity(now)?;
        let fy_token_virtual = self.virtual_fy_token_reserves(total_supply)?;

        let base_in = self.from_wad_up(YieldCurve::base_in_for_fy_token_out(
            self.wad(self.reserves.base_cached)?,
            self.wad(fy_token_virtual)?,
            self.wad(fy_token_out)?,
            t,
            self.params.ts,
            self.params.g1,
        )?);

        self.check_fy_token_out(fy_token_virtual, base_in, fy_token_out)?;
        Ok(base_in)
    }

    /// Trades paying fyToken out can't push the virtual fyToken reserve below
    /// the base reserve (negative rates), nor take more than the real balance.
    fn check_fy_token_out(
        &self,
        fy_token_virtual: u128,
        base_in: u128,
        fy_token_out: u128,
    ) -> Result<()> {
        require!(
            fy_token_out <= self.reserves.fy_token_cached,
            PoolError::NotEnoughFyTokenInPool
        );
        let base_after = self
            .reserves
            .base_cached
            .checked_add(base_in)
            .ok_or(PoolError::Overflow)?;
        require!(
            fy_token_virtual - fy_token_out >= base_after,
            PoolError::FyTokenReservesTooLow
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Trades
    // ------------------------------------------------------------------------

    /// Sell the base deposited on top of the cache for fyToken.
    pub fn sell_base(
        &self,
        now: u32,
        total_supply: u128,
        balances: Balances,
        min_fy_token_out: u128,
    ) -> Result<TradeOutcome> {
        let base_in = self.deposited(balances)?.base;
        let fy_token_out = self.sell_base_preview(now, total_supply, base_in)?;
        require!(
            fy_token_out >= min_fy_token_out,
            PoolError::NotEnoughFyTokenObtained
        );

        Ok(TradeOutcome {
            solved: fy_token_out,
            base_to_trader: 0,
            fy_token_to_trader: fy_token_out,
            bases: -signed(base_in)?,
            fy_tokens: signed(fy_token_out)?,
        })
    }

    /// Buy exactly `base_out`, paying with the fyToken deposited on top of
    /// the cache; the unused fyToken goes back.
    pub fn buy_base(
        &self,
        now: u32,
        total_supply: u128,
        balances: Balances,
        base_out: u128,
        max_fy_token_in: u128,
    ) -> Result<TradeOutcome> {
        let fy_token_in = self.buy_base_preview(now, total_supply, base_out)?;
        require!(fy_token_in <= max_fy_token_in, PoolError::TooMuchFyTokenIn);

        let deposited = self.deposited(balances)?.fy_token;
        require!(deposited >= fy_token_in, PoolError::NotEnoughFyTokenIn);

        Ok(TradeOutcome {
            solved: fy_token_in,
            base_to_trader: base_out,
            fy_token_to_trader: deposited - fy_token_in,
            bases: signed(base_out)?,
            fy_tokens: -signed(fy_token_in)?,
        })
    }

    /// Sell the fyToken deposited on top of the cache for base.
    pub fn sell_fy_token(
        &self,
        now: u32,
        total_supply: u128,
        balances: Balances,
        min_base_out: u128,
    ) -> Result<TradeOutcome> {
        let fy_token_in = self.deposited(balances)?.fy_token;
        let base_out = self.sell_fy_token_preview(now, total_supply, fy_token_in)?;
        require!(base_out >= min_base_out, PoolError::NotEnoughBaseObtained);

        Ok(TradeOutcome {
            solved: base_out,
            base_to_trader: base_out,
            fy_token_to_trader: 0,
            bases: signed(base_out)?,
            fy_tokens: -signed(fy_token_in)?,
        })
    }

    /// Buy exactly `fy_token_out`, paying with the base deposited on top of
    /// the cache; the unused base goes back.
    pub fn buy_fy_token(
        &self,
        now: u32,
        total_supply: u128,
        balances: Balances,
        fy_token_out: u128,
        max_base_in: u128,
    ) -> Result<TradeOutcome> {
        let base_in = self.buy_fy_token_preview(now, total_supply, fy_token_out)?;
        require!(base_in <= max_base_in, PoolError::TooMuchBaseIn);

        let deposited = self.deposited(balances)?.base;
        require!(deposited >= base_in, PoolError::NotEnoughBaseIn);

        Ok(TradeOutcome {
            solved: base_in,
            base_to_trader: deposited - base_in,
            fy_token_to_trader: fy_token_out,
            bases: -signed(base_in)?,
            fy_tokens: signed(fy_token_out)?,
        })
    }

    // ------------------------------------------------------------------------
    // Liquidity
    // ------------------------------------------------------------------------

    /// LP guard against the reserves moving between quote and execution.
    fn check_ratio(&self, min_ratio: u128, max_ratio: u128) -> Result<()> {
        if self.reserves.fy_token_cached == 0 {
            return Ok(());
        }
        let ratio = mul_div(
            self.reserves.base_cached,
            RATIO_PRECISION,
            self.reserves.fy_token_cached,
        )?;
        require!(
            ratio >= min_ratio && ratio <= max_ratio,
            PoolError::ReservesRatioChanged
        );
        Ok(())
    }

    /// Mint shares for the base deposited on top of the cache, taking the
    /// fyToken that keeps the reserve ratio. Surplus fyToken goes back.
    ///
    /// The first mint sets shares equal to base and starts the pool with no
    /// fyToken at all.
    pub fn mint(
        &self,
        total_supply: u128,
        balances: Balances,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<LiquidityOutcome> {
        self.check_ratio(min_ratio, max_ratio)?;
        let deposited = self.deposited(balances)?;

        let (minted, fy_token_in) = if total_supply == 0 {
            (deposited.base, 0)
        } else {
            let minted = mul_div(deposited.base, total_supply, self.reserves.base_cached)?;
            let fy_token_in =
                mul_div_up(self.reserves.fy_token_cached, minted, total_supply)?;
            (minted, fy_token_in)
        };
        require!(minted > 0, PoolError::NothingToMint);
        require!(
            deposited.fy_token >= fy_token_in,
            PoolError::NotEnoughFyTokenIn
        );

        Ok(LiquidityOutcome {
            base_to_provider: 0,
            fy_token_to_provider: deposited.fy_token - fy_token_in,
            pool_tokens_minted: minted,
            pool_tokens_burned: 0,
            bases: -signed(deposited.base)?,
            fy_tokens: -signed(fy_token_in)?,
            pool_tokens: signed(minted)?,
        })
    }

    /// Mint with (mostly) base: the pool first sells `fy_token_to_buy` of its
    /// own fyToken to the provider, then mints against that fyToken plus any
    /// deposited on top of the cache. Surplus base goes back.
    #[allow(clippy::too_many_arguments)]
    pub fn mint_with_base(
        &self,
        now: u32,
        total_supply: u128,
        balances: Balances,
        fy_token_to_buy: u128,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<LiquidityOutcome> {
        self.time_till_maturity(now)?;
        require!(total_supply > 0, PoolError::NothingToMint);
        require!(
            fy_token_to_buy < self.reserves.fy_token_cached,
            PoolError::NotEnoughFyTokenInPool
        );
        self.check_ratio(min_ratio, max_ratio)?;
        let deposited = self.deposited(balances)?;

        let base_sold = if fy_token_to_buy == 0 {
            0
        } else {
            self.buy_fy_token_preview(now, total_supply, fy_token_to_buy)?
        };

        let fy_token_for_shares = fy_token_to_buy
            .checked_add(deposited.fy_token)
            .ok_or(PoolError::Overflow)?;
        let minted = mul_div(
            total_supply,
            fy_token_for_shares,
            self.reserves.fy_token_cached - fy_token_to_buy,
        )?;
        require!(minted > 0, PoolError::NothingToMint);

        let base_after_sale = self
            .reserves
            .base_cached
            .checked_add(base_sold)
            .ok_or(PoolError::Overflow)?;
        let base_in = mul_div(base_after_sale, minted, total_supply)?
            .checked_add(base_sold)
            .ok_or(PoolError::Overflow)?;
        require!(deposited.base >= base_in, PoolError::NotEnoughBaseIn);

        Ok(LiquidityOutcome {
            base_to_provider: deposited.base - base_in,
            fy_token_to_provider: 0,
            pool_tokens_minted: minted,
            pool_tokens_burned: 0,
            bases: -signed(base_in)?,
            fy_tokens: -signed(deposited.fy_token)?,
            pool_tokens: signed(minted)?,
        })
    }

    /// Burn `pool_tokens` shares for their pro-rata base and fyToken.
    pub fn burn(
        &self,
        total_supply: u128,
        pool_tokens: u128,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<LiquidityOutcome> {
        let (base_out, fy_token_out) =
            self.pro_rata(total_supply, pool_tokens, min_ratio, max_ratio)?;

        Ok(LiquidityOutcome {
            base_to_provider: base_out,
            fy_token_to_provider: fy_token_out,
            pool_tokens_minted: 0,
            pool_tokens_burned: pool_tokens,
            bases: signed(base_out)?,
            fy_tokens: signed(fy_token_out)?,
            pool_tokens: -signed(pool_tokens)?,
        })
    }

    /// Burn `pool_tokens` shares and sell the fyToken part back into the
    /// pool, paying out base only.
    pub fn burn_for_base(
        &self,
        now: u32,
        total_supply: u128,
        pool_tokens: u128,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<LiquidityOutcome> {
        let t = self.time_till_maturity(now)?;
        let (base_out, fy_token_out) =
            self.pro_rata(total_supply, pool_tokens, min_ratio, max_ratio)?;

        let mut total_base_out = base_out;
        if fy_token_out > 0 {
            // reserves once the burn has taken its share
            let base_left = self.reserves.base_cached - base_out;
            let fy_token_left = (self.reserves.fy_token_cached - fy_token_out)
                .checked_add(total_supply - pool_tokens)
                .ok_or(PoolError::Overflow)?;

            let base_for_fy_token = self.from_wad_down(YieldCurve::base_out_for_fy_token_in(
                self.wad(base_left)?,
                self.wad(fy_token_left)?,
                self.wad(fy_token_out)?,
                t,
                self.params.ts,
                self.params.g2,
            )?);
            total_base_out = total_base_out
                .checked_add(base_for_fy_token)
                .ok_or(PoolError::Overflow)?;
        }

        Ok(LiquidityOutcome {
            base_to_provider: total_base_out,
            fy_token_to_provider: 0,
            pool_tokens_minted: 0,
            pool_tokens_burned: pool_tokens,
            bases: signed(total_base_out)?,
            fy_tokens: 0,
            pool_tokens: -signed(pool_tokens)?,
        })
    }

    fn pro_rata(
        &self,
        total_supply: u128,
        pool_tokens: u128,
        min_ratio: u128,
        max_ratio: u128,
    ) -> Result<(u128, u128)> {
        require!(
            pool_tokens > 0 && pool_tokens <= total_supply,
            PoolError::NothingToBurn
        );
        self.check_ratio(min_ratio, max_ratio)?;

        let base_out = mul_div(pool_tokens, self.reserves.base_cached, total_supply)?;
        let fy_token_out = mul_div(pool_tokens, self.reserves.fy_token_cached, total_supply)?;
        Ok((base_out, fy_token_out))
    }

    // ------------------------------------------------------------------------
    // Scaling
    // ------------------------------------------------------------------------

    fn wad(&self, amount: u128) -> Result<u128> {
        Ok(amount
            .checked_mul(self.scale_factor as u128)
            .ok_or(PoolError::Overflow)?)
    }

    fn from_wad_down(&self, amount: u128) -> u128 {
        amount / self.scale_factor as u128
    }

    fn from_wad_up(&self, amount: u128) -> u128 {
        amount.div_ceil(self.scale_factor as u128)
    }
}

fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    require!(denominator > 0, PoolError::Overflow);
    Ok((U256::from(a) * U256::from(b) / U256::from(denominator))
        .checked_as_u128()
        .ok_or(PoolError::Overflow)?)
}

fn mul_div_up(a: u128, b: u128, denominator: u128) -> Result<u128> {
    require!(denominator > 0, PoolError::Overflow);
    let product = U256::from(a) * U256::from(b);
    let d = U256::from(denominator);
    let mut q = product / d;
    if !(product % d).is_zero() {
        q = q + U256::one();
    }
    Ok(q.checked_as_u128().ok_or(PoolError::Overflow)?)
}

fn signed(amount: u128) -> Result<i128> {
    Ok(i128::try_from(amount).map_err(|_| error!(PoolError::Overflow))?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::{solve_fy_token_to_buy, FLAT_FEE};

    const E18: u128 = 1_000_000_000_000_000_000;
    const E21: u128 = 1_000 * E18;
    const E24: u128 = 1_000_000 * E18;

    const YEAR: u32 = 365 * 86_400;
    const START: u32 = 1_700_000_000;
    const MATURITY: u32 = START + YEAR;

    fn err(e: PoolError) -> anchor_lang::error::Error {
        e.into()
    }

    /// Pool vaults and LP supply
    #[derive(Clone, Debug, PartialEq)]
    struct Vaults {
        base: u128,
        fy_token: u128,
        lp: u128,
        supply: u128,
    }

    /// A pool plus the token balances it owns, driven the way the
    /// instructions drive it: sync, deposit, compute, pay out, refresh.
    /// A failing instruction rolls everything back.
    #[derive(Clone, Debug, PartialEq)]
    struct Chain {
        pool: Pool,
        vaults: Vaults,
    }

    impl Chain {
        fn new() -> Self {
            let pool = Pool::new(
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                Pubkey::new_unique(),
                18,
                18,
                MATURITY as i64,
                START as i64,
                255,
                254,
            )
            .unwrap();
            Self {
                pool,
                vaults: Vaults {
                    base: 0,
                    fy_token: 0,
                    lp: 0,
                    supply: 0,
                },
            }
        }

        fn balances(&self) -> Balances {
            Balances {
                base: self.vaults.base,
                fy_token: self.vaults.fy_token,
            }
        }

        fn assert_cache_matches_vaults(&self) {
            assert_eq!(self.pool.reserves.base_cached, self.vaults.base);
            assert_eq!(self.pool.reserves.fy_token_cached, self.vaults.fy_token);
        }

        fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
            let before = self.clone();
            let result = f(self);
            if result.is_err() {
                *self = before;
            }
            result
        }

        fn begin(&mut self, now: u32, base: u128, fy_token: u128) -> Result<()> {
            self.pool.sync(now, self.vaults.supply, self.balances())?;
            self.vaults.base += base;
            self.vaults.fy_token += fy_token;
            Ok(())
        }

        fn settle_trade(&mut self, out: &TradeOutcome) {
            self.vaults.base -= out.base_to_trader;
            self.vaults.fy_token -= out.fy_token_to_trader;
            self.pool.refresh(self.balances());
        }

        fn settle_liquidity(&mut self, out: &LiquidityOutcome) {
            self.vaults.base -= out.base_to_provider;
            self.vaults.fy_token -= out.fy_token_to_provider;
            self.vaults.supply += out.pool_tokens_minted;
            self.vaults.lp -= out.pool_tokens_burned;
            self.vaults.supply -= out.pool_tokens_burned;
            self.pool.refresh(self.balances());
        }

        fn sync(&mut self, now: u32) -> Result<()> {
            self.atomically(|c| c.begin(now, 0, 0))
        }

        fn mint(&mut self, now: u32, base: u128, fy_token: u128) -> Result<LiquidityOutcome> {
            self.atomically(|c| {
                c.begin(now, base, fy_token)?;
                let out = c.pool.mint(c.vaults.supply, c.balances(), 0, u128::MAX)?;
                c.settle_liquidity(&out);
                Ok(out)
            })
        }

        fn mint_with_base(
            &mut self,
            now: u32,
            base: u128,
            fy_token_to_buy: u128,
        ) -> Result<LiquidityOutcome> {
            self.atomically(|c| {
                c.begin(now, base, 0)?;
                let out = c.pool.mint_with_base(
                    now,
                    c.vaults.supply,
                    c.balances(),
                    fy_token_to_buy,
                    0,
                    u128::MAX,
                )?;
                c.settle_liquidity(&out);
                Ok(out)
            })
        }

        fn burn(&mut self, now: u32, shares: u128, for_base: bool) -> Result<LiquidityOutcome> {
            self.atomically(|c| {
                c.begin(now, 0, 0)?;
                c.vaults.lp += shares;
                let out = if for_base {
                    c.pool
                        .burn_for_base(now, c.vaults.supply, c.vaults.lp, 0, u128::MAX)?
                } else {
                    c.pool.burn(c.vaults.supply, c.vaults.lp, 0, u128::MAX)?
                };
                c.settle_liquidity(&out);
                Ok(out)
            })
        }

        fn sell_base(&mut self, now: u32, base_in: u128, min: u128) -> Result<TradeOutcome> {
            self.atomically(|c| {
                c.begin(now, base_in, 0)?;
                let out = c.pool.sell_base(now, c.vaults.supply, c.balances(), min)?;
                c.settle_trade(&out);
                Ok(out)
            })
        }

        fn sell_fy_token(&mut self, now: u32, fy_in: u128, min: u128) -> Result<TradeOutcome> {
            self.atomically(|c| {
                c.begin(now, 0, fy_in)?;
                let out = c.pool.sell_fy_token(now, c.vaults.supply, c.balances(), min)?;
                c.settle_trade(&out);
                Ok(out)
            })
        }

        fn buy_base(&mut self, now: u32, base_out: u128, max: u128) -> Result<TradeOutcome> {
            self.atomically(|c| {
                c.begin(now, 0, max)?;
                let out = c
                    .pool
                    .buy_base(now, c.vaults.supply, c.balances(), base_out, max)?;
                c.settle_trade(&out);
                Ok(out)
            })
        }

        fn buy_fy_token(&mut self, now: u32, fy_out: u128, max: u128) -> Result<TradeOutcome> {
            self.atomically(|c| {
                c.begin(now, max, 0)?;
                let out = c
                    .pool
                    .buy_fy_token(now, c.vaults.supply, c.balances(), fy_out, max)?;
                c.settle_trade(&out);
                Ok(out)
            })
        }
    }

    /// 1M base minted, then 100k fyToken sold into the pool a year out
    fn seeded() -> Chain {
        let mut chain = Chain::new();
        chain.mint(START, E24, 0).unwrap();
        chain.sell_fy_token(START, 100_000 * E18, 0).unwrap();
        chain
    }

    #[test]
    fn test_new_pool_validation() {
        let key = Pubkey::new_unique();
        assert_eq!(
            Pool::new(key, key, key, key, 18, 18, 100, 100, 0, 0).unwrap_err(),
            err(PoolError::InvalidMaturity)
        );
        assert_eq!(
            Pool::new(key, key, key, key, 6, 9, 200, 100, 0, 0).unwrap_err(),
            err(PoolError::InvalidDecimals)
        );
        assert_eq!(
            Pool::new(key, key, key, key, 19, 19, 200, 100, 0, 0).unwrap_err(),
            err(PoolError::InvalidDecimals)
        );

        let pool = Pool::new(key, key, key, key, 6, 6, 200, 100, 0, 0).unwrap();
        assert_eq!(pool.scale_factor, 1_000_000_000_000);
        assert_eq!(pool.reserves.block_timestamp_cached, 100);
        assert_eq!(pool.params, CurveParameters::default());
    }

    #[test]
    fn test_first_mint_sets_shares_to_base() {
        let mut chain = Chain::new();
        let out = chain.mint(START, E24, 500_000 * E18).unwrap();

        assert_eq!(out.pool_tokens_minted, E24);
        assert_eq!(out.fy_token_to_provider, 500_000 * E18);
        assert_eq!(chain.pool.reserves.fy_token_cached, 0);
        assert_eq!(chain.vaults.supply, E24);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_empty_deposit_mints_nothing() {
        let mut chain = Chain::new();
        assert_eq!(
            chain.mint(START, 0, 0).unwrap_err(),
            err(PoolError::NothingToMint)
        );
    }

    #[test]
    fn test_sell_fy_token_into_fresh_pool() {
        let mut chain = Chain::new();
        chain.mint(START, E24, 0).unwrap();

        let out = chain.sell_fy_token(START, 100_000 * E18, 0).unwrap();
        assert_eq!(out.solved, 97_433_295_015_687_835_757_779);
        assert_eq!(out.bases, 97_433_295_015_687_835_757_779);
        assert_eq!(out.fy_tokens, -100_000 * E18 as i128);

        assert_eq!(chain.pool.reserves.base_cached, 902_566_704_984_312_164_242_221);
        assert_eq!(chain.pool.reserves.fy_token_cached, 100_000 * E18);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_selling_base_needs_real_fy_token() {
        let mut chain = Chain::new();
        chain.mint(START, E24, 0).unwrap();
        assert_eq!(
            chain.sell_base(START, E18, 0).unwrap_err(),
            err(PoolError::NotEnoughFyTokenInPool)
        );
    }

    #[test]
    fn test_mint_with_base_using_solver() {
        let mut chain = seeded();
        let params = chain.pool.params;

        let solution = solve_fy_token_to_buy(
            chain.pool.reserves.base_cached,
            chain.pool.reserves.fy_token_cached,
            chain.vaults.supply,
            E18,
            YEAR as u128,
            params.ts,
            params.g1,
        )
        .unwrap();
        assert_eq!(solution.fy_token_to_buy, 100_201_129_913_330_078);

        let out = chain.mint_with_base(START, E18, solution.fy_token_to_buy).unwrap();
        assert_eq!(out.pool_tokens_minted, 1_002_012_303_160_950_417);
        assert_eq!(out.bases, -999_986_308_113_819_384);
        assert_eq!(out.base_to_provider, 13_691_886_180_616);
        assert_eq!(chain.vaults.supply, E24 + 1_002_012_303_160_950_417);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_mint_with_base_short_of_base() {
        let mut chain = seeded();
        let before = chain.clone();
        // buying this much fyToken costs more than the deposit
        assert_eq!(
            chain.mint_with_base(START, E18, 50 * E18).unwrap_err(),
            err(PoolError::NotEnoughBaseIn)
        );
        assert_eq!(chain, before);
    }

    #[test]
    fn test_mint_takes_matching_fy_token() {
        let mut chain = seeded();

        assert_eq!(
            chain.mint(START, E21, 0).unwrap_err(),
            err(PoolError::NotEnoughFyTokenIn)
        );

        let out = chain.mint(START, E21, 200 * E18).unwrap();
        assert_eq!(out.pool_tokens_minted, 1_107_951_350_828_281_837_428);
        assert_eq!(out.fy_tokens, -110_795_135_082_828_183_743);
        assert_eq!(out.fy_token_to_provider, 200 * E18 - 110_795_135_082_828_183_743);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_mint_ratio_guard() {
        let chain = seeded();
        // base / fyToken ≈ 9.0257
        let balances = Balances {
            base: chain.vaults.base + E21,
            fy_token: chain.vaults.fy_token + 200 * E18,
        };
        let supply = chain.vaults.supply;

        assert_eq!(
            chain
                .pool
                .mint(supply, balances, 10 * RATIO_PRECISION, u128::MAX)
                .unwrap_err(),
            err(PoolError::ReservesRatioChanged)
        );
        assert_eq!(
            chain.pool.mint(supply, balances, 0, 9 * RATIO_PRECISION).unwrap_err(),
            err(PoolError::ReservesRatioChanged)
        );
        assert!(chain
            .pool
            .mint(supply, balances, 9 * RATIO_PRECISION, 10 * RATIO_PRECISION)
            .is_ok());
    }

    #[test]
    fn test_burn_is_pro_rata() {
        let mut chain = seeded();
        let out = chain.burn(START, 100_000 * E18, false).unwrap();

        assert_eq!(out.base_to_provider, 90_256_670_498_431_216_424_222);
        assert_eq!(out.fy_token_to_provider, 10_000 * E18);
        assert_eq!(out.pool_tokens, -100_000 * E18 as i128);
        assert_eq!(chain.vaults.supply, 900_000 * E18);
        assert_eq!(chain.vaults.lp, 0);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_burn_for_base_pays_base_only() {
        let plain = seeded().burn(START, 100_000 * E18, false).unwrap();

        let mut chain = seeded();
        let out = chain.burn(START, 100_000 * E18, true).unwrap();
        assert_eq!(out.fy_token_to_provider, 0);
        assert_eq!(out.fy_tokens, 0);
        // the fyToken share is sold at a discount, so it adds less than its face value
        assert!(out.base_to_provider > plain.base_to_provider);
        assert!(out.base_to_provider < plain.base_to_provider + plain.fy_token_to_provider);
        assert_eq!(chain.pool.reserves.fy_token_cached, 100_000 * E18);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_failed_burn_for_base_rolls_back() {
        let mut chain = seeded();
        let before = chain.clone();
        // the fyToken share of 1000 shares is too small to sell past the flat fee
        assert_eq!(
            chain.burn(START, 1_000, true).unwrap_err(),
            anchor_lang::error::Error::from(crate::amm::CurveError::RoundingInducedError)
        );
        assert_eq!(chain, before);
        assert_eq!(chain.vaults.lp, 0);
    }

    #[test]
    fn test_burn_nothing() {
        let mut chain = seeded();
        assert_eq!(
            chain.burn(START, 0, false).unwrap_err(),
            err(PoolError::NothingToBurn)
        );
    }

    #[test]
    fn test_slippage_guards() {
        let mut chain = seeded();
        let before = chain.clone();
        let supply = chain.vaults.supply;

        let fy_out = chain.pool.sell_base_preview(START, supply, E18).unwrap();
        assert_eq!(
            chain.sell_base(START, E18, fy_out + 1).unwrap_err(),
            err(PoolError::NotEnoughFyTokenObtained)
        );

        let base_out = chain.pool.sell_fy_token_preview(START, supply, E18).unwrap();
        assert_eq!(
            chain.sell_fy_token(START, E18, base_out + 1).unwrap_err(),
            err(PoolError::NotEnoughBaseObtained)
        );

        let fy_in = chain.pool.buy_base_preview(START, supply, E18).unwrap();
        assert_eq!(
            chain.buy_base(START, E18, fy_in - 1).unwrap_err(),
            err(PoolError::TooMuchFyTokenIn)
        );

        let base_in = chain.pool.buy_fy_token_preview(START, supply, E18).unwrap();
        assert_eq!(
            chain.buy_fy_token(START, E18, base_in - 1).unwrap_err(),
            err(PoolError::TooMuchBaseIn)
        );

        assert_eq!(chain, before);
    }

    #[test]
    fn test_buy_without_enough_deposit() {
        let chain = seeded();
        let supply = chain.vaults.supply;
        let fy_in = chain.pool.buy_base_preview(START, supply, E18).unwrap();

        // the trader allows enough but transferred too little
        let balances = Balances {
            base: chain.vaults.base,
            fy_token: chain.vaults.fy_token + fy_in - 1,
        };
        assert_eq!(
            chain
                .pool
                .buy_base(START, supply, balances, E18, fy_in)
                .unwrap_err(),
            err(PoolError::NotEnoughFyTokenIn)
        );
    }

    #[test]
    fn test_trades_match_previews_and_refund_surplus() {
        let mut chain = seeded();
        let supply = chain.vaults.supply;

        let base_in = chain.pool.buy_fy_token_preview(START, supply, E18).unwrap();
        let out = chain.buy_fy_token(START, E18, 2 * E18).unwrap();
        assert_eq!(out.solved, base_in);
        assert_eq!(out.bases, -(base_in as i128));
        assert_eq!(out.base_to_trader, 2 * E18 - base_in);
        assert_eq!(out.fy_token_to_trader, E18);
        chain.assert_cache_matches_vaults();

        let fy_in = chain.pool.buy_base_preview(START, supply, E18).unwrap();
        let out = chain.buy_base(START, E18, 2 * E18).unwrap();
        assert_eq!(out.solved, fy_in);
        assert_eq!(out.fy_tokens, -(fy_in as i128));
        assert_eq!(out.fy_token_to_trader, 2 * E18 - fy_in);
        chain.assert_cache_matches_vaults();

        let fy_out = chain.pool.sell_base_preview(START, supply, E18).unwrap();
        let out = chain.sell_base(START, E18, 0).unwrap();
        assert_eq!(out.fy_token_to_trader, fy_out);
        // a year out fyToken trades at a discount
        assert!(fy_out > E18);
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_fy_token_reserves_cannot_drop_below_base() {
        let chain = seeded();
        let supply = chain.vaults.supply;
        // virtual fyToken 1.1M vs base 0.9M: buying 99,999 fyToken for ~97.7k
        // base would leave 1.000001M virtual fyToken against 1.00025M base
        assert_eq!(
            chain
                .pool
                .buy_fy_token_preview(START, supply, 99_999 * E18)
                .unwrap_err(),
            err(PoolError::FyTokenReservesTooLow)
        );
    }

    #[test]
    fn test_lockout_after_maturity() {
        let mut chain = seeded();
        let supply = chain.vaults.supply;
        let matured = err(PoolError::PastMaturity);

        assert_eq!(chain.pool.status(MATURITY - 1), PoolStatus::Active);
        assert_eq!(chain.pool.status(MATURITY), PoolStatus::Matured);

        assert_eq!(chain.sell_base(MATURITY, E18, 0).unwrap_err(), matured);
        assert_eq!(chain.sell_fy_token(MATURITY, E18, 0).unwrap_err(), matured);
        assert_eq!(chain.buy_base(MATURITY, E18, 2 * E18).unwrap_err(), matured);
        assert_eq!(chain.buy_fy_token(MATURITY, E18, 2 * E18).unwrap_err(), matured);
        assert_eq!(
            chain.pool.sell_base_preview(MATURITY, supply, E18).unwrap_err(),
            matured
        );
        assert_eq!(
            chain.pool.buy_base_preview(MATURITY + 1, supply, E18).unwrap_err(),
            matured
        );
        assert_eq!(chain.mint_with_base(MATURITY, E18, E18).unwrap_err(), matured);
        assert_eq!(chain.burn(MATURITY, E18, true).unwrap_err(), matured);

        // liquidity and sync keep working
        chain.sync(MATURITY + 10).unwrap();
        chain.mint(MATURITY + 10, E21, 200 * E18).unwrap();
        chain.burn(MATURITY + 20, 100 * E18, false).unwrap();
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_twar_accrual() {
        let mut chain = Chain::new();
        chain.mint(START, E24, 0).unwrap();
        assert!(chain.pool.cumulative_ratio().is_zero());

        // base / (0 fyToken + 1M shares) = 1
        chain.sync(START + 100).unwrap();
        assert_eq!(chain.pool.cumulative_ratio(), U256::from(RAY) * U256::from(100u32));
        assert_eq!(chain.pool.reserves.block_timestamp_cached, START + 100);

        // a second sync in the same second adds nothing
        chain.sync(START + 100).unwrap();
        assert_eq!(chain.pool.cumulative_ratio(), U256::from(RAY) * U256::from(100u32));
    }

    #[test]
    fn test_twar_saturates() {
        let mut chain = Chain::new();
        chain.mint(START, E24, 0).unwrap();
        chain.pool.cumulative_ratio = [u64::MAX; 4];
        chain.sync(START + 1).unwrap();
        assert_eq!(chain.pool.cumulative_ratio, [u64::MAX; 4]);
    }

    #[test]
    fn test_donations_are_folded_into_reserves() {
        let mut chain = seeded();
        let donation = 5 * E18;
        chain.vaults.base += donation;

        let base_before = chain.pool.reserves.base_cached;
        let out = chain.sell_fy_token(START + 1, E18, 0).unwrap();

        // the trader only gets paid for the fyToken sold
        assert!(out.base_to_trader < E18);
        assert_eq!(
            chain.pool.reserves.base_cached,
            base_before + donation - out.base_to_trader
        );
        chain.assert_cache_matches_vaults();
    }

    #[test]
    fn test_six_decimal_tokens_round_in_pool_favour() {
        let key = Pubkey::new_unique();
        let mut chain = Chain::new();
        chain.pool = Pool::new(key, key, key, key, 6, 6, MATURITY as i64, START as i64, 0, 0).unwrap();

        chain.mint(START, 1_000_000_000_000, 0).unwrap();
        let out = chain.sell_fy_token(START, 1_000_000, 0).unwrap();
        // one fyToken sells for a little under one base
        assert!(out.base_to_trader < 1_000_000);
        assert!(out.base_to_trader > 900_000);

        let supply = chain.vaults.supply;
        let fy_in = chain.pool.buy_base_preview(START, supply, 1).unwrap();
        // even the smallest unit costs at least a unit plus the flat fee, rounded up
        assert!(fy_in >= 1 + (FLAT_FEE / 1_000_000_000_000));
        chain.assert_cache_matches_vaults();
    }
}
