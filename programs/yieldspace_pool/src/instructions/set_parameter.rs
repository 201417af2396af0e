//! Curve Parameter Updates
//!
//! The pool authority can retune `ts`, `g1` or `g2`, one key per call.

use anchor_lang::prelude::*;

use crate::state::{ParameterKey, Pool};

/// Event emitted when a curve parameter changes
#[event]
pub struct ParameterSet {
    pub pool: Pubkey,
    pub parameter: String,
    pub value: u128,
}

#[derive(Accounts)]
pub struct SetParameter<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        has_one = authority,
    )]
    pub pool: Account<'info, Pool>,
}

impl<'info> SetParameter<'info> {
    pub fn set_parameter(&mut self, name: String, value: u128) -> Result<()> {
        let key = ParameterKey::from_name(&name)?;
        self.pool.params.set(key, value)?;

        msg!("Parameter {} set to {}", key.name(), value);

        emit!(ParameterSet {
            pool: self.pool.key(),
            parameter: name,
            value,
        });

        Ok(())
    }
}
