//! Curve Parameters
//!
//! The three knobs of the YieldSpace exponent, stored inside each pool and
//! changed one at a time by the pool authority through `set_parameter`.

use anchor_lang::prelude::*;

use crate::amm::ONE;

/// Seconds in four 365-day years; `ts` defaults to its inverse
pub const SECONDS_IN_FOUR_YEARS: u128 = 126_144_000;

#[error_code(offset = 6200)]
pub enum ParameterError {
    #[msg("Pool: Unrecognized parameter")]
    UnrecognizedParameter,
    #[msg("Pool: Invalid parameter value")]
    InvalidParameter,
}

/// Curve parameters, all in 64.64 fixed point
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, InitSpace, Debug)]
pub struct CurveParameters {
    /// Decay rate, per second
    pub ts: u128,
    /// Fee applied when base flows into the pool (sell base, buy fyToken)
    pub g1: u128,
    /// Fee applied when fyToken flows into the pool (sell fyToken, buy base)
    pub g2: u128,
}

impl Default for CurveParameters {
    fn default() -> Self {
        Self {
            ts: ONE / SECONDS_IN_FOUR_YEARS,
            g1: 950 * ONE / 1000,
            g2: 1000 * ONE / 950,
        }
    }
}

/// Symbolic key accepted by `set_parameter`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParameterKey {
    Ts,
    G1,
    G2,
}

impl ParameterKey {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "ts" => Ok(Self::Ts),
            "g1" => Ok(Self::G1),
            "g2" => Ok(Self::G2),
            _ => err!(ParameterError::UnrecognizedParameter),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ts => "ts",
            Self::G1 => "g1",
            Self::G2 => "g2",
        }
    }
}

impl CurveParameters {
    /// Replace one parameter, keeping `ts > 0` and `0 < g1 ≤ 1 ≤ g2`.
    pub fn set(&mut self, key: ParameterKey, value: u128) -> Result<()> {
        match key {
            ParameterKey::Ts => {
                require!(value > 0, ParameterError::InvalidParameter);
                self.ts = value;
            }
            ParameterKey::G1 => {
                require!(value > 0 && value <= ONE, ParameterError::InvalidParameter);
                self.g1 = value;
            }
            ParameterKey::G2 => {
                require!(value >= ONE, ParameterError::InvalidParameter);
                self.g2 = value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_asymmetric() {
        let params = CurveParameters::default();
        assert!(params.g1 < ONE && params.g2 > ONE);
        assert_eq!(params.ts, 146_235_604_338);
    }

    #[test]
    fn test_set_by_name() {
        let mut params = CurveParameters::default();
        params.set(ParameterKey::from_name("g1").unwrap(), ONE).unwrap();
        params.set(ParameterKey::from_name("ts").unwrap(), 42).unwrap();
        assert_eq!(params.g1, ONE);
        assert_eq!(params.ts, 42);
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            ParameterKey::from_name("k").unwrap_err(),
            anchor_lang::error::Error::from(ParameterError::UnrecognizedParameter)
        );
    }

    #[test]
    fn test_rejects_values_breaking_fee_order() {
        let mut params = CurveParameters::default();
        let invalid = anchor_lang::error::Error::from(ParameterError::InvalidParameter);

        assert_eq!(params.set(ParameterKey::G1, ONE + 1).unwrap_err(), invalid);
        assert_eq!(params.set(ParameterKey::G1, 0).unwrap_err(), invalid);
        assert_eq!(params.set(ParameterKey::G2, ONE - 1).unwrap_err(), invalid);
        assert_eq!(params.set(ParameterKey::Ts, 0).unwrap_err(), invalid);
        assert_eq!(params, CurveParameters::default());
    }
}
