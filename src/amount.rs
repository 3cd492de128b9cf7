//! Exact-decimal USDC amounts.
//!
//! Transfer amounts arrive as user-supplied decimal strings and are settled
//! onchain in base units (USDC has 6 decimals). [`Usdc`] keeps the exact
//! decimal representation for display and converts to scaled [`U256`] base
//! units at the gateway boundary.

use alloy::primitives::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Number of decimal places in the bridged token's base-unit representation.
pub const USDC_DECIMALS: u32 = 6;

const BASE_UNIT_SCALE: u64 = 1_000_000;

/// A USDC dollar amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Usdc(Decimal);

impl FromStr for Usdc {
    type Err = AmountError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(value)
            .map(Self)
            .map_err(|_| AmountError::Unparsable {
                value: value.to_string(),
            })
    }
}

impl Display for Usdc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Usdc {
    /// Converts to base units with 6 decimal places.
    ///
    /// Fails for non-positive amounts and for amounts carrying more
    /// precision than the token can represent.
    pub fn to_base_units(self) -> Result<U256, AmountError> {
        if self.0 <= Decimal::ZERO {
            return Err(AmountError::NotPositive { value: self.0 });
        }

        if self.0.scale() > USDC_DECIMALS {
            return Err(AmountError::TooPrecise { value: self.0 });
        }

        let scaled = self
            .0
            .checked_mul(Decimal::from(BASE_UNIT_SCALE))
            .and_then(|scaled| scaled.to_u128())
            .ok_or(AmountError::Overflow { value: self.0 })?;

        Ok(U256::from(scaled))
    }
}

/// Validation errors for user-supplied transfer amounts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is not a valid decimal: {value}")]
    Unparsable { value: String },
    #[error("amount must be positive, got {value}")]
    NotPositive { value: Decimal },
    #[error("amount has more than {USDC_DECIMALS} decimal places: {value}")]
    TooPrecise { value: Decimal },
    #[error("amount does not fit in the token's base-unit range: {value}")]
    Overflow { value: Decimal },
}
