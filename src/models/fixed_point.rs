// Fixed-point values read from chain, tagged with their decimal base

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixedPointError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("too many fractional digits: {digits} (max {max})")]
    TooManyDecimals { digits: usize, max: u8 },
}

/// Decimal base of a fixed-point value.
pub trait Scale: Copy + Send + Sync + 'static {
    const DECIMALS: u8;
}

/// 8 decimals: USD values, health factors, collateral ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Base8;

/// 18 decimals: equity per share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Wad;

/// 27 decimals: lending-pool interest rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ray;

impl Scale for Base8 {
    const DECIMALS: u8 = 8;
}

impl Scale for Wad {
    const DECIMALS: u8 = 18;
}

impl Scale for Ray {
    const DECIMALS: u8 = 27;
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed<S> {
    raw: U256,
    scale: PhantomData<S>,
}

impl<S: Scale> Fixed<S> {
    pub const ZERO: Self = Self {
        raw: U256::ZERO,
        scale: PhantomData,
    };

    pub const MAX: Self = Self {
        raw: U256::MAX,
        scale: PhantomData,
    };

    /// Wrap a value that is already scaled.
    pub const fn from_raw(raw: U256) -> Self {
        Self {
            raw,
            scale: PhantomData,
        }
    }

    pub const fn raw(self) -> U256 {
        self.raw
    }

    /// `10^DECIMALS`, the raw representation of 1.0.
    pub fn unit() -> U256 {
        U256::from(10u64).pow(U256::from(S::DECIMALS))
    }

    /// `numerator * 10^DECIMALS / denominator`, multiplying before dividing.
    pub fn ratio(numerator: U256, denominator: U256) -> Result<Self, FixedPointError> {
        if denominator.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let scaled = numerator
            .checked_mul(Self::unit())
            .ok_or(FixedPointError::Overflow)?;
        Ok(Self::from_raw(scaled / denominator))
    }

    /// Parse a human-readable decimal such as `"1.1"` into raw units.
    pub fn parse_units(value: &str) -> Result<Self, FixedPointError> {
        let value = value.trim();
        let (whole, fraction) = match value.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (value, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(FixedPointError::InvalidNumber(value.to_string()));
        }
        if fraction.len() > S::DECIMALS as usize {
            return Err(FixedPointError::TooManyDecimals {
                digits: fraction.len(),
                max: S::DECIMALS,
            });
        }
        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if !digits_only(whole) || !digits_only(fraction) {
            return Err(FixedPointError::InvalidNumber(value.to_string()));
        }

        let padded = format!(
            "{}{}{}",
            if whole.is_empty() { "0" } else { whole },
            fraction,
            "0".repeat(S::DECIMALS as usize - fraction.len())
        );
        U256::from_str_radix(&padded, 10)
            .map(Self::from_raw)
            .map_err(|_| FixedPointError::InvalidNumber(value.to_string()))
    }

    /// Human-readable value for alert messages.
    pub fn to_decimal(self) -> BigDecimal {
        BigDecimal::from_str(&format!("{}e-{}", self.raw, S::DECIMALS))
            .map(|d| d.normalized())
            .unwrap_or_default()
    }
}

impl<S: Scale> Default for Fixed<S> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<S: Scale> From<U256> for Fixed<S> {
    fn from(raw: U256) -> Self {
        Self::from_raw(raw)
    }
}

impl<S: Scale> From<u64> for Fixed<S> {
    fn from(raw: u64) -> Self {
        Self::from_raw(U256::from(raw))
    }
}

/// Parses the raw integer, decimal or `0x`-prefixed hex.
impl<S: Scale> FromStr for Fixed<S> {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(s, 10),
        };
        parsed
            .map(Self::from_raw)
            .map_err(|_| FixedPointError::InvalidNumber(s.to_string()))
    }
}

impl<S: Scale> fmt::Display for Fixed<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<S: Scale> fmt::Debug for Fixed<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed<{}>({})", S::DECIMALS, self.raw)
    }
}

impl<S: Scale> Serialize for Fixed<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.serialize_str(&self.raw.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRepr {
    Text(String),
    Number(u64),
}

impl<'de, S: Scale> Deserialize<'de> for Fixed<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawRepr::deserialize(deserializer)? {
            RawRepr::Text(text) => text.parse().map_err(serde::de::Error::custom),
            RawRepr::Number(n) => Ok(Self::from(n)),
        }
    }
}
