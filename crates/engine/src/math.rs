//! Three-scale fixed-point arithmetic.
//!
//! WAD (1e18) carries token amounts and debt shares, RAY (1e27) carries
//! rates and prices, RAD (1e45 = WAD × RAY) carries absolute debt value.
//! Each scale is a distinct newtype; the scales never mix through implicit
//! casts. Cross-scale products go through `U256`, which makes a WAD × RAY
//! multiplication exact — rounding only ever happens on division, and every
//! dividing conversion states its direction in its name. The convention is
//! to round in the protocol's favor: down when crediting a user, up when
//! debiting one.

use core::fmt;
use core::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{LedgerError, Result};

/// One WAD: 18 decimal places.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// One RAY: 27 decimal places.
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Basis-point denominator shared by every fee and factor parameter.
pub const BPS: u64 = 10_000;

#[inline]
fn u256(x: u128) -> U256 {
    U256::from(x)
}

#[inline]
fn to_u128(x: U256) -> Result<u128> {
    if x.bits() > 128 {
        Err(LedgerError::Overflow)
    } else {
        Ok(x.as_u128())
    }
}

/// One RAD as a `U256` (1e45 does not fit in u128).
#[inline]
pub fn rad_unit() -> U256 {
    u256(WAD) * u256(RAY)
}

// ============================================================================
// WAD
// ============================================================================

/// Token amount or debt share, 18 decimals.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wad(pub u128);

impl Wad {
    pub const ZERO: Wad = Wad(0);
    pub const ONE: Wad = Wad(WAD);

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Wad) -> Result<Wad> {
        self.0
            .checked_add(other.0)
            .map(Wad)
            .ok_or(LedgerError::Overflow)
    }

    /// Subtraction; underflow means taking more than is there.
    pub fn checked_sub(self, other: Wad) -> Result<Wad> {
        self.0
            .checked_sub(other.0)
            .map(Wad)
            .ok_or(LedgerError::InsufficientBalance)
    }

    /// Apply a signed WAD delta.
    pub fn checked_add_signed(self, delta: i128) -> Result<Wad> {
        if delta >= 0 {
            self.0
                .checked_add(delta as u128)
                .map(Wad)
                .ok_or(LedgerError::Overflow)
        } else {
            self.0
                .checked_sub(delta.unsigned_abs())
                .map(Wad)
                .ok_or(LedgerError::InsufficientBalance)
        }
    }

    /// Exact WAD × RAY product. A u128 × u128 product always fits in `U256`.
    #[inline]
    pub fn ray_value(self, rate: Ray) -> Rad {
        Rad(u256(self.0) * u256(rate.0))
    }

    /// `self × bps / 10_000`, rounding down.
    pub fn scale_bps_floor(self, bps: u64) -> Result<Wad> {
        to_u128(u256(self.0) * u256(bps as u128) / u256(BPS as u128)).map(Wad)
    }

    /// `self × 10_000 / bps`, rounding down. `bps` must be nonzero.
    pub fn unscale_bps_floor(self, bps: u64) -> Result<Wad> {
        if bps == 0 {
            return Err(LedgerError::Overflow); // division by zero
        }
        to_u128(u256(self.0) * u256(BPS as u128) / u256(bps as u128)).map(Wad)
    }

    #[inline]
    pub fn min(self, other: Wad) -> Wad {
        if self <= other {
            self
        } else {
            other
        }
    }
}

// ============================================================================
// RAY
// ============================================================================

/// Rate or price, 27 decimals.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Ray(pub u128);

impl Ray {
    pub const ZERO: Ray = Ray(0);
    pub const ONE: Ray = Ray(RAY);

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Ray) -> Result<Ray> {
        self.0
            .checked_add(other.0)
            .map(Ray)
            .ok_or(LedgerError::Overflow)
    }

    pub fn checked_sub(self, other: Ray) -> Result<Ray> {
        self.0
            .checked_sub(other.0)
            .map(Ray)
            .ok_or(LedgerError::Overflow)
    }

    /// `self × other / RAY`, rounding down.
    pub fn rmul_floor(self, other: Ray) -> Result<Ray> {
        to_u128(u256(self.0) * u256(other.0) / u256(RAY)).map(Ray)
    }

    /// Fixed-point exponentiation by squaring, rounding half-up at each
    /// step. `rpow(0) == 1.0 RAY`; used to compound per-second rates over
    /// elapsed time.
    pub fn rpow(self, mut n: u64) -> Result<Ray> {
        let ray = u256(RAY);
        let half = ray / 2;

        let rmul_half_up = |a: U256, b: U256| -> Result<U256> {
            let product = a.checked_mul(b).ok_or(LedgerError::Overflow)?;
            let rounded = product.checked_add(half).ok_or(LedgerError::Overflow)?;
            Ok(rounded / ray)
        };

        let mut x = u256(self.0);
        let mut z = if n % 2 != 0 { x } else { ray };
        n /= 2;
        while n != 0 {
            x = rmul_half_up(x, x)?;
            if n % 2 != 0 {
                z = rmul_half_up(z, x)?;
            }
            n /= 2;
        }
        to_u128(z).map(Ray)
    }
}

// ============================================================================
// RAD
// ============================================================================

/// Absolute debt or collateral value, 45 decimals (WAD × RAY).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Rad(pub U256);

impl Rad {
    #[inline]
    pub fn zero() -> Rad {
        Rad(U256::zero())
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Rad) -> Result<Rad> {
        self.0
            .checked_add(other.0)
            .map(Rad)
            .ok_or(LedgerError::Overflow)
    }

    pub fn checked_sub(self, other: Rad) -> Result<Rad> {
        self.0
            .checked_sub(other.0)
            .map(Rad)
            .ok_or(LedgerError::InsufficientBalance)
    }

    #[inline]
    pub fn saturating_sub(self, other: Rad) -> Rad {
        Rad(self.0.saturating_sub(other.0))
    }

    /// RAD ÷ RAY → WAD, rounding down (the credit direction).
    pub fn div_ray_floor(self, rate: Ray) -> Result<Wad> {
        if rate.is_zero() {
            return Err(LedgerError::Overflow); // division by zero
        }
        to_u128(self.0 / u256(rate.0)).map(Wad)
    }

    /// RAD ÷ RAY → WAD, rounding up (the debit direction).
    pub fn div_ray_ceil(self, rate: Ray) -> Result<Wad> {
        if rate.is_zero() {
            return Err(LedgerError::Overflow); // division by zero
        }
        let denom = u256(rate.0);
        let bumped = self
            .0
            .checked_add(denom - U256::one())
            .ok_or(LedgerError::Overflow)?;
        to_u128(bumped / denom).map(Wad)
    }

    /// `self × bps / 10_000`, rounding down.
    pub fn scale_bps_floor(self, bps: u64) -> Result<Rad> {
        let scaled = self
            .0
            .checked_mul(u256(bps as u128))
            .ok_or(LedgerError::Overflow)?;
        Ok(Rad(scaled / u256(BPS as u128)))
    }

    /// `self × 10_000 / bps`, rounding down. `bps` must be nonzero.
    pub fn unscale_bps_floor(self, bps: u64) -> Result<Rad> {
        if bps == 0 {
            return Err(LedgerError::Overflow); // division by zero
        }
        let scaled = self
            .0
            .checked_mul(u256(BPS as u128))
            .ok_or(LedgerError::Overflow)?;
        Ok(Rad(scaled / u256(bps as u128)))
    }
}

// ============================================================================
// Decimal literals: Display and FromStr
// ============================================================================

/// Failure to parse a decimal fixed-point literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid fixed-point literal: {0}")]
pub struct ParseFixedError(pub &'static str);

fn split_decimal(s: &str, decimals: usize) -> core::result::Result<(&str, String), ParseFixedError> {
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ParseFixedError("empty literal"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseFixedError("non-digit character"));
    }
    if frac_part.len() > decimals {
        return Err(ParseFixedError("too many decimal places"));
    }
    let mut frac = String::from(frac_part);
    while frac.len() < decimals {
        frac.push('0');
    }
    Ok((int_part, frac))
}

fn parse_fixed_u128(s: &str, unit: u128, decimals: usize) -> core::result::Result<u128, ParseFixedError> {
    let (int_part, frac) = split_decimal(s, decimals)?;
    let int: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| ParseFixedError("overflow"))?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| ParseFixedError("overflow"))?
    };
    int.checked_mul(unit)
        .and_then(|v| v.checked_add(frac))
        .ok_or(ParseFixedError("overflow"))
}

fn fmt_fixed_u128(f: &mut fmt::Formatter<'_>, value: u128, unit: u128, decimals: usize) -> fmt::Result {
    let int = value / unit;
    let frac = value % unit;
    if frac == 0 {
        write!(f, "{int}")
    } else {
        let frac = format!("{frac:0width$}", width = decimals);
        write!(f, "{}.{}", int, frac.trim_end_matches('0'))
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed_u128(f, self.0, WAD, 18)
    }
}

impl FromStr for Wad {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        parse_fixed_u128(s, WAD, 18).map(Wad)
    }
}

impl fmt::Display for Ray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed_u128(f, self.0, RAY, 27)
    }
}

impl FromStr for Ray {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        parse_fixed_u128(s, RAY, 27).map(Ray)
    }
}

impl fmt::Display for Rad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = rad_unit();
        let int = self.0 / unit;
        let frac = self.0 % unit;
        if frac.is_zero() {
            write!(f, "{int}")
        } else {
            let frac = format!("{:0>45}", frac.to_string());
            write!(f, "{}.{}", int, frac.trim_end_matches('0'))
        }
    }
}

impl FromStr for Rad {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let (int_part, frac) = split_decimal(s, 45)?;
        let int = U256::from_dec_str(if int_part.is_empty() { "0" } else { int_part })
            .map_err(|_| ParseFixedError("overflow"))?;
        let frac = U256::from_dec_str(&frac).map_err(|_| ParseFixedError("overflow"))?;
        int.checked_mul(rad_unit())
            .and_then(|v| v.checked_add(frac))
            .map(Rad)
            .ok_or(ParseFixedError("overflow"))
    }
}


// ============================================================================
// Kani proofs
// ============================================================================

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Ceil and floor conversions bracket the true quotient and differ by at
    /// most one WAD unit.
    #[kani::proof]
    #[kani::unwind(3)]
    fn rounding_pair_bounds() {
        let value: u128 = kani::any();
        let rate: u128 = kani::any();
        kani::assume(rate > 0);

        let floor = Rad(U256::from(value)).div_ray_floor(Ray(rate)).unwrap();
        let ceil = Rad(U256::from(value)).div_ray_ceil(Ray(rate)).unwrap();

        assert!(ceil.0 >= floor.0);
        assert!(ceil.0 - floor.0 <= 1);
        if value % rate == 0 {
            assert!(ceil.0 == floor.0);
        }
    }

    /// A WAD × RAY product divided back by the rate recovers the share
    /// exactly (the product itself never rounds).
    #[kani::proof]
    #[kani::unwind(3)]
    fn product_division_round_trip() {
        let share: u128 = kani::any();
        let rate: u128 = kani::any();
        kani::assume(rate > 0);

        let value = Wad(share).ray_value(Ray(rate));
        assert!(value.div_ray_floor(Ray(rate)).unwrap().0 == share);
    }

    /// Scaling by at most 10_000 bps never increases a WAD amount.
    #[kani::proof]
    #[kani::unwind(3)]
    fn bps_scale_is_contractive() {
        let amount: u128 = kani::any();
        let bps: u64 = kani::any();
        kani::assume(bps <= BPS);

        let scaled = Wad(amount).scale_bps_floor(bps).unwrap();
        assert!(scaled.0 <= amount);
    }
}
