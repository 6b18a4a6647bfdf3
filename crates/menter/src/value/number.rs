//! Arbitrary-precision decimal numbers

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

/// Significant digits kept by division and non-integral powers.
pub const DIVISION_PRECISION: u64 = 34;

/// Largest integral exponent computed exactly by repeated squaring.
const MAX_EXACT_EXPONENT: i64 = 100_000;

/// Number value of the language.
///
/// Wraps a [`BigDecimal`], so `0.1 + 0.2 == 0.3` holds and integers keep
/// every digit. Equality and ordering compare numeric value, ignoring scale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(BigDecimal);

impl Number {
    /// The number zero
    pub fn zero() -> Self {
        Number(BigDecimal::zero())
    }

    /// Parse a decimal literal such as `12`, `3.5` or `1e3`.
    pub fn parse(text: &str) -> Option<Self> {
        BigDecimal::from_str(text).ok().map(Number)
    }

    /// Convert from a float through its shortest decimal form.
    ///
    /// Returns `None` for NaN and infinities.
    pub fn from_f64(n: f64) -> Option<Self> {
        if !n.is_finite() {
            return None;
        }
        Self::parse(&n.to_string()).or_else(|| BigDecimal::from_f64(n).map(Number))
    }

    /// Underlying decimal
    pub fn as_decimal(&self) -> &BigDecimal {
        &self.0
    }

    /// Nearest float, for hosts that want one
    pub fn to_f64(&self) -> Option<f64> {
        self.0.to_f64().filter(|n| n.is_finite())
    }

    /// Integral value, if this number is an integer that fits
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.0.to_i64()
        } else {
            None
        }
    }

    /// Non-negative integral value, if it fits a `usize`
    pub fn to_index(&self) -> Option<usize> {
        if self.is_integer() && !self.is_negative() {
            self.0.to_usize()
        } else {
            None
        }
    }

    /// Whether this number is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether this number has no fractional part
    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// Whether this number is below zero
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Quotient, or `None` when dividing by zero
    pub fn checked_div(&self, rhs: &Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        Some(Number((&self.0 / &rhs.0).with_prec(DIVISION_PRECISION).normalized()))
    }

    /// Remainder with the sign of the dividend, or `None` for a zero divisor
    pub fn checked_rem(&self, rhs: &Number) -> Option<Number> {
        if rhs.is_zero() {
            return None;
        }
        Some(Number(&self.0 % &rhs.0))
    }

    /// `self ^ exponent`.
    ///
    /// Integral exponents are exact (negative ones divide). Other exponents
    /// go through `f64` and return `None` when the result is not finite.
    pub fn pow(&self, exponent: &Number) -> Option<Number> {
        match exponent.to_i64() {
            Some(e) if e.abs() <= MAX_EXACT_EXPONENT => {
                let magnitude = Number(integer_pow(&self.0, e.unsigned_abs()));
                if e < 0 {
                    Number(BigDecimal::one()).checked_div(&magnitude)
                } else {
                    Some(magnitude)
                }
            }
            _ => {
                let result = self.to_f64()?.powf(exponent.to_f64()?);
                Number::from_f64(result)
            }
        }
    }

    /// Square root, or `None` for negative numbers
    pub fn sqrt(&self) -> Option<Number> {
        self.0
            .sqrt()
            .map(|root| Number(root.with_prec(DIVISION_PRECISION).normalized()))
    }

    /// Absolute value
    pub fn abs(&self) -> Number {
        Number(self.0.abs())
    }

    /// Largest integer not above this number
    pub fn floor(&self) -> Number {
        if self.is_integer() {
            return self.clone();
        }
        let truncated = self.0.with_scale(0);
        if self.is_negative() {
            Number(truncated - BigDecimal::one())
        } else {
            Number(truncated)
        }
    }

    /// Nearest integer, halves rounding up
    pub fn round(&self) -> Number {
        let half = BigDecimal::new(5.into(), 1);
        Number(&self.0 + &half).floor()
    }

    /// Numeric ordering
    pub fn compare(&self, other: &Number) -> Ordering {
        self.0.cmp(&other.0)
    }
}

fn integer_pow(base: &BigDecimal, mut exponent: u64) -> BigDecimal {
    let mut result = BigDecimal::one();
    let mut square = base.clone();
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = &result * &square;
        }
        exponent >>= 1;
        if exponent > 0 {
            square = &square * &square;
        }
    }
    result
}

// ═══════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════

impl Add for &Number {
    type Output = Number;

    fn add(self, rhs: &Number) -> Number {
        Number(&self.0 + &rhs.0)
    }
}

impl Sub for &Number {
    type Output = Number;

    fn sub(self, rhs: &Number) -> Number {
        Number(&self.0 - &rhs.0)
    }
}

impl Mul for &Number {
    type Output = Number;

    fn mul(self, rhs: &Number) -> Number {
        Number(&self.0 * &rhs.0)
    }
}

impl Neg for &Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number(-self.0.clone())
    }
}

// ═══════════════════════════════════════════════════════════════════
// Conversions
// ═══════════════════════════════════════════════════════════════════

impl From<BigDecimal> for Number {
    fn from(n: BigDecimal) -> Self {
        Number(n)
    }
}

impl From<i32> for Number {
    fn from(n: i32) -> Self {
        Number(BigDecimal::from(n))
    }
}

impl From<i64> for Number {
    fn from(n: i64) -> Self {
        Number(BigDecimal::from(n))
    }
}

impl From<usize> for Number {
    fn from(n: usize) -> Self {
        Number(BigDecimal::from(n as u64))
    }
}

impl FromStr for Number {
    type Err = bigdecimal::ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigDecimal::from_str(s).map(Number)
    }
}

/// Integers print without a fraction, other values without trailing zeros.
impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.0.with_scale(0))
        } else {
            write!(f, "{}", self.0.normalized())
        }
    }
}
