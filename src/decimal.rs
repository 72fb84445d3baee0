//! Scaled-integer decimal values for threshold comparison.
//!
//! `cls` samples and rule thresholds arrive as decimal strings. Comparing
//! them through `f64` would let repeated evaluations of the same sample
//! drift across the breach boundary, so values are held as integers scaled
//! by 10^6 and every comparison is integer arithmetic.

use std::fmt;
use std::str::FromStr;

/// Number of fractional digits preserved.
pub const FRAC_DIGITS: u32 = 6;
const SCALE: i64 = 1_000_000;

/// A non-negative decimal value with six fractional digits, stored as a
/// scaled integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Decimal(i64);

impl Decimal {
    pub const ZERO: Decimal = Decimal(0);

    pub fn from_int(v: i64) -> Option<Decimal> {
        if v < 0 {
            return None;
        }
        v.checked_mul(SCALE).map(Decimal)
    }

    /// Raw scaled representation, mainly for tests.
    pub fn raw(self) -> i64 {
        self.0
    }

    /// True when `self` exceeds `threshold` by at least `percent` percent
    /// of the threshold. Exact: computed in i128, no rounding.
    pub fn overshoots_by_percent(self, threshold: Decimal, percent: u32) -> bool {
        let lhs = (self.0 as i128 - threshold.0 as i128) * 100;
        let rhs = threshold.0 as i128 * percent as i128;
        lhs >= rhs
    }

    /// True when `self` falls short of `threshold` by at least `percent`
    /// percent of the threshold.
    pub fn undershoots_by_percent(self, threshold: Decimal, percent: u32) -> bool {
        let lhs = (threshold.0 as i128 - self.0 as i128) * 100;
        let rhs = threshold.0 as i128 * percent as i128;
        lhs >= rhs
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecimalParseError {
    #[error("empty decimal string")]
    Empty,
    #[error("negative values are not allowed")]
    Negative,
    #[error("invalid decimal string: {0:?}")]
    Malformed(String),
    #[error("too many fractional digits (max {FRAC_DIGITS})")]
    TooPrecise,
    #[error("decimal value out of range")]
    OutOfRange,
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecimalParseError::Empty);
        }
        if s.starts_with('-') {
            return Err(DecimalParseError::Negative);
        }
        let s = s.strip_prefix('+').unwrap_or(s);

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DecimalParseError::Malformed(s.to_string()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(DecimalParseError::Malformed(s.to_string()));
        }
        if frac_part.len() > FRAC_DIGITS as usize {
            return Err(DecimalParseError::TooPrecise);
        }

        let int_value: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| DecimalParseError::OutOfRange)?
        };

        let mut frac_value: i64 = 0;
        if !frac_part.is_empty() {
            frac_value = frac_part
                .parse()
                .map_err(|_| DecimalParseError::OutOfRange)?;
            for _ in 0..(FRAC_DIGITS as usize - frac_part.len()) {
                frac_value *= 10;
            }
        }

        int_value
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .map(Decimal)
            .ok_or(DecimalParseError::OutOfRange)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int_part = self.0 / SCALE;
        let frac_part = self.0 % SCALE;
        if frac_part == 0 {
            return write!(f, "{}", int_part);
        }
        let frac = format!("{:06}", frac_part);
        write!(f, "{}.{}", int_part, frac.trim_end_matches('0'))
    }
}
