//! Numeric comparisons such as `">= 10"` or `"< 2.5"`.
//!
//! Used for lifetime filters, station time remaining, aggregate aspects
//! and memory counters.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Comparison operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompareOp {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `==` (also written `=` or with no operator)
    Equal,
    /// `!=`
    NotEqual,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Less => "<",
            Self::LessOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
        }
    }
}

/// A comparison against a fixed threshold.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Comparison {
    /// Operator.
    pub op: CompareOp,
    /// Right-hand side.
    pub value: f64,
}

impl Comparison {
    /// Creates a comparison.
    #[must_use]
    pub const fn new(op: CompareOp, value: f64) -> Self {
        Self { op, value }
    }

    /// `>= value`
    #[must_use]
    pub const fn at_least(value: f64) -> Self {
        Self::new(CompareOp::GreaterOrEqual, value)
    }

    /// `< value`
    #[must_use]
    pub const fn less_than(value: f64) -> Self {
        Self::new(CompareOp::Less, value)
    }

    /// Tests a value against the threshold.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, actual: f64) -> bool {
        match self.op {
            CompareOp::Less => actual < self.value,
            CompareOp::LessOrEqual => actual <= self.value,
            CompareOp::Equal => actual == self.value,
            CompareOp::NotEqual => actual != self.value,
            CompareOp::GreaterOrEqual => actual >= self.value,
            CompareOp::Greater => actual > self.value,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op.symbol(), self.value)
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Two-character operators first so that "<=" is not read as "<".
        let (op, rest) = [
            ("<=", CompareOp::LessOrEqual),
            (">=", CompareOp::GreaterOrEqual),
            ("==", CompareOp::Equal),
            ("!=", CompareOp::NotEqual),
            ("<", CompareOp::Less),
            (">", CompareOp::Greater),
            ("=", CompareOp::Equal),
        ]
        .iter()
        .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (*op, rest)))
        .unwrap_or((CompareOp::Equal, s));

        let value = rest
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::configuration(format!("invalid comparison: {s:?}")))?;
        if !value.is_finite() {
            return Err(Error::configuration(format!(
                "comparison threshold must be finite: {s:?}"
            )));
        }
        Ok(Self { op, value })
    }
}
