/// PM Simulator Kernel v1: Arithmetic Primitives
///
/// Currency values are plain i64 (one unit = 10k yen in the default scenario).
/// Month values are i64 fixed-point (SCALE = 10_000) so that fractional
/// schedule impacts such as 0.3 months accumulate without float drift.
///
/// Counters saturate instead of overflowing: the reducer normalizes input,
/// it never rejects it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-point scale factor. A month value is stored as `real * SCALE`.
pub const SCALE: i64 = 10_000;

/// Lowest stakeholder satisfaction level.
pub const SATISFACTION_MIN: i32 = 1;
/// Highest stakeholder satisfaction level.
pub const SATISFACTION_MAX: i32 = 5;

/// Saturating addition for currency and counters.
pub fn saturating_add(a: i64, b: i64) -> i64 {
    a.saturating_add(b)
}

/// Clamp a satisfaction value into `[1, 5]`.
pub fn clamp_satisfaction(value: i32) -> i32 {
    value.clamp(SATISFACTION_MIN, SATISFACTION_MAX)
}

/// Round half toward positive infinity (`floor(x + 0.5)`).
///
/// All score rounding goes through here so that `x.5` boundaries behave
/// identically for negative intermediate values.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// Clamp a rounded score into `[0, 100]`.
pub fn clamp_score(value: i64) -> u32 {
    value.clamp(0, 100) as u32
}

/// A month quantity in fixed-point representation.
///
/// Serialized as a plain JSON number (e.g. `0.3`), stored as `3000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Months(i64);

impl Months {
    pub const ZERO: Months = Months(0);

    /// Construct from an already-scaled fixed-point value.
    pub const fn from_raw(raw: i64) -> Self {
        Months(raw)
    }

    /// Construct from a whole number of months.
    pub const fn whole(months: i64) -> Self {
        Months(months * SCALE)
    }

    /// Construct from tenths of a month (`3` → 0.3 months).
    pub const fn tenths(tenths: i64) -> Self {
        Months(tenths * (SCALE / 10))
    }

    /// Convert a real month count, rounding to the nearest fixed-point step.
    pub fn from_f64(months: f64) -> Self {
        Months((months * SCALE as f64).round() as i64)
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE as f64
    }

    pub fn saturating_add(self, other: Months) -> Months {
        Months(self.0.saturating_add(other.0))
    }

    /// `max(0, self - other)`.
    pub fn excess_over(self, other: Months) -> Months {
        Months(self.0.saturating_sub(other.0).max(0))
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Months {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.as_f64())
    }
}

impl Serialize for Months {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 % SCALE == 0 {
            serializer.serialize_i64(self.0 / SCALE)
        } else {
            serializer.serialize_f64(self.as_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Months {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(serde::de::Error::custom("month value must be finite"));
        }
        Ok(Months::from_f64(value))
    }
}

/// Validate that an identifier matches `[a-zA-Z0-9_-]+`.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}
