//! Monetary amounts in minor currency units.
//!
//! The payment provider reports every amount as an integer count of the
//! smallest currency unit (pence for GBP). Amounts stay in that form
//! end to end; conversion to a decimal string happens only at the display
//! boundary.

use serde::{Deserialize, Serialize};

/// An amount in minor currency units (e.g. 7500 = £75.00).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    /// Wrap a raw minor-unit amount.
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Get the raw minor-unit amount.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Format as a two-decimal major-unit string (e.g. `7500` → `"75.00"`).
    ///
    /// Matches the provider's dashboard formatting for two-decimal
    /// currencies. Negative amounts (refunds) keep their sign.
    #[must_use]
    pub fn display_major(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for MinorUnits {
    fn from(amount: i64) -> Self {
        Self(amount)
    }
}

impl From<MinorUnits> for i64 {
    fn from(amount: MinorUnits) -> Self {
        amount.0
    }
}

impl core::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.display_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_major() {
        assert_eq!(MinorUnits::new(7500).display_major(), "75.00");
        assert_eq!(MinorUnits::new(600).display_major(), "6.00");
        assert_eq!(MinorUnits::new(5).display_major(), "0.05");
        assert_eq!(MinorUnits::new(0).display_major(), "0.00");
    }

    #[test]
    fn test_display_major_negative() {
        assert_eq!(MinorUnits::new(-2500).display_major(), "-25.00");
    }
}
