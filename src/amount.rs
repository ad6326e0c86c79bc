use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed-point money amount with 2 decimal places, stored as integer minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    /// `None` for NaN, infinities and values outside the representable range.
    pub fn from_float(value: f64) -> Option<Self> {
        let minor = (value * Self::SCALE as f64).round();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if !minor.is_finite() || minor < i64::MIN as f64 || minor >= i64::MAX as f64 {
            return None;
        }
        Some(Amount(minor as i64))
    }

    pub fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    /// Saturates at the representable range.
    pub fn from_whole(value: i64) -> Self {
        Amount(value.saturating_mul(Self::SCALE))
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Rupee formatting for user-facing text, e.g. `₹30` or `₹12.50`.
    pub fn display_rupees(self) -> String {
        if self.0 % Self::SCALE == 0 {
            format!("₹{}", self.0 / Self::SCALE)
        } else {
            format!("₹{self}")
        }
    }
}

/// Parse a free-text entry fee the way tournaments have always been entered:
/// every non-digit character is dropped and the remaining digits are whole
/// rupees. `"₹10"` is 10, `"Free"` and `""` are 0.
///
/// Fees are parsed once when a tournament is created; after that only the
/// structured [`Amount`] is used.
pub fn parse_entry_fee(text: &str) -> Amount {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<i64>()
        .ok()
        .and_then(|whole| whole.checked_mul(Amount::SCALE))
        .map(Amount)
        .unwrap_or(Amount::ZERO)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        let whole = abs / Self::SCALE;
        let frac = abs % Self::SCALE;
        write!(f, "{sign}{whole}.{frac:02}")
    }
}

impl std::ops::Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_float_converts_correctly() {
        assert_eq!(Amount::from_float(100.0), Some(Amount::from_minor(10_000)));
        assert_eq!(Amount::from_float(1.5), Some(Amount::from_minor(150)));
        assert_eq!(Amount::from_float(0.01), Some(Amount::from_minor(1)));
    }

    #[test]
    fn from_float_rounds_correctly() {
        assert_eq!(Amount::from_float(1.234), Some(Amount::from_minor(123)));
        assert_eq!(Amount::from_float(1.236), Some(Amount::from_minor(124)));
    }

    #[test]
    fn from_float_rejects_unrepresentable_values() {
        assert_eq!(Amount::from_float(f64::INFINITY), None);
        assert_eq!(Amount::from_float(f64::NEG_INFINITY), None);
        assert_eq!(Amount::from_float(f64::NAN), None);
        assert_eq!(Amount::from_float(1e17), None);
        assert!(Amount::from_float(1e15).is_some());
    }

    #[test]
    fn checked_arithmetic_stops_at_the_edges() {
        let max = Amount::from_minor(i64::MAX);
        assert_eq!(max.checked_add(Amount::from_minor(1)), None);
        assert_eq!(
            Amount::from_minor(i64::MIN).checked_sub(Amount::from_minor(1)),
            None
        );
        assert_eq!(
            Amount::from_whole(2).checked_add(Amount::from_whole(3)),
            Some(Amount::from_whole(5))
        );
        assert_eq!(Amount::from_whole(i64::MAX), max);
    }

    #[test]
    fn display_formats() {
        assert_eq!(Amount::from_whole(100).to_string(), "100.00");
        assert_eq!(Amount::from_minor(150).to_string(), "1.50");
        assert_eq!(Amount::from_minor(-5).to_string(), "-0.05");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
    }

    #[test]
    fn display_rupees_drops_zero_fraction() {
        assert_eq!(Amount::from_whole(30).display_rupees(), "₹30");
        assert_eq!(Amount::from_minor(1250).display_rupees(), "₹12.50");
    }

    #[test]
    fn entry_fee_keeps_only_digits() {
        assert_eq!(parse_entry_fee("₹10"), Amount::from_whole(10));
        assert_eq!(parse_entry_fee("Rs. 250 per team"), Amount::from_whole(250));
        assert_eq!(parse_entry_fee(" 0 "), Amount::ZERO);
    }

    #[test]
    fn entry_fee_without_digits_is_free() {
        assert_eq!(parse_entry_fee("Free"), Amount::ZERO);
        assert_eq!(parse_entry_fee(""), Amount::ZERO);
    }

    #[test]
    fn entry_fee_overflow_is_free() {
        assert_eq!(parse_entry_fee("99999999999999999999999"), Amount::ZERO);
    }

    #[test]
    fn arithmetic() {
        let mut a = Amount::from_whole(50);
        a -= Amount::from_whole(30);
        assert_eq!(a, Amount::from_whole(20));
        a += Amount::from_whole(5);
        assert_eq!(a + a, Amount::from_whole(50));
        assert_eq!(a - Amount::from_whole(25), Amount::ZERO);
        let total: Amount = [Amount::from_whole(1), Amount::from_whole(2)].into_iter().sum();
        assert_eq!(total, Amount::from_whole(3));
    }

    #[test]
    fn ordering() {
        assert!(Amount::from_whole(20) < Amount::from_whole(30));
        assert!(Amount::from_minor(-1) < Amount::ZERO);
    }
}
