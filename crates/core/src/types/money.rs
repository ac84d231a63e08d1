//! Type-safe money representation using decimal arithmetic.
//!
//! Prices are never floats. Amounts are `rust_decimal::Decimal` in the
//! currency's standard unit (dollars, not cents) and are rounded to two
//! decimal places, midpoint away from zero, whenever they are displayed or
//! persisted.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from money arithmetic and parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Two amounts in different currencies were combined.
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(CurrencyCode, CurrencyCode),
    /// Unknown ISO 4217 code.
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
    /// Arithmetic overflowed `Decimal`.
    #[error("amount overflow")]
    Overflow,
}

/// An amount of money in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Unit price multiplied by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the product does not fit in a `Decimal`.
    pub fn times(&self, quantity: u32) -> Result<Self, MoneyError> {
        let amount = self
            .amount
            .checked_mul(Decimal::from(quantity))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency))
    }

    /// Add two amounts of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` if the currencies differ, or
    /// `MoneyError::Overflow` if the sum does not fit.
    pub fn checked_add(&self, other: &Self) -> Result<Self, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency, other.currency));
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency))
    }

    /// Sum a sequence of amounts, starting from zero in `currency`.
    ///
    /// # Errors
    ///
    /// Fails on the first currency mismatch or overflow.
    pub fn sum<'a, I>(currency: CurrencyCode, amounts: I) -> Result<Self, MoneyError>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        amounts
            .into_iter()
            .try_fold(Self::zero(currency), |acc, m| acc.checked_add(m))
    }

    /// The amount rounded to cents.
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self::new(
            self.amount
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            self.currency,
        )
    }

    /// Format for display, e.g. `$19.99` or `-€5.00`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.rounded().amount;
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        format!("{sign}{}{:.2}", self.currency.symbol(), rounded.abs())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            other => Err(MoneyError::UnsupportedCurrency(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(s: &str) -> Money {
        Money::new(s.parse().unwrap(), CurrencyCode::USD)
    }

    #[test]
    fn test_times_multiplies_amount() {
        assert_eq!(usd("4.25").times(3).unwrap(), usd("12.75"));
        assert_eq!(usd("4.25").times(0).unwrap(), usd("0"));
    }

    #[test]
    fn test_checked_add_rejects_mixed_currencies() {
        let eur = Money::new(Decimal::ONE, CurrencyCode::EUR);
        assert_eq!(
            usd("1").checked_add(&eur),
            Err(MoneyError::CurrencyMismatch(
                CurrencyCode::USD,
                CurrencyCode::EUR
            ))
        );
    }

    #[test]
    fn test_sum() {
        let items = [usd("1.10"), usd("2.20"), usd("3.30")];
        assert_eq!(
            Money::sum(CurrencyCode::USD, &items).unwrap(),
            usd("6.60")
        );
        assert!(Money::sum(CurrencyCode::USD, &Vec::<Money>::new()).unwrap().is_zero());
    }

    #[test]
    fn test_display_rounds_midpoint_away_from_zero() {
        assert_eq!(usd("19.99").display(), "$19.99");
        assert_eq!(usd("0.125").display(), "$0.13");
        assert_eq!(usd("5").display(), "$5.00");
        assert_eq!(usd("-2.5").display(), "-$2.50");
        assert_eq!(
            Money::new("3.4".parse().unwrap(), CurrencyCode::GBP).display(),
            "£3.40"
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::USD);
        assert_eq!(" EUR ".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let json = serde_json::to_value(usd("9.50")).unwrap();
        assert_eq!(json["amount"], "9.50");
        assert_eq!(json["currency"], "USD");
    }
}
