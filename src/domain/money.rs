use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::error::DomainError;

/// Three-letter currency code (ISO 4217 style), stored upper-cased
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Currency([u8; 3]);

impl Currency {
    pub const USD: Currency = Currency(*b"USD");
    pub const EUR: Currency = Currency(*b"EUR");
    pub const GBP: Currency = Currency(*b"GBP");

    /// Parse a currency code such as `"USD"` (case-insensitive, surrounding whitespace ignored)
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let trimmed = code.trim();
        let bytes = trimmed.as_bytes();

        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(DomainError::InvalidCurrency(code.to_string()));
        }

        Ok(Self([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{}", byte as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self)
    }
}

/// Immutable monetary value: an exact decimal amount tagged with its currency
///
/// Arithmetic never mixes currencies and never rounds; every operation
/// returns a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Whole units, e.g. `Money::from_major(1000, Currency::USD)` is 1000 USD
    pub fn from_major(units: i64, currency: Currency) -> Self {
        Self::new(Decimal::from(units), currency)
    }

    /// Parse from decimal and currency strings (e.g. `"10.50"`, `"EUR"`)
    pub fn parse(amount: &str, currency: &str) -> Result<Self, DomainError> {
        let currency = Currency::new(currency)?;
        let value = Decimal::from_str(amount.trim())
            .map_err(|_| DomainError::InvalidAmount(amount.to_string()))?;

        Ok(Self::new(value, currency))
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Fail with `CurrencyMismatch` unless `other` shares this value's currency
    pub fn ensure_same_currency(&self, other: &Money) -> Result<(), DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(())
    }

    pub fn add(&self, addend: &Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(addend)?;
        let amount = self
            .amount
            .checked_add(addend.amount)
            .ok_or(DomainError::Overflow)?;
        Ok(Self::new(amount, self.currency))
    }

    pub fn subtract(&self, subtrahend: &Money) -> Result<Money, DomainError> {
        self.ensure_same_currency(subtrahend)?;
        let amount = self
            .amount
            .checked_sub(subtrahend.amount)
            .ok_or(DomainError::Overflow)?;
        Ok(Self::new(amount, self.currency))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
