use std::fmt::{Display, Formatter};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MONEY_SCALE: u32 = 2;
const RATIO_SCALE: u32 = 4;

/// Validated 3-letter uppercase ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let is_valid =
            normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());
        if !is_valid {
            return Err(ValidationError::InvalidCurrency {
                value: input.to_owned(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn usd() -> Self {
        Self(String::from("USD"))
    }

    pub fn krw() -> Self {
        Self(String::from("KRW"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-negative monetary amount in a single currency, scale 2, HALF_UP.
///
/// Cross-currency arithmetic fails instead of silently mixing units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::NegativeAmount {
                value: amount.to_string(),
            });
        }
        Ok(Self {
            amount: round_half_up(amount, MONEY_SCALE),
            currency,
        })
    }

    pub fn usd(amount: Decimal) -> Result<Self, ValidationError> {
        Self::new(amount, Currency::usd())
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn add(&self, other: &Money) -> Result<Money, ValidationError> {
        self.require_same_currency(other)?;
        Money::new(self.amount + other.amount, self.currency.clone())
    }

    /// Subtraction within one currency; a would-be-negative result is an error.
    pub fn subtract(&self, other: &Money) -> Result<Money, ValidationError> {
        self.require_same_currency(other)?;
        let result = self.amount - other.amount;
        if result < Decimal::ZERO {
            return Err(ValidationError::NegativeMoneyResult);
        }
        Money::new(result, self.currency.clone())
    }

    pub fn multiply(&self, multiplier: Decimal) -> Result<Money, ValidationError> {
        if multiplier < Decimal::ZERO {
            return Err(ValidationError::NegativeMultiplier);
        }
        Money::new(self.amount * multiplier, self.currency.clone())
    }

    pub fn divide(&self, divisor: Decimal) -> Result<Money, ValidationError> {
        if divisor <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveDivisor);
        }
        Money::new(self.amount / divisor, self.currency.clone())
    }

    /// This amount as a share of `total`, rounded to 4 decimal places.
    /// A zero total yields a zero ratio.
    pub fn ratio_of(&self, total: &Money) -> Result<Decimal, ValidationError> {
        self.require_same_currency(total)?;
        if total.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(round_half_up(self.amount / total.amount, RATIO_SCALE))
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), ValidationError> {
        if self.currency != other.currency {
            return Err(ValidationError::CurrencyMismatch {
                left: self.currency.as_str().to_owned(),
                right: other.currency.as_str().to_owned(),
            });
        }
        Ok(())
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

pub(crate) fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}
