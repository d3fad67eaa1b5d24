use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::round_half_up;

const PERCENT_SCALE: u32 = 2;
const RATIO_SCALE: u32 = 4;

/// Percentage value normalized to 2 decimal places, HALF_UP.
///
/// Used for growth rates and market shares; negative values are legal
/// (a shrinking market is still a percentage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Self {
        Self(round_half_up(value, PERCENT_SCALE))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// 0.15 -> 15.00%
    pub fn from_ratio(ratio: Decimal) -> Self {
        Self::new(ratio * Decimal::ONE_HUNDRED)
    }

    /// `numerator / denominator` as a percentage; a zero denominator yields
    /// zero rather than an error. The intermediate ratio is kept at 4dp, as
    /// the rest of the share math does.
    pub fn calculate(numerator: Decimal, denominator: Decimal) -> Self {
        if denominator.is_zero() {
            return Self::zero();
        }
        let ratio = round_half_up(numerator / denominator, RATIO_SCALE);
        Self::from_ratio(ratio)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// 15.00% -> 0.1500
    pub fn to_ratio(&self) -> Decimal {
        round_half_up(self.0 / Decimal::ONE_HUNDRED, RATIO_SCALE)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }
}

impl Display for Percentage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}
