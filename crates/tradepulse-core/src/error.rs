use thiserror::Error;

/// Validation and contract errors exposed by `tradepulse-core` domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },
    #[error("currency mismatch: {left} != {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("monetary amount must be non-negative: {value}")]
    NegativeAmount { value: String },
    #[error("monetary subtraction would produce a negative result")]
    NegativeMoneyResult,
    #[error("multiplier must be non-negative")]
    NegativeMultiplier,
    #[error("divisor must be greater than zero")]
    NonPositiveDivisor,

    #[error("year must be between 1900 and 2100: {year}")]
    YearOutOfRange { year: i32 },
    #[error("month must be between 1 and 12: {month}")]
    MonthOutOfRange { month: u8 },
    #[error("period must be a 6-digit YYYYMM token: '{value}'")]
    MalformedPeriod { value: String },
    #[error("statistics cannot be recorded for a future period: {period}")]
    FuturePeriod { period: String },

    #[error("product code must be 2-10 digits: '{value}'")]
    InvalidProductCode { value: String },
    #[error("product code level must be between 1 and 6: {level}")]
    ProductLevelOutOfRange { level: u8 },
    #[error("product code level {level} requires {expected} digits, got '{value}'")]
    ProductCodeLengthMismatch {
        level: u8,
        expected: usize,
        value: String,
    },
    #[error("level 1 product codes have no parent")]
    ProductCodeHasNoParent,

    #[error("country code must be 3 ASCII letters: '{value}'")]
    InvalidCountryCode { value: String },

    #[error("export weight must be non-negative")]
    NegativeWeight,
    #[error("export quantity must be non-negative")]
    NegativeQuantity,
    #[error("quantity unit is required when a quantity is present")]
    MissingQuantityUnit,
    #[error("weight is required to compute a per-kg value")]
    MissingWeight,
}

/// Fatal configuration errors. These abort a run outright instead of being
/// absorbed like transient source failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("remote source service key is missing or still the placeholder value")]
    MissingServiceKey,
    #[error("sentinel country '{code}' is not provisioned; check store migrations")]
    WorldCountryMissing { code: String },
}
