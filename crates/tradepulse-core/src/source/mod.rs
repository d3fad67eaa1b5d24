use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::Period;

mod customs;
mod resilient;

pub use customs::{CustomsApiSource, SourceConfig, ENVELOPE_KEY};
pub use resilient::{
    CircuitGuarded, FallbackToEmpty, RateLimited, ResiliencePolicy, Retrying, resilient_source,
};

/// Source-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidResponse,
    Internal,
}

/// Structured error from the remote trade source or its resilience stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidResponse => "source.invalid_response",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request window for one statistics fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsRequest {
    pub start: Period,
    pub end: Period,
    /// Optional HS code narrowing the query server-side.
    pub product_code: Option<String>,
}

impl StatisticsRequest {
    pub fn new(start: Period, end: Period) -> Self {
        Self {
            start,
            end,
            product_code: None,
        }
    }

    /// Single-month window, the pipeline's usual shape.
    pub fn for_period(period: Period) -> Self {
        Self::new(period, period)
    }

    pub fn with_product_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }
}

/// One remote row as the customs endpoint serves it: every numeric field is
/// a locale-formatted string with comma thousands separators, and any field
/// may be blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawTradeRow {
    /// "YYYYMM" period token, despite the field name.
    #[serde(default)]
    pub year: String,
    #[serde(default, rename = "hsCode")]
    pub hs_code: String,
    /// Product name in the source locale.
    #[serde(default, rename = "statKor")]
    pub stat_kor: String,
    #[serde(default, rename = "expDlr")]
    pub exp_dlr: String,
    #[serde(default, rename = "expWgt")]
    pub exp_wgt: String,
    #[serde(default, rename = "impDlr")]
    pub imp_dlr: String,
    #[serde(default, rename = "impWgt")]
    pub imp_wgt: String,
    #[serde(default, rename = "balPayments")]
    pub bal_payments: String,
}

impl RawTradeRow {
    pub fn export_value(&self) -> Decimal {
        parse_lenient(&self.exp_dlr)
    }

    pub fn export_weight(&self) -> Decimal {
        parse_lenient(&self.exp_wgt)
    }

    pub fn import_value(&self) -> Decimal {
        parse_lenient(&self.imp_dlr)
    }

    pub fn import_weight(&self) -> Decimal {
        parse_lenient(&self.imp_wgt)
    }

    pub fn trade_balance(&self) -> Decimal {
        parse_lenient(&self.bal_payments)
    }
}

/// Strips separators and whitespace; anything that still fails to parse is
/// zero rather than an error, matching how gappy the upstream data is.
fn parse_lenient(value: &str) -> Decimal {
    let cleaned: String = value
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != ',')
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    cleaned.parse().unwrap_or(Decimal::ZERO)
}

/// Contract for anything that can serve trade statistics rows.
pub trait TradeDataSource: Send + Sync {
    fn fetch_statistics<'a>(
        &'a self,
        request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn lenient_parsing_strips_separators() {
        let row = RawTradeRow {
            exp_dlr: String::from("15,000,000"),
            exp_wgt: String::from(" 1,234.5 "),
            ..RawTradeRow::default()
        };
        assert_eq!(row.export_value(), dec!(15000000));
        assert_eq!(row.export_weight(), dec!(1234.5));
    }

    #[test]
    fn blank_and_garbage_fields_become_zero() {
        let row = RawTradeRow {
            exp_dlr: String::new(),
            imp_dlr: String::from("n/a"),
            bal_payments: String::from("  "),
            ..RawTradeRow::default()
        };
        assert_eq!(row.export_value(), Decimal::ZERO);
        assert_eq!(row.import_value(), Decimal::ZERO);
        assert_eq!(row.trade_balance(), Decimal::ZERO);
    }

    #[test]
    fn wire_names_deserialize() {
        let row: RawTradeRow = serde_json::from_str(
            r#"{"year":"202310","hsCode":"8542","statKor":"전자집적회로","expDlr":"1,000","expWgt":"10","impDlr":"0","impWgt":"","balPayments":"1,000"}"#,
        )
        .expect("row");
        assert_eq!(row.year, "202310");
        assert_eq!(row.hs_code, "8542");
        assert_eq!(row.export_value(), dec!(1000));
    }

    #[test]
    fn error_codes_match_kinds() {
        assert_eq!(SourceError::unavailable("x").code(), "source.unavailable");
        assert!(SourceError::unavailable("x").retryable());
        assert!(SourceError::rate_limited("x").retryable());
        assert!(!SourceError::invalid_response("x").retryable());
        assert!(!SourceError::internal("x").retryable());
    }
}
