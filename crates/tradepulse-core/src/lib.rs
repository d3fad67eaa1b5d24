//! Core contracts for tradepulse.
//!
//! This crate contains:
//! - Canonical value types and the statistic record aggregate
//! - The reference code membership filter
//! - The resilient remote source client and its decorators
//! - Row-to-record transformation against pluggable stores
//! - The pure analytics engine over persisted snapshots

pub mod analytics;
pub mod circuit_breaker;
pub mod domain;
pub mod error;
pub mod filter;
pub mod http_client;
pub mod retry;
pub mod source;
pub mod stores;
pub mod throttling;
pub mod transform;

pub use analytics::{
    AnalyticsEngine, DashboardSummary, GrowthTrendAnalysis, MonthlyTotal, RankedEntry,
    RegionalConcentration, SeasonalityAnalysis, TrendClassification,
};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use domain::{
    CountryCode, Currency, ImportData, Money, Percentage, Period, ProductCode, RecordEvent,
    RecordSource, StatisticRecord,
};
pub use error::{ConfigError, ValidationError};
pub use filter::{ProductCodeFilter, ReferenceProductCode};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, StaticHttpClient,
};
pub use retry::{Backoff, RetryConfig};
pub use source::{
    resilient_source, CircuitGuarded, CustomsApiSource, FallbackToEmpty, RateLimited, RawTradeRow,
    ResiliencePolicy, Retrying, SourceConfig, SourceError, SourceErrorKind, StatisticsRequest,
    TradeDataSource, ENVELOPE_KEY,
};
pub use stores::{CountryRef, CountryStore, ProductRef, ProductStore, StoreError};
pub use throttling::{RateGate, ThrottlePolicy};
pub use transform::{RecordTransformer, TransformError, TransformOutcome};
