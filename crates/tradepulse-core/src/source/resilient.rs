//! Resilience decorators around a [`TradeDataSource`].
//!
//! Each layer wraps an inner source and is testable on its own; the full
//! stack is assembled innermost to outermost as
//! rate limit -> retry -> circuit breaker -> empty fallback.

use std::future::Future;
use std::pin::Pin;

use tracing::{error, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::retry::RetryConfig;
use crate::throttling::{RateGate, ThrottlePolicy};

use super::{RawTradeRow, SourceError, StatisticsRequest, TradeDataSource};

/// Denies requests that exceed the local budget before they reach the wire.
pub struct RateLimited<S> {
    inner: S,
    gate: RateGate,
}

impl<S> RateLimited<S> {
    pub fn new(inner: S, policy: ThrottlePolicy) -> Self {
        Self {
            inner,
            gate: RateGate::new(policy),
        }
    }
}

impl<S: TradeDataSource> TradeDataSource for RateLimited<S> {
    fn fetch_statistics<'a>(
        &'a self,
        request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.gate.try_acquire() {
                return Err(SourceError::rate_limited("local request budget exhausted"));
            }
            self.inner.fetch_statistics(request).await
        })
    }
}

/// Retries retryable failures with backoff; gives up after the configured
/// attempt budget or on the first non-retryable error.
pub struct Retrying<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> Retrying<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

impl<S: TradeDataSource> TradeDataSource for Retrying<S> {
    fn fetch_statistics<'a>(
        &'a self,
        request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                match self.inner.fetch_statistics(request).await {
                    Ok(rows) => return Ok(rows),
                    Err(e) => {
                        let budget_left =
                            self.config.enabled && attempt < self.config.max_retries;
                        if !e.retryable() || !budget_left {
                            return Err(e);
                        }
                        let delay = self.config.delay_for_attempt(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying statistics fetch"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        })
    }
}

/// Short-circuits calls while the upstream keeps failing.
pub struct CircuitGuarded<S> {
    inner: S,
    breaker: CircuitBreaker,
}

impl<S> CircuitGuarded<S> {
    pub fn new(inner: S, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            breaker: CircuitBreaker::new(config),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

impl<S: TradeDataSource> TradeDataSource for CircuitGuarded<S> {
    fn fetch_statistics<'a>(
        &'a self,
        request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.breaker.allow_request() {
                return Err(SourceError::unavailable("source circuit is open"));
            }
            match self.inner.fetch_statistics(request).await {
                Ok(rows) => {
                    self.breaker.record_success();
                    Ok(rows)
                }
                Err(e) => {
                    self.breaker.record_failure();
                    Err(e)
                }
            }
        })
    }
}

/// Outermost layer: any source failure degrades to an empty page so the
/// pipeline can finish its run on whatever data it already has.
pub struct FallbackToEmpty<S> {
    inner: S,
}

impl<S> FallbackToEmpty<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: TradeDataSource> TradeDataSource for FallbackToEmpty<S> {
    fn fetch_statistics<'a>(
        &'a self,
        request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            match self.inner.fetch_statistics(request).await {
                Ok(rows) => Ok(rows),
                Err(e) => {
                    error!(
                        start = %request.start,
                        end = %request.end,
                        error = %e,
                        "statistics fetch failed, continuing with an empty page"
                    );
                    Ok(Vec::new())
                }
            }
        })
    }
}

/// Tuning for the full resilience stack.
#[derive(Debug, Clone, Default)]
pub struct ResiliencePolicy {
    pub throttle: ThrottlePolicy,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerConfig,
}

/// Wraps a source in the full stack, innermost to outermost.
pub fn resilient_source<S: TradeDataSource>(
    inner: S,
    policy: ResiliencePolicy,
) -> FallbackToEmpty<CircuitGuarded<Retrying<RateLimited<S>>>> {
    FallbackToEmpty::new(CircuitGuarded::new(
        Retrying::new(RateLimited::new(inner, policy.throttle), policy.retry),
        policy.breaker,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitState;
    use crate::domain::Period;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Plays back a script of results and counts calls.
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<Vec<Result<Vec<RawTradeRow>, SourceError>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(mut script: Vec<Result<Vec<RawTradeRow>, SourceError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TradeDataSource for ScriptedSource {
        fn fetch_statistics<'a>(
            &'a self,
            _request: &'a StatisticsRequest,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .script
                .lock()
                .expect("script lock is not poisoned")
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()));
            Box::pin(async move { result })
        }
    }

    fn request() -> StatisticsRequest {
        StatisticsRequest::for_period(Period::new(2023, 10).expect("period"))
    }

    fn one_row() -> Vec<RawTradeRow> {
        vec![RawTradeRow {
            hs_code: String::from("8542"),
            ..RawTradeRow::default()
        }]
    }

    #[tokio::test]
    async fn rate_limited_denies_over_budget_calls() {
        let source = RateLimited::new(
            ScriptedSource::new(vec![Ok(one_row()), Ok(one_row())]),
            ThrottlePolicy {
                quota_window: Duration::from_secs(60),
                quota_limit: 1,
            },
        );

        assert!(source.fetch_statistics(&request()).await.is_ok());
        let denied = source.fetch_statistics(&request()).await.expect_err("denied");
        assert_eq!(denied.code(), "source.rate_limited");
    }

    #[tokio::test]
    async fn retrying_recovers_from_transient_failures() {
        let inner = ScriptedSource::new(vec![
            Err(SourceError::unavailable("first")),
            Err(SourceError::unavailable("second")),
            Ok(one_row()),
        ]);
        let source = Retrying::new(inner, RetryConfig::fixed(Duration::from_millis(1), 3));

        let rows = source.fetch_statistics(&request()).await.expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(source.inner.calls(), 3);
    }

    #[tokio::test]
    async fn retrying_stops_on_non_retryable_errors() {
        let inner = ScriptedSource::new(vec![Err(SourceError::invalid_response("bad json"))]);
        let source = Retrying::new(inner, RetryConfig::fixed(Duration::from_millis(1), 5));

        let err = source.fetch_statistics(&request()).await.expect_err("fatal");
        assert_eq!(err.code(), "source.invalid_response");
        assert_eq!(source.inner.calls(), 1);
    }

    #[tokio::test]
    async fn retrying_exhausts_its_attempt_budget() {
        let inner = ScriptedSource::new(vec![
            Err(SourceError::unavailable("1")),
            Err(SourceError::unavailable("2")),
            Err(SourceError::unavailable("3")),
        ]);
        let source = Retrying::new(inner, RetryConfig::fixed(Duration::from_millis(1), 2));

        let err = source.fetch_statistics(&request()).await.expect_err("exhausted");
        assert_eq!(err.code(), "source.unavailable");
        assert_eq!(source.inner.calls(), 3);
    }

    #[tokio::test]
    async fn circuit_opens_and_short_circuits() {
        let inner = ScriptedSource::new(vec![
            Err(SourceError::unavailable("1")),
            Err(SourceError::unavailable("2")),
        ]);
        let source = CircuitGuarded::new(
            inner,
            CircuitBreakerConfig {
                failure_threshold: 2,
                open_timeout: Duration::from_secs(60),
            },
        );

        let _ = source.fetch_statistics(&request()).await;
        let _ = source.fetch_statistics(&request()).await;
        assert_eq!(source.breaker().state(), CircuitState::Open);

        // Third call never reaches the inner source.
        let err = source.fetch_statistics(&request()).await.expect_err("open");
        assert_eq!(err.code(), "source.unavailable");
        assert_eq!(source.inner.calls(), 2);
    }

    #[tokio::test]
    async fn fallback_converts_errors_to_empty_pages() {
        let source =
            FallbackToEmpty::new(ScriptedSource::new(vec![Err(SourceError::internal("boom"))]));
        let rows = source.fetch_statistics(&request()).await.expect("fallback");
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn full_stack_never_surfaces_an_error() {
        let inner = ScriptedSource::new(vec![
            Err(SourceError::unavailable("1")),
            Err(SourceError::unavailable("2")),
            Err(SourceError::unavailable("3")),
        ]);
        let source = resilient_source(
            inner,
            ResiliencePolicy {
                retry: RetryConfig::fixed(Duration::from_millis(1), 2),
                breaker: CircuitBreakerConfig {
                    failure_threshold: 3,
                    open_timeout: Duration::from_secs(60),
                },
                ..ResiliencePolicy::default()
            },
        );

        let rows = source.fetch_statistics(&request()).await.expect("absorbed");
        assert!(rows.is_empty());
    }
}
