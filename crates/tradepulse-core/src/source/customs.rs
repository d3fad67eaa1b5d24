use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::http_client::{HttpClient, HttpRequest};

use super::{RawTradeRow, SourceError, StatisticsRequest, TradeDataSource};

/// Envelope key the remote endpoint wraps its row list in; doubles as the
/// service path segment.
pub const ENVELOPE_KEY: &str = "TexpimpMtYyQy";

const PLACEHOLDER_KEY: &str = "YOUR_API_KEY";

/// Connection settings for the customs statistics endpoint.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub service_key: String,
    pub timeout_ms: u64,
}

impl SourceConfig {
    pub fn new(service_key: impl Into<String>) -> Self {
        Self {
            base_url: String::from("https://unipass.customs.go.kr:38010/ext/rest"),
            service_key: service_key.into(),
            timeout_ms: 10_000,
        }
    }

    /// Reads the service key from `TRADEPULSE_SERVICE_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = std::env::var("TRADEPULSE_SERVICE_KEY").unwrap_or_default();
        Self::new(key).validated()
    }

    /// A missing or placeholder key is a deployment mistake, caught at
    /// construction rather than surfacing as endless retryable fetches.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let key = self.service_key.trim();
        if key.is_empty() || key == PLACEHOLDER_KEY {
            return Err(ConfigError::MissingServiceKey);
        }
        Ok(self)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// HTTP adapter for the customs statistics endpoint.
pub struct CustomsApiSource {
    config: SourceConfig,
    http: Arc<dyn HttpClient>,
}

impl CustomsApiSource {
    pub fn new(config: SourceConfig, http: Arc<dyn HttpClient>) -> Result<Self, ConfigError> {
        let config = config.validated()?;
        Ok(Self { config, http })
    }

    fn request_url(&self, request: &StatisticsRequest) -> String {
        let mut url = format!(
            "{}/{}?serviceKey={}&strtYymm={}&endYymm={}",
            self.config.base_url.trim_end_matches('/'),
            ENVELOPE_KEY,
            urlencoding::encode(self.config.service_key.trim()),
            request.start.format_yyyymm(),
            request.end.format_yyyymm(),
        );
        if let Some(code) = &request.product_code {
            url.push_str("&hsSgn=");
            url.push_str(&urlencoding::encode(code));
        }
        url
    }
}

impl TradeDataSource for CustomsApiSource {
    fn fetch_statistics<'a>(
        &'a self,
        request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let url = self.request_url(request);
            let http_request = HttpRequest::get(url)
                .with_header("accept", "application/json")
                .with_timeout_ms(self.config.timeout_ms);

            let response = self.http.execute(http_request).await.map_err(|e| {
                if e.retryable() {
                    SourceError::unavailable(e.message())
                } else {
                    SourceError::internal(e.message())
                }
            })?;

            if !response.is_success() {
                return Err(match response.status {
                    429 => SourceError::rate_limited("remote quota exhausted (429)"),
                    status if status >= 500 => {
                        SourceError::unavailable(format!("remote returned {status}"))
                    }
                    status => SourceError::invalid_response(format!("remote returned {status}")),
                });
            }

            let rows = parse_envelope(&response.body)?;
            debug!(
                start = %request.start,
                end = %request.end,
                rows = rows.len(),
                "fetched statistics page"
            );
            Ok(rows)
        })
    }
}

/// Unwraps the `TexpimpMtYyQy` envelope. A missing, null, or empty payload
/// is a legal empty page; a single bare object is treated as a one-row list.
fn parse_envelope(body: &str) -> Result<Vec<RawTradeRow>, SourceError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SourceError::invalid_response(format!("malformed response body: {e}")))?;

    match value.get(ENVELOPE_KEY) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(payload @ serde_json::Value::Array(_)) => {
            serde_json::from_value(payload.clone()).map_err(|e| {
                SourceError::invalid_response(format!("malformed statistics rows: {e}"))
            })
        }
        Some(payload @ serde_json::Value::Object(_)) => {
            let row: RawTradeRow = serde_json::from_value(payload.clone()).map_err(|e| {
                SourceError::invalid_response(format!("malformed statistics row: {e}"))
            })?;
            Ok(vec![row])
        }
        Some(other) => Err(SourceError::invalid_response(format!(
            "unexpected envelope payload: {other}"
        ))),
    }
}
