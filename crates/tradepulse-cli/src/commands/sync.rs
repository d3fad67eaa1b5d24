use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use tradepulse_core::http_client::ReqwestHttpClient;
use tradepulse_core::source::{
    resilient_source, CustomsApiSource, RawTradeRow, ResiliencePolicy, SourceConfig, SourceError,
    StatisticsRequest, TradeDataSource,
};
use tradepulse_pipeline::{IngestionPipeline, PipelineConfig, SyncState};
use tradepulse_warehouse::Warehouse;

use crate::cli::SyncArgs;
use crate::error::CliError;

/// Stub source for `--offline` dry runs: always an empty page.
struct OfflineSource;

impl TradeDataSource for OfflineSource {
    fn fetch_statistics<'a>(
        &'a self,
        _request: &'a StatisticsRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawTradeRow>, SourceError>> + Send + 'a>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

pub async fn run(args: &SyncArgs, db: &Path) -> Result<Value, CliError> {
    let warehouse = Arc::new(Warehouse::open(db)?);

    let source: Arc<dyn TradeDataSource> = if args.offline {
        info!("running offline against a stub source");
        Arc::new(OfflineSource)
    } else {
        let config = SourceConfig::from_env()?;
        let customs = CustomsApiSource::new(config, Arc::new(ReqwestHttpClient::new()))?;
        Arc::new(resilient_source(customs, ResiliencePolicy::default()))
    };

    let mut config =
        PipelineConfig::new(&args.reference).with_chunk_size(args.chunk_size.max(1));
    if let Some(period) = args.period {
        config = config.with_period(period);
    }

    let report = IngestionPipeline::new(source, warehouse, config).run().await;
    if report.state == SyncState::Failed {
        return Err(CliError::SyncFailed {
            message: report
                .error
                .clone()
                .unwrap_or_else(|| String::from("unknown failure")),
        });
    }
    Ok(serde_json::to_value(&report)?)
}
