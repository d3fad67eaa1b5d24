use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tradepulse_core::domain::{Period, RecordEvent, StatisticRecord};
use tradepulse_core::filter::ProductCodeFilter;
use tradepulse_core::source::{StatisticsRequest, TradeDataSource};
use tradepulse_core::transform::{RecordTransformer, TransformOutcome};
use tradepulse_warehouse::Warehouse;

use crate::reference::read_reference_codes;

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Stage the sync run is in. `Failed` is reachable from any active stage;
/// a run that merely fetched nothing still completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    NotStarted,
    LoadingReference,
    Syncing,
    Validating,
    Completed,
    Failed,
}

/// Counters and identity for one sync run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: SyncState,
    pub target_period: Option<Period>,
    pub reference_loaded: usize,
    pub fetched: usize,
    pub filtered_out: usize,
    pub transformed: usize,
    pub dropped: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed_records: usize,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: SyncState::NotStarted,
            target_period: None,
            reference_loaded: 0,
            fetched: 0,
            filtered_out: 0,
            transformed: 0,
            dropped: 0,
            inserted: 0,
            updated: 0,
            failed_records: 0,
            error: None,
            started_at: OffsetDateTime::now_utc(),
            finished_at: None,
        }
    }

    fn fail(mut self, message: String) -> Self {
        error!(run_id = %self.run_id, error = %message, "sync run failed");
        self.state = SyncState::Failed;
        self.error = Some(message);
        self.finished_at = Some(OffsetDateTime::now_utc());
        self
    }

    fn complete(mut self) -> Self {
        self.state = SyncState::Completed;
        self.finished_at = Some(OffsetDateTime::now_utc());
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Month to sync; defaults to the previous calendar month.
    pub target_period: Option<Period>,
    pub chunk_size: usize,
    pub reference_path: PathBuf,
}

impl PipelineConfig {
    pub fn new(reference_path: impl Into<PathBuf>) -> Self {
        Self {
            target_period: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            reference_path: reference_path.into(),
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.target_period = Some(period);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

/// Orchestrates one sync run: load reference codes, fetch and filter the
/// remote page, transform, and upsert in chunks.
pub struct IngestionPipeline {
    source: Arc<dyn TradeDataSource>,
    warehouse: Arc<Warehouse>,
    config: PipelineConfig,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn TradeDataSource>,
        warehouse: Arc<Warehouse>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            warehouse,
            config,
        }
    }

    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::new();
        let period = self
            .config
            .target_period
            .unwrap_or_else(Period::previous_calendar_month);
        report.target_period = Some(period);
        info!(run_id = %report.run_id, period = %period, "starting sync run");

        // Stage 1: reference codes.
        report.state = SyncState::LoadingReference;
        let references = match read_reference_codes(&self.config.reference_path) {
            Ok(references) => references,
            Err(e) => return report.fail(e.to_string()),
        };
        let mut filter = ProductCodeFilter::new();
        report.reference_loaded = filter.load(references);
        info!(run_id = %report.run_id, loaded = report.reference_loaded, "reference codes loaded");

        // Stage 2: fetch, filter, transform, upsert.
        report.state = SyncState::Syncing;
        let transformer =
            match RecordTransformer::new(self.warehouse.as_ref(), self.warehouse.as_ref()) {
                Ok(transformer) => transformer,
                Err(e) => return report.fail(e.to_string()),
            };

        let request = StatisticsRequest::for_period(period);
        let rows = match self.source.fetch_statistics(&request).await {
            Ok(rows) => rows,
            // The resilient stack absorbs fetch failures; a bare source in
            // tests may still error, and the run degrades the same way.
            Err(e) => {
                warn!(run_id = %report.run_id, error = %e, "fetch failed, syncing an empty page");
                Vec::new()
            }
        };
        report.fetched = rows.len();

        let mut records: Vec<StatisticRecord> = Vec::new();
        for row in &rows {
            if !filter.is_member(&row.hs_code) {
                report.filtered_out += 1;
                continue;
            }
            match transformer.transform(row) {
                Ok(TransformOutcome::Record(record)) => records.push(*record),
                Ok(TransformOutcome::Dropped { .. }) => report.dropped += 1,
                Err(e) => return report.fail(e.to_string()),
            }
        }
        report.transformed = records.len();

        let chunk_size = self.config.chunk_size.max(1);
        for chunk in records.chunks(chunk_size) {
            match self.warehouse.upsert_chunk(chunk) {
                Ok(chunk_report) => {
                    report.inserted += chunk_report.inserted;
                    report.updated += chunk_report.updated;
                    report.failed_records += chunk_report.failed;
                    for event in &chunk_report.events {
                        log_record_event(report.run_id, event);
                    }
                }
                Err(e) => {
                    // The chunk's transaction rolled back; later chunks
                    // still get their chance.
                    error!(run_id = %report.run_id, error = %e, "chunk upsert failed");
                    report.failed_records += chunk.len();
                }
            }
        }

        // Stage 3: reconcile and summarize.
        report.state = SyncState::Validating;
        let accounted = report.inserted + report.updated + report.failed_records;
        if accounted != report.transformed {
            warn!(
                run_id = %report.run_id,
                transformed = report.transformed,
                accounted,
                "sync counters do not reconcile"
            );
        }

        let report = report.complete();
        info!(
            run_id = %report.run_id,
            fetched = report.fetched,
            filtered_out = report.filtered_out,
            transformed = report.transformed,
            dropped = report.dropped,
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed_records,
            "sync run completed"
        );
        report
    }
}

fn log_record_event(run_id: Uuid, event: &RecordEvent) {
    match event {
        RecordEvent::Created {
            country,
            product,
            period,
            value,
        } => debug!(%run_id, %country, %product, %period, %value, "statistic created"),
        RecordEvent::ValueUpdated {
            country,
            product,
            period,
            previous,
            current,
        } => debug!(%run_id, %country, %product, %period, %previous, %current, "statistic value updated"),
        RecordEvent::ThresholdExceeded {
            country,
            product,
            period,
            value,
        } => warn!(%run_id, %country, %product, %period, %value, "export value crossed the alert threshold"),
    }
}
