//! Behavior tests for the ingestion pipeline: full sync journeys,
//! idempotent re-runs, and degraded-source outcomes.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tempfile::tempdir;

use tradepulse_core::circuit_breaker::CircuitBreakerConfig;
use tradepulse_core::domain::{CountryCode, Period, ProductCode};
use tradepulse_core::retry::RetryConfig;
use tradepulse_core::source::{resilient_source, ResiliencePolicy, TradeDataSource};
use tradepulse_core::stores::ProductStore;
use tradepulse_pipeline::{IngestionPipeline, PipelineConfig, SyncState};
use tradepulse_warehouse::Warehouse;

use tradepulse_tests::{wire_row, write_reference_csv, ScriptedSource};

fn period(year: i32, month: u8) -> Period {
    Period::new(year, month).expect("period")
}

fn pipeline(
    source: Arc<dyn TradeDataSource>,
    warehouse: Arc<Warehouse>,
    reference: std::path::PathBuf,
    target: Period,
) -> IngestionPipeline {
    IngestionPipeline::new(
        source,
        warehouse,
        PipelineConfig::new(reference).with_period(target),
    )
}

#[tokio::test]
async fn full_sync_persists_remote_rows_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("85", "Electrical machinery")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    let source = Arc::new(ScriptedSource::serving(vec![
        wire_row("202310", "8542", "15,000,000"),
        wire_row("202310", "8541", "5,000,000"),
    ]));

    let report = pipeline(source, warehouse.clone(), reference, period(2023, 10))
        .run()
        .await;

    assert_eq!(report.state, SyncState::Completed);
    assert_eq!(report.reference_loaded, 1);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.transformed, 2);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.failed_records, 0);

    let stored = warehouse
        .find_statistic(
            &CountryCode::world(),
            &ProductCode::with_inferred_level("8542").expect("code"),
            period(2023, 10),
        )
        .expect("query")
        .expect("persisted");
    assert_eq!(stored.export_value().amount(), dec!(15000000.00));
    assert!(stored.is_customs_api());

    // Auto-provisioned product carries the row's name.
    let product = warehouse
        .find_product(&ProductCode::with_inferred_level("8542").expect("code"))
        .expect("query")
        .expect("created");
    assert_eq!(product.name, "product 8542");
}

#[tokio::test]
async fn rerunning_the_same_period_updates_in_place() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("85", "Electrical machinery")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));
    let rows = vec![wire_row("202310", "8542", "15,000,000")];

    let first = pipeline(
        Arc::new(ScriptedSource::serving(rows.clone())),
        warehouse.clone(),
        reference.clone(),
        period(2023, 10),
    )
    .run()
    .await;
    assert_eq!(first.inserted, 1);

    // Same remote data again: merged in place, never duplicated.
    let second = pipeline(
        Arc::new(ScriptedSource::serving(rows)),
        warehouse.clone(),
        reference,
        period(2023, 10),
    )
    .run()
    .await;

    assert_eq!(second.state, SyncState::Completed);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(warehouse.statistics_count().expect("count"), 1);
}

#[tokio::test]
async fn changed_remote_values_overwrite_without_duplicating() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("85", "Electrical machinery")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    pipeline(
        Arc::new(ScriptedSource::serving(vec![wire_row(
            "202310",
            "8542",
            "1,000",
        )])),
        warehouse.clone(),
        reference.clone(),
        period(2023, 10),
    )
    .run()
    .await;

    pipeline(
        Arc::new(ScriptedSource::serving(vec![wire_row(
            "202310",
            "8542",
            "2,500",
        )])),
        warehouse.clone(),
        reference,
        period(2023, 10),
    )
    .run()
    .await;

    assert_eq!(warehouse.statistics_count().expect("count"), 1);
    let stored = warehouse
        .find_statistic(
            &CountryCode::world(),
            &ProductCode::with_inferred_level("8542").expect("code"),
            period(2023, 10),
        )
        .expect("query")
        .expect("stored");
    assert_eq!(stored.export_value().amount(), dec!(2500.00));
}

#[tokio::test]
async fn rows_outside_the_reference_scope_are_filtered_out() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("8542", "Integrated circuits")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    let source = Arc::new(ScriptedSource::serving(vec![
        wire_row("202310", "854231", "1,000"),
        wire_row("202310", "9013", "2,000"),
    ]));

    let report = pipeline(source, warehouse.clone(), reference, period(2023, 10))
        .run()
        .await;

    assert_eq!(report.fetched, 2);
    assert_eq!(report.filtered_out, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(warehouse.statistics_count().expect("count"), 1);
}

#[tokio::test]
async fn malformed_rows_are_dropped_and_counted() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("85", "Electrical machinery")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    let source = Arc::new(ScriptedSource::serving(vec![
        wire_row("2023", "8542", "1,000"),   // bad period token
        wire_row("202310", "854", "1,000"),  // odd-length code
        wire_row("202310", "8542", "1,000"), // good
    ]));

    let report = pipeline(source, warehouse.clone(), reference, period(2023, 10))
        .run()
        .await;

    assert_eq!(report.state, SyncState::Completed);
    // "854" matches the "85" chapter prefix, so both bad rows reach the
    // transformer and are dropped there rather than filtered.
    assert_eq!(report.transformed, 1);
    assert_eq!(report.filtered_out, 0);
    assert_eq!(report.dropped, 2);
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn an_exhausted_source_still_completes_the_run() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("85", "Electrical machinery")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    // Full resilience stack over a source that never recovers: retries
    // exhaust, the breaker opens, and the fallback serves an empty page.
    let source = Arc::new(resilient_source(
        ScriptedSource::always_failing(),
        ResiliencePolicy {
            retry: RetryConfig::fixed(Duration::from_millis(1), 2),
            breaker: CircuitBreakerConfig {
                failure_threshold: 2,
                open_timeout: Duration::from_secs(60),
            },
            ..ResiliencePolicy::default()
        },
    ));

    let report = pipeline(source, warehouse.clone(), reference, period(2023, 10))
        .run()
        .await;

    assert_eq!(report.state, SyncState::Completed);
    assert_eq!(report.fetched, 0);
    assert_eq!(report.inserted, 0);
    assert!(report.error.is_none());
    assert_eq!(warehouse.statistics_count().expect("count"), 0);
}

#[tokio::test]
async fn missing_reference_file_fails_the_run() {
    let dir = tempdir().expect("tempdir");
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    let report = pipeline(
        Arc::new(ScriptedSource::serving(vec![])),
        warehouse,
        dir.path().join("does-not-exist.csv"),
        period(2023, 10),
    )
    .run()
    .await;

    assert_eq!(report.state, SyncState::Failed);
    assert!(report.error.is_some());
    assert!(report.finished_at.is_some());
}

#[tokio::test]
async fn chunked_upserts_cover_every_record() {
    let dir = tempdir().expect("tempdir");
    let reference = write_reference_csv(dir.path(), &[("85", "Electrical machinery")]);
    let warehouse = Arc::new(Warehouse::open_in_memory().expect("warehouse"));

    let rows: Vec<_> = (0..25)
        .map(|i| wire_row("202310", &format!("85{i:02}"), "1,000"))
        .collect();

    let report = IngestionPipeline::new(
        Arc::new(ScriptedSource::serving(rows)),
        warehouse.clone(),
        PipelineConfig::new(reference)
            .with_period(period(2023, 10))
            .with_chunk_size(10),
    )
    .run()
    .await;

    assert_eq!(report.inserted, 25);
    assert_eq!(warehouse.statistics_count().expect("count"), 25);
}
