//! DuckDB-backed statistics warehouse.
//!
//! One row per natural key `(country, product, year, month)`; monetary
//! values are stored as DOUBLE so aggregation happens inside DuckDB and
//! are normalized back to scale-2 decimals on the way out. All values
//! reach SQL through bound parameters, never string interpolation.

pub mod migrations;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use duckdb::{Connection, ToSql};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use tradepulse_core::domain::{
    CountryCode, Currency, ImportData, Money, Percentage, Period, ProductCode, RecordEvent,
    RecordSource, StatisticRecord,
};
use tradepulse_core::stores::{CountryRef, CountryStore, ProductRef, ProductStore, StoreError};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("stored row is not a valid statistic: {message}")]
    Corrupt { message: String },
}

impl WarehouseError {
    fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Outcome of one chunk upsert: counters plus the record events raised by
/// inserts and merges, in write order.
#[derive(Debug, Default)]
pub struct ChunkReport {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub events: Vec<RecordEvent>,
}

pub struct Warehouse {
    conn: Mutex<Connection>,
}

impl Warehouse {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WarehouseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let connection = Connection::open(path)?;
        migrations::apply_migrations(&connection)?;
        Ok(Self {
            conn: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> Result<Self, WarehouseError> {
        let connection = Connection::open_in_memory()?;
        migrations::apply_migrations(&connection)?;
        Ok(Self {
            conn: Mutex::new(connection),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .expect("warehouse connection lock is not poisoned")
    }

    pub fn find_statistic(
        &self,
        country: &CountryCode,
        product: &ProductCode,
        period: Period,
    ) -> Result<Option<StatisticRecord>, WarehouseError> {
        find_statistic_in(&self.conn(), country, product, period)
    }

    pub fn insert_statistic(&self, record: &StatisticRecord) -> Result<(), WarehouseError> {
        insert_statistic_in(&self.conn(), record)
    }

    pub fn update_statistic(&self, record: &StatisticRecord) -> Result<(), WarehouseError> {
        update_statistic_in(&self.conn(), record)
    }

    pub fn statistics_count(&self) -> Result<u64, WarehouseError> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM trade_statistics", [], |row| {
                    row.get(0)
                })?;
        Ok(count.max(0) as u64)
    }

    /// Upserts one chunk inside a single transaction. A record that fails
    /// to merge or write is logged and counted without aborting the rest
    /// of the chunk; only transaction management errors surface.
    pub fn upsert_chunk(&self, records: &[StatisticRecord]) -> Result<ChunkReport, WarehouseError> {
        let mut report = ChunkReport::default();
        if records.is_empty() {
            return Ok(report);
        }

        let conn = self.conn();
        conn.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), WarehouseError> {
            for record in records {
                match upsert_one(&conn, record, &mut report) {
                    Ok(()) => {}
                    Err(e) => {
                        warn!(
                            country = record.country().as_str(),
                            product = record.product().as_str(),
                            period = %record.period(),
                            error = %e,
                            "failed to upsert statistic"
                        );
                        report.failed += 1;
                    }
                }
            }
            Ok(())
        })();
        finalize_transaction(&conn, result)?;

        debug!(
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed,
            "chunk upsert committed"
        );
        Ok(report)
    }

    pub fn records_for_product_period(
        &self,
        product: &ProductCode,
        period: Period,
    ) -> Result<Vec<StatisticRecord>, WarehouseError> {
        let sql = format!(
            "SELECT {STATISTIC_COLUMNS} FROM trade_statistics \
             WHERE product_code = ? AND year = ? AND month = ? \
             ORDER BY country_code"
        );
        let product = product.as_str();
        let year = period.year();
        let month = i32::from(period.month());
        let params: [&dyn ToSql; 3] = [&product, &year, &month];

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), read_statistic_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(restore_statistic(row?)?);
        }
        Ok(records)
    }

    /// Export totals per product for one period, largest first.
    pub fn product_totals(
        &self,
        period: Period,
    ) -> Result<Vec<(ProductCode, Money)>, WarehouseError> {
        let year = period.year();
        let month = i32::from(period.month());
        let params: [&dyn ToSql; 2] = [&year, &month];
        self.grouped_totals(
            "SELECT product_code, SUM(export_value) FROM trade_statistics \
             WHERE year = ? AND month = ? \
             GROUP BY product_code ORDER BY SUM(export_value) DESC",
            params.as_slice(),
            |code| {
                ProductCode::with_inferred_level(code)
                    .map_err(|e| WarehouseError::corrupt(e.to_string()))
            },
        )
    }

    /// Export totals per destination for one period, largest first.
    pub fn country_totals(
        &self,
        period: Period,
    ) -> Result<Vec<(CountryCode, Money)>, WarehouseError> {
        let year = period.year();
        let month = i32::from(period.month());
        let params: [&dyn ToSql; 2] = [&year, &month];
        self.grouped_totals(
            "SELECT country_code, SUM(export_value) FROM trade_statistics \
             WHERE year = ? AND month = ? \
             GROUP BY country_code ORDER BY SUM(export_value) DESC",
            params.as_slice(),
            |code| CountryCode::parse(code).map_err(|e| WarehouseError::corrupt(e.to_string())),
        )
    }

    /// Export totals per product across a whole year, largest first.
    pub fn product_totals_for_year(
        &self,
        year: i32,
    ) -> Result<Vec<(ProductCode, Money)>, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&year];
        self.grouped_totals(
            "SELECT product_code, SUM(export_value) FROM trade_statistics \
             WHERE year = ? \
             GROUP BY product_code ORDER BY SUM(export_value) DESC",
            params.as_slice(),
            |code| {
                ProductCode::with_inferred_level(code)
                    .map_err(|e| WarehouseError::corrupt(e.to_string()))
            },
        )
    }

    /// Export totals per destination across a whole year, largest first.
    pub fn country_totals_for_year(
        &self,
        year: i32,
    ) -> Result<Vec<(CountryCode, Money)>, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&year];
        self.grouped_totals(
            "SELECT country_code, SUM(export_value) FROM trade_statistics \
             WHERE year = ? \
             GROUP BY country_code ORDER BY SUM(export_value) DESC",
            params.as_slice(),
            |code| CountryCode::parse(code).map_err(|e| WarehouseError::corrupt(e.to_string())),
        )
    }

    pub fn monthly_totals(&self, year: i32) -> Result<Vec<(u8, Money)>, WarehouseError> {
        let params: [&dyn ToSql; 1] = [&year];
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT month, SUM(export_value) FROM trade_statistics \
             WHERE year = ? GROUP BY month ORDER BY month",
        )?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (month, value) = row?;
            totals.push((month as u8, money_from_f64(value)?));
        }
        Ok(totals)
    }

    pub fn yearly_totals(
        &self,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<(i32, Money)>, WarehouseError> {
        let params: [&dyn ToSql; 2] = [&start_year, &end_year];
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT year, SUM(export_value) FROM trade_statistics \
             WHERE year BETWEEN ? AND ? \
             GROUP BY year ORDER BY year",
        )?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (year, value) = row?;
            totals.push((year, money_from_f64(value)?));
        }
        Ok(totals)
    }

    fn grouped_totals<K>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        parse_key: impl Fn(&str) -> Result<K, WarehouseError>,
    ) -> Result<Vec<(K, Money)>, WarehouseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut totals = Vec::new();
        for row in rows {
            let (key, value) = row?;
            totals.push((parse_key(&key)?, money_from_f64(value)?));
        }
        Ok(totals)
    }
}

impl CountryStore for Warehouse {
    fn find_country(&self, code: &CountryCode) -> Result<Option<CountryRef>, StoreError> {
        let code_str = code.as_str();
        let params: [&dyn ToSql; 1] = [&code_str];
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT code, name, region, active FROM countries WHERE code = ?")
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let mut rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match rows.next() {
            None => Ok(None),
            Some(row) => {
                let (code, name, region, active) =
                    row.map_err(|e| StoreError::Query(e.to_string()))?;
                let code =
                    CountryCode::parse(&code).map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(Some(CountryRef {
                    code,
                    name,
                    region,
                    active,
                }))
            }
        }
    }
}

impl ProductStore for Warehouse {
    fn find_product(&self, code: &ProductCode) -> Result<Option<ProductRef>, StoreError> {
        let code_str = code.as_str();
        let params: [&dyn ToSql; 1] = [&code_str];
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT code, level, name, description, active FROM product_codes WHERE code = ?")
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let mut rows = stmt
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match rows.next() {
            None => Ok(None),
            Some(row) => {
                let (code, level, name, description, active) =
                    row.map_err(|e| StoreError::Query(e.to_string()))?;
                let code = ProductCode::parse(&code, level.clamp(0, u8::MAX as i32) as u8)
                    .map_err(|e| StoreError::Query(e.to_string()))?;
                Ok(Some(ProductRef {
                    code,
                    name,
                    description,
                    active,
                }))
            }
        }
    }

    fn insert_product(&self, product: &ProductRef) -> Result<(), StoreError> {
        let code = product.code.as_str();
        let level = i32::from(product.code.level());
        let description = product.description.as_deref();
        let params: [&dyn ToSql; 5] =
            [&code, &level, &product.name, &description, &product.active];
        self.conn()
            .execute(
                "INSERT INTO product_codes (code, level, name, description, active) \
                 VALUES (?, ?, ?, ?, ?)",
                params.as_slice(),
            )
            .map(|_| ())
            .map_err(|e| StoreError::Write(e.to_string()))
    }
}

const STATISTIC_COLUMNS: &str = "country_code, product_code, year, month, export_value, currency, \
     export_weight_kg, export_quantity, quantity_unit, import_value, import_weight_kg, \
     trade_balance, growth_rate_yoy, market_share, source";

/// Plain row image before domain validation.
struct StatisticRow {
    country: String,
    product: String,
    year: i32,
    month: i32,
    export_value: f64,
    currency: String,
    export_weight_kg: Option<f64>,
    export_quantity: Option<f64>,
    quantity_unit: Option<String>,
    import_value: Option<f64>,
    import_weight_kg: Option<f64>,
    trade_balance: Option<f64>,
    growth_rate_yoy: Option<f64>,
    market_share: Option<f64>,
    source: String,
}

fn read_statistic_row(row: &duckdb::Row<'_>) -> Result<StatisticRow, duckdb::Error> {
    Ok(StatisticRow {
        country: row.get(0)?,
        product: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        export_value: row.get(4)?,
        currency: row.get(5)?,
        export_weight_kg: row.get(6)?,
        export_quantity: row.get(7)?,
        quantity_unit: row.get(8)?,
        import_value: row.get(9)?,
        import_weight_kg: row.get(10)?,
        trade_balance: row.get(11)?,
        growth_rate_yoy: row.get(12)?,
        market_share: row.get(13)?,
        source: row.get(14)?,
    })
}

fn restore_statistic(row: StatisticRow) -> Result<StatisticRecord, WarehouseError> {
    let country =
        CountryCode::parse(&row.country).map_err(|e| WarehouseError::corrupt(e.to_string()))?;
    let product = ProductCode::with_inferred_level(&row.product)
        .map_err(|e| WarehouseError::corrupt(e.to_string()))?;
    let period = Period::new(row.year, row.month.clamp(0, u8::MAX as i32) as u8)
        .map_err(|e| WarehouseError::corrupt(e.to_string()))?;
    let currency =
        Currency::parse(&row.currency).map_err(|e| WarehouseError::corrupt(e.to_string()))?;
    let export_value = Money::new(decimal_from_f64(row.export_value), currency.clone())
        .map_err(|e| WarehouseError::corrupt(e.to_string()))?;

    let import_data = match row.import_value {
        Some(value) => Some(ImportData {
            value: Money::new(decimal_from_f64(value), currency)
                .map_err(|e| WarehouseError::corrupt(e.to_string()))?,
            weight_kg: row.import_weight_kg.map(decimal_from_f64),
            trade_balance: row.trade_balance.map(decimal_from_f64),
        }),
        None => None,
    };

    let source = match row.source.as_str() {
        "customs_api" => RecordSource::CustomsApi,
        "manual" => RecordSource::Manual,
        other => {
            return Err(WarehouseError::corrupt(format!(
                "unknown record source '{other}'"
            )))
        }
    };

    Ok(StatisticRecord::restore(
        country,
        product,
        period,
        export_value,
        row.export_weight_kg.map(decimal_from_f64),
        row.export_quantity.map(decimal_from_f64),
        row.quantity_unit,
        import_data,
        row.growth_rate_yoy
            .map(|v| Percentage::new(decimal_from_f64(v))),
        row.market_share
            .map(|v| Percentage::new(decimal_from_f64(v))),
        source,
    ))
}

fn find_statistic_in(
    conn: &Connection,
    country: &CountryCode,
    product: &ProductCode,
    period: Period,
) -> Result<Option<StatisticRecord>, WarehouseError> {
    let sql = format!(
        "SELECT {STATISTIC_COLUMNS} FROM trade_statistics \
         WHERE country_code = ? AND product_code = ? AND year = ? AND month = ?"
    );
    let country = country.as_str();
    let product = product.as_str();
    let year = period.year();
    let month = i32::from(period.month());
    let params: [&dyn ToSql; 4] = [&country, &product, &year, &month];

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params.as_slice(), read_statistic_row)?;
    match rows.next() {
        None => Ok(None),
        Some(row) => Ok(Some(restore_statistic(row?)?)),
    }
}

fn insert_statistic_in(conn: &Connection, record: &StatisticRecord) -> Result<(), WarehouseError> {
    let sql = format!(
        "INSERT INTO trade_statistics ({STATISTIC_COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    );
    let country = record.country().as_str();
    let product = record.product().as_str();
    let year = record.period().year();
    let month = i32::from(record.period().month());
    let export_value = decimal_to_f64(record.export_value().amount());
    let currency = record.export_value().currency().as_str();
    let export_weight_kg = record.export_weight_kg().map(decimal_to_f64);
    let export_quantity = record.export_quantity().map(decimal_to_f64);
    let quantity_unit = record.quantity_unit();
    let import_value = record
        .import_data()
        .map(|i| decimal_to_f64(i.value.amount()));
    let import_weight_kg = record
        .import_data()
        .and_then(|i| i.weight_kg)
        .map(decimal_to_f64);
    let trade_balance = record
        .import_data()
        .and_then(|i| i.trade_balance)
        .map(decimal_to_f64);
    let growth_rate_yoy = record.growth_rate_yoy().map(|p| decimal_to_f64(p.value()));
    let market_share = record.market_share().map(|p| decimal_to_f64(p.value()));
    let source = source_label(record.source());

    let params: [&dyn ToSql; 15] = [
        &country,
        &product,
        &year,
        &month,
        &export_value,
        &currency,
        &export_weight_kg,
        &export_quantity,
        &quantity_unit,
        &import_value,
        &import_weight_kg,
        &trade_balance,
        &growth_rate_yoy,
        &market_share,
        &source,
    ];
    conn.execute(&sql, params.as_slice())?;
    Ok(())
}

fn update_statistic_in(conn: &Connection, record: &StatisticRecord) -> Result<(), WarehouseError> {
    let country = record.country().as_str();
    let product = record.product().as_str();
    let year = record.period().year();
    let month = i32::from(record.period().month());
    let export_value = decimal_to_f64(record.export_value().amount());
    let currency = record.export_value().currency().as_str();
    let export_weight_kg = record.export_weight_kg().map(decimal_to_f64);
    let export_quantity = record.export_quantity().map(decimal_to_f64);
    let quantity_unit = record.quantity_unit();
    let import_value = record
        .import_data()
        .map(|i| decimal_to_f64(i.value.amount()));
    let import_weight_kg = record
        .import_data()
        .and_then(|i| i.weight_kg)
        .map(decimal_to_f64);
    let trade_balance = record
        .import_data()
        .and_then(|i| i.trade_balance)
        .map(decimal_to_f64);
    let growth_rate_yoy = record.growth_rate_yoy().map(|p| decimal_to_f64(p.value()));
    let market_share = record.market_share().map(|p| decimal_to_f64(p.value()));
    let source = source_label(record.source());

    let params: [&dyn ToSql; 15] = [
        &export_value,
        &currency,
        &export_weight_kg,
        &export_quantity,
        &quantity_unit,
        &import_value,
        &import_weight_kg,
        &trade_balance,
        &growth_rate_yoy,
        &market_share,
        &source,
        &country,
        &product,
        &year,
        &month,
    ];
    conn.execute(
        "UPDATE trade_statistics SET \
         export_value = ?, currency = ?, export_weight_kg = ?, export_quantity = ?, \
         quantity_unit = ?, import_value = ?, import_weight_kg = ?, trade_balance = ?, \
         growth_rate_yoy = ?, market_share = ?, source = ?, updated_at = CURRENT_TIMESTAMP \
         WHERE country_code = ? AND product_code = ? AND year = ? AND month = ?",
        params.as_slice(),
    )?;
    Ok(())
}

fn upsert_one(
    conn: &Connection,
    record: &StatisticRecord,
    report: &mut ChunkReport,
) -> Result<(), WarehouseError> {
    match find_statistic_in(conn, record.country(), record.product(), record.period())? {
        Some(mut existing) => {
            let events = existing
                .merge_from(record)
                .map_err(|e| WarehouseError::corrupt(e.to_string()))?;
            update_statistic_in(conn, &existing)?;
            report.events.extend(events);
            report.updated += 1;
        }
        None => {
            insert_statistic_in(conn, record)?;
            report.events.push(record.created_event());
            report.inserted += 1;
        }
    }
    Ok(())
}

fn finalize_transaction(
    conn: &Connection,
    result: Result<(), WarehouseError>,
) -> Result<(), WarehouseError> {
    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

fn source_label(source: RecordSource) -> &'static str {
    match source {
        RecordSource::Manual => "manual",
        RecordSource::CustomsApi => "customs_api",
    }
}

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or_default()
}

fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn money_from_f64(value: f64) -> Result<Money, WarehouseError> {
    let amount = decimal_from_f64(value).max(Decimal::ZERO);
    Money::new(amount, Currency::usd()).map_err(|e| WarehouseError::corrupt(e.to_string()))
}
