use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::domain::{CountryCode, Money, Period, ProductCode, StatisticRecord};
use crate::source::RawTradeRow;
use crate::stores::{CountryRef, CountryStore, ProductRef, ProductStore, StoreError};

/// Name given to auto-provisioned product codes the reference list does not
/// describe.
const UNKNOWN_PRODUCT_NAME: &str = "Unknown";

#[derive(Debug, Error)]
pub enum TransformError {
    /// The `WLD` sentinel row is part of the schema seed; its absence means
    /// a broken store, not a bad input row.
    #[error("sentinel country '{code}' is not provisioned; check store migrations")]
    WorldCountryMissing { code: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of transforming one remote row. Dropping a row is an expected
/// outcome, not an error; only store and configuration failures are `Err`.
#[derive(Debug)]
pub enum TransformOutcome {
    Record(Box<StatisticRecord>),
    Dropped { code: String, reason: String },
}

impl TransformOutcome {
    fn dropped(code: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(code, %reason, "dropping remote row");
        Self::Dropped {
            code: code.to_owned(),
            reason,
        }
    }
}

/// Turns raw remote rows into validated statistic records.
///
/// The world sentinel is resolved once at construction; every produced
/// record is attributed to it, since the remote source carries no country
/// dimension.
pub struct RecordTransformer<'a, P: ProductStore> {
    products: &'a P,
    world: CountryRef,
}

impl<'a, P: ProductStore> RecordTransformer<'a, P> {
    pub fn new(
        countries: &dyn CountryStore,
        products: &'a P,
    ) -> Result<Self, TransformError> {
        let world_code = CountryCode::world();
        let world = countries
            .find_country(&world_code)?
            .ok_or_else(|| TransformError::WorldCountryMissing {
                code: world_code.as_str().to_owned(),
            })?;
        Ok(Self { products, world })
    }

    pub fn transform(&self, row: &RawTradeRow) -> Result<TransformOutcome, TransformError> {
        let raw_code = row.hs_code.trim();
        let code = match ProductCode::with_inferred_level(raw_code) {
            Ok(code) => code,
            Err(e) => return Ok(TransformOutcome::dropped(raw_code, e.to_string())),
        };

        self.ensure_product(&code, &row.stat_kor)?;

        let period = match Period::parse_yyyymm(&row.year) {
            Ok(period) => period,
            Err(e) => return Ok(TransformOutcome::dropped(raw_code, e.to_string())),
        };

        let export_value = match Money::usd(row.export_value()) {
            Ok(value) => value,
            Err(e) => return Ok(TransformOutcome::dropped(raw_code, e.to_string())),
        };

        let mut record = match StatisticRecord::new(
            self.world.code.clone(),
            code,
            period,
            export_value,
        ) {
            Ok(record) => record,
            Err(e) => return Ok(TransformOutcome::dropped(raw_code, e.to_string())),
        };

        let weight = row.export_weight();
        if weight > Decimal::ZERO {
            if let Err(e) = record.set_weight(weight) {
                return Ok(TransformOutcome::dropped(raw_code, e.to_string()));
            }
        }

        let import_value = row.import_value();
        if import_value > Decimal::ZERO {
            let import_money = match Money::usd(import_value) {
                Ok(value) => value,
                Err(e) => return Ok(TransformOutcome::dropped(raw_code, e.to_string())),
            };
            let import_weight = Some(row.import_weight()).filter(|w| *w > Decimal::ZERO);
            if let Err(e) =
                record.set_import_data(import_money, import_weight, Some(row.trade_balance()))
            {
                return Ok(TransformOutcome::dropped(raw_code, e.to_string()));
            }
        }

        record.mark_customs_api();
        Ok(TransformOutcome::Record(Box::new(record)))
    }

    /// Get-or-create: codes missing from the reference data are provisioned
    /// with the row's own name, or a placeholder when the row is blank too.
    fn ensure_product(&self, code: &ProductCode, row_name: &str) -> Result<(), TransformError> {
        if self.products.find_product(code)?.is_some() {
            return Ok(());
        }
        let name = row_name.trim();
        let product = ProductRef {
            code: code.clone(),
            name: if name.is_empty() {
                String::from(UNKNOWN_PRODUCT_NAME)
            } else {
                name.to_owned()
            },
            description: None,
            active: true,
        };
        self.products.insert_product(&product)?;
        Ok(())
    }
}
