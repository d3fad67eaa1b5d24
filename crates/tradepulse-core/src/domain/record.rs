use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::{CountryCode, Money, Percentage, Period, ProductCode};

/// Where a statistic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Manual,
    CustomsApi,
}

/// Import-side figures, attached only when the source reported a positive
/// import value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportData {
    pub value: Money,
    pub weight_kg: Option<Decimal>,
    pub trade_balance: Option<Decimal>,
}

/// Output events returned from mutating calls on [`StatisticRecord`].
///
/// Consumers (the ingestion pipeline) receive these synchronously from the
/// call that produced them; there is no hidden event buffer on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum RecordEvent {
    Created {
        country: CountryCode,
        product: ProductCode,
        period: Period,
        value: Money,
    },
    ValueUpdated {
        country: CountryCode,
        product: ProductCode,
        period: Period,
        previous: Money,
        current: Money,
    },
    ThresholdExceeded {
        country: CountryCode,
        product: ProductCode,
        period: Period,
        value: Money,
    },
}

/// Export value above which a [`RecordEvent::ThresholdExceeded`] is raised.
fn alert_threshold() -> Decimal {
    Decimal::from(1_000_000_000u64)
}

/// One foreign-trade statistic, uniquely identified by its natural key
/// `(country, product, period)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    country: CountryCode,
    product: ProductCode,
    period: Period,
    export_value: Money,
    export_weight_kg: Option<Decimal>,
    export_quantity: Option<Decimal>,
    quantity_unit: Option<String>,
    import_data: Option<ImportData>,
    growth_rate_yoy: Option<Percentage>,
    market_share: Option<Percentage>,
    source: RecordSource,
}

impl StatisticRecord {
    pub fn new(
        country: CountryCode,
        product: ProductCode,
        period: Period,
        export_value: Money,
    ) -> Result<Self, ValidationError> {
        if period.is_after(&Period::current()) {
            return Err(ValidationError::FuturePeriod {
                period: period.to_string(),
            });
        }
        Ok(Self {
            country,
            product,
            period,
            export_value,
            export_weight_kg: None,
            export_quantity: None,
            quantity_unit: None,
            import_data: None,
            growth_rate_yoy: None,
            market_share: None,
            source: RecordSource::Manual,
        })
    }

    /// Rehydrates a record from storage; skips the future-period guard since
    /// persisted rows were validated when written.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        country: CountryCode,
        product: ProductCode,
        period: Period,
        export_value: Money,
        export_weight_kg: Option<Decimal>,
        export_quantity: Option<Decimal>,
        quantity_unit: Option<String>,
        import_data: Option<ImportData>,
        growth_rate_yoy: Option<Percentage>,
        market_share: Option<Percentage>,
        source: RecordSource,
    ) -> Self {
        Self {
            country,
            product,
            period,
            export_value,
            export_weight_kg,
            export_quantity,
            quantity_unit,
            import_data,
            growth_rate_yoy,
            market_share,
            source,
        }
    }

    pub fn country(&self) -> &CountryCode {
        &self.country
    }

    pub fn product(&self) -> &ProductCode {
        &self.product
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn export_value(&self) -> &Money {
        &self.export_value
    }

    pub fn export_weight_kg(&self) -> Option<Decimal> {
        self.export_weight_kg
    }

    pub fn export_quantity(&self) -> Option<Decimal> {
        self.export_quantity
    }

    pub fn quantity_unit(&self) -> Option<&str> {
        self.quantity_unit.as_deref()
    }

    pub fn import_data(&self) -> Option<&ImportData> {
        self.import_data.as_ref()
    }

    pub fn growth_rate_yoy(&self) -> Option<Percentage> {
        self.growth_rate_yoy
    }

    pub fn market_share(&self) -> Option<Percentage> {
        self.market_share
    }

    pub fn source(&self) -> RecordSource {
        self.source
    }

    pub fn is_customs_api(&self) -> bool {
        self.source == RecordSource::CustomsApi
    }

    pub fn mark_customs_api(&mut self) {
        self.source = RecordSource::CustomsApi;
    }

    /// True when both records address the same natural key.
    pub fn same_key(&self, other: &StatisticRecord) -> bool {
        self.country == other.country
            && self.product == other.product
            && self.period == other.period
    }

    pub fn created_event(&self) -> RecordEvent {
        RecordEvent::Created {
            country: self.country.clone(),
            product: self.product.clone(),
            period: self.period,
            value: self.export_value.clone(),
        }
    }

    pub fn update_export_value(&mut self, value: Money) -> Result<Vec<RecordEvent>, ValidationError> {
        if value.currency() != self.export_value.currency() {
            return Err(ValidationError::CurrencyMismatch {
                left: self.export_value.currency().as_str().to_owned(),
                right: value.currency().as_str().to_owned(),
            });
        }

        let mut events = Vec::new();
        if value != self.export_value {
            let previous = std::mem::replace(&mut self.export_value, value);
            events.push(RecordEvent::ValueUpdated {
                country: self.country.clone(),
                product: self.product.clone(),
                period: self.period,
                previous: previous.clone(),
                current: self.export_value.clone(),
            });

            let threshold = alert_threshold();
            if previous.amount() < threshold && self.export_value.amount() >= threshold {
                events.push(RecordEvent::ThresholdExceeded {
                    country: self.country.clone(),
                    product: self.product.clone(),
                    period: self.period,
                    value: self.export_value.clone(),
                });
            }
        }
        Ok(events)
    }

    pub fn set_weight(&mut self, weight_kg: Decimal) -> Result<(), ValidationError> {
        if weight_kg < Decimal::ZERO {
            return Err(ValidationError::NegativeWeight);
        }
        self.export_weight_kg = Some(weight_kg);
        Ok(())
    }

    pub fn set_quantity(&mut self, quantity: Decimal, unit: &str) -> Result<(), ValidationError> {
        if quantity < Decimal::ZERO {
            return Err(ValidationError::NegativeQuantity);
        }
        if unit.trim().is_empty() {
            return Err(ValidationError::MissingQuantityUnit);
        }
        self.export_quantity = Some(quantity);
        self.quantity_unit = Some(unit.trim().to_owned());
        Ok(())
    }

    pub fn set_import_data(
        &mut self,
        value: Money,
        weight_kg: Option<Decimal>,
        trade_balance: Option<Decimal>,
    ) -> Result<(), ValidationError> {
        if let Some(weight) = weight_kg {
            if weight < Decimal::ZERO {
                return Err(ValidationError::NegativeWeight);
            }
        }
        self.import_data = Some(ImportData {
            value,
            weight_kg,
            trade_balance,
        });
        Ok(())
    }

    /// The writer's field merge: takes the incoming record's export value,
    /// weight, quantity, import block, and provenance into this one.
    pub fn merge_from(&mut self, other: &StatisticRecord) -> Result<Vec<RecordEvent>, ValidationError> {
        let events = self.update_export_value(other.export_value.clone())?;

        if let Some(weight) = other.export_weight_kg {
            self.set_weight(weight)?;
        }
        if let (Some(quantity), Some(unit)) = (other.export_quantity, other.quantity_unit.as_deref())
        {
            self.set_quantity(quantity, unit)?;
        }
        if let Some(import) = &other.import_data {
            self.set_import_data(
                import.value.clone(),
                import.weight_kg,
                import.trade_balance,
            )?;
        }
        if other.is_customs_api() {
            self.mark_customs_api();
        }
        Ok(events)
    }

    /// Year-over-year growth against the prior-year export value.
    ///
    /// No comparison record means the rate stays absent; a synthetic zero
    /// would be indistinguishable from a genuinely flat market.
    pub fn recompute_growth_rate(
        &mut self,
        previous: Option<&Money>,
    ) -> Result<(), ValidationError> {
        let Some(previous) = previous else {
            self.growth_rate_yoy = None;
            return Ok(());
        };
        if previous.currency() != self.export_value.currency() {
            return Err(ValidationError::CurrencyMismatch {
                left: self.export_value.currency().as_str().to_owned(),
                right: previous.currency().as_str().to_owned(),
            });
        }

        self.growth_rate_yoy = Some(if previous.is_zero() {
            if self.export_value.is_positive() {
                Percentage::new(Decimal::ONE_HUNDRED)
            } else {
                Percentage::zero()
            }
        } else {
            Percentage::calculate(
                self.export_value.amount() - previous.amount(),
                previous.amount(),
            )
        });
        Ok(())
    }

    /// Share of this record's value within the total market for its
    /// product and period; a zero total yields a zero share.
    pub fn recompute_market_share(&mut self, total: &Money) -> Result<(), ValidationError> {
        if total.currency() != self.export_value.currency() {
            return Err(ValidationError::CurrencyMismatch {
                left: self.export_value.currency().as_str().to_owned(),
                right: total.currency().as_str().to_owned(),
            });
        }
        self.market_share = Some(Percentage::calculate(
            self.export_value.amount(),
            total.amount(),
        ));
        Ok(())
    }

    /// Unit value per kilogram; requires a positive weight.
    pub fn value_per_kg(&self) -> Result<Money, ValidationError> {
        let weight = self
            .export_weight_kg
            .filter(|w| *w > Decimal::ZERO)
            .ok_or(ValidationError::MissingWeight)?;
        self.export_value.divide(weight)
    }
}
