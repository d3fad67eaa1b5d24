//! Read-side analytics over persisted statistics.
//!
//! The engine is pure: every operation takes the snapshot rows or totals it
//! needs as arguments, so results are consistent for the duration of a call
//! and the engine itself holds no state.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::money::round_half_up;
use crate::domain::{CountryCode, Money, Percentage, ProductCode, StatisticRecord};
use crate::error::ValidationError;

const SHARE_SCALE: u32 = 4;
const CV_SCALE: u32 = 4;
const CAGR_SCALE: u32 = 2;

/// Seasonality threshold: coefficient of variation at or above this marks
/// the year as seasonal.
const SEASONALITY_CV_THRESHOLD: &str = "0.10";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionalConcentration {
    pub total: Money,
    pub top5_share: Percentage,
    pub top10_share: Percentage,
    pub country_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalityAnalysis {
    pub year: i32,
    pub coefficient_of_variation: Decimal,
    pub peak_month: u8,
    pub trough_month: u8,
    pub has_seasonality: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendClassification {
    HighGrowth,
    ModerateGrowth,
    Stable,
    Declining,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthTrendAnalysis {
    pub start_year: i32,
    pub end_year: i32,
    pub cagr: Decimal,
    pub classification: TrendClassification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub value: Money,
    pub share: Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub month: u8,
    pub value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub year: i32,
    pub total_export_value: Money,
    pub yoy_growth: Option<Percentage>,
    pub country_count: usize,
    pub product_count: usize,
    pub top_countries: Vec<RankedEntry>,
    pub top_products: Vec<RankedEntry>,
    pub monthly_trend: Vec<MonthlyTotal>,
}

#[derive(Debug, Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Year-over-year growth. No prior-year record means no rate at all;
    /// an absent comparison is not a flat market.
    pub fn growth_rate_yoy(
        &self,
        current: &StatisticRecord,
        previous: Option<&StatisticRecord>,
    ) -> Option<Percentage> {
        let previous = previous?;
        let prev = previous.export_value().amount();
        let cur = current.export_value().amount();
        Some(if prev.is_zero() {
            if cur > Decimal::ZERO {
                Percentage::new(Decimal::ONE_HUNDRED)
            } else {
                Percentage::zero()
            }
        } else {
            Percentage::calculate(cur - prev, prev)
        })
    }

    /// Share of one record within all records for the same product and
    /// period. Zero market total yields a zero share.
    pub fn market_share(
        &self,
        record: &StatisticRecord,
        same_product_period: &[StatisticRecord],
    ) -> Percentage {
        let total: Decimal = same_product_period
            .iter()
            .map(|r| r.export_value().amount())
            .sum();
        Percentage::calculate(record.export_value().amount(), total)
    }

    /// Product diversification as `1 - HHI` over product totals, with
    /// shares held at 4 decimal places. One product concentrates the whole
    /// index to 0; N equal products approach `1 - 1/N`.
    pub fn diversity_index(&self, product_totals: &[Money]) -> Decimal {
        let total: Decimal = product_totals.iter().map(Money::amount).sum();
        if total.is_zero() {
            return Decimal::ZERO;
        }
        let hhi: Decimal = product_totals
            .iter()
            .map(|value| {
                let share = round_half_up(value.amount() / total, SHARE_SCALE);
                share * share
            })
            .sum();
        round_half_up(Decimal::ONE - hhi, SHARE_SCALE)
    }

    /// How much of the total the largest destinations carry. Expects totals
    /// already sorted descending by value, as the warehouse serves them.
    pub fn regional_concentration(
        &self,
        country_totals_desc: &[(CountryCode, Money)],
    ) -> Result<RegionalConcentration, ValidationError> {
        let mut total = Money::zero(
            country_totals_desc
                .first()
                .map(|(_, value)| value.currency().clone())
                .unwrap_or_else(crate::domain::Currency::usd),
        );
        for (_, value) in country_totals_desc {
            total = total.add(value)?;
        }

        let top_sum = |n: usize| -> Decimal {
            country_totals_desc
                .iter()
                .take(n)
                .map(|(_, value)| value.amount())
                .sum()
        };

        Ok(RegionalConcentration {
            top5_share: Percentage::calculate(top_sum(5), total.amount()),
            top10_share: Percentage::calculate(top_sum(10), total.amount()),
            country_count: country_totals_desc.len(),
            total,
        })
    }

    /// Monthly dispersion within a year. Uses the population standard
    /// deviation over whatever months have data.
    pub fn seasonality(&self, year: i32, monthly_totals: &[(u8, Money)]) -> SeasonalityAnalysis {
        if monthly_totals.is_empty() {
            return SeasonalityAnalysis {
                year,
                coefficient_of_variation: Decimal::ZERO,
                peak_month: 1,
                trough_month: 1,
                has_seasonality: false,
            };
        }

        let amounts: Vec<f64> = monthly_totals
            .iter()
            .map(|(_, value)| value.amount().to_f64().unwrap_or(0.0))
            .collect();
        let count = amounts.len() as f64;
        let mean = amounts.iter().sum::<f64>() / count;

        let cv = if mean == 0.0 {
            Decimal::ZERO
        } else {
            let variance = amounts
                .iter()
                .map(|amount| {
                    let diff = amount - mean;
                    diff * diff
                })
                .sum::<f64>()
                / count;
            round_half_up(
                Decimal::from_f64_retain(variance.sqrt() / mean).unwrap_or_default(),
                CV_SCALE,
            )
        };

        let peak_month = monthly_totals
            .iter()
            .max_by_key(|(_, value)| value.amount())
            .map(|(month, _)| *month)
            .unwrap_or(1);
        let trough_month = monthly_totals
            .iter()
            .min_by_key(|(_, value)| value.amount())
            .map(|(month, _)| *month)
            .unwrap_or(1);

        let threshold: Decimal = SEASONALITY_CV_THRESHOLD
            .parse()
            .unwrap_or(Decimal::ZERO);
        SeasonalityAnalysis {
            year,
            coefficient_of_variation: cv,
            peak_month,
            trough_month,
            has_seasonality: cv >= threshold,
        }
    }

    /// Compound annual growth between the first and last year with data.
    pub fn growth_trend(
        &self,
        start_year: i32,
        end_year: i32,
        yearly_totals: &[(i32, Money)],
    ) -> GrowthTrendAnalysis {
        let insufficient = GrowthTrendAnalysis {
            start_year,
            end_year,
            cagr: Decimal::ZERO,
            classification: TrendClassification::InsufficientData,
        };

        if yearly_totals.len() < 2 {
            return insufficient;
        }
        let (first_year, first) = &yearly_totals[0];
        let (last_year, last) = &yearly_totals[yearly_totals.len() - 1];
        let years = last_year - first_year;
        if years <= 0 || first.is_zero() {
            return insufficient;
        }

        let ratio = last.amount().to_f64().unwrap_or(0.0) / first.amount().to_f64().unwrap_or(1.0);
        let cagr_pct = (ratio.powf(1.0 / f64::from(years as u32)) - 1.0) * 100.0;
        let cagr = round_half_up(
            Decimal::from_f64_retain(cagr_pct).unwrap_or_default(),
            CAGR_SCALE,
        );

        GrowthTrendAnalysis {
            start_year,
            end_year,
            cagr,
            classification: classify_trend(cagr),
        }
    }

    /// One-call dashboard rollup from pre-aggregated snapshot inputs.
    #[allow(clippy::too_many_arguments)]
    pub fn dashboard_summary(
        &self,
        year: i32,
        previous_year_total: Option<&Money>,
        country_totals_desc: &[(CountryCode, Money)],
        product_totals_desc: &[(ProductCode, Money)],
        monthly_totals: &[(u8, Money)],
    ) -> Result<DashboardSummary, ValidationError> {
        let concentration = self.regional_concentration(country_totals_desc)?;
        let total = concentration.total.clone();

        let yoy_growth = previous_year_total.map(|previous| {
            if previous.is_zero() {
                if total.is_positive() {
                    Percentage::new(Decimal::ONE_HUNDRED)
                } else {
                    Percentage::zero()
                }
            } else {
                Percentage::calculate(total.amount() - previous.amount(), previous.amount())
            }
        });

        let ranked = |key: String, value: &Money| RankedEntry {
            key,
            value: value.clone(),
            share: Percentage::calculate(value.amount(), total.amount()),
        };

        Ok(DashboardSummary {
            year,
            yoy_growth,
            country_count: country_totals_desc.len(),
            product_count: product_totals_desc.len(),
            top_countries: country_totals_desc
                .iter()
                .take(10)
                .map(|(code, value)| ranked(code.as_str().to_owned(), value))
                .collect(),
            top_products: product_totals_desc
                .iter()
                .take(10)
                .map(|(code, value)| ranked(code.as_str().to_owned(), value))
                .collect(),
            monthly_trend: monthly_totals
                .iter()
                .map(|(month, value)| MonthlyTotal {
                    month: *month,
                    value: value.clone(),
                })
                .collect(),
            total_export_value: total,
        })
    }
}

fn classify_trend(cagr: Decimal) -> TrendClassification {
    if cagr > Decimal::new(5, 0) {
        TrendClassification::HighGrowth
    } else if cagr > Decimal::ZERO {
        TrendClassification::ModerateGrowth
    } else if cagr > Decimal::new(-5, 0) {
        TrendClassification::Stable
    } else {
        TrendClassification::Declining
    }
}
