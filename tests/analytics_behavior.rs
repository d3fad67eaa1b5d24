//! Behavior tests for the analytics engine fed from warehouse aggregates,
//! the way the report commands wire them together.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tradepulse_core::analytics::{AnalyticsEngine, TrendClassification};
use tradepulse_core::domain::{CountryCode, Money, Period, ProductCode, StatisticRecord};
use tradepulse_warehouse::Warehouse;

fn period(year: i32, month: u8) -> Period {
    Period::new(year, month).expect("period")
}

fn usd(amount: Decimal) -> Money {
    Money::usd(amount).expect("money")
}

fn record(country: &str, product: &str, period: Period, amount: Decimal) -> StatisticRecord {
    StatisticRecord::new(
        CountryCode::parse(country).expect("country"),
        ProductCode::with_inferred_level(product).expect("code"),
        period,
        usd(amount),
    )
    .expect("record")
}

fn seeded(records: Vec<StatisticRecord>) -> Warehouse {
    let warehouse = Warehouse::open_in_memory().expect("warehouse");
    warehouse.upsert_chunk(&records).expect("seed");
    warehouse
}

#[test]
fn diversity_over_warehouse_product_totals() {
    let when = period(2023, 10);
    let warehouse = seeded(vec![
        record("WLD", "8542", when, dec!(250)),
        record("WLD", "9013", when, dec!(250)),
        record("WLD", "2710", when, dec!(250)),
        record("WLD", "8703", when, dec!(250)),
    ]);
    let engine = AnalyticsEngine::new();

    let totals = warehouse.product_totals(when).expect("totals");
    let values: Vec<Money> = totals.into_iter().map(|(_, value)| value).collect();

    // Four equal products: 1 - 4 * 0.25^2.
    assert_eq!(engine.diversity_index(&values), dec!(0.75));
}

#[test]
fn a_single_product_market_has_zero_diversity() {
    let when = period(2023, 10);
    let warehouse = seeded(vec![record("WLD", "8542", when, dec!(1000))]);
    let engine = AnalyticsEngine::new();

    let totals = warehouse.product_totals(when).expect("totals");
    let values: Vec<Money> = totals.into_iter().map(|(_, value)| value).collect();

    assert_eq!(engine.diversity_index(&values), dec!(0.0000));
}

#[test]
fn concentration_from_descending_country_totals() {
    let when = period(2023, 10);
    let warehouse = seeded(vec![
        record("USA", "8542", when, dec!(500)),
        record("CHN", "8542", when, dec!(300)),
        record("JPN", "8542", when, dec!(200)),
    ]);
    let engine = AnalyticsEngine::new();

    let totals = warehouse.country_totals(when).expect("totals");
    assert_eq!(totals[0].0.as_str(), "USA");
    assert_eq!(totals[2].0.as_str(), "JPN");

    let concentration = engine.regional_concentration(&totals).expect("concentration");
    assert_eq!(concentration.total.amount(), dec!(1000.00));
    assert_eq!(concentration.country_count, 3);
    // Three destinations all land inside the top five.
    assert_eq!(concentration.top5_share.value(), dec!(100.00));
}

#[test]
fn seasonality_of_a_flat_year_is_quiet() {
    let records = (1..=12)
        .map(|month| record("WLD", "8542", period(2023, month), dec!(100)))
        .collect();
    let warehouse = seeded(records);
    let engine = AnalyticsEngine::new();

    let monthly = warehouse.monthly_totals(2023).expect("monthly");
    assert_eq!(monthly.len(), 12);

    let analysis = engine.seasonality(2023, &monthly);
    assert_eq!(analysis.coefficient_of_variation, Decimal::ZERO);
    assert!(!analysis.has_seasonality);
}

#[test]
fn seasonality_flags_a_december_spike() {
    let mut records: Vec<StatisticRecord> = (1..=11)
        .map(|month| record("WLD", "8542", period(2023, month), dec!(100)))
        .collect();
    records.push(record("WLD", "8542", period(2023, 12), dec!(600)));
    let warehouse = seeded(records);
    let engine = AnalyticsEngine::new();

    let analysis = engine.seasonality(2023, &warehouse.monthly_totals(2023).expect("monthly"));
    assert!(analysis.has_seasonality);
    assert_eq!(analysis.peak_month, 12);
    assert_eq!(analysis.trough_month, 1);
}

#[test]
fn growth_trend_from_yearly_totals() {
    let warehouse = seeded(vec![
        record("WLD", "8542", period(2020, 6), dec!(1000)),
        record("WLD", "8542", period(2021, 6), dec!(1300)),
        record("WLD", "8542", period(2022, 6), dec!(1600)),
        record("WLD", "8542", period(2023, 6), dec!(2000)),
    ]);
    let engine = AnalyticsEngine::new();

    let yearly = warehouse.yearly_totals(2020, 2023).expect("yearly");
    assert_eq!(yearly.len(), 4);

    let trend = engine.growth_trend(2020, 2023, &yearly);
    // Doubling over three years compounds to just under 26% per year.
    assert_eq!(trend.cagr, dec!(25.99));
    assert_eq!(trend.classification, TrendClassification::HighGrowth);
}

#[test]
fn growth_trend_with_one_year_of_data_is_inconclusive() {
    let warehouse = seeded(vec![record("WLD", "8542", period(2023, 6), dec!(1000))]);
    let engine = AnalyticsEngine::new();

    let yearly = warehouse.yearly_totals(2020, 2023).expect("yearly");
    let trend = engine.growth_trend(2020, 2023, &yearly);
    assert_eq!(trend.classification, TrendClassification::InsufficientData);
    assert_eq!(trend.cagr, Decimal::ZERO);
}

#[test]
fn dashboard_rolls_up_a_year_of_warehouse_data() {
    let warehouse = seeded(vec![
        record("WLD", "8542", period(2022, 6), dec!(800)),
        record("USA", "8542", period(2023, 3), dec!(600)),
        record("CHN", "9013", period(2023, 9), dec!(400)),
    ]);
    let engine = AnalyticsEngine::new();

    let previous = warehouse
        .yearly_totals(2022, 2022)
        .expect("previous")
        .into_iter()
        .next()
        .map(|(_, total)| total);
    let countries = warehouse.country_totals_for_year(2023).expect("countries");
    let products = warehouse.product_totals_for_year(2023).expect("products");
    let monthly = warehouse.monthly_totals(2023).expect("monthly");

    let summary = engine
        .dashboard_summary(2023, previous.as_ref(), &countries, &products, &monthly)
        .expect("summary");

    assert_eq!(summary.total_export_value.amount(), dec!(1000.00));
    assert_eq!(summary.yoy_growth.expect("growth").value(), dec!(25.00));
    assert_eq!(summary.country_count, 2);
    assert_eq!(summary.product_count, 2);
    assert_eq!(summary.top_countries[0].key, "USA");
    assert_eq!(summary.top_countries[0].share.value(), dec!(60.00));
    assert_eq!(summary.top_products[0].key, "8542");
    assert_eq!(summary.monthly_trend.len(), 2);
}

#[test]
fn growth_rate_is_absent_without_a_prior_year_record() {
    let warehouse = seeded(vec![record("WLD", "8542", period(2023, 10), dec!(500))]);
    let engine = AnalyticsEngine::new();

    let current = warehouse
        .find_statistic(
            &CountryCode::world(),
            &ProductCode::with_inferred_level("8542").expect("code"),
            period(2023, 10),
        )
        .expect("query")
        .expect("record");
    let previous = warehouse
        .find_statistic(
            &CountryCode::world(),
            &ProductCode::with_inferred_level("8542").expect("code"),
            period(2022, 10),
        )
        .expect("query");

    assert!(previous.is_none());
    assert_eq!(engine.growth_rate_yoy(&current, previous.as_ref()), None);
}
