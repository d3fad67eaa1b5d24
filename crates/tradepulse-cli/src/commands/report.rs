use std::path::Path;

use serde_json::{json, Value};

use tradepulse_core::analytics::AnalyticsEngine;
use tradepulse_core::domain::Money;
use tradepulse_warehouse::Warehouse;

use crate::cli::ReportCommand;
use crate::error::CliError;

pub fn run(report: &ReportCommand, db: &Path) -> Result<Value, CliError> {
    let warehouse = Warehouse::open(db)?;
    let engine = AnalyticsEngine::new();

    let value = match report {
        ReportCommand::Diversity { period } => {
            let totals = warehouse.product_totals(*period)?;
            let values: Vec<Money> = totals.iter().map(|(_, value)| value.clone()).collect();
            json!({
                "period": period.to_string(),
                "product_count": totals.len(),
                "diversity_index": engine.diversity_index(&values),
            })
        }
        ReportCommand::Concentration { period } => {
            let totals = warehouse.country_totals(*period)?;
            let concentration = engine.regional_concentration(&totals)?;
            json!({
                "period": period.to_string(),
                "concentration": concentration,
            })
        }
        ReportCommand::Seasonality { year } => {
            let totals = warehouse.monthly_totals(*year)?;
            serde_json::to_value(engine.seasonality(*year, &totals))?
        }
        ReportCommand::Trend {
            start_year,
            end_year,
        } => {
            let totals = warehouse.yearly_totals(*start_year, *end_year)?;
            serde_json::to_value(engine.growth_trend(*start_year, *end_year, &totals))?
        }
        ReportCommand::Dashboard { year } => {
            let previous = warehouse
                .yearly_totals(year - 1, year - 1)?
                .into_iter()
                .next()
                .map(|(_, total)| total);
            let countries = warehouse.country_totals_for_year(*year)?;
            let products = warehouse.product_totals_for_year(*year)?;
            let monthly = warehouse.monthly_totals(*year)?;
            let summary = engine.dashboard_summary(
                *year,
                previous.as_ref(),
                &countries,
                &products,
                &monthly,
            )?;
            serde_json::to_value(summary)?
        }
    };
    Ok(value)
}
