//! Canonical value types for foreign-trade statistics.

mod country;
pub(crate) mod money;
mod percentage;
mod period;
mod product_code;
pub mod record;

pub use country::CountryCode;
pub use money::{Currency, Money};
pub use percentage::Percentage;
pub use period::Period;
pub use product_code::ProductCode;
pub use record::{ImportData, RecordEvent, RecordSource, StatisticRecord};
