use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Calendar month a statistic belongs to.
///
/// Ordered chronologically; arithmetic is calendar-correct across year
/// boundaries and fails only when it would leave the 1900-2100 window.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Period {
    year: i32,
    month: u8,
}

impl Period {
    pub fn new(year: i32, month: u8) -> Result<Self, ValidationError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ValidationError::YearOutOfRange { year });
        }
        if !(1..=12).contains(&month) {
            return Err(ValidationError::MonthOutOfRange { month });
        }
        Ok(Self { year, month })
    }

    /// Parses a 6-digit `YYYYMM` token, the remote source's period format.
    pub fn parse_yyyymm(token: &str) -> Result<Self, ValidationError> {
        let trimmed = token.trim();
        if trimmed.len() != 6 || !trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(ValidationError::MalformedPeriod {
                value: token.to_owned(),
            });
        }
        let year: i32 = trimmed[..4].parse().map_err(|_| ValidationError::MalformedPeriod {
            value: token.to_owned(),
        })?;
        let month: u8 = trimmed[4..].parse().map_err(|_| ValidationError::MalformedPeriod {
            value: token.to_owned(),
        })?;
        Self::new(year, month)
    }

    pub fn format_yyyymm(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn next_month(&self) -> Result<Self, ValidationError> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    pub fn previous_month(&self) -> Result<Self, ValidationError> {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    pub fn same_month_previous_year(&self) -> Result<Self, ValidationError> {
        Self::new(self.year - 1, self.month)
    }

    /// Current calendar month from the wall clock.
    pub fn current() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            year: now.year(),
            month: now.month() as u8,
        }
    }

    /// Previous calendar month, the pipeline's default sync target.
    pub fn previous_calendar_month() -> Self {
        Self::current()
            .previous_month()
            .expect("current date is within the supported year range")
    }

    pub fn is_after(&self, other: &Period) -> bool {
        self > other
    }

    pub fn is_before(&self, other: &Period) -> bool {
        self < other
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
