use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// ISO-style 3-letter country code.
///
/// The remote trade source carries no country dimension; its rows are
/// attributed to the synthetic `WLD` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    pub const WORLD: &'static str = "WLD";

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let is_valid =
            normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());
        if !is_valid {
            return Err(ValidationError::InvalidCountryCode {
                value: input.to_owned(),
            });
        }
        Ok(Self(normalized))
    }

    pub fn world() -> Self {
        Self(String::from(Self::WORLD))
    }

    pub fn is_world(&self) -> bool {
        self.0 == Self::WORLD
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CountryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
