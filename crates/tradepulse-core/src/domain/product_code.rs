use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hierarchical HS product code: 2-10 digits, where each level adds two
/// digits. A level-N code is exactly `N * 2` digits; the parent is the
/// first `(N - 1) * 2` digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductCode {
    value: String,
    level: u8,
}

impl ProductCode {
    pub fn parse(code: &str, level: u8) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.is_empty()
            || trimmed.len() < 2
            || trimmed.len() > 10
            || !trimmed.chars().all(|ch| ch.is_ascii_digit())
        {
            return Err(ValidationError::InvalidProductCode {
                value: code.to_owned(),
            });
        }
        if !(1..=6).contains(&level) {
            return Err(ValidationError::ProductLevelOutOfRange { level });
        }
        let expected = usize::from(level) * 2;
        if trimmed.len() != expected {
            return Err(ValidationError::ProductCodeLengthMismatch {
                level,
                expected,
                value: code.to_owned(),
            });
        }
        Ok(Self {
            value: trimmed.to_owned(),
            level,
        })
    }

    /// Infers the hierarchy level from the digit count (2 digits -> level 1,
    /// 4 -> 2, ... 10 -> 5). Odd-length codes cannot sit on the hierarchy
    /// and are rejected.
    pub fn with_inferred_level(code: &str) -> Result<Self, ValidationError> {
        let trimmed = code.trim();
        if trimmed.len() % 2 != 0 {
            return Err(ValidationError::InvalidProductCode {
                value: code.to_owned(),
            });
        }
        let level = (trimmed.len() / 2) as u8;
        Self::parse(trimmed, level)
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn parent(&self) -> Result<ProductCode, ValidationError> {
        if self.level <= 1 {
            return Err(ValidationError::ProductCodeHasNoParent);
        }
        let parent_len = usize::from(self.level - 1) * 2;
        ProductCode::parse(&self.value[..parent_len], self.level - 1)
    }

    /// Top-level chapter (first two digits).
    pub fn chapter(&self) -> ProductCode {
        if self.level == 1 {
            return self.clone();
        }
        ProductCode {
            value: self.value[..2].to_owned(),
            level: 1,
        }
    }
}

impl Display for ProductCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}
