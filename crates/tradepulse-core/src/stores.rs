use thiserror::Error;

use crate::domain::{CountryCode, ProductCode};

/// Reference row for a country known to the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryRef {
    pub code: CountryCode,
    pub name: String,
    pub region: Option<String>,
    pub active: bool,
}

/// Reference row for a product code known to the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub code: ProductCode,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
}

/// Store-level failure surfaced to the transformer and pipeline.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Country lookups needed while transforming remote rows.
pub trait CountryStore {
    fn find_country(&self, code: &CountryCode) -> Result<Option<CountryRef>, StoreError>;
}

/// Product lookups and auto-provisioning for codes seen in remote rows.
pub trait ProductStore {
    fn find_product(&self, code: &ProductCode) -> Result<Option<ProductRef>, StoreError>;
    fn insert_product(&self, product: &ProductRef) -> Result<(), StoreError>;
}
