use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] tradepulse_core::ConfigError),

    #[error(transparent)]
    Validation(#[from] tradepulse_core::ValidationError),

    #[error(transparent)]
    Warehouse(#[from] tradepulse_warehouse::WarehouseError),

    #[error("sync run failed: {message}")]
    SyncFailed { message: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) => 2,
            Self::SyncFailed { .. } => 3,
            Self::Warehouse(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
