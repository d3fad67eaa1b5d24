//! Ingestion orchestration for tradepulse.
//!
//! One sync run walks three stages: load the reference code list, fetch
//! and persist the target period through the resilient source, then
//! reconcile counters into a [`RunReport`].

pub mod pipeline;
pub mod reference;

pub use pipeline::{
    IngestionPipeline, PipelineConfig, RunReport, SyncState, DEFAULT_CHUNK_SIZE,
};
pub use reference::{read_reference_codes, ReferenceError};
