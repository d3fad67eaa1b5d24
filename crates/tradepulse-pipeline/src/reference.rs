use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use tradepulse_core::filter::ReferenceProductCode;

#[derive(Debug, Error)]
pub enum ReferenceError {
    /// A missing or unreadable file is fatal; bad rows inside it are not.
    #[error("cannot read reference file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse reference file: {0}")]
    Malformed(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct ReferenceRow {
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

/// Reads the `{code, name, description}` CSV that scopes ingestion.
///
/// Rows without a code, or rows the CSV layer cannot decode, are skipped
/// with a warning; the rest of the file still loads.
pub fn read_reference_codes(path: &Path) -> Result<Vec<ReferenceProductCode>, ReferenceError> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut references = Vec::new();
    for (index, row) in reader.deserialize::<ReferenceRow>().enumerate() {
        let line = index + 2; // header occupies line 1
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(line, error = %e, "skipping unreadable reference row");
                continue;
            }
        };
        if row.code.trim().is_empty() {
            warn!(line, "skipping reference row with a blank code");
            continue;
        }
        references.push(ReferenceProductCode {
            code: row.code.trim().to_owned(),
            name: row.name.trim().to_owned(),
            description: row.description.trim().to_owned(),
        });
    }
    Ok(references)
}
