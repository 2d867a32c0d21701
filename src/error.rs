//! This module defines the single, unified error type for the entire crate.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error
//! handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsxError {
    /// Malformed coordinate input: row/column out of range or a duplicate
    /// coordinate. Surfaced at partition construction.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// More than `CTL_PATTERNS_MAX` distinct patterns were assigned flags.
    /// Fatal for the partition being assembled.
    #[error("pattern flag space exhausted: {0}")]
    LimitExceeded(String),

    /// A consumer of the control stream requested more bytes than remain.
    #[error("control stream overrun: {0}")]
    EncodingOverflow(String),

    /// A serialized CSX image failed structural validation.
    #[error("malformed CSX image: {0}")]
    FormatError(String),

    /// An error from the JSON layer, typically during configuration loading.
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// A failure inside one partition of a multi-partition encode.
    #[error("partition {index}: {source}")]
    Partition {
        index: usize,
        #[source]
        source: Box<CsxError>,
    },
}

impl CsxError {
    /// Attaches a partition index to an error from the fan-out path.
    pub fn in_partition(self, index: usize) -> Self {
        CsxError::Partition {
            index,
            source: Box::new(self),
        }
    }
}
