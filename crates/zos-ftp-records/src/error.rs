//! Record parsing error types.

use thiserror::Error;

/// Errors produced while parsing listing records.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// The record is shorter than the fixed column layout requires.
    #[error("record too short: {0} bytes")]
    RecordTooShort(usize),

    /// A fixed field failed to parse.
    #[error("failed to parse {field} field: {detail}")]
    Field { field: &'static str, detail: String },

    /// A whitespace-delimited record did not split into the expected
    /// number of columns.
    #[error("invalid record: '{0}'")]
    InvalidRecord(String),

    /// The listing contained no records at all.
    #[error("no records provided")]
    Empty,

    /// A job-detail block was not shaped like a detail block.
    #[error("cannot get spool detail: '{0}'")]
    MalformedDetail(String),

    /// The trailing `<n> spool files` count did not match the number
    /// of detail rows parsed.
    #[error("got {actual} spool files, expected {expected}")]
    SpoolCountMismatch { expected: usize, actual: usize },

    /// The job `Class` column carried no recognizable return code.
    #[error("no return code found in '{0}'")]
    NoReturnCode(String),
}

impl RecordsError {
    pub(crate) fn field(field: &'static str, detail: impl Into<String>) -> Self {
        RecordsError::Field {
            field,
            detail: detail.into(),
        }
    }
}
