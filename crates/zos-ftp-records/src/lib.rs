//! # z/OS FTP listing records
//!
//! Column-positional parsers for the listing formats a z/OS FTP
//! server produces, plus the fixed-field value types they are built
//! from.
//!
//! - **Datasets** — `LIST` under `FILETYPE=SEQ`
//! - **PDS members** — `LIST` of a partitioned dataset
//! - **JES jobs** — `LIST` under `FILETYPE=JES`, interface levels 1
//!   and 2, with optional spool detail blocks
//!
//! The parsers take the raw lines collected over a data connection;
//! driving the listing itself is the `zos-ftp` crate's job.

pub mod dataset;
pub mod error;
pub mod fields;
pub mod job;
pub mod pds;

pub use dataset::{parse_dataset, DatasetEntry};
pub use error::RecordsError;
pub use fields::{FieldDate, FieldFloat, FieldInt, FieldString, FieldTimestamp};
pub use job::{parse_job_detail, parse_jobs, JobDetail, JobEntry, JobOutcome, SpoolFile};
pub use pds::{parse_member, PdsMember};

/// Convenience result type for record parsing.
pub type Result<T> = std::result::Result<T, RecordsError>;
