//! # z/OS FTP client
//!
//! Drives an IBM z/OS FTP server through its extended command
//! surface: dataset and PDS-member transfers, JES job submission and
//! spool retrieval, `SITE` parameter discipline, and `STAT`/`XSTA`
//! status queries.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use zos_ftp::{DialOptions, FtpSession, TransferType};
//!
//! fn main() -> zos_ftp::Result<()> {
//!     let session = FtpSession::open(
//!         "zos.example.com:21",
//!         DialOptions::new().with_timeout(Duration::from_secs(10)),
//!     )?;
//!     session.login("IBMUSER", "secret")?;
//!
//!     let datasets = session.list_datasets("'IBMUSER.*'")?;
//!     for ds in &datasets {
//!         println!("{} {}", ds.name(), ds.dsorg);
//!     }
//!
//!     let job = session.submit_jcl("//MYJOB JOB CLASS=A\n//S1 EXEC PGM=IEFBR14\n")?;
//!     println!("submitted as {}", job.id);
//!
//!     session.close()
//! }
//! ```
//!
//! A session serializes control exchanges on an internal mutex and
//! tracks its passive data connections for cleanup; the handle
//! clones cheaply so another thread can trigger
//! [`FtpSession::close`]. The library installs no signal handlers —
//! wire your own around `close`.

pub mod attributes;
pub mod command;
mod connection;
pub mod eol;
pub mod error;
pub mod files;
pub mod jes;
pub mod listing;
mod log;
pub mod options;
pub mod passive;
pub mod reply;
pub mod session;
pub mod site;
pub mod status;
pub mod transfer;

pub use attributes::{DataSpec, RecordFormat, MAX_BLOCK_SIZE, MAX_RECORD_LENGTH, MIN_BLOCK_SIZE};
pub use command::CancelToken;
pub use eol::Eol;
pub use error::{FtpError, JesError, Result};
pub use jes::{JesJob, JesOptions, JobResult};
pub use log::{set_level as set_log_level, LogLevel};
pub use options::DialOptions;
pub use passive::DataConnection;
pub use reply::ReplyCode;
pub use session::FtpSession;
pub use site::JesStatus;
pub use status::ServerStatus;
pub use transfer::TransferType;

// Re-exported so callers can consume typed listings without a second
// dependency declaration.
pub use zos_ftp_records as records;
