//! The listing engine: `LIST` / `NLST` over a fresh passive data
//! connection, and the typed listings layered on top.
//!
//! Typed listings scope the server's `FILETYPE` for their duration,
//! skip the header row, and hand the raw records to the parsers in
//! `zos-ftp-records`.

use std::sync::LazyLock;

use regex::Regex;

use zos_ftp_records::{self as records, DatasetEntry, JobEntry, PdsMember};

use crate::error::{FtpError, Result};
use crate::log;
use crate::reply::ReplyCode;
use crate::session::FtpSession;
use crate::transfer::TransferType;

/// Matches a JES search mask: wildcards, or an all-blank expression.
pub(crate) static SEARCH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*?]|^\s*$").unwrap());

/// Listing verbs. `NLST` rows are whitespace-trimmed; `LIST` rows
/// keep their column alignment for the positional parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListVerb {
    List,
    Nlst,
}

impl ListVerb {
    fn wire(&self) -> &'static str {
        match self {
            ListVerb::List => "LIST",
            ListVerb::Nlst => "NLST",
        }
    }

    fn trims(&self) -> bool {
        matches!(self, ListVerb::Nlst)
    }
}

impl FtpSession {
    /// Raw `LIST`: full records with attributes.
    pub fn list(&self, expression: &str) -> Result<Vec<String>> {
        self.any_list(ListVerb::List, expression)
    }

    /// Raw `NLST`: bare names, trimmed.
    pub fn nlist(&self, expression: &str) -> Result<Vec<String>> {
        self.any_list(ListVerb::Nlst, expression)
    }

    fn any_list(&self, verb: ListVerb, expression: &str) -> Result<Vec<String>> {
        let current = self.current_type();
        let switched = !current.is_ascii();
        if switched {
            self.set_type(TransferType::Ascii)?;
        }

        let result = self.collect_list(verb, expression);

        if switched {
            if let Err(e) = self.set_type(current) {
                log::error(&format!("error restoring transfer type: {e}"));
            }
        }
        result
    }

    fn collect_list(&self, verb: ListVerb, expression: &str) -> Result<Vec<String>> {
        let port = self.set_passive_mode()?;
        let child = self.new_data_connection(port)?;

        let result = (|| {
            self.send_command(ReplyCode::ListOk, verb.wire(), &[expression])?;

            let mut lines = Vec::new();
            while let Some(line) = child.scan_line()? {
                let line = if verb.trims() {
                    line.trim().to_string()
                } else {
                    line
                };
                log::passive(&line);
                lines.push(line);
            }

            child.close()?;

            self.check_last(ReplyCode::FileActionOk)?;
            Ok(lines)
        })();

        if !child.is_closed() {
            if let Err(e) = child.close() {
                log::error(&format!("error closing data connection: {e}"));
            }
        }

        result
    }

    /// List datasets matching `expression`, parsed with attributes.
    pub fn list_datasets(&self, expression: &str) -> Result<Vec<DatasetEntry>> {
        let _scope = self.scoped_file_type("SEQ")?;

        let lines = self.list(expression)?;
        lines
            .iter()
            .skip(1)
            .map(|line| records::parse_dataset(line).map_err(FtpError::from))
            .collect()
    }

    /// List the members of a partitioned dataset.
    pub fn list_members(&self, expression: &str) -> Result<Vec<PdsMember>> {
        let _scope = self.scoped_file_type("SEQ")?;

        let lines = self.list(expression)?;
        lines
            .iter()
            .skip(1)
            .map(|line| records::parse_member(line).map_err(FtpError::from))
            .collect()
    }

    /// List jobs on the JES spool matching a search mask. The mask
    /// must actually be a mask: wildcards only, an exact job id goes
    /// through [`job_status`](Self::job_status).
    pub fn list_spool(&self, expression: &str) -> Result<Vec<JobEntry>> {
        let expression = expression.trim();
        let expression = if expression.is_empty() { "*" } else { expression };
        if !SEARCH_PATTERN.is_match(expression) {
            return Err(FtpError::InvalidArgument(format!(
                "invalid search pattern: {expression}"
            )));
        }

        let _scope = self.scoped_file_type("JES")?;

        let lines = self.list(expression)?;
        records::parse_jobs(&lines).map_err(FtpError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
