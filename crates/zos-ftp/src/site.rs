//! `SITE` sub-commands and the scoped set-and-restore discipline.
//!
//! The z/OS server acknowledges `SITE` with 200 even when it did not
//! apply a sub-parameter, so the reply text is inspected for the
//! rejection phrases and surfaced as an error.
//!
//! Typed setters validate their argument domain locally; an
//! out-of-domain value never reaches the server.

use crate::eol::Eol;
use crate::error::{FtpError, Result};
use crate::log;
use crate::reply::ReplyCode;
use crate::session::FtpSession;

/// `JESSTATUS` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JesStatus {
    All,
    Active,
    Output,
    Input,
    Execution,
    JobLog,
    JobMsg,
    JobStatus,
}

impl JesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JesStatus::All => "ALL",
            JesStatus::Active => "ACTIVE",
            JesStatus::Output => "OUTPUT",
            JesStatus::Input => "INPUT",
            JesStatus::Execution => "EXECUTION",
            JesStatus::JobLog => "JOBLOG",
            JesStatus::JobMsg => "JOBMSG",
            JesStatus::JobStatus => "JOBSTATUS",
        }
    }
}

impl FtpSession {
    /// Send a `SITE` sub-command, expecting 200. A nominally
    /// successful reply that carries a rejection phrase is surfaced
    /// as [`FtpError::SiteRejected`].
    pub fn site(&self, sub_command: &str) -> Result<String> {
        let sub_command = sub_command.trim().to_uppercase();
        let reply = self.send_command(ReplyCode::CmdOk, "SITE", &[&sub_command])?;

        for phrase in ["Unrecognized parameter", "Parameter ignored"] {
            if reply.contains(phrase) {
                let first_line = reply.lines().next().unwrap_or_default().to_string();
                return Err(FtpError::SiteRejected {
                    command: sub_command,
                    detail: first_line,
                });
            }
        }
        Ok(reply)
    }

    /// Typed `SITE` setters for the session.
    pub fn site_params(&self) -> SiteSetter<'_> {
        SiteSetter { session: self }
    }
}

// ---------------------------------------------------------------------------
// Typed setters
// ---------------------------------------------------------------------------

/// Typed wrappers over [`FtpSession::site`] with local domain
/// validation.
pub struct SiteSetter<'s> {
    session: &'s FtpSession,
}

impl SiteSetter<'_> {
    /// `FILETYPE` selects the server's method of operation. Valid
    /// values start with `SEQ`, `SQL`, or `JES` (modifiers such as
    /// `JES NOJESGETBYDSN` ride along).
    pub fn file_type(&self, value: &str) -> Result<()> {
        let value = value.trim().to_uppercase();
        if !["SEQ", "SQL", "JES"].iter().any(|p| value.starts_with(p)) {
            return Err(FtpError::InvalidArgument(format!(
                "FILETYPE '{value}', Unrecognized parameter"
            )));
        }
        self.session.site(&format!("FILETYPE={value}")).map(drop)
    }

    /// Number of entries a JES `LIST`/`NLST` may display at once.
    pub fn jes_entry_limit(&self, limit: u32) -> Result<()> {
        if limit > 1024 {
            return Err(FtpError::InvalidArgument(format!(
                "JESENTRYLIMIT must be between 0 and 1024, got {limit}"
            )));
        }
        self.session
            .site(&format!("JESENTRYLIMIT={limit}"))
            .map(drop)
    }

    /// Whether JES output is retrieved by dataset name rather than
    /// by job name.
    pub fn jes_get_by_dsn(&self, enabled: bool) -> Result<()> {
        let sub = if enabled { "JESGETBYDSN" } else { "NOJESGETBYDSN" };
        self.session.site(sub).map(drop)
    }

    /// Job-name filter applied to JES listings and retrieves.
    pub fn jes_job_name(&self, expression: &str) -> Result<()> {
        self.session
            .site(&format!("JESJOBNAME={expression}"))
            .map(drop)
    }

    /// Record length for the JES internal reader.
    pub fn jes_lrecl(&self, length: u16) -> Result<()> {
        if !(1..=254).contains(&length) {
            return Err(FtpError::InvalidArgument(format!(
                "JESLRECL must be between 1 and 254, got {length}"
            )));
        }
        self.session.site(&format!("JESLRECL={length}")).map(drop)
    }

    /// Owner filter applied to JES listings.
    pub fn jes_owner(&self, expression: &str) -> Result<()> {
        self.session
            .site(&format!("JESOWNER={expression}"))
            .map(drop)
    }

    /// Timeout, in seconds, for the JES put-get interface.
    pub fn jes_put_get_timeout(&self, seconds: u32) -> Result<()> {
        self.session
            .site(&format!("JESPUTGETTO={seconds}"))
            .map(drop)
    }

    /// Record format for the JES internal reader.
    pub fn jes_recfm(&self, recfm: crate::attributes::RecordFormat) -> Result<()> {
        self.session
            .site(&format!("JESRECFM={}", recfm.as_str()))
            .map(drop)
    }

    /// Which job categories `LIST`/`NLST` report.
    pub fn jes_status(&self, status: JesStatus) -> Result<()> {
        self.session
            .site(&format!("JESSTATUS={}", status.as_str()))
            .map(drop)
    }

    /// Reply format level for `LIST`.
    pub fn list_level(&self, level: u32) -> Result<()> {
        self.session.site(&format!("LISTLEVEL={level}")).map(drop)
    }

    /// End-of-line sequence for outbound single-byte ASCII data.
    pub fn sb_send_eol(&self, eol: Eol) -> Result<()> {
        self.session
            .site(&format!("SBSENDEOL={}", eol.wire()))
            .map(drop)
    }

    /// End-of-line sequence for outbound multi-byte ASCII data.
    pub fn mb_send_eol(&self, eol: Eol) -> Result<()> {
        self.session
            .site(&format!("MBSENDEOL={}", eol.wire()))
            .map(drop)
    }
}

// ---------------------------------------------------------------------------
// Scoped mutation
// ---------------------------------------------------------------------------

/// Restores a site parameter to its captured prior value when
/// dropped. Every exit path through a scoped body traverses exactly
/// one restore; a restore failure is logged and never masks the
/// body's own result.
pub(crate) struct SiteScope<'s> {
    session: &'s FtpSession,
    label: &'static str,
    restore: Option<Box<dyn FnOnce(&FtpSession) -> Result<()> + Send + 's>>,
}

impl Drop for SiteScope<'_> {
    fn drop(&mut self) {
        if let Some(restore) = self.restore.take() {
            if let Err(e) = restore(self.session) {
                log::warn(&format!("failed to restore {}: {e}", self.label));
            }
        }
    }
}

impl FtpSession {
    /// Read the current `FILETYPE`, set a new one, and restore the
    /// original when the scope drops.
    pub(crate) fn scoped_file_type(&self, value: &str) -> Result<SiteScope<'_>> {
        let previous = self.status().file_type()?;
        self.site_params().file_type(value)?;
        Ok(SiteScope {
            session: self,
            label: "FILETYPE",
            restore: Some(Box::new(move |s| s.site_params().file_type(&previous))),
        })
    }

    /// Scoped `JESJOBNAME` mutation.
    pub(crate) fn scoped_jes_job_name(&self, expression: &str) -> Result<SiteScope<'_>> {
        let previous = self.status().jes_job_name()?;
        self.site_params().jes_job_name(expression)?;
        Ok(SiteScope {
            session: self,
            label: "JESJOBNAME",
            restore: Some(Box::new(move |s| {
                s.site_params().jes_job_name(&previous)
            })),
        })
    }

    /// Scoped `SBSENDEOL` mutation. The prior value is restored
    /// verbatim as the server reported it.
    pub(crate) fn scoped_sb_send_eol(&self, eol: Eol) -> Result<SiteScope<'_>> {
        let previous = self.status().sb_send_eol()?;
        self.site_params().sb_send_eol(eol)?;
        Ok(SiteScope {
            session: self,
            label: "SBSENDEOL",
            restore: Some(Box::new(move |s| {
                s.site(&format!("SBSENDEOL={previous}")).map(drop)
            })),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
