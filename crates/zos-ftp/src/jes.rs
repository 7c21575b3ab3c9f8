//! JES job submission and retrieval.
//!
//! Two submission paths:
//!
//! - [`submit_reader`](FtpSession::submit_reader) stores the JCL
//!   under `FILETYPE=JES` and returns the assigned job id straight
//!   from the store reply.
//! - [`submit_and_fetch`](FtpSession::submit_and_fetch) stores the
//!   JCL to a generated dataset, then retrieves that dataset under
//!   `FILETYPE=JES NOJESGETBYDSN`; the server blocks the retrieve
//!   until the job ends and then streams the full spool, which is
//!   split, checked for the `$HASP395 … ENDED` marker, and scanned
//!   for failure messages.

use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::LazyLock;

use chrono::{Local, Timelike};
use regex::Regex;

use zos_ftp_records::{self as records, JobDetail, JobOutcome};

use crate::error::{FtpError, JesError, Result};
use crate::listing::SEARCH_PATTERN;
use crate::session::FtpSession;
use crate::transfer::TransferType;

static JOB_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(JOB\d{5})").unwrap());
static JOB_DONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"When\s+(J\w+\d+)\s+is\s+done").unwrap());
static JOB_ENDED_RC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$HASP395\s+(\w+)\s+ENDED\s+-\s+RC=(\d+)").unwrap());
static JOB_ENDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$HASP395\s+(\w+)\s+ENDED").unwrap());
static ABEND_RC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ABEND=(\d+)").unwrap());

const SPOOL_SENTINEL: &str = " !! END OF JES SPOOL FILE !!";

/// Console message prefixes that mark an abnormal end.
const ABEND_MESSAGES: &[&str] = &[
    "IEA995I",
    "IEF450I",
    "IEF472I",
    "SYSTEM COMPLETION CODE",
    "ABEND=",
];

/// Console message prefixes that mark allocation or JCL failures.
const IEF_MESSAGES: &[&str] = &["IEF212I", "IEF272I", "IEF344I", "IEF452I", "IEF453I"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A submitted JES job: the assigned id and the generated submission
/// dataset it was stored under.
#[derive(Debug, Clone)]
pub struct JesJob {
    /// Server-assigned id, `JOBnnnnn`.
    pub id: String,
    /// Generated submission dataset name.
    pub dsn: String,
}

/// A completed submission retrieved through the get-by-DSN protocol.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job: JesJob,
    /// Job name as displayed in the `$HASP395` end message.
    pub display_name: String,
    /// Spool output, one entry per spool dataset.
    pub spool: Vec<String>,
    /// Condition code from `RC=nnnn`.
    pub return_code: i32,
}

/// Optional JES interface tuning applied before a submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct JesOptions {
    entry_limit: Option<u32>,
    get_by_dsn: Option<bool>,
    lrecl: Option<u16>,
    put_get_timeout: Option<u32>,
}

impl JesOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `JESENTRYLIMIT`, 0..=1024.
    pub fn with_entry_limit(mut self, limit: u32) -> Self {
        self.entry_limit = Some(limit);
        self
    }

    /// `JESGETBYDSN` / `NOJESGETBYDSN`.
    pub fn with_get_by_dsn(mut self, enabled: bool) -> Self {
        self.get_by_dsn = Some(enabled);
        self
    }

    /// `JESLRECL`, 1..=254.
    pub fn with_lrecl(mut self, length: u16) -> Self {
        self.lrecl = Some(length);
        self
    }

    /// `JESPUTGETTO` timeout in seconds.
    pub fn with_put_get_timeout(mut self, seconds: u32) -> Self {
        self.put_get_timeout = Some(seconds);
        self
    }

    fn apply(&self, session: &FtpSession) -> Result<()> {
        let params = session.site_params();
        if let Some(limit) = self.entry_limit {
            params.jes_entry_limit(limit)?;
        }
        if let Some(enabled) = self.get_by_dsn {
            params.jes_get_by_dsn(enabled)?;
        }
        if let Some(length) = self.lrecl {
            params.jes_lrecl(length)?;
        }
        if let Some(seconds) = self.put_get_timeout {
            params.jes_put_get_timeout(seconds)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Submission-name generation
// ---------------------------------------------------------------------------

static SUBMISSION_SEQ: AtomicU32 = AtomicU32::new(0);

/// Generate a collision-resistant submission dataset name:
/// `JES.D<yymmdd>.T<hhmmss>.N<7 digits>`. The trailing qualifier
/// folds a process-wide counter into the sub-second component so
/// concurrent submitters in the same timer tick stay distinct.
fn generate_submission_name() -> String {
    let now = Local::now();
    let seq = SUBMISSION_SEQ.fetch_add(1, Ordering::Relaxed);
    let unique = (now.nanosecond() / 100 + seq) % 10_000_000;
    format!(
        "JES.D{}.T{}.N{unique:07}",
        now.format("%y%m%d"),
        now.format("%H%M%S")
    )
}

// ---------------------------------------------------------------------------
// Spool analysis
// ---------------------------------------------------------------------------

/// Turn a retrieved spool and the terminal transfer message into a
/// [`JobResult`], or the classified failure.
fn complete_submission(dsn: String, output: &str, message: &str) -> Result<JobResult> {
    let id = JOB_DONE
        .captures(message)
        .map(|c| c[1].to_string())
        .ok_or_else(|| JesError::MissingJobId(message.to_string()))?;
    let job = JesJob { id, dsn };

    let trimmed = output.trim();
    let body = trimmed.strip_suffix(SPOOL_SENTINEL).unwrap_or(trimmed);
    let spool: Vec<String> = body
        .split(SPOOL_SENTINEL)
        .map(|segment| segment.trim().to_string())
        .collect();

    let ended = JOB_ENDED
        .captures(output)
        .ok_or_else(|| JesError::NotEnded(message.to_string()))?;
    let display_name = ended[1].to_string();

    let mut details: Vec<String> = Vec::new();
    let mut abended = false;
    let mut ief_failed = false;
    for line in output.lines() {
        if ABEND_MESSAGES.iter().any(|m| line.contains(m)) {
            details.push(line.trim().to_string());
            abended = true;
        }
    }
    for line in output.lines() {
        if IEF_MESSAGES.iter().any(|m| line.contains(m)) {
            details.push(line.trim().to_string());
            ief_failed = true;
        }
    }

    match JOB_ENDED_RC.captures(output) {
        Some(caps) => Ok(JobResult {
            job,
            display_name,
            spool,
            return_code: caps[2].parse().unwrap_or(-1),
        }),
        None => {
            let rc = ABEND_RC
                .captures(output)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(-1);
            let details = details.join(": ");
            let failure = match (abended, ief_failed) {
                (true, true) => JesError::IefAndAbend {
                    name: display_name,
                    rc,
                    details,
                },
                (true, false) => JesError::Abend {
                    name: display_name,
                    rc,
                    details,
                },
                (false, true) => JesError::Ief {
                    name: display_name,
                    rc,
                    details,
                },
                (false, false) => {
                    return Err(JesError::MissingReturnCode(message.to_string()).into())
                }
            };
            Err(failure.into())
        }
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

impl FtpSession {
    /// Submit JCL from a reader and return the assigned job id.
    pub fn submit_reader(&self, src: &mut dyn Read, options: &JesOptions) -> Result<JesJob> {
        let dsn = generate_submission_name();

        options.apply(self)?;

        let _scope = self.scoped_file_type("JES")?;

        let (_, message) = self.store_reader(&dsn, src, TransferType::Ascii)?;

        let id = JOB_ID
            .captures(&message)
            .map(|c| c[1].to_string())
            .ok_or_else(|| JesError::MissingJobId(message.clone()))?;

        Ok(JesJob { id, dsn })
    }

    /// Submit JCL from a string.
    pub fn submit_jcl(&self, jcl: &str) -> Result<JesJob> {
        self.submit_reader(&mut jcl.as_bytes(), &JesOptions::new())
    }

    /// Submit JCL from a local file.
    pub fn submit_file(&self, path: &str) -> Result<JesJob> {
        let mut file = File::open(path)?;
        self.submit_reader(&mut file, &JesOptions::new())
    }

    /// Submit JCL and wait for the job to complete, returning its
    /// spool output and condition code.
    ///
    /// The JCL is stored under `FILETYPE=SEQ` with
    /// `RECFM=FB LRECL=80 BLKSIZE=27920`, then retrieved under
    /// `FILETYPE=JES NOJESGETBYDSN` with `JESJOBNAME=*`; the server
    /// holds the retrieve until the job ends.
    pub fn submit_and_fetch(&self, jcl: &str) -> Result<JobResult> {
        let dsn = generate_submission_name();

        let _seq_scope = self.scoped_file_type("SEQ")?;
        self.site("RECFM=FB LRECL=80 BLKSIZE=27920")?;
        self.store_reader(&dsn, &mut jcl.as_bytes(), TransferType::Ascii)?;

        let _jes_scope = self.scoped_file_type("JES NOJESGETBYDSN")?;
        let _name_scope = self.scoped_jes_job_name("*")?;

        let mut spool_buf = Vec::new();
        let (_, message) = self.retrieve_writer(&dsn, &mut spool_buf, TransferType::Ascii)?;
        let output = String::from_utf8_lossy(&spool_buf).into_owned();

        complete_submission(dsn, &output, &message)
    }

    /// Query a job's status and reduce it to its condition code.
    /// Anything other than a normal completion surfaces as the
    /// classified [`JesError`].
    pub fn job_return_code(&self, job_id: &str) -> Result<i32> {
        let detail = self.job_status(job_id)?;
        let name = detail.entry().name.to_string();
        match detail.outcome()? {
            JobOutcome::Completed(rc) => Ok(rc as i32),
            JobOutcome::Active => Err(JesError::Active(name).into()),
            JobOutcome::JclError => Err(JesError::JclError(name).into()),
            JobOutcome::Abended(code) => Err(JesError::Abend {
                name,
                rc: code as i32,
                details: detail.entry().class.to_string(),
            }
            .into()),
        }
    }

    /// Query the status of a job by its exact id. Wildcards belong
    /// in [`list_spool`](Self::list_spool).
    pub fn job_status(&self, job_id: &str) -> Result<JobDetail> {
        if SEARCH_PATTERN.is_match(job_id) {
            return Err(FtpError::InvalidArgument(format!(
                "invalid job id: {job_id}"
            )));
        }

        let _type_scope = self.scoped_file_type("JES")?;
        let _name_scope = self.scoped_jes_job_name("*")?;

        let lines = self.list(job_id)?;
        records::parse_job_detail(&lines).map_err(FtpError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
