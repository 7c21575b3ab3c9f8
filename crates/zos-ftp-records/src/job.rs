//! JES job listing records.
//!
//! The shape of a `LIST` reply under `FILETYPE=JES` depends on the
//! server's JESINTERFACELEVEL. Level 2 starts with a `JOBNAME` header
//! and carries five columns per job; level 1 has no header and four
//! columns. A single-job listing may be followed by a detail block:
//!
//! ```text
//! JOBNAME  JOBID    OWNER    STATUS CLASS
//! MYJOB    JOB00123 IBMUSER  OUTPUT A        RC=0000
//! --------
//!          ID  STEPNAME PROCSTEP C DDNAME   BYTE-COUNT
//!          001 STEP1    PROC1    A JESMSGLG       1200
//! 1 spool files
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::RecordsError;
use crate::fields::{FieldInt, FieldString};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static RETURN_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"RC=(\d+)").unwrap());
static ABEND_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ABEND=(\d+)").unwrap());
static SPOOL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+spool\s+files").unwrap());

const LEVEL1_COLUMNS: usize = 4;
const LEVEL2_COLUMNS: usize = 5;
const DETAIL_HEADER: &str = " ID  STEPNAME PROCSTEP";

/// One job row from a JES listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobEntry {
    #[serde(rename = "Name")]
    pub name: FieldString,
    #[serde(rename = "JobId")]
    pub job_id: FieldString,
    /// Only present at JESINTERFACELEVEL=2.
    #[serde(rename = "Owner")]
    pub owner: FieldString,
    #[serde(rename = "Status")]
    pub status: FieldString,
    #[serde(rename = "Class")]
    pub class: FieldString,
}

/// One spool dataset row from a job detail block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpoolFile {
    #[serde(rename = "Id")]
    pub id: FieldInt,
    #[serde(rename = "StepName")]
    pub step_name: FieldString,
    #[serde(rename = "ProcSpec")]
    pub proc_spec: FieldString,
    #[serde(rename = "C")]
    pub class: FieldString,
    #[serde(rename = "DDName")]
    pub dd_name: FieldString,
    #[serde(rename = "ByteCount")]
    pub byte_count: FieldInt,
}

/// A job row plus its spool detail block, as returned by a
/// single-job status query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDetail {
    entry: JobEntry,
    spool_files: Vec<SpoolFile>,
}

/// Final disposition of a job derived from its `Status` and `Class`
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Job ended; condition code extracted from `RC=nnnn`.
    Completed(u16),
    /// Job never ran; the converter found a JCL error.
    JclError,
    /// Job abended; code extracted from `ABEND=nnn`.
    Abended(u16),
    /// Job is still executing.
    Active,
}

impl JobDetail {
    pub fn entry(&self) -> &JobEntry {
        &self.entry
    }

    pub fn spool_files(&self) -> &[SpoolFile] {
        &self.spool_files
    }

    /// Classify the job's disposition from the listing columns.
    pub fn outcome(&self) -> Result<JobOutcome, RecordsError> {
        let class = self.entry.class.as_str();

        if self.entry.status.as_str() == "ACTIVE" {
            return Ok(JobOutcome::Active);
        }
        if class.contains("JCL error") {
            return Ok(JobOutcome::JclError);
        }
        if class.contains("ABEND") {
            let code = ABEND_CODE
                .captures(class)
                .and_then(|c| c.get(1))
                .ok_or_else(|| RecordsError::NoReturnCode(class.to_string()))?;
            let code = code
                .as_str()
                .parse::<u16>()
                .map_err(|e| RecordsError::field("Abend", e.to_string()))?;
            return Ok(JobOutcome::Abended(code));
        }

        let rc = RETURN_CODE
            .captures(class)
            .and_then(|c| c.get(1))
            .ok_or_else(|| RecordsError::NoReturnCode(class.to_string()))?;
        let rc = rc
            .as_str()
            .parse::<u16>()
            .map_err(|e| RecordsError::field("ReturnCode", e.to_string()))?;
        Ok(JobOutcome::Completed(rc))
    }
}

/// Level-2 listings carry a `JOBNAME` header row; level-1 listings
/// start directly with job rows.
fn is_level2(first: &str) -> bool {
    first.contains("JOBNAME")
}

fn parse_entry(line: &str, columns: usize) -> Result<JobEntry, RecordsError> {
    let fields: Vec<&str> = WHITESPACE.splitn(line.trim(), columns).collect();
    if fields.len() != columns {
        return Err(RecordsError::InvalidRecord(line.to_string()));
    }

    let mut entry = JobEntry {
        name: FieldString::parse(fields[0]),
        job_id: FieldString::parse(fields[1]),
        ..Default::default()
    };
    if columns == LEVEL1_COLUMNS {
        entry.status = FieldString::parse(fields[2]);
        entry.class = FieldString::parse(fields[3]);
    } else {
        entry.owner = FieldString::parse(fields[2]);
        entry.status = FieldString::parse(fields[3]);
        entry.class = FieldString::parse(fields[4]);
    }
    Ok(entry)
}

fn parse_spool_file(line: &str) -> Result<SpoolFile, RecordsError> {
    let fields: Vec<&str> = WHITESPACE.splitn(line.trim(), 6).collect();
    if fields.len() != 6 {
        return Err(RecordsError::InvalidRecord(line.to_string()));
    }
    Ok(SpoolFile {
        id: FieldInt::parse(fields[0]).map_err(|e| RecordsError::field("Id", e))?,
        step_name: FieldString::parse(fields[1]),
        proc_spec: FieldString::parse(fields[2]),
        class: FieldString::parse(fields[3]),
        dd_name: FieldString::parse(fields[4]),
        byte_count: FieldInt::parse(fields[5]).map_err(|e| RecordsError::field("ByteCount", e))?,
    })
}

/// Parse a multi-job JES listing into job rows.
pub fn parse_jobs(records: &[String]) -> Result<Vec<JobEntry>, RecordsError> {
    if records.is_empty() {
        return Err(RecordsError::Empty);
    }

    let level2 = is_level2(&records[0]);
    let columns = if level2 { LEVEL2_COLUMNS } else { LEVEL1_COLUMNS };

    let mut jobs = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i == 0 && level2 {
            continue;
        }
        if record.trim().is_empty() {
            continue;
        }
        jobs.push(parse_entry(record, columns)?);
    }
    Ok(jobs)
}

/// Parse a single-job status listing, including the spool detail
/// block when the server appends one.
pub fn parse_job_detail(records: &[String]) -> Result<JobDetail, RecordsError> {
    if records.is_empty() {
        return Err(RecordsError::Empty);
    }

    if !is_level2(&records[0]) {
        let entry = parse_entry(&records[0], LEVEL1_COLUMNS)?;
        return Ok(JobDetail {
            entry,
            spool_files: Vec::new(),
        });
    }

    if records.len() < 2 {
        return Err(RecordsError::Empty);
    }
    let entry = parse_entry(&records[1], LEVEL2_COLUMNS)?;
    let mut detail = JobDetail {
        entry,
        spool_files: Vec::new(),
    };

    // An active job, or a bare status reply, carries no detail block.
    if detail.entry.status.as_str() == "ACTIVE" || records.len() < 3 {
        return Ok(detail);
    }

    if !records[2].starts_with("--------") {
        return Err(RecordsError::MalformedDetail(records[2].clone()));
    }
    if records.len() < 4 {
        return Ok(detail);
    }
    if !records[3].contains(DETAIL_HEADER) {
        return Err(RecordsError::MalformedDetail(records[3].clone()));
    }

    for record in &records[4..] {
        if record.trim().is_empty() {
            continue;
        }
        if let Some(caps) = SPOOL_COUNT.captures(record.trim_start()) {
            let expected: usize = caps[1].parse().unwrap_or(0);
            if detail.spool_files.len() != expected {
                return Err(RecordsError::SpoolCountMismatch {
                    expected,
                    actual: detail.spool_files.len(),
                });
            }
            break;
        }
        detail.spool_files.push(parse_spool_file(record)?);
    }

    Ok(detail)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn level2_listing() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT A        RC=0000",
            "OTHER    JOB00124 IBMUSER  ACTIVE A",
        ]);
        let jobs = parse_jobs(&records).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name.as_str(), "MYJOB");
        assert_eq!(jobs[0].job_id.as_str(), "JOB00123");
        assert_eq!(jobs[0].owner.as_str(), "IBMUSER");
        assert_eq!(jobs[1].status.as_str(), "ACTIVE");
    }

    #[test]
    fn level1_listing_has_no_owner() {
        let records = lines(&["MYJOB    JOB00123 OUTPUT A RC=0000"]);
        let jobs = parse_jobs(&records).unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].owner.is_empty());
        assert_eq!(jobs[0].status.as_str(), "OUTPUT");
        assert_eq!(jobs[0].class.as_str(), "A RC=0000");
    }

    #[test]
    fn empty_listing_rejected() {
        assert!(matches!(parse_jobs(&[]), Err(RecordsError::Empty)));
    }

    #[test]
    fn detail_block() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT A        RC=0000",
            "--------",
            "         ID  STEPNAME PROCSTEP C DDNAME   BYTE-COUNT",
            "         001 STEP1    PROC1    A JESMSGLG       1200",
            "         002 STEP1    PROC1    A JESJCL          800",
            "2 spool files",
        ]);
        let detail = parse_job_detail(&records).unwrap();
        assert_eq!(detail.entry().job_id.as_str(), "JOB00123");
        assert_eq!(detail.spool_files().len(), 2);
        assert_eq!(detail.spool_files()[0].dd_name.as_str(), "JESMSGLG");
        assert_eq!(detail.spool_files()[1].byte_count.value(), 800);
        assert_eq!(detail.outcome().unwrap(), JobOutcome::Completed(0));
    }

    #[test]
    fn spool_count_mismatch_rejected() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT A        RC=0000",
            "--------",
            "         ID  STEPNAME PROCSTEP C DDNAME   BYTE-COUNT",
            "         001 STEP1    PROC1    A JESMSGLG       1200",
            "3 spool files",
        ]);
        assert!(matches!(
            parse_job_detail(&records),
            Err(RecordsError::SpoolCountMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn active_job_outcome() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  ACTIVE A",
        ]);
        let detail = parse_job_detail(&records).unwrap();
        assert_eq!(detail.outcome().unwrap(), JobOutcome::Active);
    }

    #[test]
    fn abend_outcome() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT A        ABEND=806",
        ]);
        let detail = parse_job_detail(&records).unwrap();
        assert_eq!(detail.outcome().unwrap(), JobOutcome::Abended(806));
    }

    #[test]
    fn jcl_error_outcome() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT (JCL error)",
        ]);
        let detail = parse_job_detail(&records).unwrap();
        assert_eq!(detail.outcome().unwrap(), JobOutcome::JclError);
    }

    #[test]
    fn missing_return_code_surfaced() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT A",
        ]);
        let detail = parse_job_detail(&records).unwrap();
        assert!(matches!(
            detail.outcome(),
            Err(RecordsError::NoReturnCode(_))
        ));
    }

    #[test]
    fn malformed_detail_rejected() {
        let records = lines(&[
            "JOBNAME  JOBID    OWNER    STATUS CLASS",
            "MYJOB    JOB00123 IBMUSER  OUTPUT A        RC=0000",
            "unexpected",
        ]);
        assert!(matches!(
            parse_job_detail(&records),
            Err(RecordsError::MalformedDetail(_))
        ));
    }
}
