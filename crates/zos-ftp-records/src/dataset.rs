//! Dataset listing records.
//!
//! A `LIST` reply under `FILETYPE=SEQ` is a fixed-column table:
//!
//! ```text
//! Volume Unit    Referred Ext Used Recfm Lrecl BlkSz Dsorg Dsname
//! VOL001 3390   2024/01/15   1   15    FB    80 27920 PS   'USER.TEST.DATA'
//! ```
//!
//! Migrated and unmounted datasets report a short row carrying only
//! the marker and the dataset name.

use serde::{Deserialize, Serialize};

use crate::error::RecordsError;
use crate::fields::{FieldDate, FieldInt, FieldString};

// Fixed column layout of the dataset listing.
const VOLUME: (usize, usize) = (0, 6);
const UNIT: (usize, usize) = (6, 11);
const REFERRED: (usize, usize) = (11, 24);
const EXT: (usize, usize) = (24, 27);
const USED: (usize, usize) = (27, 32);
const RECFM: (usize, usize) = (32, 38);
const LRECL: (usize, usize) = (38, 44);
const BLKSZ: (usize, usize) = (44, 50);
const DSORG: (usize, usize) = (51, 56);
const DSNAME_OFFSET: usize = 56;

/// One dataset row from a `LIST` reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetEntry {
    #[serde(rename = "Dsname")]
    pub dsname: FieldString,
    #[serde(rename = "Volume")]
    pub volume: FieldString,
    #[serde(rename = "Unit")]
    pub unit: FieldString,
    #[serde(rename = "Referred")]
    pub referred: FieldDate,
    #[serde(rename = "Ext")]
    pub ext: FieldInt,
    #[serde(rename = "Used")]
    pub used: FieldInt,
    #[serde(rename = "Recfm")]
    pub recfm: FieldString,
    #[serde(rename = "Lrecl")]
    pub lrecl: FieldInt,
    #[serde(rename = "BlkSz")]
    pub blksz: FieldInt,
    #[serde(rename = "Dsorg")]
    pub dsorg: FieldString,
    #[serde(skip)]
    migrated: bool,
    #[serde(skip)]
    not_mounted: bool,
}

impl DatasetEntry {
    /// Dataset name with the surrounding quotes removed.
    pub fn name(&self) -> &str {
        self.dsname.as_str().trim_matches('\'')
    }

    /// The dataset has been migrated off primary storage.
    pub fn is_migrated(&self) -> bool {
        self.migrated
    }

    /// The dataset's volume is not mounted.
    pub fn is_not_mounted(&self) -> bool {
        self.not_mounted
    }

    /// Neither migrated nor unmounted.
    pub fn is_active(&self) -> bool {
        !self.migrated && !self.not_mounted
    }

    pub fn is_partitioned(&self) -> bool {
        self.dsorg.as_str() == "PO"
    }

    pub fn is_sequential(&self) -> bool {
        self.dsorg.as_str() == "PS"
    }

    pub fn is_vsam(&self) -> bool {
        self.volume.as_str().eq_ignore_ascii_case("vsam")
    }

    pub fn is_tape(&self) -> bool {
        self.unit.as_str().eq_ignore_ascii_case("tape")
    }
}

fn column(record: &str, (start, end): (usize, usize)) -> &str {
    &record[start..end.min(record.len())]
}

/// Parse one dataset row. The header row is the caller's problem.
pub fn parse_dataset(record: &str) -> Result<DatasetEntry, RecordsError> {
    if record.len() < DSNAME_OFFSET + 1 {
        return Err(RecordsError::RecordTooShort(record.len()));
    }

    let mut entry = DatasetEntry {
        dsname: FieldString::parse(&record[DSNAME_OFFSET..]),
        ..Default::default()
    };

    let trimmed = record.trim();
    if trimmed.starts_with("Migrated") {
        entry.migrated = true;
        entry.volume = FieldString::parse("Migrated");
        return Ok(entry);
    }
    if trimmed.contains("Not Mounted") {
        entry.not_mounted = true;
        entry.volume = FieldString::parse("Not Mounted");
        return Ok(entry);
    }

    entry.volume = FieldString::parse(column(record, VOLUME));
    entry.unit = FieldString::parse(column(record, UNIT));
    entry.referred = FieldDate::parse(column(record, REFERRED))
        .map_err(|e| RecordsError::field("Referred", e))?;
    entry.ext = FieldInt::parse(column(record, EXT)).map_err(|e| RecordsError::field("Ext", e))?;
    entry.used =
        FieldInt::parse(column(record, USED)).map_err(|e| RecordsError::field("Used", e))?;
    entry.recfm = FieldString::parse(column(record, RECFM));
    entry.lrecl =
        FieldInt::parse(column(record, LRECL)).map_err(|e| RecordsError::field("Lrecl", e))?;
    entry.blksz =
        FieldInt::parse(column(record, BLKSZ)).map_err(|e| RecordsError::field("BlkSz", e))?;
    entry.dsorg = FieldString::parse(column(record, DSORG));

    Ok(entry)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
