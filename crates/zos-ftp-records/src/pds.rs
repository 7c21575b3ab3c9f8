//! Partitioned-dataset member listing records.
//!
//! A `LIST` of a PDS yields one fixed-column row per member:
//!
//! ```text
//!  Name     VV.MM   Created       Changed      Size  Init   Mod   Id
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RecordsError;
use crate::fields::{FieldDate, FieldFloat, FieldInt, FieldString, FieldTimestamp};

const NAME: (usize, usize) = (0, 8);
const VV_MM: (usize, usize) = (8, 15);
const CREATED: (usize, usize) = (15, 26);
const CHANGED: (usize, usize) = (26, 43);
const SIZE: (usize, usize) = (43, 49);
const INIT: (usize, usize) = (49, 55);
const MOD: (usize, usize) = (55, 61);
const ID_OFFSET: usize = 61;

/// One member row from a PDS listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdsMember {
    /// Member name.
    #[serde(rename = "Name")]
    pub name: FieldString,
    /// Version number and modification level.
    #[serde(rename = "VV.MM")]
    pub vv_mm: FieldFloat,
    /// Date this version was created.
    #[serde(rename = "Created")]
    pub created: FieldDate,
    /// Date and time this version was last modified.
    #[serde(rename = "Changed")]
    pub changed: FieldTimestamp,
    /// Current number of lines.
    #[serde(rename = "Size")]
    pub size: FieldInt,
    /// Number of lines when the member was first saved.
    #[serde(rename = "Init")]
    pub init: FieldInt,
    /// Lines added or changed since; zero for unnumbered data.
    #[serde(rename = "Mod")]
    pub modified: FieldInt,
    /// User id that created or last updated this version.
    #[serde(rename = "Id")]
    pub id: FieldString,
}

fn column(record: &str, (start, end): (usize, usize)) -> &str {
    &record[start..end.min(record.len())]
}

/// Parse one PDS member row.
pub fn parse_member(record: &str) -> Result<PdsMember, RecordsError> {
    if record.len() < ID_OFFSET {
        return Err(RecordsError::RecordTooShort(record.len()));
    }

    Ok(PdsMember {
        name: FieldString::parse(column(record, NAME)),
        vv_mm: FieldFloat::parse(column(record, VV_MM))
            .map_err(|e| RecordsError::field("VvMm", e))?,
        created: FieldDate::parse(column(record, CREATED))
            .map_err(|e| RecordsError::field("Created", e))?,
        changed: FieldTimestamp::parse(column(record, CHANGED))
            .map_err(|e| RecordsError::field("Changed", e))?,
        size: FieldInt::parse(column(record, SIZE)).map_err(|e| RecordsError::field("Size", e))?,
        init: FieldInt::parse(column(record, INIT)).map_err(|e| RecordsError::field("Init", e))?,
        modified: FieldInt::parse(column(record, MOD)).map_err(|e| RecordsError::field("Mod", e))?,
        id: FieldString::parse(&record[ID_OFFSET..]),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
