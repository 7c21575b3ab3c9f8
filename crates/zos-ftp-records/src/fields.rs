//! Fixed-field value types for column-positional listing records.
//!
//! Every field trims its slice before parsing and renders an empty
//! string for an absent value, so round-tripping a padded listing
//! column never invents data.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const DATE_FORMAT: &str = "%Y/%m/%d";
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";

// ---------------------------------------------------------------------------
// FieldString
// ---------------------------------------------------------------------------

/// A trimmed text column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldString(String);

impl FieldString {
    pub fn parse(data: &str) -> Self {
        FieldString(data.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// FieldInt
// ---------------------------------------------------------------------------

/// A numeric column. An all-blank column parses as zero, and zero
/// renders back as blank, matching how listings pad unused cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldInt(u16);

impl FieldInt {
    pub fn parse(data: &str) -> Result<Self, String> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(FieldInt(0));
        }
        data.parse::<u16>()
            .map(FieldInt)
            .map_err(|e| e.to_string())
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for FieldInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            Ok(())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for FieldInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 == 0 {
            serializer.serialize_none()
        } else {
            serializer.serialize_u16(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for FieldInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<u16>::deserialize(deserializer)?;
        Ok(FieldInt(value.unwrap_or(0)))
    }
}

// ---------------------------------------------------------------------------
// FieldFloat
// ---------------------------------------------------------------------------

/// A fractional column, e.g. the `VV.MM` version level of a PDS
/// member. Renders in the `%05.2` shape the listing uses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldFloat(f32);

impl FieldFloat {
    pub fn parse(data: &str) -> Result<Self, String> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(FieldFloat(0.0));
        }
        data.parse::<f32>()
            .map(FieldFloat)
            .map_err(|e| e.to_string())
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl fmt::Display for FieldFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            Ok(())
        } else {
            write!(f, "{:05.2}", self.0)
        }
    }
}

impl Serialize for FieldFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 == 0.0 {
            serializer.serialize_none()
        } else {
            serializer.serialize_f32(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for FieldFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<f32>::deserialize(deserializer)?;
        Ok(FieldFloat(value.unwrap_or(0.0)))
    }
}

// ---------------------------------------------------------------------------
// FieldDate
// ---------------------------------------------------------------------------

/// A `YYYY/MM/DD` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldDate(Option<NaiveDate>);

impl FieldDate {
    pub fn parse(data: &str) -> Result<Self, String> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(FieldDate(None));
        }
        NaiveDate::parse_from_str(data, DATE_FORMAT)
            .map(|d| FieldDate(Some(d)))
            .map_err(|e| e.to_string())
    }

    pub fn value(&self) -> Option<NaiveDate> {
        self.0
    }
}

impl fmt::Display for FieldDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            None => Ok(()),
        }
    }
}

impl Serialize for FieldDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        FieldDate::parse(&value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// FieldTimestamp
// ---------------------------------------------------------------------------

/// A `YYYY/MM/DD HH:MM` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldTimestamp(Option<NaiveDateTime>);

impl FieldTimestamp {
    pub fn parse(data: &str) -> Result<Self, String> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(FieldTimestamp(None));
        }
        NaiveDateTime::parse_from_str(data, TIMESTAMP_FORMAT)
            .map(|t| FieldTimestamp(Some(t)))
            .map_err(|e| e.to_string())
    }

    pub fn value(&self) -> Option<NaiveDateTime> {
        self.0
    }
}

impl fmt::Display for FieldTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            None => Ok(()),
        }
    }
}

impl Serialize for FieldTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        FieldTimestamp::parse(&value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
