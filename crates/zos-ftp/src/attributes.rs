//! Transfer-attribute specifications: the physical dataset
//! attributes a store may pin via `SITE` before transferring.

use crate::error::{FtpError, Result};
use crate::log;
use crate::session::FtpSession;

pub const MIN_BLOCK_SIZE: u16 = 1;
pub const MAX_BLOCK_SIZE: u16 = 32768;
pub const MAX_RECORD_LENGTH: u16 = 32760;

/// Dataset record format (RECFM).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Fixed record length.
    F,
    /// Fixed length records, blocked.
    Fb,
    /// Fixed length records, blocked, ASA control characters.
    Fba,
    /// Fixed length records, blocked, machine control characters.
    Fbm,
    /// Variable record length.
    V,
    /// Variable length records, blocked.
    Vb,
    /// Variable length records, blocked, ASA control characters.
    Vba,
    /// Variable length records, blocked, machine control characters.
    Vbm,
    /// Undefined record format.
    U,
    /// Variable record length, spanned.
    Vs,
    /// Variable length records, blocked, spanned.
    Vbs,
}

impl RecordFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordFormat::F => "F",
            RecordFormat::Fb => "FB",
            RecordFormat::Fba => "FBA",
            RecordFormat::Fbm => "FBM",
            RecordFormat::V => "V",
            RecordFormat::Vb => "VB",
            RecordFormat::Vba => "VBA",
            RecordFormat::Vbm => "VBM",
            RecordFormat::U => "U",
            RecordFormat::Vs => "VS",
            RecordFormat::Vbs => "VBS",
        }
    }

    /// Parse a record format as the server spells it.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "F" => Some(RecordFormat::F),
            "FB" => Some(RecordFormat::Fb),
            "FBA" => Some(RecordFormat::Fba),
            "FBM" => Some(RecordFormat::Fbm),
            "V" => Some(RecordFormat::V),
            "VB" => Some(RecordFormat::Vb),
            "VBA" => Some(RecordFormat::Vba),
            "VBM" => Some(RecordFormat::Vbm),
            "U" => Some(RecordFormat::U),
            "VS" => Some(RecordFormat::Vs),
            "VBS" => Some(RecordFormat::Vbs),
            _ => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            RecordFormat::F | RecordFormat::Fb | RecordFormat::Fba | RecordFormat::Fbm
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            RecordFormat::V
                | RecordFormat::Vb
                | RecordFormat::Vba
                | RecordFormat::Vbm
                | RecordFormat::Vs
                | RecordFormat::Vbs
        )
    }
}

/// One server-side dataset attribute to pin before a store. Each
/// renders to its `KEY=VAL` wire form and validates its domain
/// locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSpec {
    Recfm(RecordFormat),
    /// Logical record length, 1..=32760.
    Lrecl(u16),
    /// Block size, 1..=32768.
    BlkSize(u16),
}

impl DataSpec {
    /// The `KEY=VAL` wire form, or a domain-validation error.
    pub fn render(&self) -> Result<String> {
        match self {
            DataSpec::Recfm(recfm) => Ok(format!("RECFM={}", recfm.as_str())),
            DataSpec::Lrecl(length) => {
                if *length < 1 || *length > MAX_RECORD_LENGTH {
                    return Err(FtpError::InvalidArgument(format!(
                        "record length must be between 1 and {MAX_RECORD_LENGTH}, got {length}"
                    )));
                }
                Ok(format!("LRECL={length}"))
            }
            DataSpec::BlkSize(size) => {
                if *size < MIN_BLOCK_SIZE || *size > MAX_BLOCK_SIZE {
                    return Err(FtpError::InvalidArgument(format!(
                        "blocksize must be between {MIN_BLOCK_SIZE} and {MAX_BLOCK_SIZE}, got {size}"
                    )));
                }
                Ok(format!("BLKSIZE={size}"))
            }
        }
    }
}

impl FtpSession {
    /// Pin dataset attributes for the next store with a single
    /// `SITE` exchange.
    pub fn set_data_specs(&self, specs: &[DataSpec]) -> Result<()> {
        if specs.is_empty() {
            return Err(FtpError::InvalidArgument(
                "no attributes specified".to_string(),
            ));
        }

        let rendered = specs
            .iter()
            .map(DataSpec::render)
            .collect::<Result<Vec<_>>>()?
            .join(" ");

        let reply = self.site(&rendered)?;
        if reply != "SITE command was accepted" {
            log::warn(&reply);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recfm_round_trips() {
        for recfm in [
            RecordFormat::F,
            RecordFormat::Fb,
            RecordFormat::Vbs,
            RecordFormat::U,
        ] {
            assert_eq!(RecordFormat::parse(recfm.as_str()), Some(recfm));
        }
        assert_eq!(RecordFormat::parse("XX"), None);
    }

    #[test]
    fn recfm_predicates() {
        assert!(RecordFormat::Fb.is_fixed());
        assert!(!RecordFormat::Fb.is_variable());
        assert!(RecordFormat::Vbs.is_variable());
        assert!(!RecordFormat::U.is_fixed());
    }

    #[test]
    fn specs_render_wire_form() {
        assert_eq!(
            DataSpec::Recfm(RecordFormat::Fb).render().unwrap(),
            "RECFM=FB"
        );
        assert_eq!(DataSpec::Lrecl(80).render().unwrap(), "LRECL=80");
        assert_eq!(DataSpec::BlkSize(27920).render().unwrap(), "BLKSIZE=27920");
    }

    #[test]
    fn out_of_domain_specs_fail_locally() {
        assert!(DataSpec::Lrecl(0).render().is_err());
        assert!(DataSpec::Lrecl(32761).render().is_err());
        assert!(DataSpec::BlkSize(0).render().is_err());
        assert!(DataSpec::BlkSize(32769).render().is_err());
    }
}
