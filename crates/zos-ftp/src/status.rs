//! Status queries: `STAT`, `XSTA`, and typed value extraction.
//!
//! `XSTA (FEATURE` retrieves a single status variable — the
//! unbalanced parenthesis is the server's own idiom. Replies follow
//! one of three conventions: the value is the last word of the line,
//! the record-format triple, or the EOL-terminator sentence. An
//! unmatched reply surfaces a typed error instead of a guess.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{FtpError, Result};
use crate::reply::ReplyCode;
use crate::session::FtpSession;

const STATUS_TRAILER: &str = "*** end of status ***";

static RECFM_TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Record\s+format\s+(\w+)\s*,\s*Lrecl:\s*(\d+)\s*,\s*Blocksize:\s*(\d+)").unwrap()
});
static EOL_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"uses\s+(\w+)\s+line\s+terminator").unwrap());
static FILE_TYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^FileType\s+(\w+)").unwrap());

impl FtpSession {
    /// Full server status.
    pub fn stat(&self) -> Result<String> {
        self.send_command(ReplyCode::SysStatus, "STAT", &[])
    }

    /// `STAT` with an argument (e.g. a dataset name).
    pub fn stat_of(&self, target: &str) -> Result<String> {
        self.send_command(ReplyCode::SysStatus, "STAT", &[target])
    }

    /// Retrieve one status variable via `XSTA (FEATURE`, with the
    /// end-of-status trailer stripped.
    pub fn xstat(&self, feature: &str) -> Result<String> {
        let out = self.send_command(ReplyCode::SysStatus, "XSTA", &[&format!("({feature}")])?;
        Ok(out.replace(STATUS_TRAILER, "").trim().to_string())
    }

    /// Typed accessors over `XSTA`.
    pub fn status(&self) -> StatusReader<'_> {
        StatusReader { session: self }
    }
}

// ---------------------------------------------------------------------------
// Extraction helpers
// ---------------------------------------------------------------------------

fn last_word(response: &str) -> Option<&str> {
    response.split_whitespace().last()
}

fn status_error(feature: &str, response: &str) -> FtpError {
    FtpError::StatusFormat {
        feature: feature.to_string(),
        response: response.to_string(),
    }
}

fn last_word_str(feature: &str, response: &str) -> Result<String> {
    last_word(response)
        .map(str::to_string)
        .ok_or_else(|| status_error(feature, response))
}

fn last_word_int(feature: &str, response: &str) -> Result<u32> {
    last_word(response)
        .and_then(|w| w.parse().ok())
        .ok_or_else(|| status_error(feature, response))
}

fn last_word_bool(feature: &str, response: &str) -> Result<bool> {
    match last_word(response).map(str::to_uppercase).as_deref() {
        Some("TRUE") => Ok(true),
        Some("FALSE") => Ok(false),
        _ => Err(status_error(feature, response)),
    }
}

// ---------------------------------------------------------------------------
// Typed accessors
// ---------------------------------------------------------------------------

/// Reads individual status variables from the server. Feature names
/// keep the server's minimal-abbreviation spelling.
pub struct StatusReader<'s> {
    session: &'s FtpSession,
}

impl StatusReader<'_> {
    fn fetch(&self, feature: &str) -> Result<String> {
        self.session.xstat(feature)
    }

    /// Current `FILETYPE` (SEQ, JES, or SQL).
    pub fn file_type(&self) -> Result<String> {
        let resp = self.fetch("FILEtype")?;
        FILE_TYPE
            .captures(&resp)
            .map(|c| c[1].to_string())
            .ok_or_else(|| status_error("FILEtype", &resp))
    }

    /// Current `JESJOBNAME` filter.
    pub fn jes_job_name(&self) -> Result<String> {
        let resp = self.fetch("JESJOBName")?;
        last_word_str("JESJOBName", &resp)
    }

    /// Current `JESOWNER` filter.
    pub fn jes_owner(&self) -> Result<String> {
        let resp = self.fetch("JESOwner")?;
        last_word_str("JESOwner", &resp)
    }

    /// Current `JESSTATUS` selection.
    pub fn jes_status(&self) -> Result<String> {
        let resp = self.fetch("JESSTatus")?;
        last_word_str("JESSTatus", &resp)
    }

    pub fn jes_lrecl(&self) -> Result<u32> {
        let resp = self.fetch("JESLrecl")?;
        last_word_int("JESLrecl", &resp)
    }

    pub fn jes_entry_limit(&self) -> Result<u32> {
        let resp = self.fetch("JESENTRYLimit")?;
        last_word_int("JESENTRYLimit", &resp)
    }

    pub fn jes_get_by_dsn(&self) -> Result<bool> {
        let resp = self.fetch("JESGETBYDSN")?;
        last_word_bool("JESGETBYDSN", &resp)
    }

    pub fn list_level(&self) -> Result<u32> {
        let resp = self.fetch("LISTLEVEL")?;
        last_word_int("LISTLEVEL", &resp)
    }

    pub fn encoding(&self) -> Result<String> {
        let resp = self.fetch("ENCODING")?;
        last_word_str("ENCODING", &resp)
    }

    /// Outbound single-byte EOL terminator (CRLF, LF, or CR).
    pub fn sb_send_eol(&self) -> Result<String> {
        let resp = self.fetch("SBSENDEOL")?;
        EOL_TERMINATOR
            .captures(&resp)
            .map(|c| c[1].to_string())
            .ok_or_else(|| status_error("SBSENDEOL", &resp))
    }

    /// Outbound multi-byte EOL terminator.
    pub fn mb_send_eol(&self) -> Result<String> {
        let resp = self.fetch("MBSENDEOL")?;
        EOL_TERMINATOR
            .captures(&resp)
            .map(|c| c[1].to_string())
            .ok_or_else(|| status_error("MBSENDEOL", &resp))
    }

    /// Record format of the current dataset attributes.
    pub fn record_format(&self) -> Result<String> {
        let resp = self.fetch("RECfm")?;
        RECFM_TRIPLE
            .captures(&resp)
            .map(|c| c[1].to_string())
            .ok_or_else(|| status_error("RECfm", &resp))
    }

    pub fn lrecl(&self) -> Result<u32> {
        let resp = self.fetch("LRecl")?;
        RECFM_TRIPLE
            .captures(&resp)
            .and_then(|c| c[2].parse().ok())
            .ok_or_else(|| status_error("LRecl", &resp))
    }

    pub fn block_size(&self) -> Result<u32> {
        let resp = self.fetch("BLOCKSIze")?;
        RECFM_TRIPLE
            .captures(&resp)
            .and_then(|c| c[3].parse().ok())
            .ok_or_else(|| status_error("BLOCKSIze", &resp))
    }
}

// ---------------------------------------------------------------------------
// Full-status extraction
// ---------------------------------------------------------------------------

static STATUS_BOOL: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    let table = [
        ("TapeReadStream", r"Server site variable TAPEREADSTREAM is set to (TRUE|FALSE)"),
        ("MbRequireLastEol", r"Server site variable MBREQUIRELASTEOL is set to (TRUE|FALSE)"),
        ("ExtDBSChinese", r"Server site variable EXTDBSCHINESE is set to (TRUE|FALSE)"),
        ("SBSub", r"SBSUB is set to (TRUE|FALSE)"),
        ("ISPFStats", r"ISPFSTATS is set to (TRUE|FALSE)"),
        ("SMS", r"SMS is (\w+)"),
    ];
    table
        .into_iter()
        .map(|(k, p)| (k, Regex::new(p).unwrap()))
        .collect()
});

static STATUS_INT: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    let table = [
        ("InactivityTimer", r"Inactivity timer is set to (\d+)"),
        ("FTPKeepalive", r"Timer FTPKEEPALIVE is set to (\d+)"),
        ("DataKeepalive", r"Timer DATAKEEPALIVE is set to (\d+)"),
        ("DSWaitTime", r"Timer DSWAITTIME is set to (\d+)"),
        ("DSWaitTimeReply", r"Server site variable DSWAITTIMEREPLY is set to (\d+)"),
        ("FIFOOpenTime", r"Timer FIFOOPENTIME is set to (\d+)"),
        ("FIFOIOTime", r"Timer FIFOIOTIME is set to (\d+)"),
        ("VCount", r"VCOUNT is (\d+)"),
        ("JESLRecl", r"JESLRECL is (\d+)"),
        ("JESInterfaceLevel", r"JESINTERFACELEVEL is (\d+)"),
    ];
    table
        .into_iter()
        .map(|(k, p)| (k, Regex::new(p).unwrap()))
        .collect()
});

static STATUS_STRING: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    let table = [
        ("User", r"User: (\w+)"),
        ("FileType", r"FileType (\w+)"),
        ("JESRecfm", r"JESRECFM is (\w+)"),
        ("SBCSAscii", r"Outbound SBCS ASCII data uses (\w+) line terminator"),
        ("MBCSAscii", r"Outbound MBCS ASCII data uses (\w+) line terminator"),
        ("UnicodeFilesystemBOM", r"Server site variable UNICODEFILESYSTEMBOM is set to (\w+)"),
        ("UnixFileType", r"Server site variable UNIXFILETYPE is set to (\w+)"),
        ("SBSUBChar", r"SBSUBCHAR is set to (\w+)"),
        ("DataSetAllocation", r"Data sets will be allocated using unit (\w+)"),
    ];
    table
        .into_iter()
        .map(|(k, p)| (k, Regex::new(p).unwrap()))
        .collect()
});

/// Search a full `STAT` payload for a boolean status variable.
pub fn search_bool_value(response: &str, variable: &str) -> Result<bool> {
    let regex = STATUS_BOOL
        .get(variable)
        .ok_or_else(|| status_error(variable, "not implemented"))?;
    let caps = regex
        .captures(response)
        .ok_or_else(|| status_error(variable, response))?;
    Ok(&caps[1] == "TRUE")
}

/// Search a full `STAT` payload for an integer status variable.
pub fn search_int_value(response: &str, variable: &str) -> Result<u32> {
    let regex = STATUS_INT
        .get(variable)
        .ok_or_else(|| status_error(variable, "not implemented"))?;
    let caps = regex
        .captures(response)
        .ok_or_else(|| status_error(variable, response))?;
    caps[1]
        .parse()
        .map_err(|_| status_error(variable, response))
}

/// Search a full `STAT` payload for a string status variable.
pub fn search_string_value(response: &str, variable: &str) -> Result<String> {
    let regex = STATUS_STRING
        .get(variable)
        .ok_or_else(|| status_error(variable, "not implemented"))?;
    let caps = regex
        .captures(response)
        .ok_or_else(|| status_error(variable, response))?;
    Ok(caps[1].to_string())
}

/// Static server configuration extracted from one full `STAT` reply.
#[derive(Debug, Clone, Default)]
pub struct ServerStatus {
    pub data_keepalive: u32,
    pub data_set_allocation: String,
    pub ds_wait_time: u32,
    pub ds_wait_time_reply: u32,
    pub ext_dbcs_chinese: bool,
    pub fifo_io_time: u32,
    pub fifo_open_time: u32,
    pub file_type: String,
    pub ftp_keepalive: u32,
    pub inactivity_timer: u32,
    pub ispf_stats: bool,
    pub jes_interface_level: u32,
    pub jes_lrecl: u32,
    pub jes_recfm: String,
    pub mbcs_ascii: String,
    pub mb_require_last_eol: bool,
    pub sbcs_ascii: String,
    pub sb_sub: bool,
    pub sb_sub_char: String,
    pub sms: bool,
    pub tape_read_stream: bool,
    pub unicode_filesystem_bom: String,
    pub unix_file_type: String,
    pub user: String,
    pub v_count: u32,
}

impl FtpSession {
    /// Issue `STAT` and extract the full static configuration.
    pub fn server_status(&self) -> Result<ServerStatus> {
        let response = self.stat()?;
        ServerStatus::from_stat(&response)
    }
}

impl ServerStatus {
    /// Extract every known status variable from a `STAT` payload.
    pub fn from_stat(response: &str) -> Result<ServerStatus> {
        Ok(ServerStatus {
            data_keepalive: search_int_value(response, "DataKeepalive")?,
            data_set_allocation: search_string_value(response, "DataSetAllocation")?,
            ds_wait_time: search_int_value(response, "DSWaitTime")?,
            ds_wait_time_reply: search_int_value(response, "DSWaitTimeReply")?,
            ext_dbcs_chinese: search_bool_value(response, "ExtDBSChinese")?,
            fifo_io_time: search_int_value(response, "FIFOIOTime")?,
            fifo_open_time: search_int_value(response, "FIFOOpenTime")?,
            file_type: search_string_value(response, "FileType")?,
            ftp_keepalive: search_int_value(response, "FTPKeepalive")?,
            inactivity_timer: search_int_value(response, "InactivityTimer")?,
            ispf_stats: search_bool_value(response, "ISPFStats")?,
            jes_interface_level: search_int_value(response, "JESInterfaceLevel")?,
            jes_lrecl: search_int_value(response, "JESLRecl")?,
            jes_recfm: search_string_value(response, "JESRecfm")?,
            mbcs_ascii: search_string_value(response, "MBCSAscii")?,
            mb_require_last_eol: search_bool_value(response, "MbRequireLastEol")?,
            sbcs_ascii: search_string_value(response, "SBCSAscii")?,
            sb_sub: search_bool_value(response, "SBSub")?,
            sb_sub_char: search_string_value(response, "SBSUBChar")?,
            sms: search_bool_value(response, "SMS")?,
            tape_read_stream: search_bool_value(response, "TapeReadStream")?,
            unicode_filesystem_bom: search_string_value(response, "UnicodeFilesystemBOM")?,
            unix_file_type: search_string_value(response, "UnixFileType")?,
            user: search_string_value(response, "User")?,
            v_count: search_int_value(response, "VCount")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recfm_triple_extraction() {
        let resp = "Record format FB, Lrecl: 80, Blocksize: 27920";
        let caps = RECFM_TRIPLE.captures(resp).unwrap();
        assert_eq!(&caps[1], "FB");
        assert_eq!(&caps[2], "80");
        assert_eq!(&caps[3], "27920");
    }

    #[test]
    fn eol_terminator_extraction() {
        let resp = "Outbound SBCS ASCII data uses CRLF line terminator";
        let caps = EOL_TERMINATOR.captures(resp).unwrap();
        assert_eq!(&caps[1], "CRLF");
    }

    #[test]
    fn file_type_extraction() {
        let caps = FILE_TYPE.captures("FileType SEQ (Sequential - default)").unwrap();
        assert_eq!(&caps[1], "SEQ");
    }

    #[test]
    fn last_word_conventions() {
        assert_eq!(last_word_str("X", "JESJOBNAME is *").unwrap(), "*");
        assert_eq!(last_word_int("X", "JESLRECL is 80").unwrap(), 80);
        assert!(last_word_bool("X", "JESGETBYDSN is set to TRUE").unwrap());
        assert!(!last_word_bool("X", "JESGETBYDSN is set to FALSE").unwrap());
        assert!(last_word_bool("X", "JESGETBYDSN is set to MAYBE").is_err());
    }

    #[test]
    fn full_status_extraction() {
        let response = "\
User: IBMUSER\n\
FileType SEQ\n\
Inactivity timer is set to 300\n\
Timer FTPKEEPALIVE is set to 0\n\
Timer DATAKEEPALIVE is set to 0\n\
Timer DSWAITTIME is set to 0\n\
Server site variable DSWAITTIMEREPLY is set to 60\n\
Timer FIFOOPENTIME is set to 60\n\
Timer FIFOIOTIME is set to 20\n\
VCOUNT is 59\n\
JESLRECL is 80\n\
JESRECFM is F\n\
JESINTERFACELEVEL is 2\n\
Outbound SBCS ASCII data uses CRLF line terminator\n\
Outbound MBCS ASCII data uses CRLF line terminator\n\
Server site variable UNICODEFILESYSTEMBOM is set to ASIS\n\
Server site variable UNIXFILETYPE is set to FILE\n\
Server site variable TAPEREADSTREAM is set to TRUE\n\
Server site variable MBREQUIRELASTEOL is set to TRUE\n\
Server site variable EXTDBSCHINESE is set to TRUE\n\
SBSUB is set to FALSE\n\
SBSUBCHAR is set to SPACE\n\
ISPFSTATS is set to FALSE\n\
SMS is active\n\
Data sets will be allocated using unit SYSDA\n";

        let status = ServerStatus::from_stat(response).unwrap();
        assert_eq!(status.user, "IBMUSER");
        assert_eq!(status.file_type, "SEQ");
        assert_eq!(status.inactivity_timer, 300);
        assert_eq!(status.jes_interface_level, 2);
        assert_eq!(status.sbcs_ascii, "CRLF");
        assert!(status.tape_read_stream);
        assert!(!status.ispf_stats);
        assert!(!status.sms);
        assert_eq!(status.data_set_allocation, "SYSDA");
        assert_eq!(status.v_count, 59);
    }

    #[test]
    fn unknown_variable_is_not_implemented() {
        assert!(search_int_value("whatever", "NoSuchVariable").is_err());
    }
}
