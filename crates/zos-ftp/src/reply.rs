//! Server reply codes and the reply reader.
//!
//! A reply is one or more lines, each starting with a 3-digit code
//! followed by `-` (continuation) or a space (terminal). The reader
//! consumes lines until it sees a terminal line whose code matches
//! the last code received, assembling the text payload along the way.

use std::fmt;

use crate::connection::ControlChannel;
use crate::error::{FtpError, Result};
use crate::log;

/// FTP reply codes the library interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReplyCode {
    ListOk = 125,
    FileStatusOk = 150,
    DirStatusOk = 151,
    CmdOk = 200,
    CmdNotImplementedSuper = 202,
    SysStatus = 211,
    DirStatus = 212,
    FileStatus = 213,
    HelpMsg = 214,
    SysType = 215,
    SvcReady = 220,
    SvcClosingControlConn = 221,
    DataConnOpen = 225,
    ClosingDataConn = 226,
    EnteringPassiveMode = 227,
    LoggedInProceed = 230,
    SecurityOk = 234,
    FileActionOk = 250,
    DirCreated = 257,
    NeedPwd = 331,
    NeedAcctForLogin = 332,
    SecurityExchangeOk = 334,
    NeedInfo = 350,
    SvcNotAvailable = 421,
    CantOpenDataConn = 425,
    ConnClosed = 426,
    FileActionNotTaken = 450,
    LocalError = 451,
    InsufficientStorage = 452,
    CmdNotRecognized = 500,
    ArgsError = 501,
    CmdNotImplemented = 502,
    BadCmdSequence = 503,
    CmdNotImplementedParam = 504,
    UserNotLogged = 530,
    FileActionNotTakenPerm = 550,
    PageTypeUnknown = 551,
    ExceededStorageAlloc = 552,
    BadFileName = 553,
}

impl ReplyCode {
    /// The numeric wire value.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// 1xx — the requested action is starting; expect another reply.
    pub fn is_preliminary(self) -> bool {
        (100..200).contains(&self.code())
    }

    /// 2xx — the requested action completed.
    pub fn is_completion(self) -> bool {
        (200..300).contains(&self.code())
    }

    /// 3xx — the server needs further information.
    pub fn is_intermediate(self) -> bool {
        (300..400).contains(&self.code())
    }

    /// 4xx — transient failure; the command may be retried.
    pub fn is_transient_failure(self) -> bool {
        (400..500).contains(&self.code())
    }

    /// 5xx — permanent failure.
    pub fn is_permanent_failure(self) -> bool {
        self.code() >= 500
    }

    /// Read one reply and require this exact code.
    pub(crate) fn expect(self, control: &mut ControlChannel) -> Result<String> {
        read_reply(control, &[self])
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Read one complete reply from the control channel.
///
/// Lines whose code matches one of `accepted` contribute their text
/// with the 4-byte prefix stripped; non-matching lines keep the full
/// line text so the eventual error stays diagnostic. EOF terminates
/// the loop gracefully with whatever accumulated. An unparseable
/// numeric prefix is logged and the last received code is kept.
pub(crate) fn read_reply(control: &mut ControlChannel, accepted: &[ReplyCode]) -> Result<String> {
    let mut response = String::new();
    let mut received: u16 = 0;

    while let Some(line) = control.read_line()? {
        log::server(&line);

        if line.len() < 4 {
            continue;
        }

        match line[..3].parse::<u16>() {
            Ok(code) => received = code,
            Err(e) => log::error(&format!("converting response code to integer: {e}")),
        }

        if accepted.iter().any(|c| c.code() == received) {
            response.push_str(&line[4..]);
        } else {
            response.push_str(&line);
        }

        match line.as_bytes()[3] {
            b'-' => response.push('\n'),
            b' ' => break,
            _ => {}
        }
    }

    if !accepted.iter().any(|c| c.code() == received) {
        return Err(FtpError::UnexpectedReply {
            got: received,
            want: accepted[0].code(),
            message: response,
        });
    }

    Ok(response)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
