//! Command dispatch: one serialized request/response exchange on the
//! control channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::connection::ControlChannel;
use crate::error::{FtpError, Result};
use crate::log;
use crate::reply::{self, ReplyCode};
use crate::session::FtpSession;

const WAIT_POLL: Duration = Duration::from_millis(25);

/// Cooperative cancellation handle for a single command wait.
///
/// Tripping the token cancels the caller's wait only: the in-flight
/// write/read runs to completion on an internal worker, because
/// aborting a stream operation mid-way would corrupt the session.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

enum Wait {
    Token(CancelToken),
    Deadline(Instant),
}

impl FtpSession {
    /// Send one command and validate the reply against the expected
    /// code. Exchanges on the same session serialize on the session
    /// mutex; the write and the matching read form one critical
    /// section.
    pub fn send_command(&self, expect: ReplyCode, verb: &str, args: &[&str]) -> Result<String> {
        let mut control = self.control();
        self.exchange(&mut control, expect, verb, args)
    }

    /// Like [`send_command`](Self::send_command), but the caller's
    /// wait can be cancelled through `token`.
    pub fn send_command_cancellable(
        &self,
        expect: ReplyCode,
        verb: &str,
        args: &[&str],
        token: &CancelToken,
    ) -> Result<String> {
        self.dispatch_detached(expect, verb, args, Wait::Token(token.clone()))
    }

    /// Like [`send_command`](Self::send_command), but gives up
    /// waiting after `timeout`. The exchange itself still runs to
    /// completion on a worker.
    pub fn send_command_timeout(
        &self,
        expect: ReplyCode,
        verb: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<String> {
        self.dispatch_detached(expect, verb, args, Wait::Deadline(Instant::now() + timeout))
    }

    /// Read the next reply off the control channel and validate it,
    /// without sending anything. Used after a data-connection close
    /// to collect the terminal transfer reply. A closed session
    /// short-circuits to an empty payload.
    pub fn check_last(&self, expect: ReplyCode) -> Result<String> {
        let mut control = self.control();
        if self.is_closed() {
            log::warn(&format!("session {} is closed", self.peer()));
            return Ok(String::new());
        }

        control.last_reply.clear();
        match reply::read_reply(&mut control, &[expect]) {
            Ok(msg) => {
                control.last_reply.push_str(&msg);
                Ok(msg)
            }
            Err(FtpError::UnexpectedReply { got, want, message }) => {
                control.last_reply.push_str(&message);
                log::warn(&format!("[res|error] got {got}, want {want}: {message}"));
                Err(FtpError::UnexpectedReply { got, want, message })
            }
            Err(e) => Err(e),
        }
    }

    /// Change the server's working directory.
    pub fn cwd(&self, path: &str) -> Result<String> {
        self.send_command(ReplyCode::FileActionOk, "CWD", &[path])
    }

    pub(crate) fn exchange(
        &self,
        control: &mut ControlChannel,
        expect: ReplyCode,
        verb: &str,
        args: &[&str],
    ) -> Result<String> {
        self.exchange_any(control, &[expect], verb, args)
    }

    /// The core exchange: format, write, read one reply, validate
    /// against any of `accepted`. A closed session short-circuits to
    /// a benign empty payload.
    pub(crate) fn exchange_any(
        &self,
        control: &mut ControlChannel,
        accepted: &[ReplyCode],
        verb: &str,
        args: &[&str],
    ) -> Result<String> {
        if self.is_closed() {
            log::warn(&format!("session {} is closed", self.peer()));
            return Ok(String::new());
        }

        let wire = format_command(verb, args);
        control.write_all(wire.as_bytes())?;
        reply::read_reply(control, accepted)
    }

    pub(crate) fn send_command_any(
        &self,
        accepted: &[ReplyCode],
        verb: &str,
        args: &[&str],
    ) -> Result<String> {
        let mut control = self.control();
        self.exchange_any(&mut control, accepted, verb, args)
    }

    fn dispatch_detached(
        &self,
        expect: ReplyCode,
        verb: &str,
        args: &[&str],
        wait: Wait,
    ) -> Result<String> {
        let (tx, rx) = mpsc::channel();
        let session = self.clone();
        let verb = verb.to_string();
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();

        thread::spawn(move || {
            let refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let _ = tx.send(session.send_command(expect, &verb, &refs));
        });

        loop {
            match rx.recv_timeout(WAIT_POLL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => match &wait {
                    Wait::Token(token) if token.is_cancelled() => return Err(FtpError::Cancelled),
                    Wait::Deadline(deadline) if Instant::now() >= *deadline => {
                        return Err(FtpError::Io(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            "timed out waiting for server reply",
                        )))
                    }
                    _ => {}
                },
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FtpError::Io(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "command worker terminated",
                    )))
                }
            }
        }
    }
}

/// Uppercase the verb, join the argument words, and frame the wire
/// line. Password-bearing commands are masked in the log.
fn format_command(verb: &str, args: &[&str]) -> String {
    let verb = verb.trim().to_uppercase();
    let joined = args.join(" ");
    let joined = joined.trim();

    log::command(&display_command(&verb, joined));

    format!("{verb} {joined}\r\n")
}

/// The loggable form of a command line: `PASS` arguments never
/// appear in clear.
fn display_command(verb: &str, args: &str) -> String {
    if verb.starts_with("PASS") {
        format!("PASS {}", "*".repeat(args.len()))
    } else if args.is_empty() {
        verb.to_string()
    } else {
        format!("{verb} {args}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uppercases_and_frames() {
        assert_eq!(format_command("user", &["ibmuser"]), "USER ibmuser\r\n");
    }

    #[test]
    fn format_joins_argument_words() {
        assert_eq!(
            format_command("site", &["FILETYPE=JES", "NOJESGETBYDSN"]),
            "SITE FILETYPE=JES NOJESGETBYDSN\r\n"
        );
    }

    #[test]
    fn format_without_args_keeps_separator() {
        assert_eq!(format_command("pasv", &[]), "PASV \r\n");
    }

    #[test]
    fn password_is_masked_in_logs() {
        assert_eq!(display_command("PASS", "hunter2"), "PASS *******");
        assert!(!display_command("PASS", "hunter2").contains("hunter2"));
        assert_eq!(display_command("USER", "ibmuser"), "USER ibmuser");
    }

    #[test]
    fn token_starts_untripped() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        token.clone().cancel();
        assert!(token.is_cancelled());
    }
}
