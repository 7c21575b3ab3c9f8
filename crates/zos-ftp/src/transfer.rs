//! The transfer pipeline: payload copies over a passive data
//! connection, bracketed by the provisional and terminal control
//! replies.
//!
//! Choreography for every transfer:
//!
//! 1. passive data connection
//! 2. optional `REST <offset>` (350)
//! 3. `STOR`/`RETR` (125 or 150)
//! 4. payload copy
//! 5. explicit data close — signals EOF for stores and makes the
//!    terminal reply forthcoming
//! 6. terminal reply (250)

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use crate::eol::Eol;
use crate::error::Result;
use crate::log;
use crate::passive::DataConnection;
use crate::reply::ReplyCode;
use crate::session::FtpSession;

/// Negotiated representation for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferType {
    /// Line-oriented text with server-side EOL handling.
    #[default]
    Ascii,
    /// Raw bytes.
    Image,
}

impl TransferType {
    /// The wire command that selects this type.
    pub(crate) fn command(&self) -> &'static str {
        match self {
            TransferType::Ascii => "TYPE A",
            TransferType::Image => "TYPE I",
        }
    }

    pub fn is_ascii(&self) -> bool {
        matches!(self, TransferType::Ascii)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, TransferType::Image)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransferType::Ascii => "ASCII",
            TransferType::Image => "BINARY",
        }
    }
}

// ---------------------------------------------------------------------------
// Payload operations
// ---------------------------------------------------------------------------

/// The byte-copy half of a transfer, selected by type and direction.
pub(crate) enum Payload<'a> {
    /// Raw copy from a local reader to the data connection.
    ImageStore(&'a mut dyn Read),
    /// Line-oriented copy: each record is sent with exactly one CRLF,
    /// including an unterminated final record.
    AsciiStore(&'a mut dyn Read),
    /// Raw copy from the data connection to a local writer. The
    /// server inserts EOLs for ASCII retrieves; nothing to do here.
    Retrieve(&'a mut dyn Write),
}

impl Payload<'_> {
    pub(crate) fn verb(&self) -> &'static str {
        match self {
            Payload::ImageStore(_) | Payload::AsciiStore(_) => "STOR",
            Payload::Retrieve(_) => "RETR",
        }
    }

    pub(crate) fn run(&mut self, conn: &DataConnection) -> io::Result<u64> {
        match self {
            Payload::ImageStore(src) => {
                let mut dest = BufWriter::new(conn);
                let n = io::copy(src, &mut dest)?;
                dest.flush()?;
                Ok(n)
            }
            Payload::AsciiStore(src) => {
                let mut reader = BufReader::new(src);
                let mut dest = BufWriter::new(conn);
                let mut line = Vec::new();
                let mut written: u64 = 0;

                loop {
                    line.clear();
                    let n = reader.read_until(b'\n', &mut line)?;
                    if n == 0 {
                        break;
                    }
                    if line.last() == Some(&b'\n') {
                        line.pop();
                    }
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    dest.write_all(&line)?;
                    dest.write_all(b"\r\n")?;
                    written += line.len() as u64 + 2;
                }

                dest.flush()?;
                Ok(written)
            }
            Payload::Retrieve(dest) => {
                let mut src = conn;
                io::copy(&mut src, dest)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

impl FtpSession {
    /// Negotiate the transfer type. The session's current type is
    /// updated only on a successful acknowledgement.
    pub fn set_type(&self, transfer_type: TransferType) -> Result<()> {
        let mut control = self.control();
        self.exchange(&mut control, ReplyCode::CmdOk, transfer_type.command(), &[])?;
        control.current_type = transfer_type;
        Ok(())
    }

    /// The session's currently negotiated transfer type.
    pub fn current_type(&self) -> TransferType {
        self.control().current_type
    }

    /// Store the reader's contents to `remote`. Returns the byte
    /// count and the concatenated provisional + terminal reply text.
    /// The prior transfer type is restored on success and failure
    /// alike.
    pub fn store_reader(
        &self,
        remote: &str,
        src: &mut dyn Read,
        transfer_type: TransferType,
    ) -> Result<(u64, String)> {
        self.store_reader_at(remote, src, transfer_type, None)
    }

    /// [`store_reader`](Self::store_reader) with a `REST` restart
    /// offset. z/OS is not known to honor `REST` for dataset stores;
    /// do not rely on partial-store resume.
    pub fn store_reader_at(
        &self,
        remote: &str,
        src: &mut dyn Read,
        transfer_type: TransferType,
        offset: Option<u64>,
    ) -> Result<(u64, String)> {
        self.with_type_restored(transfer_type, |s| {
            let mut payload = if transfer_type.is_ascii() {
                Payload::AsciiStore(src)
            } else {
                Payload::ImageStore(src)
            };
            s.run_transfer(&mut payload, remote, offset)
        })
    }

    /// Retrieve `remote` into the writer. For ASCII retrieves the
    /// server-side single-byte EOL is scoped to the platform default
    /// for the duration of the transfer.
    pub fn retrieve_writer(
        &self,
        remote: &str,
        dest: &mut dyn Write,
        transfer_type: TransferType,
    ) -> Result<(u64, String)> {
        self.retrieve_writer_at(remote, dest, transfer_type, None)
    }

    /// [`retrieve_writer`](Self::retrieve_writer) resuming at a byte
    /// offset via `REST`.
    pub fn retrieve_writer_at(
        &self,
        remote: &str,
        dest: &mut dyn Write,
        transfer_type: TransferType,
        offset: Option<u64>,
    ) -> Result<(u64, String)> {
        let _eol_scope = if transfer_type.is_ascii() {
            Some(self.scoped_sb_send_eol(Eol::System)?)
        } else {
            None
        };

        self.with_type_restored(transfer_type, |s| {
            s.run_transfer(&mut Payload::Retrieve(dest), remote, offset)
        })
    }

    /// Switch to `transfer_type`, run the body, and restore the prior
    /// type on every exit path. A restore failure after a successful
    /// body surfaces; after a failed body it is logged so the
    /// original error stays visible.
    fn with_type_restored<F>(&self, transfer_type: TransferType, body: F) -> Result<(u64, String)>
    where
        F: FnOnce(&Self) -> Result<(u64, String)>,
    {
        let previous = self.current_type();
        self.set_type(transfer_type)?;

        let result = body(self);

        match self.set_type(previous) {
            Ok(()) => result,
            Err(restore_err) => match result {
                Ok(_) => {
                    log::error("error while setting back the transfer type");
                    Err(restore_err)
                }
                Err(primary) => {
                    log::warn(&format!(
                        "error while setting back the transfer type: {restore_err}"
                    ));
                    Err(primary)
                }
            },
        }
    }

    fn run_transfer(
        &self,
        payload: &mut Payload<'_>,
        remote: &str,
        offset: Option<u64>,
    ) -> Result<(u64, String)> {
        let port = self.set_passive_mode()?;
        let child = self.new_data_connection(port)?;

        let result = (|| {
            if let Some(off) = offset {
                self.send_command(ReplyCode::NeedInfo, "REST", &[&off.to_string()])?;
            }

            let starting = self.send_command_any(
                &[ReplyCode::ListOk, ReplyCode::FileStatusOk],
                payload.verb(),
                &[remote],
            )?;

            let bytes = payload.run(&child)?;

            child.close()?;

            let done = self.check_last(ReplyCode::FileActionOk)?;
            Ok((bytes, format!("{starting}\n{done}")))
        })();

        if !child.is_closed() {
            if let Err(e) = child.close() {
                log::error(&format!("error closing data connection: {e}"));
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_commands() {
        assert_eq!(TransferType::Ascii.command(), "TYPE A");
        assert_eq!(TransferType::Image.command(), "TYPE I");
    }

    #[test]
    fn type_predicates() {
        assert!(TransferType::Ascii.is_ascii());
        assert!(!TransferType::Ascii.is_binary());
        assert!(TransferType::Image.is_binary());
        assert_eq!(TransferType::Image.name(), "BINARY");
    }

    #[test]
    fn payload_verbs() {
        let mut empty: &[u8] = b"";
        let mut sink = Vec::new();
        assert_eq!(Payload::ImageStore(&mut empty).verb(), "STOR");
        assert_eq!(Payload::AsciiStore(&mut empty).verb(), "STOR");
        assert_eq!(Payload::Retrieve(&mut sink).verb(), "RETR");
    }
}
