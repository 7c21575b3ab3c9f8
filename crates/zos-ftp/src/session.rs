//! Session lifecycle: open, login, `AUTH TLS`, close.
//!
//! A session owns one control connection and a registry of the data
//! connections currently open under it. Control exchanges serialize
//! on the session mutex; the registry is internally thread-safe so a
//! close initiated from another thread can drain it while a transfer
//! is in flight.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use native_tls::TlsConnector;

use crate::connection::{self, ControlChannel};
use crate::error::{FtpError, Result};
use crate::eol::Eol;
use crate::log::{self, LogLevel};
use crate::options::DialOptions;
use crate::passive::Registry;
use crate::reply::ReplyCode;
use crate::transfer::TransferType;

/// A client session against one z/OS FTP server.
///
/// The handle is cheaply cloneable; clones share the underlying
/// connection, so a signal handler or watchdog thread can hold one
/// and call [`close`](Self::close) while another thread is mid
/// transfer.
#[derive(Clone)]
pub struct FtpSession {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) control: Mutex<ControlChannel>,
    pub(crate) registry: Registry,
    pub(crate) closed: AtomicBool,
    /// Remote host of the control connection; every passive data
    /// connection dials back to it.
    pub(crate) host: IpAddr,
    /// Full remote address, for diagnostics.
    pub(crate) peer: String,
    pub(crate) user: Mutex<String>,
    pub(crate) system: Mutex<String>,
    pub(crate) dial: DialOptions,
}

impl FtpSession {
    /// Dial the server and consume its greeting.
    pub fn open(server: &str, options: DialOptions) -> Result<FtpSession> {
        let stream = connection::dial(server, &options)?;
        let peer_addr = stream.peer_addr()?;

        let mut control = ControlChannel::new(Box::new(stream));
        let greeting = ReplyCode::SvcReady.expect(&mut control)?;
        log::internal(&greeting);

        Ok(FtpSession {
            inner: Arc::new(SessionInner {
                control: Mutex::new(control),
                registry: Registry::new(),
                closed: AtomicBool::new(false),
                host: peer_addr.ip(),
                peer: peer_addr.to_string(),
                user: Mutex::new(String::new()),
                system: Mutex::new(String::new()),
                dial: options,
            }),
        })
    }

    /// Authenticate and negotiate the session defaults: image
    /// transfer type and the platform end-of-line sequence for both
    /// character sets. Fails unless the server identifies as MVS.
    pub fn login(&self, user: &str, pass: &str) -> Result<()> {
        *self.lock(&self.inner.user) = user.to_uppercase();

        self.send_command(ReplyCode::NeedPwd, "USER", &[user])?;
        self.send_command(ReplyCode::LoggedInProceed, "PASS", &[pass])?;
        self.send_command(ReplyCode::EnteringPassiveMode, "PASV", &[])?;

        self.set_type(TransferType::Image)?;
        self.site_params().sb_send_eol(Eol::System)?;
        self.site_params().mb_send_eol(Eol::System)?;

        let syst = self.send_command(ReplyCode::SysType, "SYST", &[])?;
        if !syst.contains("MVS") {
            return Err(FtpError::UnsupportedSystem(syst));
        }
        *self.lock(&self.inner.system) = "MVS".to_string();

        Ok(())
    }

    /// Upgrade the control connection to TLS and require protected
    /// data channels. The connector is reused for every subsequent
    /// data connection.
    pub fn auth_tls(&self, connector: TlsConnector) -> Result<()> {
        let mut control = self.control();
        self.exchange(&mut control, ReplyCode::SecurityOk, "AUTH", &["TLS"])?;
        control.upgrade_tls(connector, &self.inner.host.to_string())?;
        self.exchange(&mut control, ReplyCode::CmdOk, "PBSZ", &["0"])?;
        self.exchange(&mut control, ReplyCode::CmdOk, "PROT", &["P"])?;
        Ok(())
    }

    /// Close every data connection, then the control connection.
    /// Idempotent: the first call trips the closed flag, later calls
    /// return without touching anything.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.inner.registry.close_all();

        log::internal(&format!("closing session connection {}", self.inner.peer));
        let mut control = self.control();
        if let Err(e) = control.shutdown() {
            log::warn(&format!("error closing session connection: {e}"));
            return Err(e.into());
        }
        Ok(())
    }

    /// The server's system type. Answered from the login cache when
    /// possible, otherwise by a fresh `SYST` exchange.
    pub fn system(&self) -> Result<String> {
        let cached = self.lock(&self.inner.system).clone();
        if !cached.is_empty() {
            return Ok(cached);
        }
        self.send_command(ReplyCode::SysType, "SYST", &[])
    }

    /// The logged-in user name, uppercased.
    pub fn user(&self) -> String {
        self.lock(&self.inner.user).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// The text of the most recent terminal reply collected by
    /// [`check_last`](Self::check_last).
    pub fn last_reply(&self) -> String {
        self.control().last_reply.clone()
    }

    /// Select which wire-level log categories are emitted.
    pub fn set_verbose(&self, level: LogLevel) {
        log::set_level(level);
    }

    pub(crate) fn peer(&self) -> &str {
        &self.inner.peer
    }

    pub(crate) fn control(&self) -> MutexGuard<'_, ControlChannel> {
        self.lock(&self.inner.control)
    }

    // Mutex poisoning only happens if a thread panicked mid-exchange;
    // the connection state is still consistent enough to close.
    pub(crate) fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}
