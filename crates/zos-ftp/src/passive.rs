//! Passive-mode data connections.
//!
//! Each transfer dials a fresh passive data connection. The port
//! comes from the `PASV` reply; the host is always the control
//! connection's remote host, because servers behind NAT routinely
//! misreport the address tuple.

use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use dashmap::DashMap;
use regex::Regex;

use crate::connection::{self, BoxStream, Stream};
use crate::error::{FtpError, Result};
use crate::log;
use crate::reply::ReplyCode;
use crate::session::FtpSession;

static PASV_TUPLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d+,\d+,\d+,\d+,(\d+),(\d+)\)").unwrap());

const PASV_TIMEOUT: Duration = Duration::from_secs(10);
const SCAN_CHUNK: usize = 1024;

/// Extract the data port from a `PASV` reply line. Whitespace is
/// stripped first so servers that pad the tuple still parse.
fn find_port(line: &str) -> Result<u16> {
    let stripped: String = line.chars().filter(|c| !c.is_whitespace()).collect();

    let caps = PASV_TUPLE
        .captures(&stripped)
        .ok_or_else(|| FtpError::PassiveFormat(stripped.clone()))?;

    let p1: u32 = caps[1]
        .parse()
        .map_err(|_| FtpError::PassiveFormat(stripped.clone()))?;
    let p2: u32 = caps[2]
        .parse()
        .map_err(|_| FtpError::PassiveFormat(stripped.clone()))?;

    let port = p1 * 256 + p2;
    u16::try_from(port).map_err(|_| FtpError::PassiveFormat(stripped))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Concurrent map of the data connections currently open under a
/// session, keyed by remote address. A connection appears here from
/// creation to close, exactly.
pub(crate) struct Registry {
    connections: Arc<DashMap<String, Arc<DataConnection>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Registry {
            connections: Arc::new(DashMap::new()),
        }
    }

    fn insert(&self, conn: Arc<DataConnection>) {
        self.connections.insert(conn.remote_addr().to_string(), conn);
    }

    /// Close every registered child, logging per-child failures
    /// without aborting the sweep.
    pub(crate) fn close_all(&self) {
        let children: Vec<Arc<DataConnection>> =
            self.connections.iter().map(|e| e.value().clone()).collect();
        for child in children {
            log::internal(&format!(
                "closing child net connection {}",
                child.remote_addr()
            ));
            if let Err(e) = child.close() {
                log::warn(&format!(
                    "error closing child net connection {}: {e}",
                    child.remote_addr()
                ));
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.len()
    }
}

// ---------------------------------------------------------------------------
// Data connection
// ---------------------------------------------------------------------------

/// A child transport paired to a session, created per transfer.
pub struct DataConnection {
    stream: Mutex<BoxStream>,
    scan_buffer: Mutex<Vec<u8>>,
    closed: AtomicBool,
    remote: String,
    parent: String,
    registry: Arc<DashMap<String, Arc<DataConnection>>>,
}

impl DataConnection {
    /// Remote address of this data connection.
    pub fn remote_addr(&self) -> &str {
        &self.remote
    }

    /// Remote address of the owning control connection.
    pub fn parent_addr(&self) -> &str {
        &self.parent
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the transport and deregister. Idempotent: concurrent
    /// closers serialize on the stream lock and only the first one
    /// touches the transport.
    pub fn close(&self) -> Result<()> {
        let mut stream = self.lock_stream();

        log::internal(&format!(
            "attempting to close child connection: {} | closed={}",
            self.remote,
            self.is_closed()
        ));
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        if self.registry.remove(&self.remote).is_none() {
            debug_assert!(
                false,
                "child connection missing from registry: {}",
                self.remote
            );
            log::error(&format!(
                "cannot find child connection in registry: {}",
                self.remote
            ));
        }

        let result = stream.shutdown_stream();
        self.closed.store(true, Ordering::SeqCst);
        log::internal(&format!("closed child connection: {}", self.remote));

        result.map_err(Into::into)
    }

    /// Read one line off the data connection, for listings. Checks
    /// the closed flag before each transport read so a concurrent
    /// close yields EOF cooperatively.
    pub(crate) fn scan_line(&self) -> io::Result<Option<String>> {
        let mut buffer = self.lock(&self.scan_buffer);
        loop {
            if let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.is_closed() {
                return Ok(None);
            }

            let mut chunk = [0u8; SCAN_CHUNK];
            let n = self.lock_stream().read(&mut chunk)?;
            if n == 0 {
                if buffer.is_empty() {
                    return Ok(None);
                }
                let line = String::from_utf8_lossy(&buffer).into_owned();
                buffer.clear();
                return Ok(Some(line));
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn lock_stream(&self) -> MutexGuard<'_, BoxStream> {
        self.lock(&self.stream)
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Read for &DataConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Ok(0);
        }
        self.lock_stream().read(buf)
    }
}

impl Write for &DataConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock_stream().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock_stream().flush()
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

impl FtpSession {
    /// Request passive mode and parse the data port out of the 227
    /// reply.
    pub fn set_passive_mode(&self) -> Result<u16> {
        let response = self.send_command_timeout(
            ReplyCode::EnteringPassiveMode,
            "PASV",
            &[],
            PASV_TIMEOUT,
        )?;
        find_port(&response)
    }

    /// Dial a data connection to the control host on `port`, TLS-wrap
    /// it when the control channel is protected, and register it for
    /// cleanup. The child is never left half-registered: any dial or
    /// handshake failure surfaces before the registry is touched.
    pub(crate) fn new_data_connection(&self, port: u16) -> Result<Arc<DataConnection>> {
        let control = self.control();

        log::internal(&format!(
            "attempting to create a new connection with port {port}"
        ));

        let address = SocketAddr::new(self.inner.host, port).to_string();
        let stream = connection::dial(&address, &self.inner.dial)?;
        let remote = stream.peer_addr()?.to_string();

        let boxed: BoxStream = match &control.tls {
            Some(connector) => {
                let tls = connector
                    .connect(&self.inner.host.to_string(), stream)
                    .map_err(|e| FtpError::Tls(e.to_string()))?;
                log::internal("upgraded connection to TLS");
                Box::new(tls)
            }
            None => Box::new(stream),
        };

        let child = Arc::new(DataConnection {
            stream: Mutex::new(boxed),
            scan_buffer: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            remote: remote.clone(),
            parent: self.inner.peer.clone(),
            registry: self.inner.registry.connections.clone(),
        });
        self.inner.registry.insert(child.clone());

        log::internal(&format!("created child connection: {remote}"));
        Ok(child)
    }

    /// Number of data connections currently registered.
    pub fn open_data_connections(&self) -> usize {
        self.inner.registry.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
