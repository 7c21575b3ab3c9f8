//! Control-channel transport.
//!
//! The session owns exactly one control stream: a TCP connection,
//! optionally re-seated under TLS after `AUTH TLS`. Reply lines are
//! assembled here; reply semantics live in [`crate::reply`].

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use native_tls::TlsConnector;

use crate::error::{FtpError, Result};
use crate::log;
use crate::options::DialOptions;
use crate::transfer::TransferType;

const READ_CHUNK: usize = 1024;

/// A byte stream that can also be shut down, so data-connection
/// close can signal EOF to the server under both plain TCP and TLS.
pub(crate) trait Stream: Read + Write + Send + fmt::Debug {
    fn shutdown_stream(&mut self) -> io::Result<()>;
}

impl Stream for TcpStream {
    fn shutdown_stream(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

impl<S: Stream> Stream for native_tls::TlsStream<S> {
    fn shutdown_stream(&mut self) -> io::Result<()> {
        // close_notify may fail if the peer already went away; the
        // transport teardown below is what matters.
        let _ = self.shutdown();
        self.get_mut().shutdown_stream()
    }
}

impl Stream for Box<dyn Stream> {
    fn shutdown_stream(&mut self) -> io::Result<()> {
        (**self).shutdown_stream()
    }
}

pub(crate) type BoxStream = Box<dyn Stream>;

/// Placeholder installed while the control stream is being re-seated
/// under TLS. Any I/O against it means the upgrade failed mid-way
/// and the session is tainted.
#[derive(Debug)]
struct DetachedStream;

impl Read for DetachedStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "control stream detached",
        ))
    }
}

impl Write for DetachedStream {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::NotConnected,
            "control stream detached",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Stream for DetachedStream {
    fn shutdown_stream(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Control channel
// ---------------------------------------------------------------------------

/// The session's control stream plus everything the session mutex
/// guards alongside it: the line buffer, the negotiated transfer
/// type, the TLS configuration, and the last-reply buffer.
pub(crate) struct ControlChannel {
    stream: BoxStream,
    buffer: Vec<u8>,
    pub(crate) current_type: TransferType,
    pub(crate) tls: Option<TlsConnector>,
    pub(crate) last_reply: String,
}

impl ControlChannel {
    pub(crate) fn new(stream: BoxStream) -> Self {
        ControlChannel {
            stream,
            buffer: Vec::new(),
            current_type: TransferType::Ascii,
            tls: None,
            last_reply: String::new(),
        }
    }

    /// Read one newline-terminated line, without its terminator.
    /// Returns `None` once EOF is reached and the buffer is drained.
    /// A line longer than one read chunk is assembled across reads.
    pub(crate) fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                if self.buffer.last() == Some(&b'\r') {
                    self.buffer.pop();
                }
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                return Ok(Some(line));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    pub(crate) fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data)?;
        self.stream.flush()
    }

    pub(crate) fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown_stream()
    }

    /// `AUTH TLS` was accepted: wrap the live transport and drop any
    /// buffered plaintext so the next read starts on the TLS records.
    pub(crate) fn upgrade_tls(&mut self, connector: TlsConnector, domain: &str) -> Result<()> {
        let plain = std::mem::replace(&mut self.stream, Box::new(DetachedStream));
        let tls = connector
            .connect(domain, plain)
            .map_err(|e| FtpError::Tls(e.to_string()))?;
        self.stream = Box::new(tls);
        self.buffer.clear();
        self.tls = Some(connector);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dialing
// ---------------------------------------------------------------------------

/// Establish a TCP connection honoring the session's dial options.
pub(crate) fn dial(server: &str, options: &DialOptions) -> Result<TcpStream> {
    let stream = match options.timeout {
        Some(timeout) => {
            let mut last_err: Option<io::Error> = None;
            let mut connected = None;
            for addr in server.to_socket_addrs()? {
                match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(s) => {
                        connected = Some(s);
                        break;
                    }
                    Err(e) => last_err = Some(e),
                }
            }
            match connected {
                Some(s) => s,
                None => {
                    return Err(last_err
                        .unwrap_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::AddrNotAvailable,
                                "no socket addresses resolved",
                            )
                        })
                        .into())
                }
            }
        }
        None => TcpStream::connect(server)?,
    };

    if let Some(period) = options.keep_alive {
        if let Err(e) = set_keep_alive(&stream, period) {
            log::warn(&format!("failed to enable TCP keep-alive: {e}"));
        }
    }

    Ok(stream)
}

#[cfg(unix)]
fn set_keep_alive(stream: &TcpStream, period: Duration) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    fn setsockopt(
        fd: libc::c_int,
        level: libc::c_int,
        name: libc::c_int,
        value: libc::c_int,
    ) -> io::Result<()> {
        let rc = unsafe {
            libc::setsockopt(
                fd,
                level,
                name,
                &value as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    let fd = stream.as_raw_fd();
    setsockopt(fd, libc::SOL_SOCKET, libc::SO_KEEPALIVE, 1)?;

    #[cfg(target_os = "linux")]
    {
        let secs = period.as_secs().max(1) as libc::c_int;
        setsockopt(fd, libc::IPPROTO_TCP, libc::TCP_KEEPIDLE, secs)?;
        setsockopt(fd, libc::IPPROTO_TCP, libc::TCP_KEEPINTVL, secs)?;
    }
    #[cfg(not(target_os = "linux"))]
    let _ = period;

    Ok(())
}

#[cfg(not(unix))]
fn set_keep_alive(_stream: &TcpStream, _period: Duration) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
