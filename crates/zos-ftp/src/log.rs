//! Categorical logging front-end.
//!
//! Emission goes through `tracing`; a process-wide bit-set decides
//! which wire-level categories are emitted at all. Categories:
//! `[cmd]` outgoing commands (passwords masked by the dispatcher),
//! `[res]` incoming reply lines, `[psv]` passive-mode scanner
//! output, `[***]` internal debug.

use std::ops::BitOr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Bit-set of wire-level log categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel(u32);

impl LogLevel {
    pub const NONE: LogLevel = LogLevel(0);
    /// Incoming reply lines.
    pub const SERVER: LogLevel = LogLevel(1);
    /// Lines collected over passive data connections.
    pub const PASSIVE: LogLevel = LogLevel(1 << 1);
    /// Outgoing commands.
    pub const COMMAND: LogLevel = LogLevel(1 << 2);
    /// Internal debug traces.
    pub const DEBUG: LogLevel = LogLevel(1 << 3);
    pub const ALL: LogLevel = LogLevel(0b1111);

    pub fn contains(&self, other: LogLevel) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LogLevel {
    type Output = LogLevel;

    fn bitor(self, rhs: LogLevel) -> LogLevel {
        LogLevel(self.0 | rhs.0)
    }
}

static LEVEL: AtomicU32 = AtomicU32::new(0);

/// Select which wire-level categories are emitted.
pub fn set_level(level: LogLevel) {
    LEVEL.store(level.0, Ordering::Relaxed);
}

fn enabled(level: LogLevel) -> bool {
    LEVEL.load(Ordering::Relaxed) & level.0 != 0
}

pub(crate) fn command(line: &str) {
    if enabled(LogLevel::COMMAND) {
        tracing::debug!(target: "zos_ftp", "[cmd] {line}");
    }
}

pub(crate) fn server(line: &str) {
    if enabled(LogLevel::SERVER) {
        tracing::debug!(target: "zos_ftp", "[res] {line}");
    }
}

pub(crate) fn passive(line: &str) {
    if enabled(LogLevel::PASSIVE) {
        tracing::debug!(target: "zos_ftp", "[psv] {line}");
    }
}

pub(crate) fn internal(line: &str) {
    if enabled(LogLevel::DEBUG) {
        tracing::debug!(target: "zos_ftp", "[***] {line}");
    }
}

pub(crate) fn warn(line: &str) {
    tracing::warn!(target: "zos_ftp", "{line}");
}

pub(crate) fn error(line: &str) {
    tracing::error!(target: "zos_ftp", "{line}");
}
