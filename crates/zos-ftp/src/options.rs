//! Dialing configuration.

use std::time::Duration;

/// Configuration for establishing the control connection and every
/// passive data connection derived from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DialOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) keep_alive: Option<Duration>,
}

impl DialOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit how long connection establishment may take.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable TCP keep-alive probes with the given period. A zero
    /// duration disables them.
    pub fn with_keep_alive(mut self, period: Duration) -> Self {
        self.keep_alive = if period.is_zero() { None } else { Some(period) };
        self
    }
}
