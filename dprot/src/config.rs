use crate::core::Checking;
use crate::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RX_TIMEOUT_MS};

/// Session-wide protocol settings. Both peers must agree on `checking`,
/// it is never negotiated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub checking: Checking,
    pub max_attempts: u8,
    pub rx_timeout_ms: u32,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            checking: Checking::Crc8,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rx_timeout_ms: DEFAULT_RX_TIMEOUT_MS,
        }
    }

    pub const fn with_checking(mut self, checking: Checking) -> Self {
        self.checking = checking;
        self
    }

    /// A single attempt is always made, so zero is treated as one.
    pub const fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    pub const fn with_rx_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.rx_timeout_ms = timeout_ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
