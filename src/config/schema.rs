//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every struct is `#[serde(default)]` so a minimal (or empty) file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound for each of connect, read and write, in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 0.25;

/// Default number of bytes requested per body read.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SluiceConfig {
    /// Socket timeout policy.
    pub timeouts: TimeoutConfig,

    /// Body read settings.
    pub body: BodyConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Which timeout policy a connection runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutMode {
    /// Blocking primitives, no deadline.
    Null,
    /// Independent connect, read and write deadlines.
    #[default]
    PerOperation,
}

/// Timeout configuration. Values are seconds and may be fractional.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub mode: TimeoutMode,

    /// Bound on establishing the connection.
    pub connect_secs: f64,

    /// Bound on each wait for the socket to become readable.
    pub read_secs: f64,

    /// Bound on each wait for the socket to become writable.
    pub write_secs: f64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            mode: TimeoutMode::PerOperation,
            connect_secs: DEFAULT_TIMEOUT_SECS,
            read_secs: DEFAULT_TIMEOUT_SECS,
            write_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl TimeoutConfig {
    /// Config for the unbounded policy.
    pub fn null() -> Self {
        Self {
            mode: TimeoutMode::Null,
            ..Self::default()
        }
    }

    pub fn connect(&self) -> Duration {
        secs(self.connect_secs)
    }

    pub fn read(&self) -> Duration {
        secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        secs(self.write_secs)
    }
}

// Invalid values are rejected by validation; clamp here so a Duration can
// always be built.
fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// Response body settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum bytes requested from the socket per read.
    pub buffer_size: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sluice=info".to_string(),
        }
    }
}
