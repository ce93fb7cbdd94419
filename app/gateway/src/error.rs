//! Engine error type.

use compact_str::CompactString;

/// Failures surfaced by engine operations.
///
/// The streaming path drops most of these silently; only malformed payloads
/// are echoed back to the sender, and only the auxiliary HTTP surface
/// reports unknown runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No active session exists for the run id.
    #[error("run '{0}' not found")]
    UnknownRun(CompactString),
    /// Coordinates are not finite or out of range.
    #[error("invalid position: latitude {latitude}, longitude {longitude}")]
    InvalidPosition { latitude: f64, longitude: f64 },
    /// Speed is negative or not finite.
    #[error("invalid speed: {0}")]
    InvalidSpeed(f64),
}

impl Error {
    /// Status code reported on the wire and over HTTP.
    pub fn code(&self) -> u16 {
        match self {
            Self::UnknownRun(_) => 404,
            Self::InvalidPosition { .. } | Self::InvalidSpeed(_) => 400,
        }
    }
}

/// Engine result alias.
pub type Result<T> = std::result::Result<T, Error>;
