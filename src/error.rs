//! Error types for ifwatch

use std::io;
use thiserror::Error;

/// Result type alias for ifwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while sampling interfaces or running the query server
#[derive(Error, Debug)]
pub enum Error {
    /// The bulk counter query failed; the whole refresh cycle is skipped
    #[error("Interface source unavailable: {0}")]
    SourceUnavailable(String),

    /// Configuration or link state for a single interface could not be read
    #[error("Interface detail unavailable for {name}: {reason}")]
    InterfaceDetailUnavailable {
        /// Interface name
        name: String,
        /// Underlying cause
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Build an [`Error::InterfaceDetailUnavailable`] for `name`
    pub fn detail(name: &str, reason: impl ToString) -> Self {
        Error::InterfaceDetailUnavailable {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts a whole refresh cycle
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Error::SourceUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message() {
        let err = Error::detail("eth0", "no such device");
        assert_eq!(
            err.to_string(),
            "Interface detail unavailable for eth0: no such device"
        );
        assert!(!err.is_source_failure());
    }

    #[test]
    fn test_source_failure() {
        let err = Error::SourceUnavailable("/sys/class/net not available".to_string());
        assert!(err.is_source_failure());
    }
}
