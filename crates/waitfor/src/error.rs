//! Error types for the probing engine.
//!
//! Parse and bootstrap errors are fatal and stop a run before any network
//! I/O. Probe errors are always retryable; they only surface as the reason
//! attached to a verbose `down` line.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while turning a raw descriptor into a [`crate::Target`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("target is empty")]
    Empty,

    #[error("no scheme specified in {raw:?}")]
    MissingScheme { raw: String },

    #[error("unsupported scheme {scheme:?} in target {raw:?}")]
    UnsupportedScheme { raw: String, scheme: String },

    #[error("no host specified in {raw:?}")]
    MissingHost { raw: String },

    #[error("invalid target {raw:?}: must be in the format \"host:port\"")]
    MissingPort { raw: String },

    #[error("invalid target {raw:?}: {source}")]
    Malformed {
        raw: String,
        #[source]
        source: url::ParseError,
    },
}

/// Errors raised by a probe when the target shape does not fit its protocol
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid scheme for {probe} probe: {scheme}")]
    SchemeMismatch { probe: &'static str, scheme: String },

    #[error("no host specified for {probe} scheme")]
    MissingHost { probe: &'static str },

    #[error("{probe} targets cannot carry a path: {path:?}")]
    UnexpectedPath { probe: &'static str, path: String },

    #[error("no database name specified in the URL")]
    MissingDatabase,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("invalid {engine} connection string: {source}")]
    ConnectOptions {
        engine: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

/// A failed readiness check. Every variant is retryable.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("no {family} address found for {address}")]
    NoAddress { address: String, family: &'static str },

    #[error("no response within {0:?}")]
    TimedOut(Duration),

    #[error("received non-2xx status code: {0}")]
    Status(reqwest::StatusCode),

    #[error("{0}")]
    Transport(String),

    #[error("error opening {engine} connection: {message}")]
    Connect { engine: &'static str, message: String },

    #[error("error pinging {engine} database: {message}")]
    Ping { engine: &'static str, message: String },

    #[error("probe cancelled")]
    Cancelled,

    #[error("probe used before bootstrap")]
    NotBootstrapped,
}

/// Top-level error of a run
#[derive(Debug, Error)]
pub enum Error {
    #[error("no targets specified")]
    NoTargets,

    #[error("invalid run configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to parse target {raw:?}: {source}")]
    Parse {
        raw: String,
        #[source]
        source: TargetError,
    },

    #[error("no probe registered for scheme {scheme:?} (target: {target:?})")]
    Unregistered { scheme: String, target: String },

    #[error("failed to bootstrap configuration for target {target:?}: {source}")]
    Bootstrap {
        target: String,
        #[source]
        source: BootstrapError,
    },

    #[error("timeout reached while waiting for {target:?}")]
    TargetTimeout { target: String },

    #[error("target {target:?} failed: {source}")]
    Probe {
        target: String,
        #[source]
        source: ProbeError,
    },

    #[error("user requested early termination")]
    Interrupted,

    #[error("{timeout:?} timeout reached before all targets were up")]
    DeadlineExceeded { timeout: Duration },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

impl Error {
    /// Whether the run was stopped before any probe touched the network
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoTargets
                | Self::InvalidConfig(_)
                | Self::Parse { .. }
                | Self::Unregistered { .. }
                | Self::Bootstrap { .. }
        )
    }
}

/// Walk an error's source chain and render its innermost cause
pub(crate) fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] Middle);

    #[derive(Debug, Error)]
    #[error("middle")]
    struct Middle(#[source] io::Error);

    #[test]
    fn test_root_cause_unwraps_nested_sources() {
        let err = Outer(Middle(io::Error::new(io::ErrorKind::ConnectionRefused, "root error")));
        assert_eq!(root_cause(&err), "root error");
    }

    #[test]
    fn test_root_cause_without_source() {
        let err = io::Error::other("root error");
        assert_eq!(root_cause(&err), "root error");
    }

    #[test]
    fn test_status_message() {
        let err = ProbeError::Status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "received non-2xx status code: 404 Not Found");
    }

    #[test]
    fn test_configuration_classification() {
        assert!(Error::NoTargets.is_configuration());
        assert!(
            Error::Parse { raw: "ftp://x:21".into(), source: TargetError::Empty }.is_configuration()
        );
        assert!(!Error::Interrupted.is_configuration());
        assert!(
            !Error::DeadlineExceeded { timeout: Duration::from_secs(1) }.is_configuration()
        );
    }

    #[test]
    fn test_deadline_message() {
        let err = Error::DeadlineExceeded { timeout: Duration::from_secs(10) };
        assert_eq!(err.to_string(), "10s timeout reached before all targets were up");
    }
}
