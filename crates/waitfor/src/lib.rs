//! waitfor - concurrent multi-protocol readiness probing
//!
//! This library waits for a set of network targets to become ready before a
//! shared deadline. Every target is probed by its own task with a
//! protocol-specific readiness check, retried at a fixed interval.

pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod registry;
pub mod report;
pub mod retry;
pub mod target;

// Re-export main types
pub use error::{BootstrapError, Error, ProbeError, TargetError};
pub use orchestrator::{Orchestrator, Outcome, Report, RunConfig, TargetReport};
pub use probe::Probe;
pub use report::{Observer, ProbeEvent, StdoutObserver};
pub use retry::{Attempt, Retry, RetryError};
pub use target::{Scheme, Target};

/// Result type of a whole run
pub type Result<T> = std::result::Result<T, Error>;

/// Default time to wait for every target before giving up
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Default time between two attempts against the same target
pub const DEFAULT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);
