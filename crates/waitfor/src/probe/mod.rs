//! Protocol-specific readiness probes.
//!
//! Every probe is bootstrapped once from its [`Target`] and then pinged
//! repeatedly by the retry loop. Bootstrap validates the target shape and
//! caches whatever can be reused between attempts; it never touches the
//! network. A ping is a single check bounded by [`PING_TIMEOUT`].

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{BootstrapError, ProbeError};
use crate::target::{IpFamily, Scheme, Target};

mod http;
mod mysql;
mod postgres;
mod tcp;
mod udp;

pub use http::{HttpProbe, HttpsProbe};
pub use mysql::MySqlProbe;
pub use postgres::PostgresProbe;
pub use tcp::TcpProbe;
pub use udp::UdpProbe;

/// Upper bound for a single readiness check
pub const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// Readiness check bound to one target
#[async_trait]
pub trait Probe: Send + Sync {
    /// Scheme this probe handles
    fn scheme(&self) -> Scheme;

    /// Validate the target and cache reusable connection parameters
    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError>;

    /// Whether [`Probe::bootstrap`] has succeeded
    fn is_bootstrapped(&self) -> bool;

    /// Perform exactly one readiness check
    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ProbeError>;
}

/// Run one probe operation under the per-attempt timeout, giving up early
/// when the run is cancelled.
pub(crate) async fn bounded<F, T>(
    cancel: &CancellationToken,
    limit: Duration,
    operation: F,
) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProbeError::Cancelled),
        result = tokio::time::timeout(limit, operation) => {
            result.unwrap_or_else(|_| Err(ProbeError::TimedOut(limit)))
        }
    }
}

/// Resolve `host:port`, keeping only addresses of the requested family
pub(crate) async fn resolve(
    address: &str,
    family: Option<IpFamily>,
) -> Result<Vec<SocketAddr>, ProbeError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(address)
        .await
        .map_err(|source| ProbeError::Resolve { address: address.to_string(), source })?
        .filter(|addr| family.is_none_or(|family| family.matches(addr)))
        .collect();

    if addrs.is_empty() {
        return Err(ProbeError::NoAddress {
            address: address.to_string(),
            family: family.map_or("IP", |family| family.as_str()),
        });
    }

    Ok(addrs)
}

/// Bootstrap check shared by probes: the target must use `expected`
fn ensure_scheme(
    probe: &'static str,
    target: &Target,
    expected: Scheme,
) -> Result<(), BootstrapError> {
    if target.scheme() != expected {
        return Err(BootstrapError::SchemeMismatch {
            probe,
            scheme: target.scheme_name().to_string(),
        });
    }

    if target.host().is_empty() {
        return Err(BootstrapError::MissingHost { probe });
    }

    Ok(())
}

/// Address-style probes have nowhere to send a path
fn ensure_no_path(probe: &'static str, target: &Target) -> Result<(), BootstrapError> {
    match target.path() {
        "" | "/" => Ok(()),
        path => Err(BootstrapError::UnexpectedPath { probe, path: path.to_string() }),
    }
}
