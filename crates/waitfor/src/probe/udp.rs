use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use super::{PING_TIMEOUT, Probe, bounded, ensure_no_path, ensure_scheme, resolve};
use crate::error::{BootstrapError, ProbeError};
use crate::target::{IpFamily, Scheme, Target};

/// UDP checker.
///
/// UDP is connectionless, so a successful zero-length write only proves the
/// local stack could route the datagram, not that anything is listening.
#[derive(Debug, Default)]
pub struct UdpProbe {
    address: Option<String>,
    family: Option<IpFamily>,
}

#[async_trait]
impl Probe for UdpProbe {
    fn scheme(&self) -> Scheme {
        Scheme::Udp
    }

    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError> {
        ensure_scheme("udp", target, Scheme::Udp)?;
        ensure_no_path("udp", target)?;

        self.address = Some(target.address());
        self.family = target.family();
        Ok(())
    }

    fn is_bootstrapped(&self) -> bool {
        self.address.is_some()
    }

    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        let address = self.address.as_deref().ok_or(ProbeError::NotBootstrapped)?;

        bounded(cancel, PING_TIMEOUT, async {
            let addrs = resolve(address, self.family).await?;
            send_any(address, &addrs).await
        })
        .await
    }
}

/// Try each resolved address in turn until one accepts the datagram
async fn send_any(address: &str, addrs: &[SocketAddr]) -> Result<(), ProbeError> {
    let mut last_err = None;
    for remote in addrs {
        match send_empty(*remote).await {
            Ok(()) => return Ok(()),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.map_or_else(
        || ProbeError::NoAddress { address: address.to_string(), family: "IP" },
        ProbeError::Io,
    ))
}

/// Write a zero-length datagram to `remote`
async fn send_empty(remote: SocketAddr) -> std::io::Result<()> {
    let socket = UdpSocket::bind(unspecified_for(&remote)).await?;
    socket.connect(remote).await?;
    socket.send(&[]).await?;
    Ok(())
}

fn unspecified_for(remote: &SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}
