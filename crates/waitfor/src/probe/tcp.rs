use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use super::{PING_TIMEOUT, Probe, bounded, ensure_no_path, ensure_scheme, resolve};
use crate::error::{BootstrapError, ProbeError};
use crate::target::{IpFamily, Scheme, Target};

/// TCP port checker: ready once a connection is accepted
#[derive(Debug, Default)]
pub struct TcpProbe {
    address: Option<String>,
    family: Option<IpFamily>,
}

#[async_trait]
impl Probe for TcpProbe {
    fn scheme(&self) -> Scheme {
        Scheme::Tcp
    }

    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError> {
        ensure_scheme("tcp", target, Scheme::Tcp)?;
        ensure_no_path("tcp", target)?;

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
            let stream = TcpStream::connect(addrs.as_slice()).await?;
            drop(stream);
            Ok(())
        })
        .await
    }
}
