use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{PING_TIMEOUT, Probe, bounded, ensure_scheme};
use crate::error::{BootstrapError, ProbeError, root_cause};
use crate::target::{Scheme, Target};

/// Client and URL shared by the plain and TLS variants
#[derive(Debug)]
struct HttpCheck {
    url: Url,
    client: Client,
}

impl HttpCheck {
    fn new(target: &Target, https_only: bool) -> Result<Self, BootstrapError> {
        let client = Client::builder()
            .timeout(PING_TIMEOUT)
            .https_only(https_only)
            .build()
            .map_err(BootstrapError::HttpClient)?;

        Ok(Self { url: target.url().clone(), client })
    }

    async fn get(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        bounded(cancel, PING_TIMEOUT, async {
            let response = self
                .client
                .get(self.url.clone())
                .send()
                .await
                .map_err(|e| ProbeError::Transport(root_cause(&e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProbeError::Status(status));
            }

            Ok(())
        })
        .await
    }
}

/// HTTP checker: ready once a GET returns a 2xx status
#[derive(Debug, Default)]
pub struct HttpProbe {
    check: Option<HttpCheck>,
}

#[async_trait]
impl Probe for HttpProbe {
    fn scheme(&self) -> Scheme {
        Scheme::Http
    }

    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError> {
        ensure_scheme("http", target, Scheme::Http)?;
        self.check = Some(HttpCheck::new(target, false)?);
        Ok(())
    }

    fn is_bootstrapped(&self) -> bool {
        self.check.is_some()
    }

    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        self.check.as_ref().ok_or(ProbeError::NotBootstrapped)?.get(cancel).await
    }
}

/// HTTPS checker. Certificates are always verified against the bundled
/// webpki roots.
#[derive(Debug, Default)]
pub struct HttpsProbe {
    check: Option<HttpCheck>,
}

#[async_trait]
impl Probe for HttpsProbe {
    fn scheme(&self) -> Scheme {
        Scheme::Https
    }

    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError> {
        ensure_scheme("https", target, Scheme::Https)?;
        self.check = Some(HttpCheck::new(target, true)?);
        Ok(())
    }

    fn is_bootstrapped(&self) -> bool {
        self.check.is_some()
    }

    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        self.check.as_ref().ok_or(ProbeError::NotBootstrapped)?.get(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rcgen::CertifiedKey;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;
    use tokio_rustls::rustls::ServerConfig;
    use tokio_rustls::rustls::crypto::ring;
    use tokio_rustls::rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};

    use super::*;

    /// TLS server with a self-signed certificate; counts completed handshakes
    async fn serve_self_signed() -> (SocketAddr, Arc<AtomicUsize>) {
        let CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
        let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert.der().clone()], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handshakes = Arc::new(AtomicUsize::new(0));

        let counter = handshakes.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                let counter = counter.clone();
                tokio::spawn(async move {
                    let Ok(mut tls) = acceptor.accept(stream).await else {
                        return;
                    };
                    counter.fetch_add(1, Ordering::SeqCst);
                    let mut buf = [0u8; 1024];
                    let _ = tls.read(&mut buf).await;
                    let _ = tls
                        .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                        .await;
                    let _ = tls.shutdown().await;
                });
            }
        });

        (addr, handshakes)
    }

    /// Answer every connection with a fixed status line
    async fn serve(status: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        addr
    }

    fn http(raw: &str) -> HttpProbe {
        let mut probe = HttpProbe::default();
        probe.bootstrap(&Target::parse(raw).unwrap()).unwrap();
        probe
    }

    #[test]
    fn test_bootstrap_checks_scheme() {
        let mut probe = HttpProbe::default();
        let target = Target::parse("https://example.com").unwrap();
        assert!(matches!(
            probe.bootstrap(&target),
            Err(BootstrapError::SchemeMismatch { probe: "http", .. })
        ));
        assert!(!probe.is_bootstrapped());

        let mut probe = HttpsProbe::default();
        assert!(probe.bootstrap(&target).is_ok());
        assert!(probe.is_bootstrapped());
    }

    #[tokio::test]
    async fn test_ping_success() {
        let addr = serve("200 OK").await;
        let probe = http(&format!("http://{addr}/health"));
        assert!(probe.ping(&CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_non_2xx_status() {
        let addr = serve("404 Not Found").await;
        let probe = http(&format!("http://{addr}/"));
        let err = probe.ping(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ProbeError::Status(status) if status.as_u16() == 404));
        assert_eq!(err.to_string(), "received non-2xx status code: 404 Not Found");
    }

    #[tokio::test]
    async fn test_ping_transport_error_is_unwrapped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = http(&format!("http://{addr}/"));
        let err = probe.ping(&CancellationToken::new()).await.unwrap_err();
        let ProbeError::Transport(message) = err else {
            panic!("expected transport error, got {err:?}");
        };
        assert!(!message.contains("error sending request"), "{message}");
    }

    #[tokio::test]
    async fn test_https_rejects_untrusted_certificate() {
        let (addr, handshakes) = serve_self_signed().await;

        let mut checker = HttpsProbe::default();
        let target = Target::parse(&format!("https://localhost:{}/", addr.port())).unwrap();
        checker.bootstrap(&target).unwrap();

        let err = checker.ping(&CancellationToken::new()).await.unwrap_err();
        let ProbeError::Transport(message) = err else {
            panic!("expected transport error, got {err:?}");
        };
        let message = message.to_lowercase();
        assert!(message.contains("certificate") || message.contains("issuer"), "{message}");
        assert_eq!(handshakes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ping_cancelled() {
        let addr = serve("200 OK").await;
        let probe = http(&format!("http://{addr}/"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(probe.ping(&cancel).await, Err(ProbeError::Cancelled)));
    }
}
