//! Probe registry.
//!
//! Maps scheme names to probe constructors. The name table is what the
//! target parser validates against, so a parsed [`Target`] always has a
//! registered probe. Adding a protocol means adding a [`Scheme`] variant, a
//! name entry and a constructor entry here.

use crate::error::{BootstrapError, Error};
use crate::probe::{
    HttpProbe, HttpsProbe, MySqlProbe, PostgresProbe, Probe, TcpProbe, UdpProbe,
};
use crate::target::{IpFamily, Scheme, Target};

/// Creates a fresh, un-bootstrapped probe
pub type Constructor = fn() -> Box<dyn Probe>;

/// A scheme name accepted in target descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeName {
    pub name: &'static str,
    pub scheme: Scheme,
    pub family: Option<IpFamily>,
}

const fn name(name: &'static str, scheme: Scheme, family: Option<IpFamily>) -> SchemeName {
    SchemeName { name, scheme, family }
}

/// Every accepted scheme name, aliases included
pub const SCHEME_NAMES: &[SchemeName] = &[
    name("tcp", Scheme::Tcp, None),
    name("tcp4", Scheme::Tcp, Some(IpFamily::V4)),
    name("tcp6", Scheme::Tcp, Some(IpFamily::V6)),
    name("udp", Scheme::Udp, None),
    name("udp4", Scheme::Udp, Some(IpFamily::V4)),
    name("udp6", Scheme::Udp, Some(IpFamily::V6)),
    name("http", Scheme::Http, None),
    name("https", Scheme::Https, None),
    name("mysql", Scheme::Mysql, None),
    name("mariadb", Scheme::Mysql, None),
    name("postgres", Scheme::Postgres, None),
    name("postgresql", Scheme::Postgres, None),
];

const CONSTRUCTORS: &[(Scheme, Constructor)] = &[
    (Scheme::Tcp, new_probe::<TcpProbe>),
    (Scheme::Udp, new_probe::<UdpProbe>),
    (Scheme::Http, new_probe::<HttpProbe>),
    (Scheme::Https, new_probe::<HttpsProbe>),
    (Scheme::Mysql, new_probe::<MySqlProbe>),
    (Scheme::Postgres, new_probe::<PostgresProbe>),
];

fn new_probe<P: Probe + Default + 'static>() -> Box<dyn Probe> {
    Box::new(P::default())
}

/// Resolve a scheme name (case-insensitive) to its registry entry
pub fn resolve(scheme_name: &str) -> Option<SchemeName> {
    SCHEME_NAMES
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(scheme_name))
        .copied()
}

/// Find the constructor registered for a scheme
pub fn constructor(scheme: Scheme) -> Option<Constructor> {
    CONSTRUCTORS
        .iter()
        .find(|(registered, _)| *registered == scheme)
        .map(|(_, ctor)| *ctor)
}

/// Create and bootstrap the probe for a target.
///
/// A registry miss is reported as a fatal error even though parsing makes it
/// unreachable.
pub fn instantiate(target: &Target) -> Result<Box<dyn Probe>, Error> {
    let ctor = constructor(target.scheme()).ok_or_else(|| Error::Unregistered {
        scheme: target.scheme_name().to_string(),
        target: target.to_string(),
    })?;

    let mut probe = ctor();
    probe.bootstrap(target).map_err(|source: BootstrapError| Error::Bootstrap {
        target: target.to_string(),
        source,
    })?;

    Ok(probe)
}
