//! # Target Model
//!
//! A target is one endpoint to wait for. It is parsed once from a raw
//! descriptor such as `localhost:5432`, `udp://dns.local:53` or
//! `postgres://user:secret@db:5432/app?sslmode=disable` and never mutated.
//!
//! Descriptors without a `scheme://` prefix are treated as `tcp://`.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::TargetError;
use crate::registry;

const SCHEME_SEPARATOR: &str = "://";
const DEFAULT_SCHEME: &str = "tcp";

/// Protocol used to check a target for readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Tcp,
    Udp,
    Http,
    Https,
    Mysql,
    Postgres,
}

impl Scheme {
    /// Canonical scheme name
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Udp => "udp",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Mysql => "mysql",
            Scheme::Postgres => "postgres",
        }
    }

    /// Port used when the descriptor does not name one
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Scheme::Tcp | Scheme::Udp => None,
            Scheme::Http => Some(80),
            Scheme::Https => Some(443),
            Scheme::Mysql => Some(3306),
            Scheme::Postgres => Some(5432),
        }
    }

    /// Address-style schemes must be written as `host:port`
    pub fn is_address_style(&self) -> bool {
        matches!(self, Scheme::Tcp | Scheme::Udp)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IP family restriction requested through a `tcp4`/`tcp6`/`udp4`/`udp6` scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpFamily::V4 => "IPv4",
            IpFamily::V6 => "IPv6",
        }
    }

    pub fn matches(&self, addr: &std::net::SocketAddr) -> bool {
        match self {
            IpFamily::V4 => addr.is_ipv4(),
            IpFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed, validated target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    scheme: Scheme,
    family: Option<IpFamily>,
    scheme_name: String,
    remainder: String,
    url: Url,
}

impl Target {
    /// Parse a raw descriptor into a target.
    ///
    /// Validation only consults the scheme registry; no name resolution or
    /// other I/O happens here.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        if raw.trim().is_empty() {
            return Err(TargetError::Empty);
        }

        let (scheme_name, remainder) = match raw.split_once(SCHEME_SEPARATOR) {
            Some((scheme, rest)) => (scheme, rest),
            None => (DEFAULT_SCHEME, raw),
        };

        if scheme_name.is_empty() {
            return Err(TargetError::MissingScheme { raw: raw.to_string() });
        }

        let resolved = registry::resolve(scheme_name).ok_or_else(|| {
            TargetError::UnsupportedScheme {
                raw: raw.to_string(),
                scheme: scheme_name.to_string(),
            }
        })?;

        let full = format!("{scheme_name}{SCHEME_SEPARATOR}{remainder}");
        let url = Url::parse(&full).map_err(|source| match source {
            url::ParseError::EmptyHost => TargetError::MissingHost { raw: raw.to_string() },
            source => TargetError::Malformed { raw: raw.to_string(), source },
        })?;

        if url.host_str().is_none_or(str::is_empty) {
            return Err(TargetError::MissingHost { raw: raw.to_string() });
        }

        if resolved.scheme.is_address_style() && url.port().is_none() {
            return Err(TargetError::MissingPort { raw: raw.to_string() });
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: resolved.scheme,
            family: resolved.family,
            scheme_name: scheme_name.to_string(),
            remainder: remainder.to_string(),
            url,
        })
    }

    /// The descriptor exactly as the user wrote it
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The scheme as written, which may be an alias such as `tcp4`
    pub fn scheme_name(&self) -> &str {
        &self.scheme_name
    }

    pub fn family(&self) -> Option<IpFamily> {
        self.family
    }

    /// Host component; IPv6 literals keep their brackets
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, or the scheme's well-known port
    pub fn port(&self) -> Option<u16> {
        self.url.port().or_else(|| self.scheme.default_port())
    }

    /// `host:port` when a port is known, otherwise just the host
    pub fn address(&self) -> String {
        match self.port() {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_string(),
        }
    }

    /// Percent-encoded user name, if one was given
    pub fn username(&self) -> Option<&str> {
        Some(self.url.username()).filter(|user| !user.is_empty())
    }

    /// Percent-encoded password, if one was given
    pub fn password(&self) -> Option<&str> {
        self.url.password()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FromStr for Target {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SCHEME_SEPARATOR}{}", self.scheme_name, self.remainder)
    }
}
