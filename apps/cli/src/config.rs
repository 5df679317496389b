use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use serde::Deserialize;
use thiserror::Error;
use waitfor::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT, RunConfig};

use crate::args::Args;

/// Loaded when `--config` is not given; ignored if absent
pub const DEFAULT_CONFIG_FILE: &str = "targets.toml";

#[derive(Debug, Error)]
pub enum Error {
    #[error("error reading config file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error parsing config file {}: {source}", path.display())]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid duration {value:?} for `{key}`: {source}")]
    InvalidDuration {
        key: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
}

/// Settings read from a config file.
///
/// ```toml
/// host = ["localhost:5432", "http://api.local/health"]
/// timeout = "30s"
/// every = "500ms"
/// verbose = true
/// ```
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub host: Vec<String>,
    pub timeout: Option<String>,
    pub every: Option<String>,
    pub verbose: Option<bool>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &Path) -> PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().is_none() {
        path.set_extension("toml");
    }
    path
}

impl FileConfig {
    /// Load settings from `explicit_path`, or from [`DEFAULT_CONFIG_FILE`].
    ///
    /// A missing default file yields empty settings; a missing explicit file
    /// is an error.
    pub fn from_config(explicit_path: Option<impl AsRef<Path>>) -> Result<Self, Error> {
        let (config_path, required) = match explicit_path {
            Some(path) => (normalize_toml_path(path.as_ref()), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !config_path.exists() {
            return Ok(Self::default());
        }

        let raw_string = fs::read_to_string(&config_path)
            .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
        toml::from_str(&raw_string).map_err(|source| Error::ParseFailed { path: config_path, source })
    }
}

fn parse_duration(key: &'static str, value: Option<&str>) -> Result<Option<Duration>, Error> {
    value
        .map(|value| {
            humantime::parse_duration(value.trim()).map_err(|source| Error::InvalidDuration {
                key,
                value: value.to_string(),
                source,
            })
        })
        .transpose()
}

/// Combine flags and file settings into a run configuration.
///
/// Flags win over the file; hosts from both are kept, flags first.
pub fn merge(args: &Args, file: FileConfig) -> Result<RunConfig, Error> {
    let targets: Vec<String> = args
        .hosts
        .iter()
        .chain(file.host.iter())
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect();

    let timeout = match args.timeout {
        Some(timeout) => timeout,
        None => parse_duration("timeout", file.timeout.as_deref())?.unwrap_or(DEFAULT_TIMEOUT),
    };
    let interval = match args.every {
        Some(every) => every,
        None => parse_duration("every", file.every.as_deref())?.unwrap_or(DEFAULT_INTERVAL),
    };

    Ok(RunConfig::new(targets)
        .with_timeout(timeout)
        .with_interval(interval)
        .with_verbose(args.verbose || file.verbose.unwrap_or(false)))
}
