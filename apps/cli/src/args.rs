use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const LONG_ABOUT: &str = "\
wait-for blocks until every target accepts connections and answers its \
protocol's readiness check, retrying at a fixed interval until a shared \
timeout expires.

Targets without a scheme are checked over TCP. Supported schemes: tcp, tcp4, \
tcp6, udp, udp4, udp6, http, https, mysql, mariadb, postgres, postgresql.";

/// Wait for network services to be ready
#[derive(Parser, Debug)]
#[command(name = "wait-for", author, version, about, long_about = LONG_ABOUT)]
pub struct Args {
    /// Target to wait for, as `host:port` or `scheme://...` (repeatable, comma-separated)
    #[arg(short = 's', long = "host", value_name = "TARGET", value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Maximum time to wait for every target [default: 10s]
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Time between two attempts against the same target [default: 1s]
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub every: Option<Duration>,

    /// Print every attempt
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML file to load targets and settings from [default: targets.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
