use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tokio_util::sync::CancellationToken;

use super::{PING_TIMEOUT, Probe, bounded, ensure_scheme};
use crate::error::{BootstrapError, ProbeError, root_cause};
use crate::target::{Scheme, Target};

const ENGINE: &str = "PostgreSQL";
const DEFAULT_USER: &str = "postgres";

/// PostgreSQL checker. The URL must name a database; query parameters such
/// as `sslmode` are handed to the driver untouched.
#[derive(Debug, Default)]
pub struct PostgresProbe {
    options: Option<PgConnectOptions>,
}

#[async_trait]
impl Probe for PostgresProbe {
    fn scheme(&self) -> Scheme {
        Scheme::Postgres
    }

    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError> {
        ensure_scheme("postgres", target, Scheme::Postgres)?;

        if target.path().trim_start_matches('/').is_empty() {
            return Err(BootstrapError::MissingDatabase);
        }

        let mut options = PgConnectOptions::from_str(target.url().as_str())
            .map_err(|source| BootstrapError::ConnectOptions { engine: ENGINE, source })?
            .disable_statement_logging();
        if target.username().is_none() {
            options = options.username(DEFAULT_USER);
        }

        self.options = Some(options);
        Ok(())
    }

    fn is_bootstrapped(&self) -> bool {
        self.options.is_some()
    }

    async fn ping(&self, cancel: &CancellationToken) -> Result<(), ProbeError> {
        let options = self.options.as_ref().ok_or(ProbeError::NotBootstrapped)?;

        bounded(cancel, PING_TIMEOUT, async {
            let mut conn = options.connect().await.map_err(|e| ProbeError::Connect {
                engine: ENGINE,
                message: root_cause(&e),
            })?;

            let pinged = conn
                .ping()
                .await
                .map_err(|e| ProbeError::Ping { engine: ENGINE, message: root_cause(&e) });
            let _ = conn.close().await;
            pinged
        })
        .await
    }
}
