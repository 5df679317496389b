use std::str::FromStr;

use async_trait::async_trait;
use sqlx::mysql::MySqlConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tokio_util::sync::CancellationToken;
use url::Position;

use super::{PING_TIMEOUT, Probe, bounded, ensure_scheme};
use crate::error::{BootstrapError, ProbeError, root_cause};
use crate::target::{Scheme, Target};

const ENGINE: &str = "MySQL";
const DEFAULT_USER: &str = "root";

/// MySQL/MariaDB checker: ready once a connection is established and the
/// server answers a ping. The database name is optional.
#[derive(Debug, Default)]
pub struct MySqlProbe {
    options: Option<MySqlConnectOptions>,
}

#[async_trait]
impl Probe for MySqlProbe {
    fn scheme(&self) -> Scheme {
        Scheme::Mysql
    }

    fn bootstrap(&mut self, target: &Target) -> Result<(), BootstrapError> {
        ensure_scheme("mysql", target, Scheme::Mysql)?;

        // `mariadb://` is accepted as an alias; the driver only knows `mysql://`
        let url = format!("mysql{}", &target.url()[Position::AfterScheme..]);

        let mut options = MySqlConnectOptions::from_str(&url)
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
