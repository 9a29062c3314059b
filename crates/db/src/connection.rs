use std::{fmt, str::FromStr, time::Duration};

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Connections are only used one at a time; the second is headroom.
pub const MAX_CONNECTIONS: u32 = 2;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

const APPLICATION_NAME: &str = "zane-operator";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sslmode {0:?}, expected one of disable, allow, prefer, require, verify-ca, verify-full")]
pub struct InvalidSslMode(pub String);

/// libpq `sslmode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    #[default]
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl FromStr for SslMode {
    type Err = InvalidSslMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(Self::Disable),
            "allow" => Ok(Self::Allow),
            "prefer" => Ok(Self::Prefer),
            "require" => Ok(Self::Require),
            "verify-ca" => Ok(Self::VerifyCa),
            "verify-full" => Ok(Self::VerifyFull),
            _ => Err(InvalidSslMode(s.to_string())),
        }
    }
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Allow => PgSslMode::Allow,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

/// Parameters for the administrative connection.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminConnectOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: SslMode,
}

impl fmt::Debug for AdminConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl AdminConnectOptions {
    fn to_pg_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(self.ssl_mode.into())
            .application_name(APPLICATION_NAME)
    }
}

/// Administrative connection pool, opened once per run and closed on every exit path.
#[derive(Clone)]
pub struct DBService {
    pub pool: PgPool,
}

impl DBService {
    pub async fn connect(options: &AdminConnectOptions) -> Result<Self, sqlx::Error> {
        debug!(
            host = %options.host,
            port = options.port,
            database = %options.database,
            user = %options.username,
            ssl_mode = ?options.ssl_mode,
            "Connecting to admin database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(0)
            .acquire_timeout(CONNECT_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options.to_pg_options())
            .await
            .map_err(|e| {
                warn!(error = %e, host = %options.host, "Failed to connect to admin database");
                e
            })?;

        info!(host = %options.host, database = %options.database, "Admin connection pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the pool, giving up after [`CLOSE_TIMEOUT`].
    pub async fn close(self) {
        if tokio::time::timeout(CLOSE_TIMEOUT, self.pool.close())
            .await
            .is_err()
        {
            warn!(
                timeout_secs = CLOSE_TIMEOUT.as_secs(),
                "Timed out closing admin connection pool"
            );
        } else {
            debug!("Admin connection pool closed");
        }
    }
}
