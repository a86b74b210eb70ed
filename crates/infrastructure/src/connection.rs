//! Store connection setup.

use std::path::PathBuf;

use aceload_core::{AppError, AppResult};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use tracing::info;

/// Port used when the address does not name one.
pub const DEFAULT_PORT: u16 = 26257;

/// Client certificate material for a mutually authenticated connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    /// Client private key.
    pub key: PathBuf,
    /// Client certificate.
    pub cert: PathBuf,
    /// Certificate authority used to verify the server.
    pub ca_cert: PathBuf,
}

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConnectionSettings {
    /// `host:port` of the server.
    pub addr: String,
    /// Database holding the generated tables.
    pub database: String,
    /// Login role.
    pub user: String,
    /// TLS material; plaintext when absent.
    pub tls: Option<TlsFiles>,
}

impl PostgresConnectionSettings {
    /// Builds driver options. TLS material selects `verify-full`, otherwise
    /// the connection is unencrypted.
    pub fn connect_options(&self) -> AppResult<PgConnectOptions> {
        let (host, port) = split_addr(self.addr.as_str())?;
        let options = PgConnectOptions::new()
            .host(host)
            .port(port)
            .username(self.user.as_str())
            .database(self.database.as_str());

        Ok(match &self.tls {
            Some(tls) => options
                .ssl_mode(PgSslMode::VerifyFull)
                .ssl_root_cert(&tls.ca_cert)
                .ssl_client_cert(&tls.cert)
                .ssl_client_key(&tls.key),
            None => options.ssl_mode(PgSslMode::Disable),
        })
    }
}

fn split_addr(addr: &str) -> AppResult<(&str, u16)> {
    let (host, port) = match addr.rsplit_once(':') {
        Some((host, port)) if !host.ends_with(':') => {
            let port = port.parse::<u16>().map_err(|error| {
                AppError::Validation(format!("invalid port in address '{addr}': {error}"))
            })?;
            (host, port)
        }
        _ => (addr, DEFAULT_PORT),
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return Err(AppError::Validation(format!(
            "address '{addr}' does not name a host"
        )));
    }

    Ok((host, port))
}

/// Opens the process-wide connection pool.
pub async fn connect(
    settings: &PostgresConnectionSettings,
    max_connections: u32,
) -> AppResult<PgPool> {
    let options = settings.connect_options()?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    info!(
        addr = %settings.addr,
        database = %settings.database,
        tls = settings.tls.is_some(),
        "connected to database"
    );
    Ok(pool)
}

/// Applies the schema migrations.
///
/// Migration locking relies on advisory locks, which CockroachDB lacks, so
/// it is disabled.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_locking(false);
    migrator
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))
}
