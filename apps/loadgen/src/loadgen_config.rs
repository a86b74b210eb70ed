use std::path::PathBuf;
use std::time::Duration;

use aceload_application::{QueryProbeOptions, RetryPolicy};
use aceload_core::{AppError, AppResult};
use aceload_domain::RecordCount;
use aceload_infrastructure::{AceUpsertStrategy, PostgresConnectionSettings, TlsFiles};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "aceload")]
#[command(about = "Grows and tears down an access-control dataset to load a database")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Log every record-level step
    #[arg(long, env = "ACELOAD_VERBOSE")]
    pub verbose: bool,

    /// Size of the connection pool
    #[arg(long, default_value_t = 5, env = "ACELOAD_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Executions allowed per transaction before a conflict becomes fatal
    #[arg(long, default_value_t = 100, env = "ACELOAD_MAX_TRANSACTION_ATTEMPTS")]
    pub max_transaction_attempts: u32,

    /// How actions are merged into access control entries
    #[arg(long, default_value = "read-modify-write", env = "ACELOAD_ACE_UPSERT")]
    pub ace_upsert: AceUpsertStrategy,

    /// Run against an in-process store instead of a database
    #[arg(long, env = "ACELOAD_IN_MEMORY")]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and tear down data, iteration by iteration
    Load(LoadArgs),
    /// Probe the join of a random user's grants with their resources
    Query(QueryArgs),
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Database address (host:port)
    #[arg(long, default_value = "localhost:26257", env = "ACELOAD_ADDR")]
    pub addr: String,

    /// Database name
    #[arg(long, default_value = "testdb", env = "ACELOAD_DATABASE")]
    pub database: String,

    /// Login role
    #[arg(long, default_value = "root", env = "ACELOAD_USER")]
    pub user: String,

    /// Client key; enables verify-full TLS when set
    #[arg(long, env = "ACELOAD_TLS_KEY_FILE")]
    pub tls_key_file: Option<PathBuf>,

    /// Client certificate
    #[arg(long, env = "ACELOAD_TLS_CERT_FILE")]
    pub tls_cert_file: Option<PathBuf>,

    /// CA certificate
    #[arg(long, env = "ACELOAD_TLS_CA_CERT_FILE")]
    pub tls_ca_cert_file: Option<PathBuf>,
}

#[derive(Debug, Default, Args)]
pub struct LoadArgs {
    /// Run one iteration with the counts below instead of the schedule
    #[arg(long)]
    pub custom: bool,

    /// Users to create in custom mode
    #[arg(long, default_value_t = 0)]
    pub users: usize,

    /// Groups to create in custom mode
    #[arg(long, default_value_t = 0)]
    pub groups: usize,

    /// Members per group in custom mode
    #[arg(long, default_value_t = 0)]
    pub members: usize,

    /// Resources granted to every user in custom mode
    #[arg(long, default_value_t = 0)]
    pub user_permissions: usize,

    /// Resources granted to every group in custom mode
    #[arg(long, default_value_t = 0)]
    pub group_permissions: usize,

    /// First scheduled iteration
    #[arg(long, default_value_t = 0, env = "ACELOAD_START_ITERATION")]
    pub start_iteration: u64,

    /// Stop after this many scheduled iterations
    #[arg(long, env = "ACELOAD_MAX_ITERATIONS")]
    pub max_iterations: Option<u64>,

    /// Remove data left behind by an earlier run before loading
    #[arg(long)]
    pub clean_start: bool,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Stop after this many probes
    #[arg(long, env = "ACELOAD_MAX_QUERIES")]
    pub max_queries: Option<u64>,

    /// Wait between polls while no users exist
    #[arg(long, default_value_t = 500, env = "ACELOAD_IDLE_WAIT_MS")]
    pub idle_wait_ms: u64,
}

impl Cli {
    /// Checks values clap cannot check on its own.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_connections == 0 {
            return Err(AppError::Validation(
                "max connections must be greater than zero".to_owned(),
            ));
        }

        self.retry_policy()?;
        if !self.in_memory {
            self.connection.settings()?;
        }

        Ok(())
    }

    /// Returns the transaction retry policy.
    pub fn retry_policy(&self) -> AppResult<RetryPolicy> {
        RetryPolicy::new(self.max_transaction_attempts)
    }
}

impl ConnectionArgs {
    /// Builds connection settings. A key file selects TLS and then requires
    /// the certificate and CA files too.
    pub fn settings(&self) -> AppResult<PostgresConnectionSettings> {
        let tls = match (
            &self.tls_key_file,
            &self.tls_cert_file,
            &self.tls_ca_cert_file,
        ) {
            (None, None, None) => None,
            (Some(key), Some(cert), Some(ca_cert)) => Some(TlsFiles {
                key: key.clone(),
                cert: cert.clone(),
                ca_cert: ca_cert.clone(),
            }),
            (None, _, _) => {
                return Err(AppError::Validation(
                    "TLS certificate files require --tls-key-file".to_owned(),
                ));
            }
            (Some(_), _, _) => {
                return Err(AppError::Validation(
                    "--tls-key-file requires --tls-cert-file and --tls-ca-cert-file".to_owned(),
                ));
            }
        };

        Ok(PostgresConnectionSettings {
            addr: self.addr.clone(),
            database: self.database.clone(),
            user: self.user.clone(),
            tls,
        })
    }
}

impl LoadArgs {
    /// Returns the explicit counts when custom mode is on.
    pub fn custom_counts(&self) -> Option<RecordCount> {
        self.custom.then(|| {
            RecordCount::new(
                self.users,
                self.groups,
                self.members,
                self.user_permissions,
                self.group_permissions,
            )
        })
    }
}

impl QueryArgs {
    /// Returns the probe bounds.
    pub fn probe_options(&self) -> QueryProbeOptions {
        QueryProbeOptions {
            max_queries: self.max_queries,
            idle_wait: Duration::from_millis(self.idle_wait_ms),
        }
    }
}
