//! aceload: access-control load generator.

#![forbid(unsafe_code)]

mod loadgen_config;

use std::sync::Arc;

use aceload_application::{
    AceRepository, DriverOptions, EntityRepository, IterationDriver, IterationOutcome, LogScope,
    QueryProbeRepository, QueryProbeService, TeardownRepository, TeardownService,
    WorkloadService,
};
use aceload_core::{AppError, AppResult};
use aceload_infrastructure::{
    InMemoryAccessControlStore, PostgresAccessControlStore, connect, run_migrations,
};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::loadgen_config::{Cli, Command, LoadArgs, QueryArgs};

/// Exit status after a second interrupt.
const INTERRUPTED_EXIT_CODE: i32 = 130;

struct Services {
    driver: IterationDriver,
    probe: QueryProbeService,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.validate()?;

    let services = build_services(&cli).await?;
    let stop = spawn_stop_listener();

    match cli.command {
        Some(Command::Query(query)) => run_query(&services, &query, stop).await,
        Some(Command::Load(load)) => run_load(&services, &load, &stop).await,
        None => run_load(&services, &LoadArgs::default(), &stop).await,
    }
}

/// `--verbose` raises only this workspace's crates to debug, keeping sqlx and
/// the other dependencies at info.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,aceload=debug,aceload_core=debug,aceload_domain=debug,\
         aceload_application=debug,aceload_infrastructure=debug"
    } else {
        "info"
    }
}

fn init_tracing(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

async fn build_services(cli: &Cli) -> AppResult<Services> {
    let retry = cli.retry_policy()?;
    if cli.in_memory {
        info!("using the in-memory store");
        return Ok(wire_services(Arc::new(InMemoryAccessControlStore::new(
            retry,
        ))));
    }

    let settings = cli.connection.settings()?;
    let pool = connect(&settings, cli.max_connections).await?;
    run_migrations(&pool).await?;
    info!(ace_upsert = %cli.ace_upsert, "database schema ready");

    Ok(wire_services(Arc::new(PostgresAccessControlStore::new(
        pool,
        retry,
        cli.ace_upsert,
    ))))
}

fn wire_services<S>(store: Arc<S>) -> Services
where
    S: EntityRepository + AceRepository + TeardownRepository + QueryProbeRepository + 'static,
{
    Services {
        driver: IterationDriver::new(
            WorkloadService::new(store.clone(), store.clone()),
            TeardownService::new(store.clone()),
        ),
        probe: QueryProbeService::new(store),
    }
}

/// The first interrupt asks the workload to stop at its next checkpoint, a
/// second one exits immediately.
fn spawn_stop_listener() -> watch::Receiver<bool> {
    let (stop_tx, stop_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for interrupts");
            return;
        }
        warn!("interrupt received, stopping after the current step (interrupt again to exit now)");
        stop_tx.send_replace(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt received, exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    stop_rx
}

async fn run_load(
    services: &Services,
    args: &LoadArgs,
    stop: &watch::Receiver<bool>,
) -> AppResult<()> {
    let scope = LogScope::root();

    if args.clean_start {
        let removed = services.driver.clean_start(scope).await?;
        info!(
            users = removed.users,
            groups = removed.groups,
            resources = removed.resources,
            "removed leftover data"
        );
    }

    if let Some(counts) = args.custom_counts() {
        let outcome = scope
            .timed(&format!("Custom iteration ({counts})"), |scope| {
                services.driver.run_with_counts(scope, counts)
            })
            .await?;
        match outcome {
            IterationOutcome::Skipped { reason } => {
                info!(%counts, reason = %reason, "custom counts skipped");
            }
            IterationOutcome::Completed { load, teardown } => {
                info!(
                    %counts,
                    grants = load.grants,
                    resources = teardown.resources,
                    "custom iteration finished"
                );
            }
        }
        return Ok(());
    }

    let summary = services
        .driver
        .run(
            scope,
            DriverOptions {
                start_iteration: args.start_iteration,
                max_iterations: args.max_iterations,
            },
            stop,
        )
        .await?;

    info!(
        completed = summary.completed,
        skipped = summary.skipped,
        next_iteration = summary.next_iteration,
        stopped = summary.stopped,
        "load run finished"
    );
    Ok(())
}

async fn run_query(
    services: &Services,
    args: &QueryArgs,
    stop: watch::Receiver<bool>,
) -> AppResult<()> {
    let summary = services.probe.run(args.probe_options(), stop).await?;

    info!(
        queries = summary.queries,
        rows = summary.rows,
        "query probe finished"
    );
    Ok(())
}
