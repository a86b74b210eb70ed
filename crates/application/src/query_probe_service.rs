//! Read-side probe workload.
//!
//! Repeatedly picks a random stored user and drains the join of that user's
//! access control entries with their resources, logging how long each probe
//! took. Useful to measure query latency while the loader grows the dataset.

use std::sync::Arc;
use std::time::{Duration, Instant};

use aceload_core::{AppResult, BusinessKey};
use rand::seq::SliceRandom;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::load_ports::QueryProbeRepository;

/// Bounds for a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryProbeOptions {
    /// Number of probes to run before returning, unbounded when `None`.
    pub max_queries: Option<u64>,
    /// Wait before polling again while no users exist.
    pub idle_wait: Duration,
}

impl Default for QueryProbeOptions {
    fn default() -> Self {
        Self {
            max_queries: None,
            idle_wait: Duration::from_millis(500),
        }
    }
}

/// Totals of a probe run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Probes executed.
    pub queries: u64,
    /// Rows drained across all probes.
    pub rows: u64,
}

/// Application service running the join query probe.
#[derive(Clone)]
pub struct QueryProbeService {
    repository: Arc<dyn QueryProbeRepository>,
}

impl QueryProbeService {
    /// Creates a probe service.
    #[must_use]
    pub fn new(repository: Arc<dyn QueryProbeRepository>) -> Self {
        Self { repository }
    }

    /// Runs one probe against a random user. Returns `None` when no user exists.
    pub async fn probe_once(&self) -> AppResult<Option<(BusinessKey, usize)>> {
        let user_keys = self.repository.list_user_keys().await?;
        let Some(user) = user_keys.choose(&mut rand::thread_rng()).cloned() else {
            return Ok(None);
        };

        let grants = self.repository.resource_grants_for_user(&user).await?;
        Ok(Some((user, grants.len())))
    }

    /// Probes until stopped or bounded.
    pub async fn run(
        &self,
        options: QueryProbeOptions,
        mut stop: watch::Receiver<bool>,
    ) -> AppResult<ProbeSummary> {
        let mut summary = ProbeSummary::default();
        let mut started = Instant::now();

        loop {
            if *stop.borrow() {
                info!(queries = summary.queries, "stop requested, ending probe run");
                break;
            }

            if options
                .max_queries
                .is_some_and(|max_queries| summary.queries >= max_queries)
            {
                break;
            }

            let Some((user, rows)) = self.probe_once().await? else {
                debug!("no users stored yet, waiting before the next probe");
                tokio::select! {
                    () = tokio::time::sleep(options.idle_wait) => {}
                    changed = stop.changed() => {
                        if changed.is_err() {
                            tokio::time::sleep(options.idle_wait).await;
                        }
                    }
                }
                started = Instant::now();
                continue;
            };

            let elapsed = started.elapsed();
            started = Instant::now();
            summary.queries += 1;
            summary.rows = summary.rows.saturating_add(rows as u64);
            info!(
                user = %user,
                rows,
                ?elapsed,
                "Query {} took {elapsed:?}",
                summary.queries
            );
        }

        Ok(summary)
    }
}
