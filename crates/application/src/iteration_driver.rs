//! Iteration driver.
//!
//! Walks the workload schedule one iteration at a time: plan the counts,
//! skip them if they cannot be built, load them, and always tear them down
//! before moving on. A stop signal is honored between iterations.

use aceload_core::{AppError, AppResult};
use aceload_domain::{RecordCount, record_count_for_iteration};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::teardown_service::{TeardownReport, TeardownService};
use crate::timing::LogScope;
use crate::workload_service::{LoadReport, WorkloadService};

/// Bounds for a scheduled run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// First iteration counter to plan.
    pub start_iteration: u64,
    /// Number of iterations to run before returning, unbounded when `None`.
    pub max_iterations: Option<u64>,
}

/// Result of a single load and teardown cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Counts failed validation; nothing was written.
    Skipped {
        /// Violated rule.
        reason: String,
    },
    /// Data was loaded and fully removed again.
    Completed {
        /// Rows written by the load phase.
        load: LoadReport,
        /// Entities removed by teardown.
        teardown: TeardownReport,
    },
}

/// Totals of a scheduled run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    /// Iterations loaded and torn down.
    pub completed: u64,
    /// Iterations skipped by validation.
    pub skipped: u64,
    /// Counter the next run should start from.
    pub next_iteration: u64,
    /// Whether the run ended because a stop was requested.
    pub stopped: bool,
}

impl DriverSummary {
    fn iterations(&self) -> u64 {
        self.completed.saturating_add(self.skipped)
    }
}

/// Application service looping over the workload schedule.
#[derive(Clone)]
pub struct IterationDriver {
    workload: WorkloadService,
    teardown: TeardownService,
}

impl IterationDriver {
    /// Creates an iteration driver.
    #[must_use]
    pub fn new(workload: WorkloadService, teardown: TeardownService) -> Self {
        Self { workload, teardown }
    }

    /// Removes data left behind by an earlier failed run.
    pub async fn clean_start(&self, scope: LogScope) -> AppResult<TeardownReport> {
        let report = scope
            .timed("Removing leftover data", |scope| {
                self.teardown.remove_all(scope)
            })
            .await?;
        self.teardown.ensure_empty().await?;

        Ok(report)
    }

    /// Runs one load and teardown cycle for explicit counts.
    ///
    /// Teardown runs whether or not the load succeeded. A teardown failure is
    /// returned as [`AppError::TeardownFailed`] carrying the load error too,
    /// if there was one.
    pub async fn run_with_counts(
        &self,
        scope: LogScope,
        counts: RecordCount,
    ) -> AppResult<IterationOutcome> {
        if let Err(error) = counts.validate() {
            info!(
                depth = scope.depth(),
                reason = %error,
                "{}Skipping non-sensical data mixture: {counts}",
                scope.indent()
            );
            return Ok(IterationOutcome::Skipped {
                reason: error.to_string(),
            });
        }

        let load = scope
            .timed_detail("Loading data", |scope| self.workload.execute(scope, &counts))
            .await;
        let teardown = self.remove_data(scope).await;

        match (load, teardown) {
            (Ok(load), Ok(teardown)) => Ok(IterationOutcome::Completed { load, teardown }),
            (Err(load), Ok(_)) => Err(load),
            (load, Err(teardown)) => Err(AppError::TeardownFailed {
                load: load.err().map(Box::new),
                teardown: Box::new(teardown),
            }),
        }
    }

    /// Runs the schedule until stopped, bounded, or an iteration fails.
    pub async fn run(
        &self,
        scope: LogScope,
        options: DriverOptions,
        stop: &watch::Receiver<bool>,
    ) -> AppResult<DriverSummary> {
        let mut summary = DriverSummary {
            next_iteration: options.start_iteration,
            ..DriverSummary::default()
        };

        loop {
            if *stop.borrow() {
                warn!(
                    next_iteration = summary.next_iteration,
                    "stop requested, ending run between iterations"
                );
                summary.stopped = true;
                break;
            }

            if options
                .max_iterations
                .is_some_and(|max_iterations| summary.iterations() >= max_iterations)
            {
                break;
            }

            let iteration = summary.next_iteration;
            let counts = record_count_for_iteration(iteration);
            let outcome = scope
                .timed(&format!("Iteration {iteration} ({counts})"), |scope| {
                    self.run_with_counts(scope, counts)
                })
                .await?;

            match outcome {
                IterationOutcome::Skipped { .. } => summary.skipped += 1,
                IterationOutcome::Completed { .. } => summary.completed += 1,
            }

            let Some(next_iteration) = iteration.checked_add(1) else {
                break;
            };
            summary.next_iteration = next_iteration;
        }

        Ok(summary)
    }

    async fn remove_data(&self, scope: LogScope) -> AppResult<TeardownReport> {
        let report = scope
            .timed_detail("Removing data", |scope| self.teardown.remove_all(scope))
            .await?;
        self.teardown.ensure_empty().await?;

        Ok(report)
    }
}
