//! Application services and ports.

#![forbid(unsafe_code)]

mod iteration_driver;
mod load_ports;
mod query_probe_service;
mod teardown_service;
mod timing;
mod transaction_retry;
mod workload_service;

#[cfg(test)]
mod test_support;

pub use iteration_driver::{DriverOptions, DriverSummary, IterationDriver, IterationOutcome};
pub use load_ports::{
    AceRepository, EntityRepository, QueryProbeRepository, ResourceGrant, TableCounts,
    TeardownRepository,
};
pub use query_probe_service::{ProbeSummary, QueryProbeOptions, QueryProbeService};
pub use teardown_service::{TeardownReport, TeardownService};
pub use timing::LogScope;
pub use transaction_retry::{DEFAULT_MAX_TRANSACTION_ATTEMPTS, RetryPolicy, retry_transaction};
pub use workload_service::{LoadReport, WorkloadService};
