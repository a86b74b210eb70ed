//! Ports implemented by access-control stores.
//!
//! Every method runs as its own retryable transaction, mirroring a
//! single-record production API rather than a bulk loader.

mod aces;
mod entities;
mod probe;
mod teardown;

pub use aces::AceRepository;
pub use entities::EntityRepository;
pub use probe::{QueryProbeRepository, ResourceGrant};
pub use teardown::{TableCounts, TeardownRepository};
