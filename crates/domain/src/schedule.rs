//! Ever-growing workload schedule.
//!
//! The low bits of the iteration counter select which record types receive an
//! extra step on top of a baseline, and the remaining high bits form the
//! baseline itself. Walking the counter upwards therefore cycles through every
//! combination of record types before all counts grow by one step together.

use crate::record_count::{RECORD_TYPE_COUNT, RecordCount, RecordType};

/// Number of records added per selected record type and per baseline step.
pub const RECORDS_PER_STEP: usize = 20;

/// Returns the record counts to generate for `iteration`.
///
/// Iteration zero yields the empty tuple.
#[must_use]
pub fn record_count_for_iteration(iteration: u64) -> RecordCount {
    let baseline = iteration >> RECORD_TYPE_COUNT;
    let mut counts = RecordCount::default();
    if baseline == iteration {
        return counts;
    }

    let baseline = usize::try_from(baseline)
        .unwrap_or(usize::MAX)
        .saturating_mul(RECORDS_PER_STEP);
    for record_type in RecordType::all() {
        let count = counts.get_mut(*record_type);
        *count = baseline;
        if iteration & (1 << record_type.bit()) != 0 {
            *count = count.saturating_add(RECORDS_PER_STEP);
        }
    }

    counts
}
