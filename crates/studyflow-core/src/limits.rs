//! Input size guard.
//!
//! Oversized inputs fail fast with `ResourceExhausted` instead of degrading
//! quietly. Checked at the entry of availability computation, allocation and
//! candidate-schedule parsing; no partial result is produced past the guard.

use crate::error::{CoreError, Result};
use crate::interval::Interval;

pub const MAX_BUSY_INTERVALS: usize = 5_000;
pub const MAX_TASKS: usize = 500;
pub const MAX_CANDIDATE_ENTRIES: usize = 10_000;
pub const MAX_HORIZON_DAYS: i64 = 370;

pub(crate) fn check_cardinality(what: &'static str, actual: usize, limit: usize) -> Result<()> {
    if actual > limit {
        return Err(CoreError::ResourceExhausted {
            what,
            actual,
            limit,
        });
    }
    Ok(())
}

pub(crate) fn check_horizon(horizon: &Interval) -> Result<()> {
    let days = horizon.duration().num_days();
    if days > MAX_HORIZON_DAYS {
        return Err(CoreError::ResourceExhausted {
            what: "horizon days",
            actual: days as usize,
            limit: MAX_HORIZON_DAYS as usize,
        });
    }
    Ok(())
}
