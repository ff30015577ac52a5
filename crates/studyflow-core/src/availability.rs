//! Availability engine: derives the free-time set offered to the allocator.
//!
//! Free slots are computed per calendar day of the horizon: busy time (padded
//! by the buffer margin) is merged and subtracted from the study windows
//! projected onto that day, slivers too short to hold a block are dropped,
//! and the remainder is capped at the daily hour limit. Later slots are
//! truncated first so the allocator, which places earliest-first, keeps the
//! most usable capacity.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::allocator::AllocatorConfig;
use crate::error::Result;
use crate::interval::{merge_intervals, subtract_intervals, BusyInterval, Interval};
use crate::limits;
use crate::preferences::Preferences;

/// Compute the ordered free slots within `horizon`.
///
/// A day with no overlap between the busy-complement and the study windows
/// contributes no slots; that is a normal outcome, not an error. A horizon
/// shorter than one day is valid.
pub fn compute_free_slots(
    busy: &[BusyInterval],
    prefs: &Preferences,
    horizon: Interval,
    config: &AllocatorConfig,
) -> Result<Vec<Interval>> {
    limits::check_horizon(&horizon)?;
    limits::check_cardinality("busy intervals", busy.len(), limits::MAX_BUSY_INTERVALS)?;

    let padded: Vec<Interval> = busy
        .iter()
        .filter_map(|b| b.padded(prefs.buffer_minutes).clip(&horizon))
        .collect();
    let busy_merged = merge_intervals(padded);

    let cap_minutes = prefs.max_daily_minutes();
    let mut free = Vec::new();

    let mut day = horizon.start().date_naive();
    let last_day = horizon.end().date_naive();
    while day <= last_day {
        if !(prefs.no_weekends && is_weekend(day.weekday())) {
            let windows = day_windows(day, prefs, &horizon)?;
            let mut day_free = subtract_intervals(&windows, &busy_merged);
            day_free.retain(|slot| slot.duration_minutes() >= config.min_block_minutes);
            cap_daily(&mut day_free, cap_minutes, config.min_block_minutes);
            free.extend(day_free);
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    Ok(free)
}

fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// The study windows of one calendar day, clipped to the horizon and merged.
/// No explicit windows means the whole day is offered.
fn day_windows(day: NaiveDate, prefs: &Preferences, horizon: &Interval) -> Result<Vec<Interval>> {
    let mut windows = Vec::new();

    if prefs.study_windows.is_empty() {
        let start = day.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
        let end = day.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc());
        if let (Some(start), Some(end)) = (start, end) {
            if let Some(clipped) = Interval::new(start, end)?.clip(horizon) {
                windows.push(clipped);
            }
        }
    } else {
        let weekday = day.weekday();
        for rule in prefs.study_windows.iter().filter(|w| w.applies_on(weekday)) {
            let start = day.and_time(rule.start).and_utc();
            let end = day.and_time(rule.end).and_utc();
            if let Some(clipped) = Interval::new(start, end)?.clip(horizon) {
                windows.push(clipped);
            }
        }
    }

    Ok(merge_intervals(windows))
}

/// Cap one day's slots at the daily limit, truncating the latest slots
/// first. Earlier-in-day slots are preserved intact.
fn cap_daily(slots: &mut Vec<Interval>, cap_minutes: i64, min_block_minutes: i64) {
    let mut capped = Vec::with_capacity(slots.len());
    let mut used = 0i64;

    for slot in slots.iter() {
        let len = slot.duration_minutes();
        if used + len <= cap_minutes {
            used += len;
            capped.push(*slot);
            continue;
        }
        let allowed = cap_minutes - used;
        if allowed >= min_block_minutes {
            if let Some(truncated) = slot.first_minutes(allowed) {
                capped.push(truncated);
            }
        }
        break;
    }

    *slots = capped;
}
