//! Metrics engine: correctness, quality and system metrics for a schedule.
//!
//! Pure functions over a validated schedule plus the originating task,
//! preference and busy sets. Every field of `MetricsResult` is always
//! populated; when a metric's denominator is zero it takes its documented
//! neutral value instead of NaN.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::preferences::Preferences;
use crate::schedule::{Block, Schedule};
use crate::task::Task;
use crate::validator::{Conflict, ParseStats};

/// Tolerance when comparing placed minutes against an estimate.
const EPSILON_MINUTES: i64 = 1;

/// System pass-through fields supplied by the caller for externally
/// generated schedules. The baseline is free, instantaneous and token-less.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemMetadata {
    pub api_cost: f64,
    pub latency_seconds: f64,
    pub token_usage: u64,
}

/// Flat record of every metric computed for one schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    // Constraint/correctness metrics
    pub conflict_free: bool,
    pub num_conflicts: usize,
    pub deadline_compliance_rate: f64,
    pub tasks_meeting_deadline: usize,
    pub total_tasks: usize,
    pub parsing_success_rate: f64,

    // Quality metrics
    pub workload_variance: f64,
    pub average_daily_hours: f64,
    pub completion_ratio: f64,
    pub hours_scheduled: f64,
    pub hours_requested: f64,
    pub fragmentation: f64,
    /// Span from first block start to last block end, in hours
    pub makespan: f64,
    pub preference_compliance: f64,
    pub weekend_violation: bool,

    // System metrics
    pub api_cost: f64,
    pub latency_seconds: f64,
    pub token_usage: u64,
}

impl Default for MetricsResult {
    fn default() -> Self {
        Self {
            conflict_free: true,
            num_conflicts: 0,
            deadline_compliance_rate: 0.0,
            tasks_meeting_deadline: 0,
            total_tasks: 0,
            parsing_success_rate: 1.0,
            workload_variance: 0.0,
            average_daily_hours: 0.0,
            completion_ratio: 1.0,
            hours_scheduled: 0.0,
            hours_requested: 0.0,
            fragmentation: 0.0,
            makespan: 0.0,
            preference_compliance: 0.0,
            weekend_violation: false,
            api_cost: 0.0,
            latency_seconds: 0.0,
            token_usage: 0,
        }
    }
}

/// Compute the full metric set for one schedule.
pub fn compute_all_metrics(
    schedule: &Schedule,
    tasks: &[Task],
    prefs: &Preferences,
    conflicts: &[Conflict],
    parse_stats: ParseStats,
    system: SystemMetadata,
) -> MetricsResult {
    let (tasks_meeting_deadline, deadline_compliance_rate) =
        deadline_compliance(schedule, tasks);
    let (workload_variance, average_daily_hours) = workload_balance(schedule);
    let (completion_ratio, hours_scheduled, hours_requested) =
        completion_ratio(schedule, tasks);

    MetricsResult {
        conflict_free: conflicts.is_empty(),
        num_conflicts: conflicts.len(),
        deadline_compliance_rate,
        tasks_meeting_deadline,
        total_tasks: tasks.len(),
        parsing_success_rate: parse_stats.success_rate(),
        workload_variance,
        average_daily_hours,
        completion_ratio,
        hours_scheduled,
        hours_requested,
        fragmentation: fragmentation(schedule, tasks),
        makespan: schedule.span().map_or(0.0, |span| span.duration_hours()),
        preference_compliance: preference_compliance(schedule, prefs),
        weekend_violation: weekend_violation(schedule, prefs),
        api_cost: system.api_cost,
        latency_seconds: system.latency_seconds,
        token_usage: system.token_usage,
    }
}

/// A task meets its deadline when its full estimate is placed and every one
/// of its blocks ends at or before the deadline.
fn deadline_compliance(schedule: &Schedule, tasks: &[Task]) -> (usize, f64) {
    if tasks.is_empty() {
        return (0, 0.0);
    }

    let meeting = tasks
        .iter()
        .filter(|task| {
            let mut placed = 0i64;
            let mut any = false;
            for block in schedule.blocks_for(&task.id) {
                if block.end() > task.deadline {
                    return false;
                }
                placed += block.duration_minutes();
                any = true;
            }
            any && placed + EPSILON_MINUTES >= task.estimated_minutes()
        })
        .count();

    (meeting, meeting as f64 / tasks.len() as f64)
}

/// Population variance and mean of scheduled hours per calendar day, over
/// every day of the schedule's span (idle days count as zero).
fn workload_balance(schedule: &Schedule) -> (f64, f64) {
    let Some(span) = schedule.span() else {
        return (0.0, 0.0);
    };

    let mut daily_minutes: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
    let mut day = span.start().date_naive();
    let last = span.end().date_naive();
    while day <= last {
        daily_minutes.insert(day, 0);
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    // A block is attributed to the day it starts on.
    for block in schedule.blocks() {
        *daily_minutes.entry(block.start().date_naive()).or_insert(0) +=
            block.duration_minutes();
    }

    let hours: Vec<f64> = daily_minutes.values().map(|m| *m as f64 / 60.0).collect();
    let mean = hours.iter().sum::<f64>() / hours.len() as f64;
    let variance = hours.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / hours.len() as f64;
    (variance, mean)
}

/// Placed hours over requested hours; vacuously 1.0 with nothing requested.
fn completion_ratio(schedule: &Schedule, tasks: &[Task]) -> (f64, f64, f64) {
    let hours_requested: f64 = tasks.iter().map(|t| t.estimated_hours).sum();
    let hours_scheduled = schedule.total_hours();
    let ratio = if hours_requested > 0.0 {
        hours_scheduled / hours_requested
    } else {
        1.0
    };
    (ratio, hours_scheduled, hours_requested)
}

/// Mean number of blocks per task; tasks with no blocks stay in the
/// denominator.
fn fragmentation(schedule: &Schedule, tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let total_blocks: usize = tasks
        .iter()
        .map(|task| schedule.blocks_for(&task.id).count())
        .sum();
    total_blocks as f64 / tasks.len() as f64
}

/// Fraction of blocks fully contained in a declared study window. With no
/// declared windows every block complies.
fn preference_compliance(schedule: &Schedule, prefs: &Preferences) -> f64 {
    let blocks = schedule.blocks();
    if blocks.is_empty() {
        return 0.0;
    }

    let compliant = blocks
        .iter()
        .filter(|b| block_within_windows(b, prefs))
        .count();
    compliant as f64 / blocks.len() as f64
}

fn block_within_windows(block: &Block, prefs: &Preferences) -> bool {
    if prefs.study_windows.is_empty() {
        return true;
    }
    let start = block.start();
    let end = block.end();
    if start.date_naive() != end.date_naive() {
        // A block crossing midnight cannot sit inside a daily window.
        return false;
    }
    let weekday = start.weekday();
    prefs
        .study_windows
        .iter()
        .filter(|w| w.applies_on(weekday))
        .any(|w| w.start <= start.time() && end.time() <= w.end)
}

fn weekend_violation(schedule: &Schedule, prefs: &Preferences) -> bool {
    prefs.no_weekends
        && schedule.blocks().iter().any(|b| {
            matches!(
                b.start().weekday(),
                chrono::Weekday::Sat | chrono::Weekday::Sun
            )
        })
}
