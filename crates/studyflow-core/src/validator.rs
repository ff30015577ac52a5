//! Schedule validation and tolerant ingestion of candidate schedules.
//!
//! Candidate schedules arrive from two kinds of producers: the internal
//! allocator, and external generators whose output may carry malformed
//! timestamps, missing fields or duplicate entries. Both are reduced to the
//! same wire representation here; an entry that cannot be understood under
//! any supported format is excluded and counted, never fatal for the batch.

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, Result};
use crate::interval::{parse_clock_time, parse_date, parse_instant, BusyInterval, Interval};
use crate::limits;
use crate::schedule::{Block, Schedule};

/// One entry of the candidate-schedule wire representation.
///
/// Field aliases absorb producer variance: the task reference may arrive as
/// `task_id`, `taskName` or `title`, and an entry may carry either
/// `date` + `startTime` + `duration` or explicit `start`/`end` instants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    #[serde(rename = "task_id", alias = "taskName", alias = "task", alias = "title")]
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(
        rename = "startTime",
        alias = "start_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    /// Duration in hours
    #[serde(
        rename = "duration",
        alias = "duration_hours",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Parse accounting for one candidate schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub total_entries: usize,
    pub parse_failures: usize,
}

impl ParseStats {
    /// `1 - failures / total`; vacuously 1.0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total_entries == 0 {
            1.0
        } else {
            1.0 - self.parse_failures as f64 / self.total_entries as f64
        }
    }
}

/// Kind of pairwise time overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Two blocks overlap (same-task overlap counts equally)
    BlockBlock,
    /// A block overlaps a pre-existing busy interval
    BlockBusy,
}

/// One detected overlap. Recorded and scored, never raised as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub task_id: String,
    /// The other block's task, or `None` against a busy interval.
    pub other_task_id: Option<String>,
    pub first: Interval,
    pub second: Interval,
}

pub type ConflictList = Vec<Conflict>;

/// Parse a candidate schedule from its JSON wire form.
///
/// A document that is not a JSON array counts as one failed entry rather
/// than aborting the request, mirroring how entry-level failures are folded
/// into `parsing_success_rate`.
pub fn parse_candidate_schedule(
    json: &str,
    busy: &[BusyInterval],
) -> Result<(Schedule, ParseStats)> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(values) => values,
        Err(_) => {
            return Ok((
                Schedule::new(Vec::new(), busy.to_vec()),
                ParseStats {
                    total_entries: 1,
                    parse_failures: 1,
                },
            ));
        }
    };
    limits::check_cardinality(
        "candidate entries",
        values.len(),
        limits::MAX_CANDIDATE_ENTRIES,
    )?;

    let mut stats = ParseStats {
        total_entries: values.len(),
        parse_failures: 0,
    };
    let mut blocks = Vec::new();
    let mut seen = HashSet::new();

    for value in values {
        let parsed = serde_json::from_value::<CandidateEntry>(value)
            .map_err(|e| ParseError::InvalidValue {
                field: "entry",
                message: e.to_string(),
            })
            .and_then(|entry| entry_to_block(&entry));
        match parsed {
            Ok(block) => {
                let (task, start, end) = block.identity();
                // Duplicate identity is deduplicated, not counted as a
                // conflict or a failure.
                if seen.insert((task.to_string(), start, end)) {
                    blocks.push(block);
                }
            }
            Err(_) => stats.parse_failures += 1,
        }
    }

    Ok((Schedule::new(blocks, busy.to_vec()), stats))
}

/// Reconstruct a block from one wire entry.
fn entry_to_block(entry: &CandidateEntry) -> Result<Block, ParseError> {
    let (start, end) = match (&entry.start, &entry.end) {
        (Some(start_raw), Some(end_raw)) => (parse_instant(start_raw)?, parse_instant(end_raw)?),
        _ => {
            let date_raw = entry
                .date
                .as_deref()
                .ok_or(ParseError::MissingField("date"))?;
            let time_raw = entry
                .start_time
                .as_deref()
                .ok_or(ParseError::MissingField("startTime"))?;
            let duration_hours = entry
                .duration_hours
                .ok_or(ParseError::MissingField("duration"))?;
            if !(duration_hours > 0.0) {
                return Err(ParseError::InvalidValue {
                    field: "duration",
                    message: format!("must be positive, got {duration_hours}"),
                });
            }

            let date = parse_date(date_raw)?;
            let time = parse_clock_time(time_raw)?;
            let start = date.and_time(time).and_utc();
            let end = start + Duration::minutes((duration_hours * 60.0).round() as i64);
            (start, end)
        }
    };

    let interval = Interval::new(start, end).map_err(|_| ParseError::InvalidValue {
        field: "end",
        message: "end does not come after start".to_string(),
    })?;
    Ok(Block::new(&entry.task, interval))
}

/// Serialize a schedule to the candidate wire representation.
pub fn schedule_to_entries(schedule: &Schedule) -> Vec<CandidateEntry> {
    schedule
        .blocks()
        .iter()
        .map(|block| CandidateEntry {
            task: block.task_id.clone(),
            date: Some(block.start().format("%Y-%m-%d").to_string()),
            start_time: Some(block.start().format("%H:%M").to_string()),
            duration_hours: Some(block.duration_minutes() as f64 / 60.0),
            start: None,
            end: None,
            kind: Some("study".to_string()),
        })
        .collect()
}

/// Detect every pairwise overlap in a schedule.
///
/// Duplicate block identities are collapsed before counting so a repeated
/// entry is not reported as a self-conflict.
pub fn detect_conflicts(schedule: &Schedule) -> ConflictList {
    let mut seen = HashSet::new();
    let blocks: Vec<&Block> = schedule
        .blocks()
        .iter()
        .filter(|b| {
            let (task, start, end) = b.identity();
            seen.insert((task.to_string(), start, end))
        })
        .collect();

    let mut conflicts = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        for other in &blocks[i + 1..] {
            if block.interval.overlaps(&other.interval) {
                conflicts.push(Conflict {
                    kind: ConflictKind::BlockBlock,
                    task_id: block.task_id.clone(),
                    other_task_id: Some(other.task_id.clone()),
                    first: block.interval,
                    second: other.interval,
                });
            }
        }
        for busy in schedule.busy() {
            if block.interval.overlaps(&busy.interval) {
                conflicts.push(Conflict {
                    kind: ConflictKind::BlockBusy,
                    task_id: block.task_id.clone(),
                    other_task_id: None,
                    first: block.interval,
                    second: busy.interval,
                });
            }
        }
    }
    conflicts
}
