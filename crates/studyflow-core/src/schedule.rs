//! Schedule and block value types.
//!
//! A `Schedule` is a value: it is created once by the allocator or
//! reconstructed once from external data, and every transformation produces
//! a new `Schedule`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interval::{BusyInterval, Interval};

/// A scheduled study block assigned to one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub task_id: String,
    pub interval: Interval,
}

impl Block {
    /// Create a new block with a generated id.
    pub fn new(task_id: impl Into<String>, interval: Interval) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            interval,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.interval.start()
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.interval.end()
    }

    pub fn duration_minutes(&self) -> i64 {
        self.interval.duration_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        self.interval.duration_hours()
    }

    /// Identity used for duplicate detection: generated ids are ignored.
    pub fn identity(&self) -> (&str, DateTime<Utc>, DateTime<Utc>) {
        (self.task_id.as_str(), self.start(), self.end())
    }
}

/// An ordered sequence of blocks plus the reference busy set the schedule
/// must respect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    blocks: Vec<Block>,
    busy: Vec<BusyInterval>,
}

impl Schedule {
    pub fn new(blocks: Vec<Block>, busy: Vec<BusyInterval>) -> Self {
        Self { blocks, busy }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn busy(&self) -> &[BusyInterval] {
        &self.busy
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Blocks belonging to one task, in schedule order.
    pub fn blocks_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks.iter().filter(move |b| b.task_id == task_id)
    }

    /// Total scheduled hours across all blocks.
    pub fn total_hours(&self) -> f64 {
        self.blocks.iter().map(Block::duration_hours).sum()
    }

    /// Wall-clock span from first block start to last block end.
    pub fn span(&self) -> Option<Interval> {
        let start = self.blocks.iter().map(Block::start).min()?;
        let end = self.blocks.iter().map(Block::end).max()?;
        Interval::new(start, end).ok()
    }

    /// A copy with duplicate block identities removed, first occurrence wins.
    pub fn deduplicated(&self) -> Schedule {
        let mut seen = std::collections::HashSet::new();
        let blocks = self
            .blocks
            .iter()
            .filter(|b| {
                let (task, start, end) = b.identity();
                seen.insert((task.to_string(), start, end))
            })
            .cloned()
            .collect();
        Schedule {
            blocks,
            busy: self.busy.clone(),
        }
    }
}
