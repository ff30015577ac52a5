//! Greedy baseline allocator.
//!
//! Tasks are placed in a deterministic order (deadline, priority, size, id)
//! into the earliest free capacity before their deadline, carving sessions
//! of bounded length and reserving recurring breaks. Capacity consumed by an
//! earlier task is permanently gone for later ones: this first-come
//! contention under priority-aware ordering is the intended model, and the
//! priority inversion it can produce under load is deliberate.

use chrono::Duration;

use crate::error::Result;
use crate::interval::{BusyInterval, Interval};
use crate::limits;
use crate::preferences::BreakPattern;
use crate::schedule::{Block, Schedule};
use crate::task::Task;
use crate::validator;

/// Allocator configuration.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Maximum length of a single study session (minutes)
    pub max_session_minutes: i64,
    /// Minimum block worth placing (minutes)
    pub min_block_minutes: i64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_session_minutes: 120,
            min_block_minutes: 30,
        }
    }
}

/// Feasibility classification for one task after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScheduleOutcome {
    /// All estimated hours placed before the deadline
    FullyScheduled,
    /// Some hours placed; capacity before the deadline ran out
    PartiallyScheduled,
    /// No hours could be placed before the deadline
    Infeasible,
}

/// Per-task placement status.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub outcome: ScheduleOutcome,
    pub minutes_requested: i64,
    pub minutes_placed: i64,
}

/// Result of one allocation run.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub schedule: Schedule,
    pub statuses: Vec<TaskStatus>,
}

/// Deterministic greedy scheduler.
pub struct GreedyAllocator {
    config: AllocatorConfig,
}

impl GreedyAllocator {
    pub fn new() -> Self {
        Self {
            config: AllocatorConfig::default(),
        }
    }

    pub fn with_config(config: AllocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Place every task into the free slots, consuming capacity as it goes.
    ///
    /// `busy` is the reference busy set the emitted schedule must respect;
    /// `free_slots` is expected to already exclude it (see
    /// `compute_free_slots`). In debug builds the output is re-validated and
    /// a conflict is treated as a programming defect.
    pub fn allocate(
        &self,
        tasks: &[Task],
        free_slots: &[Interval],
        break_pattern: BreakPattern,
        busy: &[BusyInterval],
    ) -> Result<AllocationOutcome> {
        limits::check_cardinality("tasks", tasks.len(), limits::MAX_TASKS)?;
        limits::check_cardinality(
            "free slots",
            free_slots.len(),
            limits::MAX_BUSY_INTERVALS,
        )?;

        let order = Self::ordered(tasks);

        // Open capacity, consumed as blocks and breaks are carved out.
        let mut pool: Vec<Interval> = free_slots.to_vec();
        pool.sort_by_key(|iv| (iv.start(), iv.duration()));

        let mut blocks: Vec<Block> = Vec::new();
        let mut statuses: Vec<TaskStatus> = Vec::with_capacity(order.len());
        // Placed study time since the last reserved break, across tasks.
        let mut minutes_since_break: i64 = 0;

        for task in order {
            let requested = task.estimated_minutes();
            let mut remaining = requested;

            let mut i = 0;
            while remaining > 0 && i < pool.len() {
                let slot = pool[i];
                if slot.start() >= task.deadline {
                    // Pool is start-sorted; nothing further can help this task.
                    break;
                }

                let usable_end = slot.end().min(task.deadline);
                let usable = (usable_end - slot.start()).num_minutes();
                let len = usable.min(remaining).min(self.config.max_session_minutes);
                if len < self.config.min_block_minutes {
                    i += 1;
                    continue;
                }

                let block_end = slot.start() + Duration::minutes(len);
                let block_interval = Interval::new(slot.start(), block_end)?;
                blocks.push(Block::new(&task.id, block_interval));
                remaining -= len;
                minutes_since_break += len;

                // Reserve a break right after the block once enough study
                // time has accumulated. The reservation never crosses the
                // slot boundary; a remainder shorter than the break is
                // forfeited with it.
                let mut next_start = block_end;
                if break_pattern.break_minutes > 0
                    && minutes_since_break >= break_pattern.interval_minutes
                {
                    next_start =
                        (block_end + Duration::minutes(break_pattern.break_minutes)).min(slot.end());
                    minutes_since_break = 0;
                }

                if next_start < slot.end() {
                    pool[i] = Interval::new(next_start, slot.end())?;
                } else {
                    pool.remove(i);
                }

                if !task.can_be_split {
                    break;
                }
            }

            let placed = requested - remaining;
            let outcome = if remaining == 0 {
                ScheduleOutcome::FullyScheduled
            } else if placed > 0 {
                ScheduleOutcome::PartiallyScheduled
            } else {
                ScheduleOutcome::Infeasible
            };

            statuses.push(TaskStatus {
                task_id: task.id.clone(),
                outcome,
                minutes_requested: requested,
                minutes_placed: placed,
            });
        }

        let schedule = Schedule::new(blocks, busy.to_vec());
        debug_assert!(
            validator::detect_conflicts(&schedule).is_empty(),
            "allocator emitted a conflicting schedule"
        );

        Ok(AllocationOutcome { schedule, statuses })
    }

    /// The deterministic processing order: deadline ascending, then priority
    /// (high first), then smaller estimate, then id as the final tie-break.
    fn ordered(tasks: &[Task]) -> Vec<&Task> {
        let mut order: Vec<&Task> = tasks.iter().collect();
        order.sort_by(|a, b| {
            a.deadline
                .cmp(&b.deadline)
                .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
                .then_with(|| a.estimated_minutes().cmp(&b.estimated_minutes()))
                .then_with(|| a.id.cmp(&b.id))
        });
        order
    }
}

impl Default for GreedyAllocator {
    fn default() -> Self {
        Self::new()
    }
}
