//! # Studyflow Core Library
//!
//! Deterministic study-schedule synthesis and validation. The crate turns a
//! set of tasks, existing calendar commitments and user preferences into a
//! conflict-free study schedule, and scores any schedule (its own or an
//! externally generated one) against the same constraints.
//!
//! ## Pipeline
//!
//! - **Availability Engine**: subtracts busy time from the preference
//!   windows to produce free slots
//! - **Greedy Allocator**: places task blocks into free slots, earliest
//!   deadline first, splitting long tasks and reserving breaks
//! - **Schedule Validator**: ingests candidate schedules in a tolerant wire
//!   form and detects overlap conflicts
//! - **Metrics Engine**: computes correctness, quality and system metrics
//!   for a validated schedule
//!
//! Every stage is a pure, synchronous function over immutable inputs: the
//! same inputs always produce byte-identical outputs, so callers may run
//! many evaluations in parallel without coordination.
//!
//! ## Key Components
//!
//! - [`GreedyAllocator`]: deadline-first block placement
//! - [`compute_free_slots`]: busy-time subtraction and daily capping
//! - [`parse_candidate_schedule`] / [`detect_conflicts`]: validation
//! - [`compute_all_metrics`]: the full metric set

pub mod allocator;
pub mod availability;
pub mod error;
pub mod interval;
pub mod limits;
pub mod metrics;
pub mod preferences;
pub mod schedule;
pub mod task;
pub mod testcase;
pub mod validator;

pub use allocator::{
    AllocationOutcome, AllocatorConfig, GreedyAllocator, ScheduleOutcome, TaskStatus,
};
pub use availability::compute_free_slots;
pub use error::{CoreError, ParseError, Result};
pub use interval::{BusyInterval, BusySource, Interval};
pub use metrics::{compute_all_metrics, MetricsResult, SystemMetadata};
pub use preferences::{BreakPattern, DayRule, Preferences, StudyWindow};
pub use schedule::{Block, Schedule};
pub use task::{Priority, Task};
pub use testcase::{TestCase, TestCaseRecord};
pub use validator::{
    detect_conflicts, parse_candidate_schedule, schedule_to_entries, Conflict, ConflictKind,
    ConflictList, ParseStats,
};
