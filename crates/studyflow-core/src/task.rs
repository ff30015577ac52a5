//! Task model for scheduling requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{CoreError, ParseError, Result};

/// Task priority.
///
/// Rank order (high first) drives the allocator's tie-break; the weight
/// multiplier is exposed for workload estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank: high=0, medium=1, low=2.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    /// Weight multiplier for workload estimation.
    pub fn weight(self) -> f64 {
        match self {
            Priority::High => 1.3,
            Priority::Medium => 1.0,
            Priority::Low => 0.8,
        }
    }
}

impl FromStr for Priority {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, ParseError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(ParseError::InvalidValue {
                field: "priority",
                message: format!("unknown priority '{other}'"),
            }),
        }
    }
}

/// A user task to be scheduled. Immutable once submitted to a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub estimated_hours: f64,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
    /// Unsplittable tasks receive at most one block.
    #[serde(default = "default_can_be_split")]
    pub can_be_split: bool,
}

fn default_can_be_split() -> bool {
    true
}

impl Task {
    /// Create a new task, rejecting a non-positive duration estimate.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        estimated_hours: f64,
        deadline: DateTime<Utc>,
        priority: Priority,
    ) -> Result<Self> {
        if !(estimated_hours > 0.0) {
            return Err(CoreError::Parse(ParseError::InvalidValue {
                field: "estimated_hours",
                message: format!("must be positive, got {estimated_hours}"),
            }));
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            subject: None,
            estimated_hours,
            deadline,
            priority,
            can_be_split: true,
        })
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_can_be_split(mut self, can_be_split: bool) -> Self {
        self.can_be_split = can_be_split;
        self
    }

    /// Estimate in whole minutes, the allocator's working unit.
    pub fn estimated_minutes(&self) -> i64 {
        (self.estimated_hours * 60.0).round() as i64
    }

    /// Hours adjusted by the priority weight multiplier.
    pub fn weighted_hours(&self) -> f64 {
        self.estimated_hours * self.priority.weight()
    }
}
