//! Ingestion of external test-case records.
//!
//! A record bundles one scheduling request: the new tasks, the existing
//! calendar events and the raw preference fields. Records come from JSON
//! produced by several generators, so the serde shapes here are tolerant:
//! event times may be plain strings or `{dateTime, timeZone}` envelopes,
//! task ids may be strings or numbers, and most fields are optional.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{CoreError, ParseError, Result};
use crate::interval::{parse_instant, BusyInterval, Interval};
use crate::preferences::{BreakPattern, Preferences};
use crate::task::{Priority, Task};

/// Raw test-case record as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCaseRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub split_type: Option<String>,
    #[serde(default)]
    pub feasibility_label: Option<String>,
    #[serde(default)]
    pub preferences: PreferencesRecord,
    #[serde(default)]
    pub existing_events: Vec<EventRecord>,
    #[serde(default)]
    pub new_tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesRecord {
    #[serde(default)]
    pub study_windows: Option<String>,
    #[serde(default)]
    pub max_daily_hours: Option<f64>,
    #[serde(default)]
    pub break_pattern: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub description: Option<String>,
}

/// Event boundary: either a bare timestamp string or the calendar-API
/// envelope. All-day events carry `date` instead of `dateTime`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Envelope {
        #[serde(rename = "dateTime", default)]
        date_time: Option<String>,
        #[serde(default)]
        date: Option<String>,
        #[serde(rename = "timeZone", default)]
        time_zone: Option<String>,
    },
    Plain(String),
}

impl EventTime {
    fn instant(&self) -> Result<DateTime<Utc>, ParseError> {
        match self {
            EventTime::Plain(raw) => parse_instant(raw),
            EventTime::Envelope {
                date_time, date, ..
            } => {
                let raw = date_time
                    .as_deref()
                    .or(date.as_deref())
                    .ok_or(ParseError::MissingField("dateTime"))?;
                parse_instant(raw)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub estimated_hours: f64,
    pub deadline: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub can_be_split: Option<bool>,
}

/// A fully parsed test case, ready for the scheduling pipeline.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub id: String,
    pub split_type: Option<String>,
    pub feasibility_label: Option<String>,
    pub tasks: Vec<Task>,
    pub busy: Vec<BusyInterval>,
    pub preferences: Preferences,
}

impl TestCaseRecord {
    /// Parse one record from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolve raw fields into domain types. Fails on the first event or
    /// task that cannot be interpreted; a record is taken whole or not at
    /// all.
    pub fn into_test_case(self) -> Result<TestCase> {
        let mut busy = Vec::with_capacity(self.existing_events.len());
        for event in &self.existing_events {
            let start = event.start.instant()?;
            let end = event.end.instant()?;
            busy.push(BusyInterval::from_event(Interval::new(start, end)?));
        }

        let mut tasks = Vec::with_capacity(self.new_tasks.len());
        for record in self.new_tasks {
            let deadline = parse_instant(&record.deadline)?;
            let priority = match record.priority.as_deref() {
                Some(raw) => raw.parse::<Priority>().map_err(CoreError::Parse)?,
                None => Priority::default(),
            };
            let mut task = Task::new(
                record.id,
                record.name,
                record.estimated_hours,
                deadline,
                priority,
            )?;
            if let Some(subject) = record.subject {
                task = task.with_subject(subject);
            }
            if let Some(can_be_split) = record.can_be_split {
                task = task.with_can_be_split(can_be_split);
            }
            tasks.push(task);
        }

        let prefs = &self.preferences;
        let break_pattern = prefs
            .break_pattern
            .as_deref()
            .and_then(BreakPattern::from_text);
        let preferences = Preferences::from_parts(
            prefs.study_windows.as_deref(),
            prefs.max_daily_hours,
            break_pattern,
            prefs.additional_notes.as_deref(),
        )?;

        Ok(TestCase {
            id: self.id,
            split_type: self.split_type,
            feasibility_label: self.feasibility_label,
            tasks,
            busy,
            preferences,
        })
    }
}

impl TestCase {
    /// Scheduling horizon for this case: from the given instant to the
    /// latest task deadline. `None` when the case has no tasks or every
    /// deadline is already past.
    pub fn horizon(&self, from: DateTime<Utc>) -> Option<Interval> {
        let latest = self.tasks.iter().map(|t| t.deadline).max()?;
        Interval::new(from, latest).ok()
    }
}

/// Accept ids that arrive as JSON strings or numbers.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}
