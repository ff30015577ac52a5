//! User scheduling preferences and the free-text parsing boundary.
//!
//! Free-text preference fields (study-window descriptions, notes) are
//! translated into structured rules here and nowhere else. The availability
//! engine, allocator and metrics only ever see structured values.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ParseError, Result};
use crate::interval::parse_clock_time;

/// Which days a study window applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayRule {
    /// Every day of the week
    Any,
    /// A single weekday
    On(Weekday),
}

/// A daily time range during which study blocks may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyWindow {
    pub day: DayRule,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl StudyWindow {
    pub fn applies_on(&self, weekday: Weekday) -> bool {
        match self.day {
            DayRule::Any => true,
            DayRule::On(day) => day == weekday,
        }
    }
}

/// Recurring break rule: a break of `break_minutes` is reserved after every
/// `interval_minutes` of placed study time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPattern {
    #[serde(alias = "break_duration")]
    pub break_minutes: i64,
    #[serde(alias = "break_interval")]
    pub interval_minutes: i64,
}

impl Default for BreakPattern {
    fn default() -> Self {
        Self {
            break_minutes: 15,
            interval_minutes: 120,
        }
    }
}

impl BreakPattern {
    /// A pattern that never reserves breaks.
    pub fn none() -> Self {
        Self {
            break_minutes: 0,
            interval_minutes: i64::MAX,
        }
    }

    /// Best-effort reading of a free-text break description such as
    /// `"10 min break every hour"` or `"15 minute break every 2 hours"`.
    /// Returns `None` when the text carries no recognizable rule, leaving
    /// the caller to fall back to the default pattern.
    pub fn from_text(text: &str) -> Option<Self> {
        let lower = text.trim().to_ascii_lowercase();
        if lower.is_empty() {
            return None;
        }
        if lower.contains("no break") {
            return Some(Self::none());
        }

        let mut numbers = Vec::new();
        let mut current = String::new();
        for ch in lower.chars() {
            if ch.is_ascii_digit() {
                current.push(ch);
            } else if !current.is_empty() {
                numbers.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            numbers.push(current);
        }

        let break_minutes: i64 = numbers.first()?.parse().ok()?;
        let interval_minutes = match numbers.get(1) {
            Some(n) => {
                let value: i64 = n.parse().ok()?;
                if lower.contains("hour") {
                    value * 60
                } else {
                    value
                }
            }
            // "every hour" and similar phrasings carry a single number.
            None if lower.contains("hour") => 60,
            None => return None,
        };
        if break_minutes < 0 || interval_minutes <= 0 {
            return None;
        }
        Some(Self {
            break_minutes,
            interval_minutes,
        })
    }
}

/// Structured scheduling preferences for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Explicit study windows; empty means all hours of the horizon.
    #[serde(default)]
    pub study_windows: Vec<StudyWindow>,
    pub max_daily_hours: f64,
    #[serde(default)]
    pub break_pattern: BreakPattern,
    /// Margin kept free around every busy interval.
    #[serde(default = "default_buffer_minutes")]
    pub buffer_minutes: i64,
    /// Derived once from `additional_notes` at the parsing boundary.
    #[serde(default)]
    pub no_weekends: bool,
    /// Opaque free text, never interpreted outside this module.
    #[serde(default)]
    pub additional_notes: String,
}

fn default_buffer_minutes() -> i64 {
    15
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            study_windows: Vec::new(),
            max_daily_hours: 8.0,
            break_pattern: BreakPattern::default(),
            buffer_minutes: default_buffer_minutes(),
            no_weekends: false,
            additional_notes: String::new(),
        }
    }
}

impl Preferences {
    /// Build structured preferences from the raw fields of a request.
    ///
    /// This is the only place free text is interpreted: the study-window
    /// description becomes structured rules and the notes are scanned for a
    /// weekend restriction. Anything else in the notes stays opaque.
    pub fn from_parts(
        study_windows_text: Option<&str>,
        max_daily_hours: Option<f64>,
        break_pattern: Option<BreakPattern>,
        additional_notes: Option<&str>,
    ) -> Result<Self> {
        let max_daily_hours = max_daily_hours.unwrap_or(8.0);
        if !(max_daily_hours > 0.0) {
            return Err(CoreError::Parse(ParseError::InvalidValue {
                field: "max_daily_hours",
                message: format!("must be positive, got {max_daily_hours}"),
            }));
        }

        let study_windows = match study_windows_text {
            Some(text) if !text.trim().is_empty() => parse_study_windows(text)?,
            _ => Vec::new(),
        };

        let notes = additional_notes.unwrap_or("").to_string();
        Ok(Self {
            study_windows,
            max_daily_hours,
            break_pattern: break_pattern.unwrap_or_default(),
            buffer_minutes: default_buffer_minutes(),
            no_weekends: notes_forbid_weekends(&notes),
            additional_notes: notes,
        })
    }

    pub fn max_daily_minutes(&self) -> i64 {
        (self.max_daily_hours * 60.0).round() as i64
    }
}

/// Parse a study-window description into structured rules.
///
/// Grammar: comma-separated rules, each an optional day prefix followed by a
/// time range. Examples: `"9am-5pm"`, `"Mon 9:00-12:00, Tue 2pm-6pm"`,
/// `"weekdays 19:00-22:00"`.
pub fn parse_study_windows(raw: &str) -> Result<Vec<StudyWindow>, ParseError> {
    let mut windows = Vec::new();

    for rule in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        let (days, range) = split_day_prefix(rule)?;
        let (start_raw, end_raw) = range
            .split_once('-')
            .ok_or_else(|| ParseError::StudyWindow(rule.to_string()))?;
        let start = parse_clock_time(start_raw)?;
        let end = parse_clock_time(end_raw)?;
        if end <= start {
            return Err(ParseError::StudyWindow(rule.to_string()));
        }
        for day in days {
            windows.push(StudyWindow { day, start, end });
        }
    }

    Ok(windows)
}

fn split_day_prefix(rule: &str) -> Result<(Vec<DayRule>, &str), ParseError> {
    let Some((prefix, rest)) = rule.split_once(char::is_whitespace) else {
        return Ok((vec![DayRule::Any], rule));
    };

    let days = match prefix.to_ascii_lowercase().as_str() {
        "any" | "daily" => vec![DayRule::Any],
        "weekdays" => [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ]
        .into_iter()
        .map(DayRule::On)
        .collect(),
        "weekends" => vec![DayRule::On(Weekday::Sat), DayRule::On(Weekday::Sun)],
        name => match weekday_from_name(name) {
            Some(day) => vec![DayRule::On(day)],
            // No recognized day prefix; the whole rule is a bare time range
            // with an embedded space such as "9 am-5 pm".
            None => return Ok((vec![DayRule::Any], rule)),
        },
    };

    Ok((days, rest.trim_start()))
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Whether a free-text notes field declares a weekend restriction.
pub fn notes_forbid_weekends(notes: &str) -> bool {
    let lowered = notes.to_ascii_lowercase();
    ["no weekend", "not on weekend", "don't work on weekend", "do not work on weekend"]
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn single_anonymous_range() {
        let windows = parse_study_windows("9am-5pm").unwrap();
        assert_eq!(
            windows,
            vec![StudyWindow {
                day: DayRule::Any,
                start: time(9, 0),
                end: time(17, 0),
            }]
        );
    }

    #[test]
    fn multiple_ranges_with_day_prefixes() {
        let windows = parse_study_windows("Mon 9:00-12:00, Tue 2pm-6pm").unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].day, DayRule::On(Weekday::Mon));
        assert_eq!(windows[0].start, time(9, 0));
        assert_eq!(windows[1].day, DayRule::On(Weekday::Tue));
        assert_eq!(windows[1].end, time(18, 0));
    }

    #[test]
    fn weekdays_prefix_expands() {
        let windows = parse_study_windows("weekdays 19:00-22:00").unwrap();
        assert_eq!(windows.len(), 5);
        assert!(windows.iter().all(|w| w.start == time(19, 0)));
        assert!(!windows.iter().any(|w| w.applies_on(Weekday::Sat)));
    }

    #[test]
    fn inverted_range_rejected() {
        assert!(parse_study_windows("5pm-9am").is_err());
        assert!(parse_study_windows("nonsense").is_err());
    }

    #[test]
    fn weekend_restriction_detected_in_notes() {
        assert!(notes_forbid_weekends("Please, no weekends for me"));
        assert!(notes_forbid_weekends("I don't work on weekends"));
        assert!(!notes_forbid_weekends("I love studying on Saturday"));
    }

    #[test]
    fn from_parts_validates_daily_cap() {
        assert!(Preferences::from_parts(Some("9am-5pm"), Some(0.0), None, None).is_err());

        let prefs =
            Preferences::from_parts(Some("9am-5pm"), Some(6.0), None, Some("no weekends")).unwrap();
        assert_eq!(prefs.study_windows.len(), 1);
        assert!(prefs.no_weekends);
        assert_eq!(prefs.max_daily_minutes(), 360);
    }

    #[test]
    fn empty_windows_text_means_unconstrained() {
        let prefs = Preferences::from_parts(None, Some(4.0), None, None).unwrap();
        assert!(prefs.study_windows.is_empty());
    }

    #[test]
    fn break_pattern_from_text() {
        assert_eq!(
            BreakPattern::from_text("10 min break every hour"),
            Some(BreakPattern {
                break_minutes: 10,
                interval_minutes: 60,
            })
        );
        assert_eq!(
            BreakPattern::from_text("15 minute break every 2 hours"),
            Some(BreakPattern {
                break_minutes: 15,
                interval_minutes: 120,
            })
        );
        assert_eq!(BreakPattern::from_text("no breaks"), Some(BreakPattern::none()));
        assert_eq!(BreakPattern::from_text(""), None);
        assert_eq!(BreakPattern::from_text("whenever I feel like it"), None);
    }
}
