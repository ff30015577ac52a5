//! Canonical time intervals and interval algebra.
//!
//! Every instant entering the core is normalized here into `DateTime<Utc>`,
//! regardless of which producer wrote it (internal allocator, calendar
//! export, or an external generator). The rest of the library never sees a
//! raw timestamp string.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ParseError, Result};

/// A half-open time interval `[start, end)` with `start < end`.
///
/// Construction is checked; a degenerate or inverted interval cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = CoreError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        Interval::new(raw.start, raw.end)
    }
}

impl Interval {
    /// Create a new interval, rejecting `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(CoreError::MalformedInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Get duration in whole minutes
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }

    /// Check if this interval overlaps another.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this interval fully contains another.
    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Intersect with a window, returning `None` when nothing remains.
    pub fn clip(&self, window: &Interval) -> Option<Interval> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        if start < end {
            Some(Interval { start, end })
        } else {
            None
        }
    }

    /// Keep only the first `minutes` of the interval. Returns `None` for a
    /// non-positive request; a request longer than the interval returns the
    /// interval unchanged.
    pub fn first_minutes(&self, minutes: i64) -> Option<Interval> {
        if minutes <= 0 {
            return None;
        }
        if minutes >= self.duration_minutes() {
            return Some(*self);
        }
        Some(Interval {
            start: self.start,
            end: self.start + Duration::minutes(minutes),
        })
    }
}

/// What a busy interval was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusySource {
    /// A pre-existing calendar event
    CalendarEvent,
    /// A previously placed study block
    PlacedBlock,
}

/// Time already occupied by a calendar event or a previously placed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub interval: Interval,
    pub source: BusySource,
}

impl BusyInterval {
    pub fn from_event(interval: Interval) -> Self {
        Self {
            interval,
            source: BusySource::CalendarEvent,
        }
    }

    pub fn from_block(interval: Interval) -> Self {
        Self {
            interval,
            source: BusySource::PlacedBlock,
        }
    }

    /// The busy interval expanded by a buffer margin on both sides.
    pub fn padded(&self, buffer_minutes: i64) -> Interval {
        if buffer_minutes <= 0 {
            return self.interval;
        }
        let margin = Duration::minutes(buffer_minutes);
        Interval {
            start: self.interval.start - margin,
            end: self.interval.end + margin,
        }
    }
}

/// Sort intervals by start time, ties broken by shorter duration first.
fn sort_canonical(intervals: &mut [Interval]) {
    intervals.sort_by_key(|iv| (iv.start, iv.end - iv.start));
}

/// Merge intervals into a sorted, non-overlapping sequence.
///
/// Touching intervals (`a.end == b.start`) are coalesced.
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    sort_canonical(&mut intervals);

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end => {
                if iv.end > last.end {
                    last.end = iv.end;
                }
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// Subtract `cutouts` from each interval in `base`, returning what remains.
pub fn subtract_intervals(base: &[Interval], cutouts: &[Interval]) -> Vec<Interval> {
    let cutouts = merge_intervals(cutouts.to_vec());

    let mut remaining = Vec::new();
    for iv in base {
        let mut cursor = iv.start;
        for cut in &cutouts {
            if cut.end <= cursor {
                continue;
            }
            if cut.start >= iv.end {
                break;
            }
            if cut.start > cursor {
                remaining.push(Interval {
                    start: cursor,
                    end: cut.start.min(iv.end),
                });
            }
            cursor = cursor.max(cut.end);
            if cursor >= iv.end {
                break;
            }
        }
        if cursor < iv.end {
            remaining.push(Interval {
                start: cursor,
                end: iv.end,
            });
        }
    }
    remaining
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y"];

/// Parse an instant from the formats heterogeneous producers emit.
///
/// Accepted: RFC 3339 with offset or `Z`, naive datetimes with `T`, space or
/// slash separators, a trailing ` UTC` suffix, and bare dates. Naive inputs
/// are taken as UTC; a bare date resolves to 23:59:59 of that day, the
/// end-of-day convention calendar exports use for all-day deadlines.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyTimestamp);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let trimmed = trimmed.strip_suffix(" UTC").unwrap_or(trimmed).trim_end();

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            let end_of_day = date
                .and_hms_opt(23, 59, 59)
                .ok_or_else(|| ParseError::Timestamp(raw.to_string()))?;
            return Ok(end_of_day.and_utc());
        }
    }

    Err(ParseError::Timestamp(raw.to_string()))
}

/// Parse a calendar date, also accepting a full datetime and taking its
/// date component.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyTimestamp);
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(date);
        }
    }

    parse_instant(trimmed)
        .map(|dt| dt.date_naive())
        .map_err(|_| ParseError::Date(raw.to_string()))
}

/// Parse a clock time such as "9am", "9:30pm", "09:00" or "17:00:30".
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime, ParseError> {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return Err(ParseError::EmptyTimestamp);
    }

    let (body, meridiem) = if let Some(stripped) = lowered.strip_suffix("am") {
        (stripped.trim_end(), Some(Meridiem::Am))
    } else if let Some(stripped) = lowered.strip_suffix("pm") {
        (stripped.trim_end(), Some(Meridiem::Pm))
    } else {
        (lowered.as_str(), None)
    };

    let mut fields = body.split(':');
    let hour: u32 = fields
        .next()
        .and_then(|f| f.trim().parse().ok())
        .ok_or_else(|| ParseError::ClockTime(raw.to_string()))?;
    let minute: u32 = match fields.next() {
        Some(f) => f
            .trim()
            .parse()
            .map_err(|_| ParseError::ClockTime(raw.to_string()))?,
        None => 0,
    };
    let second: u32 = match fields.next() {
        Some(f) => f
            .trim()
            .parse()
            .map_err(|_| ParseError::ClockTime(raw.to_string()))?,
        None => 0,
    };

    let hour = match meridiem {
        Some(Meridiem::Pm) if hour != 12 => hour + 12,
        Some(Meridiem::Am) if hour == 12 => 0,
        _ => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, second)
        .ok_or_else(|| ParseError::ClockTime(raw.to_string()))
}

enum Meridiem {
    Am,
    Pm,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, h, m, 0).unwrap()
    }

    fn iv(sh: u32, sm: u32, eh: u32, em: u32) -> Interval {
        Interval::new(at(sh, sm), at(eh, em)).unwrap()
    }

    #[test]
    fn degenerate_interval_rejected() {
        let t = at(9, 0);
        assert!(matches!(
            Interval::new(t, t),
            Err(CoreError::MalformedInterval { .. })
        ));
        assert!(Interval::new(at(10, 0), at(9, 0)).is_err());
    }

    #[test]
    fn degenerate_interval_rejected_on_deserialize() {
        let json = r#"{"start":"2025-03-03T10:00:00Z","end":"2025-03-03T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Interval>(json).is_err());
    }

    #[test]
    fn overlap_is_strict() {
        assert!(iv(9, 0, 11, 0).overlaps(&iv(10, 0, 12, 0)));
        // Touching intervals do not overlap
        assert!(!iv(9, 0, 10, 0).overlaps(&iv(10, 0, 11, 0)));
    }

    #[test]
    fn merge_coalesces_overlapping_and_touching() {
        let merged = merge_intervals(vec![
            iv(12, 0, 13, 0),
            iv(9, 0, 10, 0),
            iv(10, 0, 11, 0),
            iv(10, 30, 12, 30),
        ]);
        assert_eq!(merged, vec![iv(9, 0, 13, 0)]);
    }

    #[test]
    fn merge_keeps_disjoint_intervals_sorted() {
        let merged = merge_intervals(vec![iv(14, 0, 15, 0), iv(9, 0, 10, 0)]);
        assert_eq!(merged, vec![iv(9, 0, 10, 0), iv(14, 0, 15, 0)]);
    }

    #[test]
    fn subtract_carves_holes() {
        let remaining = subtract_intervals(&[iv(9, 0, 17, 0)], &[iv(10, 0, 11, 0), iv(12, 0, 13, 0)]);
        assert_eq!(
            remaining,
            vec![iv(9, 0, 10, 0), iv(11, 0, 12, 0), iv(13, 0, 17, 0)]
        );
    }

    #[test]
    fn subtract_cutout_covering_base_leaves_nothing() {
        let remaining = subtract_intervals(&[iv(10, 0, 11, 0)], &[iv(9, 0, 12, 0)]);
        assert!(remaining.is_empty());
    }

    #[test]
    fn clip_to_window() {
        assert_eq!(iv(8, 0, 12, 0).clip(&iv(9, 0, 17, 0)), Some(iv(9, 0, 12, 0)));
        assert_eq!(iv(6, 0, 8, 0).clip(&iv(9, 0, 17, 0)), None);
    }

    #[test]
    fn first_minutes_truncates() {
        assert_eq!(iv(9, 0, 12, 0).first_minutes(60), Some(iv(9, 0, 10, 0)));
        assert_eq!(iv(9, 0, 10, 0).first_minutes(120), Some(iv(9, 0, 10, 0)));
        assert_eq!(iv(9, 0, 10, 0).first_minutes(0), None);
    }

    #[test]
    fn padded_busy_interval() {
        let busy = BusyInterval::from_event(iv(10, 0, 11, 0));
        assert_eq!(busy.padded(15), iv(9, 45, 11, 15));
        assert_eq!(busy.padded(0), iv(10, 0, 11, 0));
    }

    #[test]
    fn parse_instant_formats() {
        let expected = at(10, 30);
        for raw in [
            "2025-03-03T10:30:00Z",
            "2025-03-03T10:30:00+00:00",
            "2025-03-03T10:30:00",
            "2025-03-03T10:30",
            "2025-03-03 10:30:00",
            "2025-03-03 10:30",
            "2025/03/03 10:30",
            "2025-03-03 10:30 UTC",
        ] {
            assert_eq!(parse_instant(raw).unwrap(), expected, "format: {raw}");
        }
    }

    #[test]
    fn parse_instant_offset_converted_to_utc() {
        let parsed = parse_instant("2025-03-03T05:30:00-05:00").unwrap();
        assert_eq!(parsed, at(10, 30));
    }

    #[test]
    fn parse_instant_date_only_is_end_of_day() {
        let parsed = parse_instant("2025-03-03").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 3, 23, 59, 59).unwrap());
    }

    #[test]
    fn parse_instant_garbage_rejected() {
        assert!(parse_instant("next tuesday").is_err());
        assert!(parse_instant("").is_err());
    }

    #[test]
    fn parse_clock_time_formats() {
        let time = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(parse_clock_time("9am").unwrap(), time(9, 0));
        assert_eq!(parse_clock_time("12am").unwrap(), time(0, 0));
        assert_eq!(parse_clock_time("12pm").unwrap(), time(12, 0));
        assert_eq!(parse_clock_time("9:30pm").unwrap(), time(21, 30));
        assert_eq!(parse_clock_time("09:00").unwrap(), time(9, 0));
        assert_eq!(parse_clock_time("17:45").unwrap(), time(17, 45));
        assert!(parse_clock_time("25:00").is_err());
        assert!(parse_clock_time("soonish").is_err());
    }

    #[test]
    fn parse_date_accepts_datetime() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        assert_eq!(parse_date("2025-03-03").unwrap(), date);
        assert_eq!(parse_date("2025-03-03T10:00:00Z").unwrap(), date);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_interval() -> impl Strategy<Value = Interval> {
            (0i64..10_000, 1i64..500).prop_map(|(start_min, len)| {
                let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
                let start = base + Duration::minutes(start_min);
                Interval::new(start, start + Duration::minutes(len)).unwrap()
            })
        }

        proptest! {
            #[test]
            fn merge_yields_sorted_disjoint(intervals in prop::collection::vec(arb_interval(), 0..40)) {
                let merged = merge_intervals(intervals);
                for pair in merged.windows(2) {
                    prop_assert!(pair[0].end() < pair[1].start());
                }
            }

            #[test]
            fn merge_preserves_total_coverage(intervals in prop::collection::vec(arb_interval(), 0..40)) {
                let merged = merge_intervals(intervals.clone());
                for iv in &intervals {
                    prop_assert!(merged.iter().any(|m| m.contains(iv)));
                }
            }

            #[test]
            fn subtract_never_returns_cut_time(
                base in prop::collection::vec(arb_interval(), 0..20),
                cutouts in prop::collection::vec(arb_interval(), 0..20),
            ) {
                let base = merge_intervals(base);
                let remaining = subtract_intervals(&base, &cutouts);
                for r in &remaining {
                    for c in &cutouts {
                        prop_assert!(!r.overlaps(c));
                    }
                }
            }
        }
    }
}
