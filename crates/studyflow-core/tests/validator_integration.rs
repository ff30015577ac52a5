//! Validation and scoring of externally generated candidate schedules,
//! including malformed input and the wire round-trip of allocator output.

use chrono::{DateTime, TimeZone, Utc};
use indoc::indoc;

use studyflow_core::{
    compute_all_metrics, compute_free_slots, detect_conflicts, parse_candidate_schedule,
    schedule_to_entries, BusyInterval, GreedyAllocator, Interval, Preferences, Priority,
    SystemMetadata, Task,
};

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, m, 0).unwrap()
}

fn event(d: u32, sh: u32, eh: u32) -> BusyInterval {
    BusyInterval::from_event(Interval::new(at(d, sh, 0), at(d, eh, 0)).unwrap())
}

// An external generator's output with mixed formats, a broken entry, a
// duplicate and a real conflict: everything is folded into the metrics, and
// nothing is fatal.
#[test]
fn messy_external_schedule_is_scored_not_rejected() {
    let tasks = vec![
        Task::new("essay", "Essay", 2.0, at(5, 23, 59), Priority::High).unwrap(),
        Task::new("reading", "Reading", 1.0, at(5, 23, 59), Priority::Low).unwrap(),
    ];
    let busy = vec![event(3, 10, 11)];
    let prefs = Preferences::from_parts(Some("9am-9pm"), Some(6.0), None, None).unwrap();

    let json = indoc! {r#"
        [
            {"task_id": "essay", "date": "2025-03-03", "startTime": "9:00", "duration": 2},
            {"taskName": "reading", "start": "2025/03/03 14:00", "end": "2025-03-03T15:00:00Z"},
            {"task_id": "reading", "date": "2025-03-03", "startTime": "2pm", "duration": 1},
            {"task_id": "broken", "date": "someday", "startTime": "9:00", "duration": 1}
        ]
    "#};

    let (schedule, stats) = parse_candidate_schedule(json, &busy).unwrap();
    // The duplicate reading entry collapses; the broken one is counted.
    assert_eq!(schedule.blocks().len(), 2);
    assert_eq!(stats.total_entries, 4);
    assert_eq!(stats.parse_failures, 1);

    let conflicts = detect_conflicts(&schedule);
    // The essay block 09:00-11:00 overlaps the 10:00-11:00 event.
    assert_eq!(conflicts.len(), 1);

    let metrics = compute_all_metrics(
        &schedule,
        &tasks,
        &prefs,
        &conflicts,
        stats,
        SystemMetadata::default(),
    );
    assert!(!metrics.conflict_free);
    assert_eq!(metrics.num_conflicts, 1);
    assert!((metrics.parsing_success_rate - 0.75).abs() < 1e-9);
    // Both tasks fully placed before their deadlines, conflicts aside.
    assert_eq!(metrics.deadline_compliance_rate, 1.0);
    assert_eq!(metrics.completion_ratio, 1.0);
}

#[test]
fn garbage_document_scores_zero_parse_rate() {
    let tasks = vec![Task::new("t1", "T1", 2.0, at(5, 23, 59), Priority::Medium).unwrap()];
    let prefs = Preferences::default();

    let (schedule, stats) =
        parse_candidate_schedule("I cannot produce a schedule for this.", &[]).unwrap();
    assert!(schedule.is_empty());

    let metrics = compute_all_metrics(
        &schedule,
        &tasks,
        &prefs,
        &detect_conflicts(&schedule),
        stats,
        SystemMetadata::default(),
    );
    assert_eq!(metrics.parsing_success_rate, 0.0);
    assert_eq!(metrics.completion_ratio, 0.0);
    assert!(metrics.conflict_free);
}

// Allocator output survives the wire: serialize, re-parse, re-validate.
#[test]
fn allocator_output_round_trips_through_the_wire_form() {
    let deadline = at(6, 23, 59);
    let tasks = vec![
        Task::new("t1", "A", 3.0, deadline, Priority::Medium).unwrap(),
        Task::new("t2", "B", 2.0, deadline, Priority::High).unwrap(),
    ];
    let busy = vec![event(3, 12, 13), event(4, 10, 11)];
    let prefs = Preferences::from_parts(Some("9am-6pm"), Some(5.0), None, None).unwrap();

    let allocator = GreedyAllocator::new();
    let horizon = Interval::new(at(3, 0, 0), deadline).unwrap();
    let slots = compute_free_slots(&busy, &prefs, horizon, allocator.config()).unwrap();
    let outcome = allocator
        .allocate(&tasks, &slots, prefs.break_pattern, &busy)
        .unwrap();
    assert!(!outcome.schedule.is_empty());

    let wire = serde_json::to_string(&schedule_to_entries(&outcome.schedule)).unwrap();
    let (reparsed, stats) = parse_candidate_schedule(&wire, &busy).unwrap();

    assert_eq!(stats.parse_failures, 0);
    assert!(detect_conflicts(&reparsed).is_empty());

    let identities = |s: &studyflow_core::Schedule| {
        s.blocks()
            .iter()
            .map(|b| (b.task_id.clone(), b.start(), b.end()))
            .collect::<Vec<_>>()
    };
    assert_eq!(identities(&outcome.schedule), identities(&reparsed));
}

#[test]
fn system_metadata_passes_through_untouched() {
    let (schedule, stats) = parse_candidate_schedule("[]", &[]).unwrap();
    let system = SystemMetadata {
        api_cost: 0.031,
        latency_seconds: 4.2,
        token_usage: 2048,
    };
    let metrics = compute_all_metrics(
        &schedule,
        &[],
        &Preferences::default(),
        &[],
        stats,
        system,
    );
    assert!((metrics.api_cost - 0.031).abs() < 1e-9);
    assert!((metrics.latency_seconds - 4.2).abs() < 1e-9);
    assert_eq!(metrics.token_usage, 2048);
    assert_eq!(metrics.parsing_success_rate, 1.0);
}
