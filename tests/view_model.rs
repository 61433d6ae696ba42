use raid_attendance::model::{AttendanceRecord, Night, SortKey, ViewState};
use raid_attendance::view::{matches_filter, project};

fn record(name: &str, attended: u32, percentage: u8, last_seen: Option<&str>) -> AttendanceRecord {
    AttendanceRecord {
        name: name.to_string(),
        attended,
        possible: 6,
        percentage,
        last_seen_night: last_seen.map(Night::from),
    }
}

fn names(rows: &[&AttendanceRecord]) -> Vec<String> {
    rows.iter().map(|r| r.name.clone()).collect()
}

fn view(sort_key: SortKey) -> ViewState {
    ViewState {
        sort_key,
        ..ViewState::default()
    }
}

fn roster() -> Vec<AttendanceRecord> {
    vec![
        record("Mara", 5, 83, Some("2025-02-06")),
        record("bram", 5, 83, Some("2025-02-13")),
        record("Quill", 6, 83, None),
        record("Ash", 2, 33, Some("2025-02-13")),
        record("Zed", 6, 100, Some("2025-02-06")),
        record("Nox", 0, 0, None),
    ]
}

#[test]
fn percentage_sort_breaks_ties_by_attended_then_name() {
    let rows = roster();
    let out = project(&rows, &view(SortKey::Percentage));
    assert_eq!(names(&out), ["Zed", "Quill", "bram", "Mara", "Ash", "Nox"]);
}

#[test]
fn name_sort_ignores_case() {
    let rows = vec![record("Zed", 1, 10, None), record("alice", 1, 10, None)];
    let out = project(&rows, &view(SortKey::Name));
    assert_eq!(names(&out), ["alice", "Zed"]);
}

#[test]
fn name_sort_is_total_for_case_only_differences() {
    let rows = vec![record("alice", 1, 10, None), record("Alice", 1, 10, None)];
    let out = project(&rows, &view(SortKey::Name));
    assert_eq!(names(&out), ["Alice", "alice"]);
    let reversed: Vec<_> = rows.into_iter().rev().collect();
    let out = project(&reversed, &view(SortKey::Name));
    assert_eq!(names(&out), ["Alice", "alice"]);
}

#[test]
fn attended_sort_breaks_ties_by_percentage_then_name() {
    let rows = vec![
        record("b", 4, 50, None),
        record("a", 4, 50, None),
        record("c", 4, 67, None),
        record("d", 5, 10, None),
    ];
    let out = project(&rows, &view(SortKey::Attended));
    assert_eq!(names(&out), ["d", "c", "a", "b"]);
}

#[test]
fn last_seen_sort_puts_unseen_last() {
    let rows = roster();
    let out = project(&rows, &view(SortKey::LastSeen));
    // 2025-02-13: bram (83) before Ash (33); 2025-02-06: Zed before Mara;
    // then unseen by percentage.
    assert_eq!(names(&out), ["bram", "Ash", "Zed", "Mara", "Quill", "Nox"]);
}

#[test]
fn search_is_case_insensitive_substring() {
    let rows = roster();
    let mut v = view(SortKey::Name);
    v.search_query = "  AR ".to_string();
    let out = project(&rows, &v);
    assert_eq!(names(&out), ["Mara"]);

    v.search_query = "r".to_string();
    let out = project(&rows, &v);
    assert_eq!(names(&out), ["bram", "Mara"]);
}

#[test]
fn threshold_keeps_records_at_or_above() {
    let rows = roster();
    let mut v = view(SortKey::Percentage);
    v.min_threshold = Some(83);
    let out = project(&rows, &v);
    assert_eq!(names(&out), ["Zed", "Quill", "bram", "Mara"]);
}

#[test]
fn filtering_is_idempotent() {
    let rows = roster();
    let mut v = view(SortKey::Attended);
    v.search_query = "a".to_string();
    v.min_threshold = Some(30);

    let once: Vec<AttendanceRecord> = project(&rows, &v).into_iter().cloned().collect();
    let twice: Vec<AttendanceRecord> = project(&once, &v).into_iter().cloned().collect();
    assert_eq!(once, twice);
    assert!(once.iter().all(|r| matches_filter(r, &v)));
}

#[test]
fn project_does_not_mutate_input() {
    let rows = roster();
    let before = rows.clone();
    let _ = project(&rows, &view(SortKey::LastSeen));
    assert_eq!(rows, before);
}

#[test]
fn corrupt_percentage_is_clamped_for_ordering_and_filtering() {
    let rows = vec![record("hi", 1, 250, None), record("full", 2, 100, None)];
    let mut v = view(SortKey::Percentage);
    v.min_threshold = Some(100);
    let out = project(&rows, &v);
    // Both read as 100; more attended wins.
    assert_eq!(names(&out), ["full", "hi"]);
    assert_eq!(out[1].pct(), 100);
}
