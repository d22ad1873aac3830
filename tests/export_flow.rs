use careflow::models::event::{
    CalendarEvent, EventKind, EventStatus, Participant, ParticipantRole, Priority,
};
use careflow::service::conflicts::annotate_conflicts;
use careflow::service::export::{calendar_to_csv, schedule_report};
use chrono::{TimeZone, Utc};

fn event(id: &str, title: &str, start_h: u32, end_h: u32, staff: &[&str]) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        kind: EventKind::Booking,
        title: title.to_string(),
        start_time: Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2026, 3, 2, end_h, 0, 0).unwrap(),
        status: EventStatus::Scheduled,
        branch_id: "b1".to_string(),
        branch_name: "North".to_string(),
        participants: vec![Participant {
            id: "c1".to_string(),
            name: "Rose Hart".to_string(),
            role: ParticipantRole::Client,
        }],
        location: None,
        priority: Priority::Medium,
        client_id: Some("c1".to_string()),
        staff_ids: staff.iter().map(|s| s.to_string()).collect(),
        conflicts_with: Vec::new(),
    }
}

#[test]
fn csv_export_quotes_titles_with_commas() {
    let mut events = vec![
        event("e1", "Hart, Rose - personal care", 9, 10, &["s1"]),
        event("e2", "Medication round", 9, 10, &["s1"]),
    ];
    annotate_conflicts(&mut events);
    let csv = calendar_to_csv(&events);

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "id,kind,title,start_time,end_time,branch,staff,conflicts"
    );
    assert!(lines[1].starts_with("e1,booking,\"Hart, Rose - personal care\""));
    // The overlap shows up in both rows.
    assert!(lines[1].ends_with(",e2"));
    assert!(lines[2].ends_with(",e1"));
}

#[test]
fn schedule_report_collects_conflict_section_last() {
    let mut events = vec![
        event("e1", "Morning visit", 9, 10, &["s1"]),
        event("e2", "Overlapping visit", 9, 10, &["s1"]),
        event("e3", "Afternoon visit", 14, 15, &["s2"]),
    ];
    annotate_conflicts(&mut events);

    let generated = Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap();
    let report = schedule_report("Daily rota", "Harbour Care", generated, &events);

    let last = report.sections.last().unwrap();
    assert_eq!(last.heading, "Schedule conflicts");
    assert_eq!(last.rows.len(), 2);

    let text = report.render_text();
    assert!(text.contains("Daily rota"));
    assert!(text.contains("Afternoon visit"));
}

#[test]
fn conflict_free_schedule_has_no_conflict_section() {
    let mut events = vec![event("e1", "Morning visit", 9, 10, &["s1"])];
    annotate_conflicts(&mut events);
    let generated = Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap();
    let report = schedule_report("Daily rota", "Harbour Care", generated, &events);
    assert!(report.sections.iter().all(|s| s.heading != "Schedule conflicts"));
}
