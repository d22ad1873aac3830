use chrono::{DateTime, Utc};

use crate::models::event::CalendarEvent;

/// Quotes a field when it embeds a comma, quote, or newline; embedded quotes
/// are doubled.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Calendar export consumed by the billing team's spreadsheets.
pub fn calendar_to_csv(events: &[CalendarEvent]) -> String {
    let mut lines = vec![csv_line(&[
        "id".to_string(),
        "kind".to_string(),
        "title".to_string(),
        "start_time".to_string(),
        "end_time".to_string(),
        "branch".to_string(),
        "staff".to_string(),
        "conflicts".to_string(),
    ])];
    for event in events {
        lines.push(csv_line(&[
            event.id.clone(),
            format!("{:?}", event.kind).to_lowercase(),
            event.title.clone(),
            event.start_time.to_rfc3339(),
            event.end_time.to_rfc3339(),
            event.branch_name.clone(),
            event.staff_ids.join(";"),
            event.conflicts_with.join(";"),
        ]));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Multi-section report artifact. The crate builds the structure and a
/// plain-text rendering; producing the final PDF bytes is the renderer's
/// job, not ours.
#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub organization: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
    pub footer: String,
}

#[derive(Debug, Clone)]
pub struct ReportSection {
    pub heading: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Report {
    pub fn new(
        title: impl Into<String>,
        organization: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let organization = organization.into();
        Self {
            title: title.into(),
            footer: format!("{} - generated by careflow", organization),
            organization,
            generated_at,
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{}\n{}\nGenerated {}\n\n",
            self.title,
            self.organization,
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        for (idx, section) in self.sections.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, section.heading));
            out.push_str(&section.columns.join(" | "));
            out.push('\n');
            for row in &section.rows {
                out.push_str(&row.join(" | "));
                out.push('\n');
            }
            out.push('\n');
        }
        out.push_str(&self.footer);
        out.push('\n');
        out
    }
}

/// The standard schedule report: one section per branch, conflicts last.
pub fn schedule_report(
    title: &str,
    organization: &str,
    generated_at: DateTime<Utc>,
    events: &[CalendarEvent],
) -> Report {
    let mut report = Report::new(title, organization, generated_at);

    let mut branches: Vec<String> = events.iter().map(|e| e.branch_name.clone()).collect();
    branches.sort();
    branches.dedup();

    for branch in branches {
        let rows: Vec<Vec<String>> = events
            .iter()
            .filter(|e| e.branch_name == branch)
            .map(|e| {
                vec![
                    e.title.clone(),
                    e.start_time.format("%Y-%m-%d %H:%M").to_string(),
                    e.end_time.format("%H:%M").to_string(),
                    e.staff_ids.join(", "),
                ]
            })
            .collect();
        report.add_section(ReportSection {
            heading: branch,
            columns: vec![
                "Event".to_string(),
                "Start".to_string(),
                "End".to_string(),
                "Staff".to_string(),
            ],
            rows,
        });
    }

    let conflict_rows: Vec<Vec<String>> = events
        .iter()
        .filter(|e| !e.conflicts_with.is_empty())
        .map(|e| vec![e.id.clone(), e.title.clone(), e.conflicts_with.join(", ")])
        .collect();
    if !conflict_rows.is_empty() {
        report.add_section(ReportSection {
            heading: "Schedule conflicts".to_string(),
            columns: vec!["Event id".to_string(), "Title".to_string(), "Conflicts with".to_string()],
            rows: conflict_rows,
        });
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::{EventKind, EventStatus, Priority};
    use chrono::TimeZone;

    #[test]
    fn plain_fields_are_not_quoted() {
        assert_eq!(csv_line(&["a".to_string(), "b".to_string()]), "a,b");
    }

    #[test]
    fn embedded_comma_quotes_the_field() {
        assert_eq!(
            csv_line(&["Smith, John".to_string(), "ok".to_string()]),
            "\"Smith, John\",ok"
        );
    }

    #[test]
    fn embedded_quote_is_doubled() {
        assert_eq!(csv_line(&["say \"hi\"".to_string()]), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn report_renders_header_sections_footer() {
        let generated = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let event = CalendarEvent {
            id: "e1".to_string(),
            kind: EventKind::Booking,
            title: "Morning visit".to_string(),
            start_time: generated,
            end_time: generated,
            status: EventStatus::Scheduled,
            branch_id: "b1".to_string(),
            branch_name: "North".to_string(),
            participants: Vec::new(),
            location: None,
            priority: Priority::Medium,
            client_id: None,
            staff_ids: vec!["s1".to_string()],
            conflicts_with: vec!["e2".to_string()],
        };
        let report = schedule_report("Weekly schedule", "Harbour Care", generated, &[event]);
        let text = report.render_text();
        assert!(text.starts_with("Weekly schedule\nHarbour Care\n"));
        assert!(text.contains("1. North"));
        assert!(text.contains("Schedule conflicts"));
        assert!(text.trim_end().ends_with("generated by careflow"));
    }
}
