//! Output formatting for CLI

use kino_telemetry::{DomainEvent, SessionSummary, Violation};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Seq")]
    sequence: u64,
    #[tabled(rename = "At (ms)")]
    emitted_at_ms: u64,
    #[tabled(rename = "Event")]
    name: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&DomainEvent> for EventRow {
    fn from(event: &DomainEvent) -> Self {
        Self {
            sequence: event.sequence,
            emitted_at_ms: event.emitted_at_ms,
            name: event.name(),
            detail: detail(event),
        }
    }
}

#[derive(Tabled)]
struct ViolationRow {
    #[tabled(rename = "Seq")]
    sequence: u64,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Violation")]
    kind: String,
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    summary: &'a SessionSummary,
    events: &'a [DomainEvent],
}

#[derive(Serialize)]
struct AuditReport<'a> {
    events_seen: u64,
    clean: bool,
    violations: &'a [Violation],
}

/// Event payload beyond its name, as compact JSON
fn detail(event: &DomainEvent) -> String {
    match serde_json::to_value(&event.event) {
        Ok(serde_json::Value::Object(mut map)) => {
            map.remove("event");
            if map.is_empty() {
                String::new()
            } else {
                serde_json::Value::Object(map).to_string()
            }
        }
        _ => String::new(),
    }
}

fn to_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

fn summary_text(summary: &SessionSummary) -> String {
    let mut out = String::new();
    out.push_str("\nSession Summary:\n");
    out.push_str(&format!("  Session: {}\n", summary.session_id));
    out.push_str(&format!("  Final state: {:?}\n", summary.final_state));
    out.push_str(&format!(
        "  Signals: {} received, {} suppressed, {} dropped\n",
        summary.pipeline.signals_received,
        summary.pipeline.signals_suppressed,
        summary.pipeline.signals_dropped
    ));
    out.push_str(&format!("  Events emitted: {}\n", summary.pipeline.events_emitted));
    out.push_str(&format!(
        "  Segment loads: {} started, {} completed, {} failed ({} bytes)",
        summary.segment_loads.started,
        summary.segment_loads.completed,
        summary.segment_loads.failed,
        summary.segment_loads.bytes_loaded
    ));
    if summary.segments_in_flight > 0 {
        out.push_str(&format!("\n  Segments in flight: {}", summary.segments_in_flight));
    }
    if let Some(mime) = &summary.container_mime {
        out.push_str(&format!("\n  Container: {mime}"));
    }
    if summary.restarts > 0 {
        out.push_str(&format!("\n  Restarts: {}", summary.restarts));
    }
    out
}

/// Render a replayed event stream with its session summary
pub fn render_replay(events: &[DomainEvent], summary: &SessionSummary, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&ReplayReport { summary, events }),
        OutputFormat::Table => {
            let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            format!("{table}{}", summary_text(summary))
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for event in events {
                let detail = detail(event);
                out.push_str(&format!(
                    "{:>5} {:>8}ms  {}",
                    event.sequence,
                    event.emitted_at_ms,
                    event.name()
                ));
                if !detail.is_empty() {
                    out.push_str(&format!("  {detail}"));
                }
                out.push('\n');
            }
            out.push_str(&summary_text(summary));
            out
        }
    }
}

/// Render audit results
pub fn render_violations(events_seen: u64, violations: &[Violation], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&AuditReport {
            events_seen,
            clean: violations.is_empty(),
            violations,
        }),
        _ if violations.is_empty() => format!("PASS: {events_seen} events, no violations"),
        OutputFormat::Table => {
            let rows: Vec<ViolationRow> = violations
                .iter()
                .map(|v| ViolationRow {
                    sequence: v.sequence,
                    event: v.event.clone(),
                    kind: v.kind.to_string(),
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            format!("{table}\nFAIL: {} violations in {events_seen} events", violations.len())
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for violation in violations {
                out.push_str(&format!("  {violation}\n"));
            }
            out.push_str(&format!("FAIL: {} violations in {events_seen} events", violations.len()));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kino_telemetry::{EventKind, SessionId, ViolationKind};
    use uuid::Uuid;

    fn event(sequence: u64, event: EventKind) -> DomainEvent {
        DomainEvent {
            id: Uuid::new_v4(),
            session_id: SessionId::new(),
            sequence,
            emitted_at_ms: sequence * 10,
            event,
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_violations_text() {
        let clean = render_violations(4, &[], OutputFormat::Text);
        assert_eq!(clean, "PASS: 4 events, no violations");

        let violations = vec![Violation {
            kind: ViolationKind::PlayingBeforeSeeked,
            sequence: 3,
            event: "playing".to_string(),
        }];
        let text = render_violations(4, &violations, OutputFormat::Text);
        assert!(text.contains("#3 playing"));
        assert!(text.ends_with("FAIL: 1 violations in 4 events"));
    }

    #[test]
    fn test_detail_omits_unit_events() {
        assert_eq!(detail(&event(1, EventKind::Playing)), "");
    }
}
