//! CLI command implementations

use anyhow::Context;
use kino_telemetry::{
    DomainEvent, LifecycleAuditor, MemorySink, PlayerSnapshot, RawSignal, SessionSummary,
    SharedPlayerFacts, TelemetryConfig, TelemetrySession,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::output::{self, OutputFormat};

/// One line of a recorded trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum TraceEntry {
    /// A player or ad SDK callback
    Signal(RawSignal),
    /// New player facts, visible to every signal after this line
    Facts(PlayerSnapshot),
}

/// Result of replaying a trace
pub struct Replay {
    pub events: Vec<DomainEvent>,
    pub summary: SessionSummary,
}

/// Load a config file, or the defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<TelemetryConfig> {
    match path {
        Some(path) => TelemetryConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(TelemetryConfig::default()),
    }
}

/// Parse a JSON lines trace. Blank lines and `#` comments are skipped.
pub fn parse_trace(contents: &str) -> anyhow::Result<Vec<TraceEntry>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid trace entry on line {}", i + 1))
        })
        .collect()
}

fn read_trace(path: &Path) -> anyhow::Result<Vec<TraceEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    parse_trace(&contents)
}

/// Drive a trace through a live telemetry session
pub async fn run_trace(entries: Vec<TraceEntry>, config: TelemetryConfig) -> anyhow::Result<Replay> {
    let mut entries = entries.into_iter().peekable();

    // Facts recorded before the first signal describe the player at attach time
    let facts = SharedPlayerFacts::default();
    while let Some(TraceEntry::Facts(snapshot)) = entries.peek() {
        facts.set(*snapshot);
        entries.next();
    }

    let sink = Arc::new(MemorySink::new());
    let mut session = TelemetrySession::spawn(config, Arc::new(facts.clone()), sink.clone())?;
    tracing::debug!(session_id = %session.id(), "Replaying trace");

    for entry in entries {
        match entry {
            TraceEntry::Signal(signal) => session.submit(signal)?,
            TraceEntry::Facts(snapshot) => {
                // Earlier signals must see the facts that were current for them
                session.sync().await?;
                facts.set(snapshot);
            }
        }
    }

    let summary = session.release().await?;
    Ok(Replay {
        events: sink.events(),
        summary,
    })
}

/// Replay a trace and print the normalized events
pub async fn replay(path: &Path, config: TelemetryConfig, format: OutputFormat) -> anyhow::Result<()> {
    let entries = read_trace(path)?;
    let replay = run_trace(entries, config).await?;

    println!("{}", output::render_replay(&replay.events, &replay.summary, format));
    Ok(())
}

/// Replay a trace and audit the emitted events. Returns true if clean.
pub async fn audit(path: &Path, config: TelemetryConfig, format: OutputFormat) -> anyhow::Result<bool> {
    let entries = read_trace(path)?;
    let replay = run_trace(entries, config).await?;

    let mut auditor = LifecycleAuditor::new();
    for event in &replay.events {
        auditor.observe(event);
    }

    println!(
        "{}",
        output::render_violations(auditor.events_seen(), auditor.violations(), format)
    );
    Ok(auditor.is_clean())
}

pub fn print_default_config() {
    println!("{}", TelemetryConfig::default().to_json_pretty());
}
