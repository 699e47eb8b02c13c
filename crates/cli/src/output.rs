//! Outcome rendering

use anyhow::Result;
use colored::Colorize;
use falqueue_core::domain::{JobOutcome, JobStatus, LogEntry};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&LogEntry> for LogRow {
    fn from(entry: &LogEntry) -> Self {
        Self {
            timestamp: entry.timestamp.clone().unwrap_or_default(),
            level: entry.level.clone().unwrap_or_default(),
            message: entry.message.clone(),
        }
    }
}

/// Pretty JSON on stdout
pub fn print_outcome(outcome: &JobOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

/// One-line colored summary on stderr
pub fn print_summary(outcome: &JobOutcome) {
    let label = match outcome.status() {
        Some(status @ JobStatus::Completed) => status.as_str().green().bold(),
        Some(status @ JobStatus::Error) => status.as_str().red().bold(),
        Some(status) => status.as_str().yellow().bold(),
        None => "ACCEPTED".cyan().bold(),
    };

    let mut line = label.to_string();
    if let Some(request_id) = outcome.request_id() {
        line.push_str(&format!(" request_id={}", request_id));
    }
    if let Some(position) = outcome.queue_position() {
        line.push_str(&format!(" queue_position={}", position));
    }
    if let Some(error) = outcome.error() {
        line.push_str(&format!(" error={}", error));
    }
    eprintln!("{}", line);
}

/// Log lines as a table on stderr
pub fn print_logs(outcome: &JobOutcome) {
    let rows: Vec<LogRow> = match outcome.logs() {
        Some(logs) if !logs.is_empty() => logs.iter().map(LogRow::from).collect(),
        _ => return,
    };
    eprintln!("{}", Table::new(rows));
}
