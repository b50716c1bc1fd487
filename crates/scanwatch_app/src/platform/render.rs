use chrono::{DateTime, NaiveDateTime, Utc};
use scanwatch_core::{AppViewModel, FindingRowView, HistoryRowView, Phase, StatusView};

const BAR_WIDTH: usize = 20;
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which sections of the view the current command shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub status: bool,
    pub history: bool,
}

/// Renders the view model as terminal lines.
pub fn render(view: &AppViewModel, options: RenderOptions) -> Vec<String> {
    let mut lines = Vec::new();

    if options.status {
        if view.submitting {
            lines.push("Submitting scan...".to_string());
        }
        if let Some(scan_id) = &view.inspecting {
            lines.push(format!("Loading scan {scan_id}..."));
        }
        if let Some(status) = &view.status {
            lines.extend(status_lines(status, view.awaiting_details));
        }
    }

    if let Some(notice) = &view.notice {
        lines.push(format!("Note: {notice}"));
    }

    if options.history {
        lines.extend(history_lines(&view.history, view.history_refreshing));
    }

    lines
}

fn status_lines(status: &StatusView, awaiting_details: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let heading = match &status.scan_id {
        Some(scan_id) => format!("Scan {scan_id}"),
        None => "Scan".to_string(),
    };
    lines.push(format!(
        "{heading}: {} {}",
        progress_bar(status.progress_percent),
        phase_label(status.phase)
    ));

    match status.phase {
        Phase::Starting | Phase::Running => {}
        Phase::Completed if status.findings.is_empty() => {
            lines.push(if awaiting_details {
                "Loading results...".to_string()
            } else {
                "No open ports found.".to_string()
            });
        }
        Phase::Completed => {
            lines.push("IP, Port, Protocol, State, Timestamp".to_string());
            lines.extend(status.findings.iter().map(finding_line));
        }
        Phase::Error => {
            if let Some(error) = &status.error_text {
                lines.push(format!("Error: {error}"));
            }
        }
    }
    lines
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Starting => "Starting scan...",
        Phase::Running => "Scanning...",
        Phase::Completed => "Scan completed",
        Phase::Error => "Scan failed",
    }
}

fn progress_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn finding_line(row: &FindingRowView) -> String {
    format!(
        "{}, {}, {}, {}, {}",
        row.address,
        row.port,
        row.protocol,
        row.state,
        format_timestamp(&row.discovered_at)
    )
}

fn history_lines(rows: &[HistoryRowView], refreshing: bool) -> Vec<String> {
    if rows.is_empty() {
        let empty = if refreshing {
            "Loading recent scans..."
        } else {
            "No recent scans."
        };
        return vec![empty.to_string()];
    }
    let mut lines = vec![format!(
        "{:<20} {:<20} {:<10} {}",
        "SCAN ID", "TARGET", "STATUS", "STARTED"
    )];
    lines.extend(rows.iter().map(|row| {
        let started = if row.start_time.is_empty() {
            "-".to_string()
        } else {
            format_timestamp(&row.start_time)
        };
        format!(
            "{:<20} {:<20} {:<10} {}",
            row.scan_id,
            row.target,
            row.phase.as_str(),
            started
        )
    }));
    lines
}

/// Formats a service timestamp as UTC wall-clock time.
///
/// Accepts epoch seconds (integer or fractional), RFC 3339, and naive ISO
/// 8601 (taken as UTC). Anything else is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    let text = raw.trim();
    parse_timestamp(text)
        .map(|moment| moment.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(seconds) = text.parse::<i64>() {
        return DateTime::from_timestamp(seconds, 0);
    }
    if let Ok(seconds) = text.parse::<f64>() {
        if seconds.is_finite() {
            return DateTime::from_timestamp(seconds.floor() as i64, 0);
        }
        return None;
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
