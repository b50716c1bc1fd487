use crate::{AppState, Finding, HistoryEntry, Phase, ScanId, StatusModel};

/// Masscan only reports open ports, so every finding row shows this state.
pub const FINDING_STATE_OPEN: &str = "open";

const GENERIC_SCAN_ERROR: &str = "Scan failed";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    /// `None` until something is submitted or inspected.
    pub status: Option<StatusView>,
    pub history: Vec<HistoryRowView>,
    pub history_refreshing: bool,
    pub submitting: bool,
    pub inspecting: Option<ScanId>,
    pub awaiting_details: bool,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub scan_id: Option<ScanId>,
    pub phase: Phase,
    pub progress_percent: u8,
    pub error_text: Option<String>,
    pub findings: Vec<FindingRowView>,
    pub revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingRowView {
    pub address: String,
    pub port: u16,
    pub protocol: String,
    pub state: &'static str,
    pub discovered_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub scan_id: ScanId,
    pub target: String,
    pub phase: Phase,
    pub start_time: String,
}

impl AppState {
    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            status: status_view(&self.status),
            history: self.history.entries().iter().map(history_row).collect(),
            history_refreshing: self.history.is_refreshing(),
            submitting: self.pending_submit.is_some(),
            inspecting: self.pending_inspect.clone(),
            awaiting_details: self.awaiting_details,
            notice: self.notice.clone(),
        }
    }
}

fn status_view(model: &StatusModel) -> Option<StatusView> {
    let phase = model.phase()?;
    let error_text = (phase == Phase::Error).then(|| {
        model
            .error_message()
            .unwrap_or(GENERIC_SCAN_ERROR)
            .to_string()
    });
    let findings = match (phase, model.results()) {
        (Phase::Completed, Some(results)) => results.iter().map(finding_row).collect(),
        _ => Vec::new(),
    };
    Some(StatusView {
        scan_id: model.scan_id().map(ToOwned::to_owned),
        phase,
        progress_percent: progress_percent(phase),
        error_text,
        findings,
        revision: model.revision(),
    })
}

fn progress_percent(phase: Phase) -> u8 {
    match phase {
        Phase::Starting => 10,
        Phase::Running => 50,
        Phase::Completed | Phase::Error => 100,
    }
}

fn finding_row(finding: &Finding) -> FindingRowView {
    FindingRowView {
        address: finding.address.clone(),
        port: finding.port,
        protocol: finding.protocol.clone(),
        state: FINDING_STATE_OPEN,
        discovered_at: finding.discovered_at.clone(),
    }
}

fn history_row(entry: &HistoryEntry) -> HistoryRowView {
    HistoryRowView {
        scan_id: entry.scan_id.clone(),
        target: entry.target.clone(),
        phase: entry.phase,
        start_time: entry.start_time.clone(),
    }
}
