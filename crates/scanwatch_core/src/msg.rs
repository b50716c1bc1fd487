use crate::{FetchPurpose, HistoryEntry, ScanForm, ScanId, StatusUpdate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted the scan form.
    SubmitRequested(ScanForm),
    /// The service accepted a submission and assigned a scan id.
    SubmitAccepted { request_id: u64, scan_id: ScanId },
    /// The service rejected a submission, or it never reached the service.
    SubmitFailed { request_id: u64, message: String },
    /// A decoded push event.
    PushReceived(StatusUpdate),
    /// The poll timer armed by `Effect::SchedulePoll` fired.
    PollDue { scan_id: ScanId, generation: u64 },
    /// A status fetch finished. `Err` carries a transport or service message.
    StatusFetched {
        scan_id: ScanId,
        purpose: FetchPurpose,
        result: Result<StatusUpdate, String>,
    },
    /// User asked for a fresh history list.
    HistoryRefreshRequested,
    /// A history fetch finished.
    HistoryLoaded {
        request_id: u64,
        result: Result<Vec<HistoryEntry>, String>,
    },
    /// User picked a past scan to inspect.
    HistorySelected { scan_id: ScanId },
    /// Render tick.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
