use crate::{ScanId, ScanRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Issue `POST /start_scan`; answer with `SubmitAccepted`/`SubmitFailed`.
    SubmitScan { request_id: u64, request: ScanRequest },
    /// Point the push filter at `scan_id` and drop any previous poll timer.
    Observe { scan_id: ScanId },
    /// Cancel the pending poll timer, keeping the push filter.
    StopPolling,
    /// Cancel the poll timer and clear the push filter.
    StopObserving,
    /// Arm the poll timer; when it fires send `PollDue` with the same values.
    SchedulePoll { scan_id: ScanId, generation: u64 },
    /// Issue `GET /scan_status/{scan_id}`; answer with `StatusFetched`.
    FetchStatus {
        scan_id: ScanId,
        purpose: FetchPurpose,
    },
    /// Issue `GET /recent_scans`; answer with `HistoryLoaded`.
    RefreshHistory { request_id: u64 },
}

/// Why a status fetch was issued; decides how its answer is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    /// Answer to the poll issued under `generation`.
    Poll { generation: u64 },
    Details,
    Inspect,
}
