use crate::effect::Effect;
use crate::history::HistoryCache;
use crate::phase::Phase;
use crate::poll::PollLoop;

/// Opaque scan identifier assigned by the scanning service.
pub type ScanId = String;

/// One open service observed by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub address: String,
    pub port: u16,
    pub protocol: String,
    /// Raw service timestamp; formatting is left to the renderer.
    pub discovered_at: String,
}

/// Read-only summary row of a past scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub scan_id: ScanId,
    pub target: String,
    pub phase: Phase,
    pub start_time: String,
}

/// Which channel produced a candidate update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    Push,
    Poll,
    Details,
}

/// A candidate status update for one scan, as decoded from either channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub scan_id: ScanId,
    pub phase: Phase,
    pub error: Option<String>,
    pub results: Option<Vec<Finding>>,
}

impl StatusUpdate {
    pub fn new(scan_id: impl Into<ScanId>, phase: Phase) -> Self {
        Self {
            scan_id: scan_id.into(),
            phase,
            error: None,
            results: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_results(mut self, results: Vec<Finding>) -> Self {
        self.results = Some(results);
        self
    }
}

/// The authoritative view of the scan currently being observed.
///
/// Mutated only by the reconciler and by the explicit seeding operations
/// (submission, inspection). `revision` grows on every accepted change and is
/// never reset, even when a different scan is seeded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusModel {
    pub(crate) scan_id: Option<ScanId>,
    pub(crate) phase: Option<Phase>,
    pub(crate) error_message: Option<String>,
    pub(crate) results: Option<Vec<Finding>>,
    pub(crate) revision: u64,
}

impl StatusModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model observing `scan_id` in the `Starting` phase.
    pub fn observing(scan_id: impl Into<ScanId>) -> Self {
        let mut model = Self::new();
        model.seed(scan_id.into(), Phase::Starting);
        model
    }

    pub fn scan_id(&self) -> Option<&str> {
        self.scan_id.as_deref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn results(&self) -> Option<&[Finding]> {
        self.results.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_some_and(Phase::is_terminal)
    }

    pub(crate) fn seed(&mut self, scan_id: ScanId, phase: Phase) {
        self.scan_id = Some(scan_id);
        self.phase = Some(phase);
        self.error_message = None;
        self.results = None;
        self.revision += 1;
    }

    /// Seeds from a one-shot detail snapshot, keeping the data invariants:
    /// results only on `Completed`, an error message only on `Error`.
    pub(crate) fn seed_snapshot(&mut self, update: StatusUpdate) {
        self.seed(update.scan_id, update.phase);
        match update.phase {
            Phase::Completed => self.results = update.results,
            Phase::Error => self.error_message = non_empty(update.error),
            Phase::Starting | Phase::Running => {}
        }
    }

    /// No scan is observed while a submission is in flight.
    pub(crate) fn begin_submission(&mut self) {
        self.scan_id = None;
        self.phase = Some(Phase::Starting);
        self.error_message = None;
        self.results = None;
        self.revision += 1;
    }

    pub(crate) fn fail_submission(&mut self, message: String) {
        self.scan_id = None;
        self.phase = Some(Phase::Error);
        self.error_message = Some(message);
        self.results = None;
        self.revision += 1;
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) status: StatusModel,
    pub(crate) poll: PollLoop,
    pub(crate) history: HistoryCache,
    pub(crate) submit_seq: u64,
    pub(crate) pending_submit: Option<u64>,
    pub(crate) pending_inspect: Option<ScanId>,
    pub(crate) awaiting_details: bool,
    pub(crate) notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &StatusModel {
        &self.status
    }

    pub fn poll(&self) -> &PollLoop {
        &self.poll
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn is_submitting(&self) -> bool {
        self.pending_submit.is_some()
    }

    pub fn is_awaiting_details(&self) -> bool {
        self.awaiting_details
    }

    pub fn pending_inspect(&self) -> Option<&str> {
        self.pending_inspect.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// True once nothing is in flight for the observed scan: no submission,
    /// no inspection, no polling and no outstanding details fetch.
    pub fn is_settled(&self) -> bool {
        self.pending_submit.is_none()
            && self.pending_inspect.is_none()
            && !self.awaiting_details
            && !self.poll.is_active()
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns whether anything changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Stops observing the current scan, if any. Returns the effect that
    /// cancels the runtime side of the observation.
    pub(crate) fn release_observation(&mut self) -> Option<Effect> {
        let was_observing = self.status.scan_id.is_some() || self.poll.is_active();
        self.poll.stop();
        self.awaiting_details = false;
        was_observing.then_some(Effect::StopObserving)
    }

    /// Starts observing `scan_id` on both channels.
    pub(crate) fn begin_observation(&mut self, scan_id: &str) -> Vec<Effect> {
        let mut effects = vec![Effect::Observe {
            scan_id: scan_id.to_string(),
        }];
        effects.extend(self.poll.observe(scan_id.to_string()));
        effects
    }
}
