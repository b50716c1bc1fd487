use scan_logging::{scan_debug, scan_warn};

use crate::{Effect, HistoryEntry};

/// Last successfully fetched list of past scans.
///
/// Each refresh replaces the whole snapshot. A failed refresh keeps the
/// previous snapshot; a response older than one already applied is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryCache {
    entries: Vec<HistoryEntry>,
    requested: u64,
    settled: u64,
    last_error: Option<String>,
}

impl HistoryCache {
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_refreshing(&self) -> bool {
        self.requested > self.settled
    }

    /// Message of the most recent failed refresh, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn begin_refresh(&mut self) -> Effect {
        self.requested += 1;
        Effect::RefreshHistory {
            request_id: self.requested,
        }
    }

    /// Applies a refresh response. Returns whether the visible state changed.
    pub(crate) fn apply(
        &mut self,
        request_id: u64,
        result: Result<Vec<HistoryEntry>, String>,
    ) -> bool {
        if request_id <= self.settled || request_id > self.requested {
            scan_debug!(
                "Dropping history response request_id={} settled={} requested={}",
                request_id,
                self.settled,
                self.requested
            );
            return false;
        }
        self.settled = request_id;
        match result {
            Ok(entries) => {
                self.entries = entries;
                self.last_error = None;
            }
            Err(message) => {
                scan_warn!(
                    "History refresh failed, keeping {} cached entries: {}",
                    self.entries.len(),
                    message
                );
                self.last_error = Some(message);
            }
        }
        true
    }
}
