use std::time::Duration;

use scan_logging::{observed_scan_label, scan_debug, scan_warn};
use scanwatch_client::{
    ClientCommand, ClientError, ClientEvent, ClientHandle, ClientSettings, FailureKind,
    FetchError, RecentScan, ScanResult, ScanState, ScanStatus, ScanUpdateEvent, StartScan,
    StatusTag,
};
use scanwatch_core::{Effect, FetchPurpose, Finding, HistoryEntry, Msg, Phase, StatusUpdate};

/// Carries core effects out on the client runtime and turns its events back
/// into core messages.
pub struct EffectRunner {
    client: ClientHandle,
}

impl EffectRunner {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        Ok(Self {
            client: ClientHandle::new(settings)?,
        })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            scan_debug!("[{}] effect {:?}", observed_scan_label(), effect);
            self.client.send(command_for(effect));
        }
    }

    /// Waits up to `timeout` for the next client event.
    pub fn next_msg(&self, timeout: Duration) -> Option<Msg> {
        self.client.recv_timeout(timeout).map(msg_for)
    }
}

pub(crate) fn command_for(effect: Effect) -> ClientCommand {
    match effect {
        Effect::SubmitScan {
            request_id,
            request,
        } => ClientCommand::Submit {
            request_id,
            request: StartScan {
                ip_range: request.target,
                ports: request.ports,
                rate: request.rate,
            },
        },
        Effect::Observe { scan_id } => ClientCommand::Observe { scan_id },
        Effect::StopPolling => ClientCommand::StopPolling,
        Effect::StopObserving => ClientCommand::StopObserving,
        Effect::SchedulePoll {
            scan_id,
            generation,
        } => ClientCommand::SchedulePoll {
            scan_id,
            generation,
        },
        Effect::FetchStatus { scan_id, purpose } => ClientCommand::FetchStatus {
            scan_id,
            tag: tag_for(purpose),
        },
        Effect::RefreshHistory { request_id } => ClientCommand::FetchHistory { request_id },
    }
}

pub(crate) fn msg_for(event: ClientEvent) -> Msg {
    match event {
        ClientEvent::SubmitCompleted { request_id, result } => match result {
            Ok(scan_id) => Msg::SubmitAccepted {
                request_id,
                scan_id,
            },
            Err(err) => {
                scan_warn!("Scan submission {} failed: {}", request_id, err);
                Msg::SubmitFailed {
                    request_id,
                    message: submit_failure_message(&err),
                }
            }
        },
        ClientEvent::StatusFetched {
            scan_id,
            tag,
            result,
        } => {
            let result = match result {
                Ok(status) => Ok(status_update(&scan_id, status)),
                Err(err) => {
                    scan_warn!("[{}] Status fetch for {} failed: {}", observed_scan_label(), scan_id, err);
                    Err(err.describe())
                }
            };
            Msg::StatusFetched {
                scan_id,
                purpose: purpose_for(tag),
                result,
            }
        }
        ClientEvent::HistoryFetched { request_id, result } => Msg::HistoryLoaded {
            request_id,
            result: result
                .map(|rows| rows.into_iter().map(history_entry).collect())
                .map_err(|err| err.describe()),
        },
        ClientEvent::PushUpdate(update) => Msg::PushReceived(push_update(update)),
        ClientEvent::PollDue {
            scan_id,
            generation,
        } => Msg::PollDue {
            scan_id,
            generation,
        },
    }
}

/// The service's own message for rejected submissions; a prefixed
/// description when the request never got an answer.
fn submit_failure_message(err: &FetchError) -> String {
    match err.kind {
        FailureKind::HttpStatus(_) => err.describe(),
        _ => format!("Failed to start scan: {err}"),
    }
}

fn tag_for(purpose: FetchPurpose) -> StatusTag {
    match purpose {
        FetchPurpose::Poll { generation } => StatusTag::Poll { generation },
        FetchPurpose::Details => StatusTag::Details,
        FetchPurpose::Inspect => StatusTag::Inspect,
    }
}

fn purpose_for(tag: StatusTag) -> FetchPurpose {
    match tag {
        StatusTag::Poll { generation } => FetchPurpose::Poll { generation },
        StatusTag::Details => FetchPurpose::Details,
        StatusTag::Inspect => FetchPurpose::Inspect,
    }
}

fn map_phase(state: ScanState) -> Phase {
    match state {
        ScanState::Starting => Phase::Starting,
        ScanState::Running => Phase::Running,
        ScanState::Completed => Phase::Completed,
        ScanState::Error => Phase::Error,
    }
}

fn status_update(scan_id: &str, status: ScanStatus) -> StatusUpdate {
    StatusUpdate {
        scan_id: scan_id.to_string(),
        phase: map_phase(status.status),
        error: status.error,
        results: status
            .results
            .map(|results| results.into_iter().filter_map(finding).collect()),
    }
}

/// Only the first port entry of a result becomes a row.
fn finding(result: ScanResult) -> Option<Finding> {
    let first = result.ports.into_iter().next()?;
    Some(Finding {
        address: result.ip,
        port: first.port,
        protocol: first.proto,
        discovered_at: result.timestamp,
    })
}

fn push_update(update: ScanUpdateEvent) -> StatusUpdate {
    StatusUpdate {
        scan_id: update.scan_id,
        phase: map_phase(update.status),
        error: update.error,
        results: None,
    }
}

fn history_entry(row: RecentScan) -> HistoryEntry {
    HistoryEntry {
        scan_id: row.scan_id,
        target: row.ip_range,
        phase: map_phase(row.status),
        start_time: row.start_time.unwrap_or_default(),
    }
}
