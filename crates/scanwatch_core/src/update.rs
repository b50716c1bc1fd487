use scan_logging::{scan_debug, scan_info, scan_warn};

use crate::{
    reconcile, AppState, Effect, FetchPurpose, Msg, Phase, ScanForm, StatusUpdate, UpdateSource,
    Verdict,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SubmitRequested(form) => submit(&mut state, &form),
        Msg::SubmitAccepted {
            request_id,
            scan_id,
        } => {
            if state.pending_submit != Some(request_id) {
                scan_debug!(
                    "Ignoring superseded submission request_id={} scan_id={}",
                    request_id,
                    scan_id
                );
                return (state, Vec::new());
            }
            state.pending_submit = None;
            scan_info!("Scan {} accepted, observing", scan_id);
            state.status.seed(scan_id.clone(), Phase::Starting);
            state.mark_dirty();
            let mut effects = state.begin_observation(&scan_id);
            effects.push(state.history.begin_refresh());
            effects
        }
        Msg::SubmitFailed {
            request_id,
            message,
        } => {
            if state.pending_submit != Some(request_id) {
                return (state, Vec::new());
            }
            state.pending_submit = None;
            scan_warn!("Scan submission failed: {}", message);
            state.status.fail_submission(message);
            state.mark_dirty();
            Vec::new()
        }
        Msg::PushReceived(candidate) => apply_candidate(&mut state, candidate, UpdateSource::Push),
        Msg::PollDue {
            scan_id,
            generation,
        } => state.poll.tick(&scan_id, generation).into_iter().collect(),
        Msg::StatusFetched {
            scan_id,
            purpose,
            result,
        } => match purpose {
            FetchPurpose::Poll { generation } => {
                poll_response(&mut state, scan_id, generation, result)
            }
            FetchPurpose::Details => details_response(&mut state, scan_id, result),
            FetchPurpose::Inspect => inspect_response(&mut state, scan_id, result),
        },
        Msg::HistoryRefreshRequested => {
            state.mark_dirty();
            vec![state.history.begin_refresh()]
        }
        Msg::HistoryLoaded { request_id, result } => {
            if state.history.apply(request_id, result) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::HistorySelected { scan_id } => {
            state.pending_inspect = Some(scan_id.clone());
            state.notice = None;
            state.mark_dirty();
            vec![Effect::FetchStatus {
                scan_id,
                purpose: FetchPurpose::Inspect,
            }]
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState, form: &ScanForm) -> Vec<Effect> {
    let mut effects: Vec<Effect> = state.release_observation().into_iter().collect();
    state.pending_inspect = None;
    state.notice = None;
    state.mark_dirty();

    match form.to_request() {
        Ok(request) => {
            state.submit_seq += 1;
            state.pending_submit = Some(state.submit_seq);
            state.status.begin_submission();
            effects.push(Effect::SubmitScan {
                request_id: state.submit_seq,
                request,
            });
        }
        Err(message) => {
            scan_warn!("Scan form rejected: {}", message);
            state.pending_submit = None;
            state.status.fail_submission(message);
        }
    }
    effects
}

/// Runs a candidate through the reconciler and derives follow-up effects.
fn apply_candidate(
    state: &mut AppState,
    candidate: StatusUpdate,
    source: UpdateSource,
) -> Vec<Effect> {
    let scan_id = candidate.scan_id.clone();
    let phase = candidate.phase;
    match reconcile(&mut state.status, candidate) {
        Verdict::Applied { reached_terminal } => {
            scan_info!(
                "Scan {} -> {} via {:?} (revision {})",
                scan_id,
                phase,
                source,
                state.status.revision()
            );
            state.mark_dirty();
            if !reached_terminal {
                return Vec::new();
            }
            state.poll.stop();
            state.awaiting_details = true;
            vec![
                Effect::StopPolling,
                Effect::FetchStatus {
                    scan_id,
                    purpose: FetchPurpose::Details,
                },
                state.history.begin_refresh(),
            ]
        }
        Verdict::Rejected(reason) => {
            scan_debug!(
                "Rejected {} update for scan {} via {:?}: {}",
                phase,
                scan_id,
                source,
                reason
            );
            Vec::new()
        }
    }
}

fn poll_response(
    state: &mut AppState,
    scan_id: String,
    generation: u64,
    result: Result<StatusUpdate, String>,
) -> Vec<Effect> {
    if !state.poll.settle(&scan_id, generation) {
        // Late answer from a loop that was stopped or replaced. Its payload
        // still goes through the reconciler; its failure concerns nobody.
        return match result {
            Ok(candidate) => apply_candidate(state, candidate, UpdateSource::Poll),
            Err(message) => {
                scan_debug!("Dropping stale poll failure for {}: {}", scan_id, message);
                Vec::new()
            }
        };
    }

    let candidate = result.unwrap_or_else(|message| {
        scan_warn!("Poll for scan {} failed: {}", scan_id, message);
        StatusUpdate::new(scan_id.clone(), Phase::Error).with_error(message)
    });
    let mut effects = apply_candidate(state, candidate, UpdateSource::Poll);
    if state.status.is_terminal() {
        state.poll.stop();
    } else if let Some(next) = state.poll.resume() {
        effects.push(next);
    }
    effects
}

fn details_response(
    state: &mut AppState,
    scan_id: String,
    result: Result<StatusUpdate, String>,
) -> Vec<Effect> {
    if state.status.scan_id() != Some(scan_id.as_str()) {
        return Vec::new();
    }
    state.awaiting_details = false;
    state.mark_dirty();
    match result {
        Ok(candidate) => apply_candidate(state, candidate, UpdateSource::Details),
        Err(message) => {
            scan_warn!("Details fetch for scan {} failed: {}", scan_id, message);
            state.notice = Some(format!("Could not load scan details: {message}"));
            Vec::new()
        }
    }
}

fn inspect_response(
    state: &mut AppState,
    scan_id: String,
    result: Result<StatusUpdate, String>,
) -> Vec<Effect> {
    if state.pending_inspect.as_deref() != Some(scan_id.as_str()) {
        scan_debug!("Ignoring superseded inspect response for {}", scan_id);
        return Vec::new();
    }
    state.pending_inspect = None;
    state.mark_dirty();

    let snapshot = match result {
        Ok(snapshot) => snapshot,
        Err(message) => {
            scan_warn!("Inspect of scan {} failed: {}", scan_id, message);
            state.notice = Some(format!("Could not load scan {scan_id}: {message}"));
            return Vec::new();
        }
    };

    state.notice = None;
    if state.status.scan_id() == Some(scan_id.as_str()) {
        // Already observed: the snapshot is one more candidate, and the
        // running observation stays in place.
        return apply_candidate(state, snapshot, UpdateSource::Details);
    }

    let mut effects: Vec<Effect> = state.release_observation().into_iter().collect();
    state.pending_submit = None;
    let live = !snapshot.phase.is_terminal();
    scan_info!("Inspecting scan {} ({})", scan_id, snapshot.phase);
    state.status.seed_snapshot(snapshot);
    if live {
        effects.extend(state.begin_observation(&scan_id));
    }
    effects
}
