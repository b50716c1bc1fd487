use std::sync::Once;

use pretty_assertions::assert_eq;
use scanwatch_core::{
    update, AppState, Effect, FetchPurpose, Finding, HistoryEntry, Msg, Phase, ScanForm,
    StatusUpdate,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(scan_logging::initialize_for_tests);
}

fn entry(scan_id: &str, phase: Phase) -> HistoryEntry {
    HistoryEntry {
        scan_id: scan_id.to_string(),
        target: "192.168.1.0/24".to_string(),
        phase,
        start_time: "2024-05-01T10:00:00.123456".to_string(),
    }
}

fn select(state: AppState, scan_id: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::HistorySelected {
            scan_id: scan_id.to_string(),
        },
    )
}

fn inspected(
    state: AppState,
    scan_id: &str,
    result: Result<StatusUpdate, String>,
) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusFetched {
            scan_id: scan_id.to_string(),
            purpose: FetchPurpose::Inspect,
            result,
        },
    )
}

#[test]
fn refresh_replaces_rows_and_failure_keeps_them() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::HistoryRefreshRequested);
    assert_eq!(effects, vec![Effect::RefreshHistory { request_id: 1 }]);
    assert!(state.view().history_refreshing);

    let (state, _) = update(
        state,
        Msg::HistoryLoaded {
            request_id: 1,
            result: Ok(vec![entry("a", Phase::Completed), entry("b", Phase::Error)]),
        },
    );
    let view = state.view();
    assert!(!view.history_refreshing);
    assert_eq!(view.history.len(), 2);
    assert_eq!(view.history[1].phase, Phase::Error);

    let (state, _) = update(state, Msg::HistoryRefreshRequested);
    let (state, effects) = update(
        state,
        Msg::HistoryLoaded {
            request_id: 2,
            result: Err("network error".to_string()),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().history.len(), 2);
    assert_eq!(state.history().last_error(), Some("network error"));
    // A failed refresh is not a scan error.
    assert!(state.view().status.is_none());
}

#[test]
fn inspecting_finished_scan_seeds_model_without_observing() {
    init_logging();
    let (state, effects) = select(AppState::new(), "20240501_100000");
    assert_eq!(
        effects,
        vec![Effect::FetchStatus {
            scan_id: "20240501_100000".to_string(),
            purpose: FetchPurpose::Inspect
        }]
    );
    assert_eq!(state.view().inspecting.as_deref(), Some("20240501_100000"));

    let findings = vec![Finding {
        address: "10.0.0.1".to_string(),
        port: 22,
        protocol: "tcp".to_string(),
        discovered_at: "1714557600".to_string(),
    }];
    let (state, effects) = inspected(
        state,
        "20240501_100000",
        Ok(StatusUpdate::new("20240501_100000", Phase::Completed).with_results(findings.clone())),
    );
    assert!(effects.is_empty());
    assert_eq!(state.status().scan_id(), Some("20240501_100000"));
    assert_eq!(state.status().phase(), Some(Phase::Completed));
    assert_eq!(state.status().results(), Some(findings.as_slice()));
    assert!(!state.poll().is_active());
    assert!(state.is_settled());
}

#[test]
fn inspecting_live_scan_resumes_observation() {
    init_logging();
    let (state, _) = select(AppState::new(), "live");
    let (state, effects) = inspected(state, "live", Ok(StatusUpdate::new("live", Phase::Running)));

    assert_eq!(
        effects,
        vec![
            Effect::Observe {
                scan_id: "live".to_string()
            },
            Effect::SchedulePoll {
                scan_id: "live".to_string(),
                generation: 1
            },
        ]
    );
    assert_eq!(state.status().phase(), Some(Phase::Running));

    let (state, _) = update(
        state,
        Msg::PushReceived(StatusUpdate::new("live", Phase::Completed)),
    );
    assert_eq!(state.status().phase(), Some(Phase::Completed));
}

#[test]
fn inspecting_replaces_current_observation() {
    init_logging();
    let (state, _) = update(
        AppState::new(),
        Msg::SubmitRequested(ScanForm::new("10.0.0.0/30", "80", "1000")),
    );
    let (state, _) = update(
        state,
        Msg::SubmitAccepted {
            request_id: 1,
            scan_id: "abc123".to_string(),
        },
    );

    let (state, _) = select(state, "old");
    // Until the detail arrives the current scan is still observed.
    assert_eq!(state.status().scan_id(), Some("abc123"));
    assert!(state.poll().is_active());

    let (state, effects) = inspected(
        state,
        "old",
        Ok(StatusUpdate::new("old", Phase::Error).with_error("Masscan error: permission denied")),
    );
    assert_eq!(effects, vec![Effect::StopObserving]);
    assert!(!state.poll().is_active());

    let revision = state.status().revision();
    let (state, _) = update(
        state,
        Msg::PushReceived(StatusUpdate::new("abc123", Phase::Completed)),
    );
    assert_eq!(state.status().revision(), revision);
    let status = state.view().status.expect("status view");
    assert_eq!(
        status.error_text.as_deref(),
        Some("Masscan error: permission denied")
    );
}

#[test]
fn failed_inspect_leaves_model_and_sets_notice() {
    init_logging();
    let (state, _) = select(AppState::new(), "missing");
    let (state, effects) = inspected(state, "missing", Err("Scan missing not found".to_string()));

    assert!(effects.is_empty());
    assert!(state.view().status.is_none());
    assert_eq!(
        state.notice(),
        Some("Could not load scan missing: Scan missing not found")
    );
}

#[test]
fn only_latest_selection_is_applied() {
    init_logging();
    let (state, _) = select(AppState::new(), "first");
    let (state, _) = select(state, "second");

    let (state, effects) = inspected(state, "first", Ok(StatusUpdate::new("first", Phase::Running)));
    assert!(effects.is_empty());
    assert!(state.view().status.is_none());

    let (state, _) = inspected(state, "second", Ok(StatusUpdate::new("second", Phase::Completed)));
    assert_eq!(state.status().scan_id(), Some("second"));
}

fn observing(scan_id: &str) -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::SubmitRequested(ScanForm::new("10.0.0.0/30", "80,443", "1000")),
    );
    let (state, _) = update(
        state,
        Msg::SubmitAccepted {
            request_id: 1,
            scan_id: scan_id.to_string(),
        },
    );
    state
}

#[test]
fn late_inspect_of_observed_scan_cannot_undo_completion() {
    init_logging();
    let (state, _) = select(observing("abc123"), "abc123");
    let (state, effects) = update(
        state,
        Msg::PushReceived(StatusUpdate::new("abc123", Phase::Completed)),
    );
    assert_eq!(effects.len(), 3);
    let revision = state.status().revision();

    // Snapshot taken before the push, answered after it.
    let (state, effects) = inspected(state, "abc123", Ok(StatusUpdate::new("abc123", Phase::Running)));
    assert!(effects.is_empty());
    assert_eq!(state.status().phase(), Some(Phase::Completed));
    assert_eq!(state.status().revision(), revision);
    assert!(!state.poll().is_active());
    assert!(state.is_awaiting_details());
    assert_eq!(state.pending_inspect(), None);
}

#[test]
fn inspecting_observed_live_scan_keeps_its_poll_schedule() {
    init_logging();
    let (state, _) = select(observing("abc123"), "abc123");
    let (state, effects) = inspected(state, "abc123", Ok(StatusUpdate::new("abc123", Phase::Running)));

    assert!(effects.is_empty());
    assert_eq!(state.status().phase(), Some(Phase::Running));
    assert_eq!(state.poll().generation(), 1);

    let (_, effects) = update(
        state,
        Msg::PollDue {
            scan_id: "abc123".to_string(),
            generation: 1,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchStatus {
            scan_id: "abc123".to_string(),
            purpose: FetchPurpose::Poll { generation: 1 }
        }]
    );
}

#[test]
fn returning_to_a_scan_waits_for_its_unanswered_poll() {
    init_logging();
    let (state, effects) = update(
        observing("abc123"),
        Msg::PollDue {
            scan_id: "abc123".to_string(),
            generation: 1,
        },
    );
    assert_eq!(effects.len(), 1);

    // Look at another live scan, then come back while poll 1 is in flight.
    let (state, _) = select(state, "other");
    let (state, _) = inspected(state, "other", Ok(StatusUpdate::new("other", Phase::Running)));
    let (state, _) = select(state, "abc123");
    let (state, effects) = inspected(state, "abc123", Ok(StatusUpdate::new("abc123", Phase::Running)));
    assert_eq!(
        effects,
        vec![
            Effect::StopObserving,
            Effect::Observe {
                scan_id: "abc123".to_string()
            },
        ]
    );
    assert_eq!(state.poll().generation(), 3);
    assert!(state.poll().is_active());

    let (state, effects) = update(
        state,
        Msg::PollDue {
            scan_id: "abc123".to_string(),
            generation: 3,
        },
    );
    assert!(effects.is_empty(), "second request while poll 1 is unanswered");

    let (state, effects) = update(
        state,
        Msg::StatusFetched {
            scan_id: "abc123".to_string(),
            purpose: FetchPurpose::Poll { generation: 1 },
            result: Ok(StatusUpdate::new("abc123", Phase::Running)),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SchedulePoll {
            scan_id: "abc123".to_string(),
            generation: 3
        }]
    );

    let (_, effects) = update(
        state,
        Msg::PollDue {
            scan_id: "abc123".to_string(),
            generation: 3,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::FetchStatus {
            scan_id: "abc123".to_string(),
            purpose: FetchPurpose::Poll { generation: 3 }
        }]
    );
}
