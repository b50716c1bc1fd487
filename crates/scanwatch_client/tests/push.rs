use std::sync::mpsc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scanwatch_client::{ClientEvent, ClientSettings, PushListener, ScanState};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = "\
: keep-alive

event: scan_update
data: {\"scan_id\":\"abc123\",\"status\":\"running\"}

event: scan_update
data: {\"scan_id\":\"zzz999\",\"status\":\"completed\"}

event: heartbeat
data: {}

event: scan_update
data: {\"scan_id\":\"abc123\",\"status\":\"completed\"}

";

fn settings_for(server: &MockServer) -> ClientSettings {
    ClientSettings {
        base_url: server.uri(),
        push_reconnect_delay: Duration::from_secs(30),
        ..ClientSettings::default()
    }
}

fn push_states(events: &mpsc::Receiver<ClientEvent>, count: usize) -> Vec<(String, ScanState)> {
    let mut seen = Vec::new();
    while seen.len() < count {
        match events.recv_timeout(Duration::from_secs(5)) {
            Ok(ClientEvent::PushUpdate(update)) => seen.push((update.scan_id, update.status)),
            Ok(other) => panic!("unexpected event {other:?}"),
            Err(_) => break,
        }
    }
    seen
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forwards_only_updates_for_the_observed_scan() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("accept", "text/event-stream"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "text/event-stream"))
        .mount(&server)
        .await;

    let (_filter_tx, filter_rx) = watch::channel(Some("abc123".to_string()));
    let (event_tx, event_rx) = mpsc::channel();
    let listener =
        PushListener::new(&settings_for(&server), "/events", filter_rx, event_tx).expect("listener");
    let cancel = CancellationToken::new();
    let task = tokio::spawn(listener.run(cancel.clone()));

    let seen = tokio::task::spawn_blocking(move || push_states(&event_rx, 2))
        .await
        .expect("collector");
    assert_eq!(
        seen,
        vec![
            ("abc123".to_string(), ScanState::Running),
            ("abc123".to_string(), ScanState::Completed),
        ]
    );

    cancel.cancel();
    task.await.expect("listener stops");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nothing_is_forwarded_while_no_scan_is_observed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let (_filter_tx, filter_rx) = watch::channel(None::<String>);
    let (event_tx, event_rx) = mpsc::channel();
    let listener =
        PushListener::new(&settings_for(&server), "/events", filter_rx, event_tx).expect("listener");
    let cancel = CancellationToken::new();
    let task = tokio::spawn(listener.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(event_rx.try_recv().is_err());

    cancel.cancel();
    task.await.expect("listener stops");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reconnects_after_the_feed_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FEED, "text/event-stream"))
        .mount(&server)
        .await;

    let settings = ClientSettings {
        push_reconnect_delay: Duration::from_millis(50),
        ..settings_for(&server)
    };
    let (_filter_tx, filter_rx) = watch::channel(Some("abc123".to_string()));
    let (event_tx, event_rx) = mpsc::channel();
    let listener = PushListener::new(&settings, "/events", filter_rx, event_tx).expect("listener");
    let cancel = CancellationToken::new();
    let task = tokio::spawn(listener.run(cancel.clone()));

    let seen = tokio::task::spawn_blocking(move || push_states(&event_rx, 1))
        .await
        .expect("collector");
    assert_eq!(seen, vec![("abc123".to_string(), ScanState::Running)]);

    cancel.cancel();
    task.await.expect("listener stops");
}
