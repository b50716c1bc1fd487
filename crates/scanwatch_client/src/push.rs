use std::sync::mpsc;
use std::time::Duration;

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use scan_logging::{scan_info, scan_trace, scan_warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::service::{endpoint, map_reqwest_error, parse_base_url};
use crate::{ClientEvent, ClientSettings, FailureKind, FetchError, ScanUpdateEvent};

/// Event name the scanning service uses for status changes.
pub const SCAN_UPDATE_EVENT: &str = "scan_update";

/// Long-lived subscription to the service's event feed.
///
/// Forwards `scan_update` events for the scan named by `filter` and drops the
/// rest. Connection loss is logged and followed by a reconnect after a fixed
/// delay; it is never reported as a scan failure.
pub struct PushListener {
    client: reqwest::Client,
    url: Url,
    reconnect_delay: Duration,
    filter: watch::Receiver<Option<String>>,
    events: mpsc::Sender<ClientEvent>,
}

impl PushListener {
    pub fn new(
        settings: &ClientSettings,
        push_path: &str,
        filter: watch::Receiver<Option<String>>,
        events: mpsc::Sender<ClientEvent>,
    ) -> Result<Self, FetchError> {
        let base = parse_base_url(&settings.base_url)?;
        let segments: Vec<&str> = push_path.split('/').filter(|s| !s.is_empty()).collect();
        let url = endpoint(&base, &segments)?;
        // No overall timeout: the stream is expected to stay open.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            url,
            reconnect_delay: settings.push_reconnect_delay,
            filter,
            events,
        })
    }

    pub async fn run(self, cancel: CancellationToken) {
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                outcome = self.stream_once() => outcome,
            };
            match outcome {
                Ok(()) => scan_info!("Push feed {} closed, reconnecting", self.url),
                Err(err) => scan_warn!("Push feed {} lost: {}", self.url, err),
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn stream_once(&self) -> Result<(), FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        scan_info!("Push feed connected to {}", self.url);

        let mut stream = response.bytes_stream().eventsource();
        while let Some(event) = stream.next().await {
            let event = event.map_err(map_stream_error)?;
            let observed = self.filter.borrow().clone();
            if let Some(update) = accept_event(&event, observed.as_deref()) {
                let _ = self.events.send(ClientEvent::PushUpdate(update));
            }
        }
        Ok(())
    }
}

fn map_stream_error(err: EventStreamError<reqwest::Error>) -> FetchError {
    match err {
        EventStreamError::Transport(err) => map_reqwest_error(err),
        other => FetchError::new(FailureKind::Network, format!("malformed event stream: {other}")),
    }
}

/// Decodes `event` and keeps it only if it is a `scan_update` for `observed`.
pub fn accept_event(event: &Event, observed: Option<&str>) -> Option<ScanUpdateEvent> {
    if event.event != SCAN_UPDATE_EVENT {
        scan_trace!("Ignoring push event {:?}", event.event);
        return None;
    }
    if event.data.trim().is_empty() {
        scan_trace!("Ignoring empty scan_update event");
        return None;
    }
    let update: ScanUpdateEvent = match serde_json::from_str(&event.data) {
        Ok(update) => update,
        Err(err) => {
            scan_warn!("Undecodable scan_update payload: {}", err);
            return None;
        }
    };
    if observed != Some(update.scan_id.as_str()) {
        scan_trace!("Dropping scan_update for unobserved scan {}", update.scan_id);
        return None;
    }
    Some(update)
}
