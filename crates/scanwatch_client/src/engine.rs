use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use scan_logging::{scan_debug, scan_warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::poll::PollTimer;
use crate::push::PushListener;
use crate::service::{ClientSettings, ReqwestScanService, ScanService};
use crate::{ClientError, ClientEvent, StartScan, StatusTag};

/// Work the event loop hands to the client runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Submit { request_id: u64, request: StartScan },
    FetchStatus { scan_id: String, tag: StatusTag },
    FetchHistory { request_id: u64 },
    /// Retarget the push filter and drop any armed poll timer.
    Observe { scan_id: String },
    StopPolling,
    StopObserving,
    SchedulePoll { scan_id: String, generation: u64 },
}

enum ServiceRequest {
    Submit { request_id: u64, request: StartScan },
    Status { scan_id: String, tag: StatusTag },
    History { request_id: u64 },
}

/// Owns the runtime thread that talks to the scanning service.
///
/// Commands are executed concurrently on a tokio runtime; results come back
/// as [`ClientEvent`]s to be consumed by a single event loop.
pub struct ClientHandle {
    cmd_tx: mpsc::Sender<ClientCommand>,
    event_rx: mpsc::Receiver<ClientEvent>,
}

impl ClientHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let service = Arc::new(ReqwestScanService::new(&settings)?);
        Self::with_service(settings, service)
    }

    pub fn with_service(
        settings: ClientSettings,
        service: Arc<dyn ScanService>,
    ) -> Result<Self, ClientError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let (filter_tx, filter_rx) = watch::channel(None::<String>);
        let runtime = tokio::runtime::Runtime::new()?;
        let shutdown = CancellationToken::new();

        if let Some(push_path) = settings.push_path.as_deref() {
            let listener = PushListener::new(&settings, push_path, filter_rx, event_tx.clone())?;
            runtime.spawn(listener.run(shutdown.clone()));
        }

        let mut timer = PollTimer::new(settings.poll_interval);
        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let request = match command {
                    ClientCommand::Observe { scan_id } => {
                        timer.cancel();
                        filter_tx.send_replace(Some(scan_id));
                        continue;
                    }
                    ClientCommand::StopPolling => {
                        timer.cancel();
                        continue;
                    }
                    ClientCommand::StopObserving => {
                        timer.cancel();
                        filter_tx.send_replace(None);
                        continue;
                    }
                    ClientCommand::SchedulePoll {
                        scan_id,
                        generation,
                    } => {
                        runtime.spawn(timer.arm(scan_id, generation, event_tx.clone()));
                        continue;
                    }
                    ClientCommand::Submit {
                        request_id,
                        request,
                    } => ServiceRequest::Submit {
                        request_id,
                        request,
                    },
                    ClientCommand::FetchStatus { scan_id, tag } => {
                        ServiceRequest::Status { scan_id, tag }
                    }
                    ClientCommand::FetchHistory { request_id } => {
                        ServiceRequest::History { request_id }
                    }
                };
                let service = service.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_request(service.as_ref(), request, event_tx).await;
                });
            }
            scan_debug!("Client command channel closed, shutting down runtime");
            shutdown.cancel();
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn send(&self, command: ClientCommand) {
        if self.cmd_tx.send(command).is_err() {
            scan_warn!("Client runtime is gone; command dropped");
        }
    }

    pub fn try_recv(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ClientEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_request(
    service: &dyn ScanService,
    request: ServiceRequest,
    event_tx: mpsc::Sender<ClientEvent>,
) {
    let event = match request {
        ServiceRequest::Submit {
            request_id,
            request,
        } => ClientEvent::SubmitCompleted {
            request_id,
            result: service.start_scan(&request).await,
        },
        ServiceRequest::Status { scan_id, tag } => {
            let result = service.scan_status(&scan_id).await;
            ClientEvent::StatusFetched {
                scan_id,
                tag,
                result,
            }
        }
        ServiceRequest::History { request_id } => ClientEvent::HistoryFetched {
            request_id,
            result: service.recent_scans().await,
        },
    };
    let _ = event_tx.send(event);
}
