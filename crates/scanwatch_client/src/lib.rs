//! Scanwatch client: HTTP boundary to the scanning service, push feed and
//! poll timers, run on a dedicated tokio runtime.
mod engine;
mod poll;
mod push;
mod service;
mod types;

pub use engine::{ClientCommand, ClientHandle};
pub use poll::PollTimer;
pub use push::{accept_event, PushListener, SCAN_UPDATE_EVENT};
pub use service::{ClientSettings, ReqwestScanService, ScanService};
pub use types::{
    ClientError, ClientEvent, FailureKind, FetchError, PortEntry, RecentScan, ScanResult,
    ScanState, ScanStatus, ScanUpdateEvent, StartScan, StatusTag,
};
