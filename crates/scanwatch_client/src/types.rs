use std::fmt;
use std::io;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Scan status as spelled by the scanning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanState {
    Starting,
    Running,
    Completed,
    Error,
}

/// Body of `POST /start_scan`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartScan {
    pub ip_range: String,
    pub ports: String,
    pub rate: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StartScanResponse {
    pub scan_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /scan_status/{scan_id}`. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanStatus {
    pub status: ScanState,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<ScanResult>>,
}

/// One host record of masscan's JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanResult {
    pub ip: String,
    #[serde(default)]
    pub ports: Vec<PortEntry>,
    /// Epoch seconds (masscan writes them as a string) or an RFC 3339 string.
    #[serde(default, deserialize_with = "timestamp_text")]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortEntry {
    pub port: u16,
    #[serde(default)]
    pub proto: String,
}

/// Row of `GET /recent_scans`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecentScan {
    pub scan_id: String,
    #[serde(default)]
    pub ip_range: String,
    pub status: ScanState,
    #[serde(default)]
    pub start_time: Option<String>,
}

/// Payload of a `scan_update` push event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScanUpdateEvent {
    pub scan_id: String,
    pub status: ScanState,
    #[serde(default)]
    pub error: Option<String>,
}

fn timestamp_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

/// Why a status fetch was issued. Echoed back unchanged in
/// [`ClientEvent::StatusFetched`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTag {
    Poll { generation: u64 },
    Details,
    Inspect,
}

/// Everything the client runtime reports back to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    SubmitCompleted {
        request_id: u64,
        result: Result<String, FetchError>,
    },
    StatusFetched {
        scan_id: String,
        tag: StatusTag,
        result: Result<ScanStatus, FetchError>,
    },
    HistoryFetched {
        request_id: u64,
        result: Result<Vec<RecentScan>, FetchError>,
    },
    PushUpdate(ScanUpdateEvent),
    PollDue {
        scan_id: String,
        generation: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Text suitable for the user: the service's own message for HTTP
    /// failures, the full description otherwise.
    pub fn describe(&self) -> String {
        match self.kind {
            FailureKind::HttpStatus(_) if !self.message.is_empty() => self.message.clone(),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Json,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Json => write!(f, "invalid json"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to start client runtime: {0}")]
    Runtime(#[from] io::Error),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
