use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::{ErrorBody, StartScanResponse};
use crate::{FailureKind, FetchError, RecentScan, ScanStatus, StartScan};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// `None` leaves requests without a deadline; only transport failures end them.
    pub request_timeout: Option<Duration>,
    pub poll_interval: Duration,
    /// Path of the server-sent event feed; `None` disables the push channel.
    pub push_path: Option<String>,
    pub push_reconnect_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:12000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            poll_interval: Duration::from_secs(1),
            push_path: Some("/events".to_string()),
            push_reconnect_delay: Duration::from_secs(2),
        }
    }
}

/// Request/response boundary of the scanning service.
#[async_trait::async_trait]
pub trait ScanService: Send + Sync {
    /// Submits a scan and returns the id the service assigned to it.
    async fn start_scan(&self, request: &StartScan) -> Result<String, FetchError>;

    async fn scan_status(&self, scan_id: &str) -> Result<ScanStatus, FetchError>;

    async fn recent_scans(&self) -> Result<Vec<RecentScan>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestScanService {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestScanService {
    pub fn new(settings: &ClientSettings) -> Result<Self, FetchError> {
        let base = parse_base_url(&settings.base_url)?;
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        endpoint(&self.base, segments)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Bytes, FetchError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| status.to_string());
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ScanService for ReqwestScanService {
    async fn start_scan(&self, request: &StartScan) -> Result<String, FetchError> {
        let url = self.endpoint(&["start_scan"])?;
        let payload = serde_json::to_vec(request)
            .map_err(|err| FetchError::new(FailureKind::Json, err.to_string()))?;
        let body = self
            .send(
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, "application/json")
                    .body(payload),
            )
            .await?;
        let response: StartScanResponse = decode(&body)?;
        Ok(response.scan_id)
    }

    async fn scan_status(&self, scan_id: &str) -> Result<ScanStatus, FetchError> {
        let url = self.endpoint(&["scan_status", scan_id])?;
        let body = self.send(self.client.get(url)).await?;
        decode(&body)
    }

    async fn recent_scans(&self) -> Result<Vec<RecentScan>, FetchError> {
        let url = self.endpoint(&["recent_scans"])?;
        let body = self.send(self.client.get(url)).await?;
        decode(&body)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(FetchError::new(
            FailureKind::InvalidUrl,
            format!("{raw} cannot be used as a base url"),
        ));
    }
    Ok(url)
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, FetchError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| FetchError::new(FailureKind::InvalidUrl, base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|err| FetchError::new(FailureKind::Json, err.to_string()))
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Json, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
