/// Raw scan form input exactly as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanForm {
    pub target: String,
    pub ports: String,
    pub rate: String,
}

/// Submission payload for `POST /start_scan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub target: String,
    pub ports: String,
    pub rate: i64,
}

impl ScanForm {
    pub fn new(target: impl Into<String>, ports: impl Into<String>, rate: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ports: ports.into(),
            rate: rate.into(),
        }
    }

    /// Checks that every field is present and turns the rate into a number.
    ///
    /// Target and port syntax and the rate's range are passed through
    /// untouched; the scanning service decides whether they are valid.
    pub fn to_request(&self) -> Result<ScanRequest, String> {
        let target = self.target.trim();
        let ports = self.ports.trim();
        if target.is_empty() || ports.is_empty() {
            return Err("IP range and ports are required".to_string());
        }
        let rate = self.rate.trim();
        if rate.is_empty() {
            return Err("Rate is required".to_string());
        }
        let rate = rate
            .parse::<i64>()
            .map_err(|_| format!("Rate must be a whole number, got {rate:?}"))?;
        Ok(ScanRequest {
            target: target.to_string(),
            ports: ports.to_string(),
            rate,
        })
    }
}
