use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use scanwatch_client::ClientSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cli::Cli;
use super::logging::LogDestination;

/// Settings read from `scanwatch.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub poll_interval_ms: u64,
    /// `None` disables the push channel; polling alone still tracks scans.
    pub push_path: Option<String>,
    pub push_reconnect_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub log_destination: LogDestination,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        Self {
            server_url: client.base_url,
            poll_interval_ms: millis(client.poll_interval),
            push_path: client.push_path,
            push_reconnect_ms: millis(client.push_reconnect_delay),
            connect_timeout_ms: millis(client.connect_timeout),
            request_timeout_ms: client.request_timeout.map(millis),
            log_destination: LogDestination::default(),
            verbose: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("could not parse {path}: {message}")]
    Parse { path: String, message: String },
}

/// Reads the config file. `Ok(None)` means there is no file at `path`.
pub fn read(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    ron::from_str(&content)
        .map(Some)
        .map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })
}

impl AppConfig {
    /// Command-line flags win over file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(interval) = cli.poll_interval_ms {
            self.poll_interval_ms = interval;
        }
        if let Some(timeout) = cli.request_timeout_ms {
            self.request_timeout_ms = Some(timeout);
        }
        if let Some(destination) = cli.log {
            self.log_destination = destination;
        }
        self.verbose |= cli.verbose;
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.server_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: self
                .request_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            // A zero interval would turn polling into a busy loop.
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            push_path: self.push_path.clone().filter(|path| !path.trim().is_empty()),
            push_reconnect_delay: Duration::from_millis(self.push_reconnect_ms),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::{read, AppConfig, ConfigError};
    use crate::platform::cli::Cli;
    use crate::platform::logging::LogDestination;

    #[test]
    fn defaults_match_the_service_baseline() {
        let config = AppConfig::default();
        assert_eq!(config.server_url, "http://127.0.0.1:12000");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.push_path.as_deref(), Some("/events"));
        assert_eq!(config.push_reconnect_ms, 2000);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.request_timeout_ms, None);
        assert_eq!(config.client_settings().request_timeout, None);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let loaded = read(&dir.path().join("scanwatch.ron")).unwrap();
        assert_eq!(loaded, None);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanwatch.ron");
        fs::write(
            &path,
            r#"(
                server_url: "http://scanner.local:12000",
                request_timeout_ms: Some(5000),
                push_path: None,
                log_destination: Both,
            )"#,
        )
        .unwrap();

        let config = read(&path).unwrap().expect("config present");
        assert_eq!(config.server_url, "http://scanner.local:12000");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.log_destination, LogDestination::Both);

        let settings = config.client_settings();
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.push_path, None);
    }

    #[test]
    fn unparsable_file_reports_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scanwatch.ron");
        fs::write(&path, "(server_url: 12").unwrap();
        assert!(matches!(read(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn cli_flags_override_file_values() {
        let mut config = AppConfig {
            server_url: "http://from-file:1".to_string(),
            request_timeout_ms: Some(5000),
            ..AppConfig::default()
        };
        let cli = Cli::parse_from([
            "scanwatch",
            "--server",
            "http://from-cli:2",
            "--request-timeout-ms",
            "0",
            "--verbose",
            "--log",
            "file",
            "history",
        ]);
        config.apply_cli(&cli);

        assert_eq!(config.server_url, "http://from-cli:2");
        assert!(config.verbose);
        assert_eq!(config.log_destination, LogDestination::File);
        assert_eq!(config.client_settings().request_timeout, None);
    }
}
