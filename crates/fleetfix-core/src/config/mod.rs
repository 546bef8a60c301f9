//! Client configuration resolved from the environment.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::submit::{HttpIssueSubmitter, DEFAULT_REQUEST_TIMEOUT};
use crate::sync::{SyncPolicy, MAX_RETRIES};
use crate::trigger::HttpReachabilityProbe;
use crate::util::is_http_url;

pub const ISSUES_ENDPOINT_VAR: &str = "FLEETFIX_ISSUES_ENDPOINT";
pub const API_TOKEN_VAR: &str = "FLEETFIX_API_TOKEN";
pub const REQUEST_TIMEOUT_VAR: &str = "FLEETFIX_REQUEST_TIMEOUT_SECS";
pub const MAX_RETRIES_VAR: &str = "FLEETFIX_MAX_RETRIES";
pub const SYNC_INTERVAL_VAR: &str = "FLEETFIX_SYNC_INTERVAL_SECS";
pub const PROBE_INTERVAL_VAR: &str = "FLEETFIX_PROBE_INTERVAL_SECS";

const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for crate::Error {
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub issues_endpoint: Option<String>,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// `None` disables the periodic wake
    pub sync_interval: Option<Duration>,
    pub probe_interval: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("issues_endpoint", &self.issues_endpoint)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("sync_interval", &self.sync_interval)
            .field("probe_interval", &self.probe_interval)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            issues_endpoint: None,
            api_token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: MAX_RETRIES,
            sync_interval: Some(Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let issues_endpoint =
            optional_trimmed(&lookup, ISSUES_ENDPOINT_VAR).map(|value| trim_trailing(&value).to_string());
        if let Some(endpoint) = issues_endpoint.as_deref() {
            if !is_http_url(endpoint) {
                return Err(ConfigError::Invalid(format!(
                    "{ISSUES_ENDPOINT_VAR} must start with http:// or https://"
                )));
            }
        }

        let api_token = optional_trimmed(&lookup, API_TOKEN_VAR);

        let request_timeout_secs =
            parse_u64(&lookup, REQUEST_TIMEOUT_VAR, DEFAULT_REQUEST_TIMEOUT.as_secs())?;
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(format!(
                "{REQUEST_TIMEOUT_VAR} must be >= 1"
            )));
        }

        let max_retries = optional_trimmed(&lookup, MAX_RETRIES_VAR)
            .map(|value| {
                value.parse::<u32>().map_err(|_| {
                    ConfigError::Invalid(format!("{MAX_RETRIES_VAR} must be a non-negative integer"))
                })
            })
            .transpose()?
            .unwrap_or(MAX_RETRIES);

        let sync_interval_secs = parse_u64(&lookup, SYNC_INTERVAL_VAR, DEFAULT_SYNC_INTERVAL_SECS)?;
        let sync_interval =
            (sync_interval_secs > 0).then(|| Duration::from_secs(sync_interval_secs));

        let probe_interval_secs =
            parse_u64(&lookup, PROBE_INTERVAL_VAR, DEFAULT_PROBE_INTERVAL_SECS)?;
        if probe_interval_secs == 0 {
            return Err(ConfigError::Invalid(format!(
                "{PROBE_INTERVAL_VAR} must be >= 1"
            )));
        }

        Ok(Self {
            issues_endpoint,
            api_token,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_retries,
            sync_interval,
            probe_interval: Duration::from_secs(probe_interval_secs),
        })
    }

    /// The issues endpoint, required by anything that talks to the backend.
    pub fn require_endpoint(&self) -> Result<&str, ConfigError> {
        self.issues_endpoint
            .as_deref()
            .ok_or(ConfigError::MissingVar(ISSUES_ENDPOINT_VAR))
    }

    pub const fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy::new(self.max_retries)
    }

    pub fn submitter(&self) -> crate::Result<HttpIssueSubmitter> {
        let endpoint = self.require_endpoint()?;
        Ok(HttpIssueSubmitter::new(endpoint, self.request_timeout)?
            .with_api_token(self.api_token.clone()))
    }

    /// Reachability probe aimed at the issues endpoint.
    pub fn reachability_probe(&self) -> crate::Result<HttpReachabilityProbe> {
        HttpReachabilityProbe::new(self.require_endpoint()?)
    }
}

fn parse_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    optional_trimmed(lookup, name).map_or(Ok(default), |value| {
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
    })
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ClientConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn network_operations_require_endpoint() {
        let config = config_from(&[]).unwrap();
        let err = config.require_endpoint().unwrap_err();
        assert!(err.to_string().contains(ISSUES_ENDPOINT_VAR));
        assert!(config.submitter().is_err());
    }

    #[test]
    fn parses_all_values() {
        let config = config_from(&[
            (ISSUES_ENDPOINT_VAR, " https://fleet.example.com/api/issues/ "),
            (API_TOKEN_VAR, "depot-token"),
            (REQUEST_TIMEOUT_VAR, "3"),
            (MAX_RETRIES_VAR, "2"),
            (SYNC_INTERVAL_VAR, "0"),
            (PROBE_INTERVAL_VAR, "30"),
        ])
        .unwrap();

        assert_eq!(
            config.issues_endpoint.as_deref(),
            Some("https://fleet.example.com/api/issues")
        );
        assert_eq!(config.api_token.as_deref(), Some("depot-token"));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.sync_policy(), SyncPolicy::new(2));
        assert_eq!(config.sync_interval, None);
        assert_eq!(config.probe_interval, Duration::from_secs(30));
        assert_eq!(
            config.submitter().unwrap().endpoint(),
            "https://fleet.example.com/api/issues"
        );
        assert_eq!(
            config.reachability_probe().unwrap().url(),
            "https://fleet.example.com/api/issues"
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(config_from(&[(ISSUES_ENDPOINT_VAR, "fleet.example.com")]).is_err());
        assert!(config_from(&[(REQUEST_TIMEOUT_VAR, "0")]).is_err());
        assert!(config_from(&[(MAX_RETRIES_VAR, "-1")]).is_err());
        assert!(config_from(&[(SYNC_INTERVAL_VAR, "soon")]).is_err());
        assert!(config_from(&[(PROBE_INTERVAL_VAR, "0")]).is_err());
    }

    #[test]
    fn debug_redacts_api_token() {
        let config = config_from(&[(API_TOKEN_VAR, "depot-token")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("depot-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
