//! Client for the remote issue submission endpoint.

use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use thiserror::Error;

use crate::models::IssuePayload;
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Default request timeout for issue submissions.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a single submission attempt did not succeed.
///
/// The sync engine treats both variants the same way: one failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionFailure {
    #[error("issues endpoint answered HTTP {status}")]
    Rejected { status: u16 },
    #[error("issues endpoint unreachable: {0}")]
    Transport(String),
}

impl SubmissionFailure {
    /// Whether the request never got an HTTP answer.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Something that can deliver an issue report to the server.
#[allow(async_fn_in_trait)]
pub trait IssueSubmitter {
    /// Attempt one submission. `Ok` means the server answered 2xx.
    async fn submit(&self, payload: &IssuePayload) -> std::result::Result<(), SubmissionFailure>;
}

impl<T: IssueSubmitter> IssueSubmitter for &T {
    async fn submit(&self, payload: &IssuePayload) -> std::result::Result<(), SubmissionFailure> {
        (**self).submit(payload).await
    }
}

/// `POST`s issue payloads as JSON to the configured endpoint.
#[derive(Clone)]
pub struct HttpIssueSubmitter {
    endpoint: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl fmt::Debug for HttpIssueSubmitter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HttpIssueSubmitter")
            .field("endpoint", &self.endpoint)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl HttpIssueSubmitter {
    /// Create a submitter for `endpoint` with a finite request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        if timeout.is_zero() {
            return Err(Error::Config(
                "issue submission timeout must be greater than zero".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            endpoint,
            api_token: None,
            client,
        })
    }

    /// Attach a bearer token to every submission.
    #[must_use]
    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = normalize_text_option(token);
        self
    }

    /// The normalized endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl IssueSubmitter for HttpIssueSubmitter {
    async fn submit(&self, payload: &IssuePayload) -> std::result::Result<(), SubmissionFailure> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(payload);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|error| {
            if error.is_timeout() {
                SubmissionFailure::Transport(format!("request timed out: {error}"))
            } else {
                SubmissionFailure::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // Body is only logged; failures are not classified by content.
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(
            status = status.as_u16(),
            body = %compact_text(&body),
            "Issue submission rejected"
        );
        Err(SubmissionFailure::Rejected {
            status: status.as_u16(),
        })
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("issues endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "issues endpoint must include http:// or https://".to_string(),
        ))
    }
}
