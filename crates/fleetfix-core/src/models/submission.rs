//! Queued issue submission model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix shared by every locally generated submission id.
const ID_PREFIX: &str = "offline";

/// Number of hex characters taken from a v4 UUID for the id suffix.
const ID_SUFFIX_LEN: usize = 16;

/// Issue report body as supplied by the caller: field name to JSON value.
///
/// Opaque to the queue; it is persisted as-is and posted as-is.
pub type IssuePayload = Map<String, Value>;

/// Identifier of a queued submission: `offline_<unix-ms>_<random suffix>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    /// Generate a fresh id stamped with the given creation time.
    #[must_use]
    pub fn generate(timestamp_ms: i64) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{ID_PREFIX}_{timestamp_ms}_{}",
            &suffix[..ID_SUFFIX_LEN]
        ))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Submission id cannot be empty".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<String> for SubmissionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An issue report persisted on the device, waiting for the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedSubmission {
    /// Unique identifier, never reused on this device
    pub id: SubmissionId,
    /// Report body, never mutated while queued
    pub payload: IssuePayload,
    /// Creation timestamp (Unix ms)
    pub enqueued_at: i64,
    /// Failed drain attempts so far
    pub retry_count: u32,
}

impl QueuedSubmission {
    /// Create a fresh submission with a newly generated id and no retries.
    #[must_use]
    pub fn new(payload: IssuePayload) -> Self {
        let now = crate::util::unix_timestamp_now_ms();
        Self {
            id: SubmissionId::generate(now),
            payload,
            enqueued_at: now,
            retry_count: 0,
        }
    }

    /// Record one more failed attempt, returning the new count.
    pub fn record_failure(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    /// Fetch a string field from the payload, if present.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}

/// Row shape shared by every store backend; the payload stays encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSubmissionRow {
    pub id: String,
    pub payload: String,
    pub enqueued_at: i64,
    pub retry_count: i64,
}

impl RawSubmissionRow {
    /// Encode a submission for storage.
    pub fn encode(submission: &QueuedSubmission) -> crate::Result<Self> {
        Ok(Self {
            id: submission.id.as_str().to_string(),
            payload: serde_json::to_string(&submission.payload)?,
            enqueued_at: submission.enqueued_at,
            retry_count: i64::from(submission.retry_count),
        })
    }

    /// Decode a stored row. Undecodable rows come back as
    /// [`StoredSubmission::Corrupt`] instead of failing the caller.
    #[must_use]
    pub fn decode(self) -> StoredSubmission {
        let id = SubmissionId(self.id);

        let payload = match serde_json::from_str::<Value>(&self.payload) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return StoredSubmission::Corrupt {
                    id,
                    reason: format!("payload is not a JSON object: {}", json_kind(&other)),
                }
            }
            Err(error) => {
                return StoredSubmission::Corrupt {
                    id,
                    reason: format!("payload is not valid JSON: {error}"),
                }
            }
        };

        let Ok(retry_count) = u32::try_from(self.retry_count) else {
            return StoredSubmission::Corrupt {
                id,
                reason: format!("retry count out of range: {}", self.retry_count),
            };
        };

        StoredSubmission::Ready(QueuedSubmission {
            id,
            payload,
            enqueued_at: self.enqueued_at,
            retry_count,
        })
    }
}

/// A row read back from the durable store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredSubmission {
    /// Well-formed record
    Ready(QueuedSubmission),
    /// Record whose persisted form could not be decoded
    Corrupt { id: SubmissionId, reason: String },
}

impl StoredSubmission {
    /// Id of the stored row, decodable or not.
    pub const fn id(&self) -> &SubmissionId {
        match self {
            Self::Ready(submission) => &submission.id,
            Self::Corrupt { id, .. } => id,
        }
    }

    /// The decoded submission, if the row was well-formed.
    #[must_use]
    pub fn into_ready(self) -> Option<QueuedSubmission> {
        match self {
            Self::Ready(submission) => Some(submission),
            Self::Corrupt { .. } => None,
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
