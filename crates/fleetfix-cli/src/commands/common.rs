use std::env;
use std::path::{Path, PathBuf};

use fleetfix_core::db::{Database, LibSqlLastSyncStore, LibSqlSubmissionStore};
use fleetfix_core::{
    ClientConfig, HttpIssueSubmitter, IssuePayload, OfflineQueue, QueuedSubmission, SyncEngine,
    SyncResult,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

pub type CliQueue<'a> = OfflineQueue<LibSqlSubmissionStore<'a>>;
pub type CliEngine<'a> =
    SyncEngine<LibSqlSubmissionStore<'a>, LibSqlLastSyncStore<'a>, HttpIssueSubmitter>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub id: String,
    pub enqueued_at: i64,
    pub retry_count: u32,
    pub payload: IssuePayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusItem {
    pub pending: usize,
    pub last_sync_time: Option<i64>,
    pub issues_endpoint: Option<String>,
    pub max_retries: u32,
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("FLEETFIX_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fleetfix")
        .join("offline-queue.db")
}

pub async fn open_database(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path).await?)
}

pub fn load_config() -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::from_env()?)
}

pub fn queue_for(db: &Database) -> CliQueue<'_> {
    OfflineQueue::new(LibSqlSubmissionStore::new(db.connection()))
}

pub fn engine_for<'a>(db: &'a Database, config: &ClientConfig) -> Result<CliEngine<'a>, CliError> {
    Ok(SyncEngine::new(
        queue_for(db),
        LibSqlLastSyncStore::new(db.connection()),
        config.submitter()?,
    )
    .with_policy(config.sync_policy()))
}

/// Assemble a report from `--json`, then `--field`, then the named flags.
pub fn build_report_payload(
    fleet_number: Option<&str>,
    description: Option<&str>,
    fields: &[String],
    json: Option<&str>,
) -> Result<IssuePayload, CliError> {
    let mut payload = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw)? {
            Value::Object(map) => map,
            other => return Err(CliError::InvalidReportJson(other.to_string())),
        },
        None => IssuePayload::new(),
    };

    for field in fields {
        let (key, value) = parse_field(field)?;
        payload.insert(key, value);
    }

    if let Some(fleet_number) = fleet_number.and_then(normalize_text) {
        payload.insert("fleetNumber".to_string(), Value::String(fleet_number));
    }
    if let Some(description) = description.and_then(normalize_text) {
        payload.insert("description".to_string(), Value::String(description));
    }

    if payload.is_empty() {
        return Err(CliError::EmptyReport);
    }
    Ok(payload)
}

pub fn parse_field(raw: &str) -> Result<(String, Value), CliError> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(CliError::InvalidField(raw.to_string()));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::InvalidField(raw.to_string()));
    }

    let value = value.trim();
    let value =
        serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn pending_to_item(submission: &QueuedSubmission) -> PendingItem {
    PendingItem {
        id: submission.id.to_string(),
        enqueued_at: submission.enqueued_at,
        retry_count: submission.retry_count,
        payload: submission.payload.clone(),
    }
}

pub fn format_pending_lines(pending: &[QueuedSubmission], now_ms: i64) -> Vec<String> {
    pending
        .iter()
        .map(|submission| {
            let retries = if submission.retry_count == 0 {
                String::new()
            } else {
                format!(" [retried {}x]", submission.retry_count)
            };
            format!(
                "{}  {}  {}{}",
                submission.id,
                format_relative_time(submission.enqueued_at, now_ms),
                report_preview(submission, 60),
                retries
            )
        })
        .collect()
}

/// One-line summary: "T-107: engine overheating", truncated to `max_chars`.
pub fn report_preview(submission: &QueuedSubmission, max_chars: usize) -> String {
    let fleet_number = submission.payload_str("fleetNumber");
    let description = submission.payload_str("description");
    let preview = match (fleet_number, description) {
        (Some(fleet), Some(text)) => format!("{fleet}: {text}"),
        (Some(fleet), None) => fleet.to_string(),
        (None, Some(text)) => text.to_string(),
        (None, None) => Value::Object(submission.payload.clone()).to_string(),
    };
    let first_line = preview.lines().next().unwrap_or_default();

    if first_line.chars().count() <= max_chars {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

pub fn format_sync_result(result: &SyncResult) -> String {
    if result.is_empty() {
        return "Nothing to sync".to_string();
    }
    format!(
        "Sync completed: {} delivered, {} retrying, {} abandoned",
        result.succeeded, result.retried, result.permanently_failed
    )
}

pub fn format_last_sync(last_sync_time: Option<i64>, now_ms: i64) -> String {
    last_sync_time.map_or_else(
        || "never".to_string(),
        |timestamp| {
            format!(
                "{} ({})",
                format_sync_timestamp(timestamp),
                format_relative_time(timestamp, now_ms)
            )
        },
    )
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
