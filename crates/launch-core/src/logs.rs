//! Paginated log retrieval from CloudWatch Logs.
//!
//! Both backends ship their output to CloudWatch; the reader turns a page of
//! log events into [`LogLine`]s plus an opaque cursor for the next call.

use crate::error::ApiError;
use crate::CREATED_BY_TAG;
use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One line of task output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadLogsParams {
    pub group_name: String,
    pub stream_name: String,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadLogsResult {
    pub log_lines: Vec<LogLine>,
    pub next_token: Option<String>,
}

/// Reads one page of a log stream.
///
/// Without a cursor the stream is read from its beginning. The returned
/// cursor must be passed back unchanged on the next call; when a page is
/// empty the cursor handed in is returned as-is.
#[async_trait::async_trait]
pub trait LogsReader: Send + Sync {
    async fn read_logs(&self, params: &ReadLogsParams) -> Result<ReadLogsResult, ApiError>;
}

// ---------------------------------------------------------------------------
// CloudWatch Logs service seam

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogGroupInput {
    pub log_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetLogEventsInput {
    pub log_group_name: String,
    pub log_stream_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_from_head: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetLogEventsOutput {
    #[serde(default)]
    pub events: Vec<OutputLogEvent>,
    #[serde(default)]
    pub next_forward_token: Option<String>,
    #[serde(default)]
    pub next_backward_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutputLogEvent {
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ingestion_time: Option<i64>,
}

/// The CloudWatch Logs calls this tool makes.
#[async_trait::async_trait]
pub trait CloudWatchLogsApi: Send + Sync {
    async fn create_log_group(&self, input: CreateLogGroupInput) -> Result<(), ApiError>;

    async fn get_log_events(&self, input: GetLogEventsInput) -> Result<GetLogEventsOutput, ApiError>;
}

pub const RESOURCE_ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";

/// Create a log group, treating one that already exists as success.
pub async fn ensure_log_group(api: &dyn CloudWatchLogsApi, group_name: &str) -> Result<(), ApiError> {
    let tags = BTreeMap::from([(CREATED_BY_TAG.0.to_string(), CREATED_BY_TAG.1.to_string())]);

    match api
        .create_log_group(CreateLogGroupInput {
            log_group_name: group_name.to_string(),
            tags: Some(tags),
        })
        .await
    {
        Ok(()) => {
            info!(name = group_name, "created cloudwatch log group");
            Ok(())
        }
        Err(err) if err.is_code(RESOURCE_ALREADY_EXISTS) => {
            info!(name = group_name, "cloudwatch log group exists");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// [`LogsReader`] backed by `GetLogEvents`.
#[derive(Clone)]
pub struct CloudWatchLogsReader {
    api: Arc<dyn CloudWatchLogsApi>,
}

impl CloudWatchLogsReader {
    pub fn new(api: Arc<dyn CloudWatchLogsApi>) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl LogsReader for CloudWatchLogsReader {
    async fn read_logs(&self, params: &ReadLogsParams) -> Result<ReadLogsResult, ApiError> {
        debug!(
            group = %params.group_name,
            stream = %params.stream_name,
            next_token = ?params.next_token,
            "GetLogEvents"
        );

        let output = self
            .api
            .get_log_events(GetLogEventsInput {
                log_group_name: params.group_name.clone(),
                log_stream_name: params.stream_name.clone(),
                next_token: params.next_token.clone(),
                start_from_head: Some(true),
            })
            .await?;

        // only advance the cursor when something came back
        let next_token = if output.events.is_empty() {
            params.next_token.clone()
        } else {
            output.next_forward_token
        };

        let log_lines = output
            .events
            .into_iter()
            .map(|event| LogLine {
                timestamp: event
                    .timestamp
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                    .unwrap_or_default(),
                message: event.message.unwrap_or_default(),
            })
            .collect();

        Ok(ReadLogsResult {
            log_lines,
            next_token,
        })
    }
}
