use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Which execution service a definition or task targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Ecs,
    Codebuild,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Ecs => write!(f, "ecs"),
            BackendKind::Codebuild => write!(f, "codebuild"),
        }
    }
}

/// Canonical task status shared by every backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    /// `RUNNING` may move anywhere; a terminal status only to itself.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        match self {
            TaskStatus::Running => true,
            terminal => *terminal == next,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "RUNNING"),
            TaskStatus::Succeeded => write!(f, "SUCCEEDED"),
            TaskStatus::Failed => write!(f, "FAILED"),
            TaskStatus::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Native identifiers and status kept for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum TaskDetail {
    Ecs {
        task_arn: String,
        task_id: String,
        last_status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stop_code: Option<String>,
    },
    Codebuild {
        build_arn: String,
        build_status: String,
    },
}

/// One running (or finished) instance of a definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct Task {
    pub id: String,
    pub task_status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub detail: TaskDetail,
}

impl Task {
    /// Apply a freshly fetched view of the same task. A terminal status is
    /// never replaced by a different one.
    pub fn refresh(self, latest: Task) -> Task {
        if self.task_status.can_transition_to(latest.task_status) {
            return latest;
        }

        warn!(
            task = %self.id,
            from = %self.task_status,
            to = %latest.task_status,
            "ignoring non-monotonic status transition"
        );
        Task {
            task_status: self.task_status,
            end_time: self.end_time.or(latest.end_time),
            ..latest
        }
    }

    /// Wall-clock duration once both timestamps are known.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
