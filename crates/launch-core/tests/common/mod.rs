#![allow(dead_code)]

use launch_core::error::{ApiError, LaunchError};
use launch_core::logs::{
    CloudWatchLogsApi, CreateLogGroupInput, GetLogEventsInput, GetLogEventsOutput, OutputLogEvent,
};
use launch_core::params::*;
use launch_core::task::{BackendKind, Task, TaskDetail, TaskStatus};
use launch_core::Launcher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Launcher that records every call and answers with canned results.
pub struct RecordingLauncher {
    kind: BackendKind,
    pub calls: Mutex<Vec<&'static str>>,
    pub fail_define: bool,
}

impl RecordingLauncher {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            calls: Mutex::new(Vec::new()),
            fail_define: false,
        }
    }

    pub fn failing_define(kind: BackendKind) -> Self {
        Self {
            fail_define: true,
            ..Self::new(kind)
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }

    fn task(&self, id: &str) -> Task {
        Task {
            id: id.to_string(),
            task_status: TaskStatus::Running,
            start_time: None,
            end_time: None,
            detail: TaskDetail::Codebuild {
                build_arn: format!("arn:{}", id),
                build_status: "IN_PROGRESS".into(),
            },
        }
    }
}

#[async_trait::async_trait]
impl Launcher for RecordingLauncher {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn define_task(&self, _params: &DefineTaskParams) -> Result<DefineTaskResult, LaunchError> {
        self.record("define_task");
        if self.fail_define {
            return Err(LaunchError::backend(
                self.kind,
                "DefineTask",
                ApiError::service("AccessDeniedException", "denied"),
            ));
        }
        Ok(DefineTaskResult {
            id: "def-1".into(),
            cloudwatch_log_group_name: format!("/aws/{}/def", self.kind),
            cloudwatch_stream_prefix: self.kind.to_string(),
        })
    }

    async fn launch_task(&self, params: &LaunchTaskParams) -> Result<LaunchTaskResult, LaunchError> {
        self.record("launch_task");
        let id = params
            .ecs
            .as_ref()
            .map(|ecs| ecs.task_definition.clone())
            .unwrap_or_else(|| "build-1".into());
        Ok(self.task(&format!("task-for-{}", id)))
    }

    async fn wait_for_task(
        &self,
        params: &WaitForTaskParams,
        _cancel: &CancellationToken,
    ) -> Result<WaitForTaskResult, LaunchError> {
        self.record("wait_for_task");
        Ok(WaitForTaskResult {
            id: params.id.clone(),
        })
    }

    async fn get_task_status(
        &self,
        params: &GetTaskStatusParams,
    ) -> Result<GetTaskStatusResult, LaunchError> {
        self.record("get_task_status");
        Ok(self.task(&params.id))
    }

    async fn stop_task(&self, params: &StopTaskParams) -> Result<StopTaskResult, LaunchError> {
        self.record("stop_task");
        Ok(self.task(&params.id))
    }

    async fn cleanup_task(&self, _params: &CleanupTaskParams) -> Result<CleanupTaskResult, LaunchError> {
        self.record("cleanup_task");
        Ok(CleanupTaskResult {})
    }

    async fn get_task_logs(&self, params: &GetTaskLogsParams) -> Result<GetTaskLogsResult, LaunchError> {
        self.record("get_task_logs");
        Ok(GetTaskLogsResult {
            log_lines: Vec::new(),
            next_token: params.next_token.clone(),
        })
    }
}

/// In-memory log streams with CloudWatch-style forward tokens.
///
/// The forward token is `f/<index>` where index is the next unread event.
#[derive(Default)]
pub struct FakeLogs {
    pub events: Mutex<Vec<(i64, String)>>,
    pub groups: Mutex<Vec<String>>,
    pub get_calls: AtomicUsize,
    /// Returned by every CreateLogGroup when set.
    pub fail_create: Mutex<Option<ApiError>>,
}

impl FakeLogs {
    pub fn push(&self, timestamp_ms: i64, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((timestamp_ms, message.to_string()));
    }
}

#[async_trait::async_trait]
impl CloudWatchLogsApi for FakeLogs {
    async fn create_log_group(&self, input: CreateLogGroupInput) -> Result<(), ApiError> {
        if let Some(err) = self.fail_create.lock().unwrap().clone() {
            return Err(err);
        }
        let mut groups = self.groups.lock().unwrap();
        if groups.contains(&input.log_group_name) {
            return Err(ApiError::service(
                "ResourceAlreadyExistsException",
                "The specified log group already exists",
            ));
        }
        groups.push(input.log_group_name);
        Ok(())
    }

    async fn get_log_events(&self, input: GetLogEventsInput) -> Result<GetLogEventsOutput, ApiError> {
        let call = self.get_calls.fetch_add(1, Ordering::SeqCst);
        let start = input
            .next_token
            .as_deref()
            .and_then(|t| t.strip_prefix("f/"))
            .and_then(|t| t.split('#').next())
            .and_then(|i| i.parse::<usize>().ok())
            .unwrap_or(0);

        let events = self.events.lock().unwrap();
        let page: Vec<OutputLogEvent> = events
            .iter()
            .skip(start)
            .map(|(ts, msg)| OutputLogEvent {
                timestamp: Some(*ts),
                message: Some(msg.clone()),
                ingestion_time: Some(*ts),
            })
            .collect();

        // like CloudWatch, an empty page still gets a fresh-looking token
        let next_forward_token = if page.is_empty() {
            format!("f/{}#{}", start, call)
        } else {
            format!("f/{}", start + page.len())
        };

        Ok(GetLogEventsOutput {
            next_forward_token: Some(next_forward_token),
            next_backward_token: Some("b/0".into()),
            events: page,
        })
    }
}
