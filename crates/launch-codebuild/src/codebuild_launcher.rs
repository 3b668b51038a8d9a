use crate::api::*;
use launch_core::error::{ApiError, LaunchError};
use launch_core::logs::{ensure_log_group, CloudWatchLogsApi, CloudWatchLogsReader, LogsReader, ReadLogsParams};
use launch_core::params::{
    CleanupTaskParams, CleanupTaskResult, CodebuildDefineParams, DefineTaskParams,
    DefineTaskResult, GetTaskLogsParams, GetTaskLogsResult, GetTaskStatusParams,
    GetTaskStatusResult, LaunchTaskParams, LaunchTaskResult, StopTaskParams, StopTaskResult,
    WaitForTaskParams, WaitForTaskResult,
};
use launch_core::task::{BackendKind, Task, TaskDetail, TaskStatus};
use launch_core::{Launcher, Waiter, WaiterConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stream name configured on every project; CodeBuild appends the build id.
pub const CODEBUILD_STREAM_PREFIX: &str = "codebuild";

const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
const WAITER_NAME: &str = "BuildsComplete";

/// `/aws/codebuild/<project>`
pub fn log_group_name(project_name: &str) -> String {
    format!("/aws/codebuild/{}", project_name)
}

/// `codebuild/<build-uuid>`. CodeBuild drops the `<project>:` part of the
/// build id when naming the stream.
pub fn log_stream_name(build_id: &str) -> String {
    let build_uuid = build_id.split_once(':').map_or(build_id, |(_, uuid)| uuid);
    format!("{}/{}", CODEBUILD_STREAM_PREFIX, build_uuid)
}

/// Map a CodeBuild `buildStatus` to the canonical status.
pub fn convert_task_status(build_status: &str) -> TaskStatus {
    match build_status {
        "IN_PROGRESS" => TaskStatus::Running,
        "SUCCEEDED" => TaskStatus::Succeeded,
        "STOPPED" => TaskStatus::Stopped,
        "FAILED" | "FAULT" | "TIMED_OUT" => TaskStatus::Failed,
        other => {
            warn!(status = other, "unrecognised CodeBuild build status");
            TaskStatus::Failed
        }
    }
}

fn to_task(build: &Build) -> Task {
    let build_status = build.build_status.clone().unwrap_or_default();
    Task {
        id: build.id.clone(),
        task_status: convert_task_status(&build_status),
        start_time: build.start_time,
        end_time: build.end_time,
        detail: TaskDetail::Codebuild {
            build_arn: build.arn.clone().unwrap_or_default(),
            build_status,
        },
    }
}

fn project_input(cb: &CodebuildDefineParams, params: &DefineTaskParams, group: &str) -> ProjectInput {
    ProjectInput {
        name: cb.project_name.clone(),
        environment: ProjectEnvironment {
            kind: ENVIRONMENT_TYPE_LINUX_CONTAINER.to_string(),
            image: params.image.clone(),
            compute_type: cb.compute_type.clone(),
            privileged_mode: cb.privileged_mode,
            environment_variables: environment_variables(&params.environment),
        },
        artifacts: ProjectArtifacts {
            kind: ARTIFACTS_TYPE_NO_ARTIFACTS.to_string(),
        },
        source: ProjectSource {
            kind: SOURCE_TYPE_NO_SOURCE.to_string(),
            buildspec: Some(cb.buildspec.clone()),
        },
        service_role: cb.service_role.clone(),
        logs_config: LogsConfig {
            cloud_watch_logs: CloudWatchLogsConfig {
                status: LOGS_STATUS_ENABLED.to_string(),
                group_name: Some(group.to_string()),
                stream_name: Some(CODEBUILD_STREAM_PREFIX.to_string()),
            },
        },
        tags: tags(&params.tags),
    }
}

fn project_arn(operation: &str, out: ProjectOutput) -> Result<String, LaunchError> {
    out.project
        .and_then(|p| p.arn)
        .ok_or_else(|| LaunchError::UnexpectedResponse(format!("{} returned no project ARN", operation)))
}

/// True once every build reports complete.
fn builds_complete(id: &str, out: &BatchGetBuildsOutput) -> Result<bool, LaunchError> {
    if out.builds.is_empty() {
        if !out.builds_not_found.is_empty() {
            return Err(LaunchError::TaskNotFound(id.to_string()));
        }
        return Ok(false);
    }
    Ok(out.builds.iter().all(|b| b.build_complete))
}

/// Build-project launcher.
pub struct CodeBuildLauncher {
    codebuild: Arc<dyn CodeBuildApi>,
    logs: Arc<dyn CloudWatchLogsApi>,
    reader: Arc<dyn LogsReader>,
    waiter: WaiterConfig,
}

impl CodeBuildLauncher {
    pub fn new(codebuild: Arc<dyn CodeBuildApi>, logs: Arc<dyn CloudWatchLogsApi>) -> Self {
        let reader = Arc::new(CloudWatchLogsReader::new(logs.clone()));
        Self {
            codebuild,
            logs,
            reader,
            waiter: WaiterConfig::default(),
        }
    }

    pub fn with_waiter(mut self, waiter: WaiterConfig) -> Self {
        self.waiter = waiter;
        self
    }

    fn error(operation: &'static str, source: ApiError) -> LaunchError {
        LaunchError::backend(BackendKind::Codebuild, operation, source)
    }

    /// Update the project in place. `None` means it does not exist yet.
    async fn try_update_project(&self, input: ProjectInput) -> Result<Option<String>, LaunchError> {
        match self.codebuild.update_project(input).await {
            Ok(out) => project_arn("UpdateProject", out).map(Some),
            Err(err) if err.is_code(RESOURCE_NOT_FOUND) => Ok(None),
            Err(err) => Err(Self::error("UpdateProject", err)),
        }
    }

    async fn get_build(&self, id: &str) -> Result<BatchGetBuildsOutput, LaunchError> {
        let out = self
            .codebuild
            .batch_get_builds(BatchGetBuildsInput {
                ids: vec![id.to_string()],
            })
            .await
            .map_err(|e| Self::error("BatchGetBuilds", e))?;
        debug!(?out, "BatchGetBuilds");
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Launcher for CodeBuildLauncher {
    fn kind(&self) -> BackendKind {
        BackendKind::Codebuild
    }

    async fn define_task(&self, params: &DefineTaskParams) -> Result<DefineTaskResult, LaunchError> {
        let cb = params
            .codebuild
            .as_ref()
            .ok_or(LaunchError::MissingBackendParams)?;
        let group = log_group_name(&cb.project_name);

        ensure_log_group(self.logs.as_ref(), &group)
            .await
            .map_err(|e| Self::error("CreateLogGroup", e))?;

        let input = project_input(cb, params, &group);

        // ListProjects has no name filter, so try the update first
        let arn = match self.try_update_project(input.clone()).await? {
            Some(arn) => {
                info!(project_arn = %arn, "updated codebuild project");
                arn
            }
            None => {
                let out = self
                    .codebuild
                    .create_project(input)
                    .await
                    .map_err(|e| Self::error("CreateProject", e))?;
                let arn = project_arn("CreateProject", out)?;
                info!(project_arn = %arn, "created codebuild project");
                arn
            }
        };

        Ok(DefineTaskResult {
            id: arn,
            cloudwatch_log_group_name: group,
            cloudwatch_stream_prefix: CODEBUILD_STREAM_PREFIX.to_string(),
        })
    }

    async fn launch_task(&self, params: &LaunchTaskParams) -> Result<LaunchTaskResult, LaunchError> {
        let cb = params
            .codebuild
            .as_ref()
            .ok_or(LaunchError::MissingBackendParams)?;

        info!(project = %cb.project_name, "start build");

        let out = self
            .codebuild
            .start_build(StartBuildInput {
                project_name: cb.project_name.clone(),
                environment_variables_override: environment_variables(&params.environment),
                image_override: cb.image.clone(),
                compute_type_override: cb.compute_type.clone(),
                privileged_mode_override: cb.privileged_mode,
                service_role_override: cb.service_role.clone(),
                idempotency_token: Some(Uuid::new_v4().to_string()),
            })
            .await
            .map_err(|e| Self::error("StartBuild", e))?;

        let build = out
            .build
            .ok_or_else(|| LaunchError::UnexpectedResponse("StartBuild returned no build".into()))?;

        info!(build_id = %build.id, "build started");
        Ok(to_task(&build))
    }

    async fn wait_for_task(
        &self,
        params: &WaitForTaskParams,
        cancel: &CancellationToken,
    ) -> Result<WaitForTaskResult, LaunchError> {
        let id = params.id.as_str();

        let waiter = Waiter::new(WAITER_NAME, self.waiter);
        let attempts = waiter
            .wait(cancel, move || async move {
                let out = self.get_build(id).await?;
                builds_complete(id, &out)
            })
            .await?;

        info!(build_id = id, attempts, "build complete");
        Ok(WaitForTaskResult { id: params.id.clone() })
    }

    async fn get_task_status(
        &self,
        params: &GetTaskStatusParams,
    ) -> Result<GetTaskStatusResult, LaunchError> {
        let out = self.get_build(&params.id).await?;
        let build = out
            .builds
            .first()
            .ok_or_else(|| LaunchError::TaskNotFound(params.id.clone()))?;

        info!(
            build_id = %build.id,
            build_complete = build.build_complete,
            build_status = build.build_status.as_deref().unwrap_or_default(),
            "describe build"
        );
        Ok(to_task(build))
    }

    async fn stop_task(&self, params: &StopTaskParams) -> Result<StopTaskResult, LaunchError> {
        let out = self
            .codebuild
            .stop_build(StopBuildInput {
                id: params.id.clone(),
            })
            .await
            .map_err(|e| Self::error("StopBuild", e))?;

        let build = out
            .build
            .ok_or_else(|| LaunchError::UnexpectedResponse("StopBuild returned no build".into()))?;

        info!(build_id = %build.id, "stop requested");
        Ok(to_task(&build))
    }

    async fn cleanup_task(&self, params: &CleanupTaskParams) -> Result<CleanupTaskResult, LaunchError> {
        let cb = params
            .codebuild
            .as_ref()
            .ok_or(LaunchError::MissingBackendParams)?;

        self.codebuild
            .delete_project(DeleteProjectInput {
                name: cb.project_name.clone(),
            })
            .await
            .map_err(|e| Self::error("DeleteProject", e))?;

        info!(project = %cb.project_name, "deleted codebuild project");
        Ok(CleanupTaskResult {})
    }

    async fn get_task_logs(&self, params: &GetTaskLogsParams) -> Result<GetTaskLogsResult, LaunchError> {
        let cb = params
            .codebuild
            .as_ref()
            .ok_or(LaunchError::MissingBackendParams)?;
        let group_name = log_group_name(&cb.project_name);
        let stream_name = log_stream_name(&cb.task_id);

        debug!(group = %group_name, stream = %stream_name, "read logs");

        let res = self
            .reader
            .read_logs(&ReadLogsParams {
                group_name,
                stream_name,
                next_token: params.next_token.clone(),
            })
            .await
            .map_err(|e| Self::error("GetLogEvents", e))?;

        Ok(GetTaskLogsResult {
            log_lines: res.log_lines,
            next_token: res.next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_known_status() {
        assert_eq!(convert_task_status("IN_PROGRESS"), TaskStatus::Running);
        assert_eq!(convert_task_status("SUCCEEDED"), TaskStatus::Succeeded);
        assert_eq!(convert_task_status("STOPPED"), TaskStatus::Stopped);
        assert_eq!(convert_task_status("FAILED"), TaskStatus::Failed);
        assert_eq!(convert_task_status("FAULT"), TaskStatus::Failed);
        assert_eq!(convert_task_status("TIMED_OUT"), TaskStatus::Failed);
    }

    #[test]
    fn unknown_status_fails_closed() {
        assert_eq!(convert_task_status("QUEUED_FOREVER"), TaskStatus::Failed);
        assert_eq!(convert_task_status(""), TaskStatus::Failed);
    }

    #[test]
    fn builds_log_names() {
        assert_eq!(log_group_name("build-1"), "/aws/codebuild/build-1");
        assert_eq!(
            log_stream_name("build-1:6f2b1c3e-0000-4000-8000-000000000000"),
            "codebuild/6f2b1c3e-0000-4000-8000-000000000000"
        );
        assert_eq!(log_stream_name("6f2b1c3e"), "codebuild/6f2b1c3e");
    }

    #[test]
    fn complete_only_when_every_build_is() {
        let build = |complete| Build {
            id: "b".into(),
            build_complete: complete,
            ..Default::default()
        };
        let mut out = BatchGetBuildsOutput {
            builds: vec![build(true), build(false)],
            builds_not_found: vec![],
        };
        assert!(!builds_complete("b", &out).unwrap());
        out.builds[1].build_complete = true;
        assert!(builds_complete("b", &out).unwrap());
    }

    #[test]
    fn build_not_found_is_fatal() {
        let out = BatchGetBuildsOutput {
            builds: vec![],
            builds_not_found: vec!["b".into()],
        };
        assert!(matches!(builds_complete("b", &out), Err(LaunchError::TaskNotFound(_))));
    }
}
