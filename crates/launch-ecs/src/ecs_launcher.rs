use crate::api::*;
use launch_core::error::{ApiError, LaunchError};
use launch_core::logs::{ensure_log_group, CloudWatchLogsApi, CloudWatchLogsReader, LogsReader, ReadLogsParams};
use launch_core::params::{
    CleanupTaskParams, CleanupTaskResult, DefineTaskParams, DefineTaskResult, EcsDefineParams,
    GetTaskLogsParams, GetTaskLogsResult, GetTaskStatusParams, GetTaskStatusResult,
    LaunchTaskParams, LaunchTaskResult, StopTaskParams, StopTaskResult, WaitForTaskParams,
    WaitForTaskResult,
};
use launch_core::task::{BackendKind, Task, TaskDetail, TaskStatus};
use launch_core::{Launcher, Waiter, WaiterConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Prefix of every ECS log stream name.
pub const ECS_STREAM_PREFIX: &str = "ecs";

/// Default Fargate task size when the request names none.
pub const DEFAULT_CPU: u32 = 256;
pub const DEFAULT_MEMORY: u32 = 512;

const STOP_REASON: &str = "request stop task";
const WAITER_NAME: &str = "TasksStopped";
const MISSING: &str = "MISSING";
const INCLUDE_TAGS: &str = "TAGS";

/// `/aws/fargate/<definition>`
pub fn log_group_name(definition_name: &str) -> String {
    format!("/aws/fargate/{}", definition_name)
}

/// `ecs/<definition>/<task-id>`, as written by the awslogs driver.
pub fn log_stream_name(definition_name: &str, task_arn: &str) -> String {
    format!(
        "{}/{}/{}",
        ECS_STREAM_PREFIX,
        definition_name,
        shorten_task_arn(task_arn)
    )
}

/// Task id from `arn:aws:ecs:<region>:<account>:task/<cluster>/<id>`.
pub fn shorten_task_arn(task_arn: &str) -> String {
    let tokens: Vec<&str> = task_arn.split('/').collect();
    match tokens.as_slice() {
        [_, _, id] => id.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Map ECS `lastStatus`, stop code and container exit codes to the
/// canonical status. Anything unrecognised counts as a failure.
pub fn convert_task_status(task: &EcsTask) -> TaskStatus {
    match task.last_status.as_deref().unwrap_or_default() {
        "PROVISIONING" | "PENDING" | "ACTIVATING" | "RUNNING" | "DEACTIVATING" | "STOPPING"
        | "DEPROVISIONING" => TaskStatus::Running,
        "STOPPED" => match task.stop_code.as_deref() {
            Some("EssentialContainerExited") if !any_container_failed(task) => TaskStatus::Succeeded,
            Some("UserInitiated") => TaskStatus::Stopped,
            _ => TaskStatus::Failed,
        },
        other => {
            warn!(task = %task.task_arn, status = other, "unrecognised ECS task status");
            TaskStatus::Failed
        }
    }
}

fn any_container_failed(task: &EcsTask) -> bool {
    task.containers
        .iter()
        .any(|c| matches!(c.exit_code, Some(code) if code != 0))
}

fn to_task(task: &EcsTask) -> Task {
    Task {
        id: task.task_arn.clone(),
        task_status: convert_task_status(task),
        start_time: task.started_at,
        end_time: task.stopped_at,
        detail: TaskDetail::Ecs {
            task_arn: task.task_arn.clone(),
            task_id: shorten_task_arn(&task.task_arn),
            last_status: task.last_status.clone().unwrap_or_default(),
            stop_code: task.stop_code.clone(),
        },
    }
}

fn is_missing(failures: &[Failure]) -> bool {
    failures.iter().any(|f| f.reason.as_deref() == Some(MISSING))
}

fn describe_failures(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(|f| {
            format!(
                "{} ({})",
                f.reason.as_deref().unwrap_or("unknown"),
                f.arn.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// DescribeTaskDefinition reports an unknown family as a client error.
fn is_unknown_definition(err: &ApiError) -> bool {
    err.is_code("ClientException")
        && err
            .message()
            .map(|m| m.to_ascii_lowercase().contains("unable to describe task definition"))
            .unwrap_or(false)
}

fn sorted_containers(containers: &[ContainerDefinition]) -> Vec<ContainerDefinition> {
    containers
        .iter()
        .cloned()
        .map(|mut c| {
            c.environment.sort();
            c
        })
        .collect()
}

fn sorted_tags(tags: &[Tag]) -> Vec<Tag> {
    let mut tags = tags.to_vec();
    tags.sort();
    tags
}

/// Whether `current` already is what `wanted` would register.
fn matches_registration(
    current: &TaskDefinition,
    current_tags: &[Tag],
    wanted: &RegisterTaskDefinitionInput,
) -> bool {
    current.status.as_deref() != Some("INACTIVE")
        && sorted_tags(current_tags) == sorted_tags(&wanted.tags)
        && current.cpu.as_deref() == Some(wanted.cpu.as_str())
        && current.memory.as_deref() == Some(wanted.memory.as_str())
        && current.execution_role_arn.as_deref() == Some(wanted.execution_role_arn.as_str())
        && current.task_role_arn == wanted.task_role_arn
        && current.network_mode.as_deref() == Some(wanted.network_mode.as_str())
        && sorted_containers(&current.container_definitions)
            == sorted_containers(&wanted.container_definitions)
}

fn registration(
    ecs: &EcsDefineParams,
    params: &DefineTaskParams,
    region: &str,
    group: &str,
) -> RegisterTaskDefinitionInput {
    let options = BTreeMap::from([
        ("awslogs-group".to_string(), group.to_string()),
        ("awslogs-region".to_string(), region.to_string()),
        ("awslogs-stream-prefix".to_string(), ECS_STREAM_PREFIX.to_string()),
    ]);

    RegisterTaskDefinitionInput {
        family: ecs.definition_name.clone(),
        requires_compatibilities: vec![LAUNCH_TYPE_FARGATE.to_string()],
        network_mode: NETWORK_MODE_AWSVPC.to_string(),
        cpu: ecs.cpu.unwrap_or(DEFAULT_CPU).to_string(),
        memory: ecs.memory.unwrap_or(DEFAULT_MEMORY).to_string(),
        execution_role_arn: ecs.execution_role_arn.clone(),
        task_role_arn: ecs.task_role_arn.clone(),
        container_definitions: vec![ContainerDefinition {
            name: ecs.container_name.clone(),
            image: params.image.clone(),
            environment: key_value_pairs(&params.environment),
            log_configuration: Some(LogConfiguration {
                log_driver: LOG_DRIVER_AWSLOGS.to_string(),
                options,
            }),
        }],
        tags: tags(&params.tags),
    }
}

/// Fargate launcher: task definitions, `RunTask` and the `awslogs` streams.
pub struct EcsLauncher {
    ecs: Arc<dyn EcsApi>,
    logs: Arc<dyn CloudWatchLogsApi>,
    reader: Arc<dyn LogsReader>,
    region: String,
    waiter: WaiterConfig,
}

impl EcsLauncher {
    /// `region` is written into the awslogs options of new definitions
    /// unless the request names its own.
    pub fn new(ecs: Arc<dyn EcsApi>, logs: Arc<dyn CloudWatchLogsApi>, region: impl Into<String>) -> Self {
        let reader = Arc::new(CloudWatchLogsReader::new(logs.clone()));
        Self {
            ecs,
            logs,
            reader,
            region: region.into(),
            waiter: WaiterConfig::default(),
        }
    }

    pub fn with_waiter(mut self, waiter: WaiterConfig) -> Self {
        self.waiter = waiter;
        self
    }

    fn error(operation: &'static str, source: ApiError) -> LaunchError {
        LaunchError::backend(BackendKind::Ecs, operation, source)
    }

    /// Latest active revision of a family and its tags, if the family exists.
    async fn latest_definition(&self, family: &str) -> Result<Option<(TaskDefinition, Vec<Tag>)>, LaunchError> {
        match self
            .ecs
            .describe_task_definition(DescribeTaskDefinitionInput {
                task_definition: family.to_string(),
                include: vec![INCLUDE_TAGS.to_string()],
            })
            .await
        {
            Ok(out) => Ok(out.task_definition.map(|definition| (definition, out.tags))),
            Err(err) if is_unknown_definition(&err) => Ok(None),
            Err(err) => Err(Self::error("DescribeTaskDefinition", err)),
        }
    }

    async fn describe(&self, cluster: &str, task: &str) -> Result<DescribeTasksOutput, LaunchError> {
        let out = self
            .ecs
            .describe_tasks(DescribeTasksInput {
                cluster: cluster.to_string(),
                tasks: vec![task.to_string()],
            })
            .await
            .map_err(|e| Self::error("DescribeTasks", e))?;
        debug!(?out, "DescribeTasks");
        Ok(out)
    }
}

/// True once every described task has stopped.
fn tasks_stopped(id: &str, out: &DescribeTasksOutput) -> Result<bool, LaunchError> {
    if is_missing(&out.failures) {
        return Err(LaunchError::TaskNotFound(id.to_string()));
    }
    if out.tasks.is_empty() {
        return Ok(false);
    }
    Ok(out
        .tasks
        .iter()
        .all(|t| t.last_status.as_deref() == Some("STOPPED")))
}

#[async_trait::async_trait]
impl Launcher for EcsLauncher {
    fn kind(&self) -> BackendKind {
        BackendKind::Ecs
    }

    async fn define_task(&self, params: &DefineTaskParams) -> Result<DefineTaskResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;
        let group = log_group_name(&ecs.definition_name);

        ensure_log_group(self.logs.as_ref(), &group)
            .await
            .map_err(|e| Self::error("CreateLogGroup", e))?;

        let region = params.region.as_deref().unwrap_or(&self.region);
        let wanted = registration(ecs, params, region, &group);

        let id = match self.latest_definition(&ecs.definition_name).await? {
            Some((current, tags)) if matches_registration(&current, &tags, &wanted) => {
                info!(definition = %current.id(), "task definition unchanged, reusing");
                current.id()
            }
            _ => {
                let out = self
                    .ecs
                    .register_task_definition(wanted)
                    .await
                    .map_err(|e| Self::error("RegisterTaskDefinition", e))?;
                debug!(?out, "RegisterTaskDefinition");

                let definition = out.task_definition.ok_or_else(|| {
                    LaunchError::UnexpectedResponse("RegisterTaskDefinition returned no definition".into())
                })?;
                info!(definition = %definition.id(), "registered task definition");
                definition.id()
            }
        };

        Ok(DefineTaskResult {
            id,
            cloudwatch_log_group_name: group,
            cloudwatch_stream_prefix: ECS_STREAM_PREFIX.to_string(),
        })
    }

    async fn launch_task(&self, params: &LaunchTaskParams) -> Result<LaunchTaskResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;

        info!(
            cluster = %ecs.cluster_name,
            task_definition = %ecs.task_definition,
            "launch task"
        );

        let out = self
            .ecs
            .run_task(RunTaskInput {
                cluster: ecs.cluster_name.clone(),
                task_definition: ecs.task_definition.clone(),
                launch_type: LAUNCH_TYPE_FARGATE.to_string(),
                count: 1,
                platform_version: PLATFORM_VERSION_LATEST.to_string(),
                network_configuration: NetworkConfiguration {
                    awsvpc_configuration: AwsVpcConfiguration {
                        subnets: ecs.subnets.clone(),
                        assign_public_ip: ASSIGN_PUBLIC_IP_ENABLED.to_string(),
                    },
                },
                overrides: TaskOverride {
                    container_overrides: vec![ContainerOverride {
                        name: ecs.container_name.clone(),
                        cpu: ecs.cpu,
                        memory: ecs.memory,
                        environment: key_value_pairs(&params.environment),
                    }],
                },
                tags: tags(&params.tags),
                client_token: Some(Uuid::new_v4().to_string()),
            })
            .await
            .map_err(|e| Self::error("RunTask", e))?;

        let task = out.tasks.first().ok_or_else(|| {
            LaunchError::UnexpectedResponse(format!(
                "RunTask started no task: {}",
                describe_failures(&out.failures)
            ))
        })?;

        info!(task_id = %shorten_task_arn(&task.task_arn), "task provisioned");
        Ok(to_task(task))
    }

    async fn wait_for_task(
        &self,
        params: &WaitForTaskParams,
        cancel: &CancellationToken,
    ) -> Result<WaitForTaskResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;
        let cluster = ecs.cluster_name.as_str();
        let id = params.id.as_str();

        let waiter = Waiter::new(WAITER_NAME, self.waiter);
        let attempts = waiter
            .wait(cancel, move || async move {
                let out = self.describe(cluster, id).await?;
                tasks_stopped(id, &out)
            })
            .await?;

        info!(task_id = %shorten_task_arn(id), attempts, "task stopped");
        Ok(WaitForTaskResult { id: params.id.clone() })
    }

    async fn get_task_status(
        &self,
        params: &GetTaskStatusParams,
    ) -> Result<GetTaskStatusResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;

        let out = self.describe(&ecs.cluster_name, &params.id).await?;
        if is_missing(&out.failures) {
            return Err(LaunchError::TaskNotFound(params.id.clone()));
        }
        let task = out
            .tasks
            .first()
            .ok_or_else(|| LaunchError::TaskNotFound(params.id.clone()))?;

        info!(
            task_id = %shorten_task_arn(&task.task_arn),
            stop_code = task.stop_code.as_deref().unwrap_or_default(),
            stopped_reason = task.stopped_reason.as_deref().unwrap_or_default(),
            "describe task"
        );
        Ok(to_task(task))
    }

    async fn stop_task(&self, params: &StopTaskParams) -> Result<StopTaskResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;

        let out = self
            .ecs
            .stop_task(StopTaskInput {
                cluster: ecs.cluster_name.clone(),
                task: params.id.clone(),
                reason: Some(STOP_REASON.to_string()),
            })
            .await
            .map_err(|e| Self::error("StopTask", e))?;

        let task = out
            .task
            .ok_or_else(|| LaunchError::UnexpectedResponse("StopTask returned no task".into()))?;

        info!(task_id = %shorten_task_arn(&task.task_arn), "stop requested");
        Ok(to_task(&task))
    }

    async fn cleanup_task(&self, params: &CleanupTaskParams) -> Result<CleanupTaskResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;

        self.ecs
            .deregister_task_definition(DeregisterTaskDefinitionInput {
                task_definition: ecs.task_definition.clone(),
            })
            .await
            .map_err(|e| Self::error("DeregisterTaskDefinition", e))?;

        info!(definition = %ecs.task_definition, "deregistered task definition");
        Ok(CleanupTaskResult {})
    }

    async fn get_task_logs(&self, params: &GetTaskLogsParams) -> Result<GetTaskLogsResult, LaunchError> {
        let ecs = params.ecs.as_ref().ok_or(LaunchError::MissingBackendParams)?;
        let group_name = log_group_name(&ecs.definition_name);
        let stream_name = log_stream_name(&ecs.definition_name, &ecs.task_arn);

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
