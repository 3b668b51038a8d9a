//! Request and result shapes for every launcher operation.
//!
//! Requests carry common fields plus one optional block per backend; the
//! dispatcher checks that exactly one block is populated before routing.

use crate::backend::impl_backend_params;
use crate::logs::LogLine;
use crate::task::Task;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Environment = BTreeMap<String, String>;
pub type Tags = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// DefineTask

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DefineTaskParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefineParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebuild: Option<CodebuildDefineParams>,
    /// Container image used by the definition.
    pub image: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EcsDefineParams {
    pub definition_name: String,
    pub container_name: String,
    pub execution_role_arn: String,
    #[serde(default)]
    pub task_role_arn: Option<String>,
    /// CPU units, defaults to 256.
    #[serde(default)]
    pub cpu: Option<u32>,
    /// Memory in MiB, defaults to 512.
    #[serde(default)]
    pub memory: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CodebuildDefineParams {
    pub project_name: String,
    pub compute_type: String,
    #[serde(default)]
    pub privileged_mode: Option<bool>,
    pub buildspec: String,
    pub service_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct DefineTaskResult {
    /// `family:revision` for ECS, the project ARN for CodeBuild.
    pub id: String,
    pub cloudwatch_log_group_name: String,
    pub cloudwatch_stream_prefix: String,
}

// ---------------------------------------------------------------------------
// LaunchTask

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct LaunchTaskParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsLaunchParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebuild: Option<CodebuildLaunchParams>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EcsLaunchParams {
    pub cluster_name: String,
    pub task_definition: String,
    pub container_name: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub cpu: Option<u32>,
    #[serde(default)]
    pub memory: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CodebuildLaunchParams {
    pub project_name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub compute_type: Option<String>,
    #[serde(default)]
    pub privileged_mode: Option<bool>,
    #[serde(default)]
    pub service_role: Option<String>,
}

pub type LaunchTaskResult = Task;

// ---------------------------------------------------------------------------
// DefineAndLaunch

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct DefineAndLaunchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsDefineAndLaunchParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebuild: Option<CodebuildDefineAndLaunchParams>,
    pub image: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EcsDefineAndLaunchParams {
    #[serde(flatten)]
    pub definition: EcsDefineParams,
    pub cluster_name: String,
    #[serde(default)]
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CodebuildDefineAndLaunchParams {
    #[serde(flatten)]
    pub definition: CodebuildDefineParams,
}

impl DefineAndLaunchParams {
    pub fn define_params(&self) -> DefineTaskParams {
        DefineTaskParams {
            ecs: self.ecs.as_ref().map(|ecs| ecs.definition.clone()),
            codebuild: self.codebuild.as_ref().map(|cb| cb.definition.clone()),
            image: self.image.clone(),
            region: self.region.clone(),
            environment: self.environment.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Launch request for the definition created by [`Self::define_params`].
    pub fn launch_params(&self, definition_id: &str) -> LaunchTaskParams {
        LaunchTaskParams {
            ecs: self.ecs.as_ref().map(|ecs| EcsLaunchParams {
                cluster_name: ecs.cluster_name.clone(),
                task_definition: definition_id.to_string(),
                container_name: ecs.definition.container_name.clone(),
                subnets: ecs.subnets.clone(),
                cpu: ecs.definition.cpu,
                memory: ecs.definition.memory,
            }),
            codebuild: self.codebuild.as_ref().map(|cb| CodebuildLaunchParams {
                project_name: cb.definition.project_name.clone(),
                ..Default::default()
            }),
            environment: self.environment.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Reference used to wait on or query the launched task.
    pub fn task_ref(&self, id: &str) -> TaskRefParams {
        TaskRefParams {
            id: id.to_string(),
            ecs: self.ecs.as_ref().map(|ecs| EcsTaskRef {
                cluster_name: ecs.cluster_name.clone(),
            }),
            codebuild: self.codebuild.as_ref().map(|_| CodebuildTaskRef {}),
        }
    }

    /// Log request for the launched task.
    pub fn logs_params(&self, task: &Task) -> GetTaskLogsParams {
        GetTaskLogsParams {
            ecs: self.ecs.as_ref().map(|ecs| EcsLogsParams {
                definition_name: ecs.definition.definition_name.clone(),
                task_arn: task.id.clone(),
            }),
            codebuild: self.codebuild.as_ref().map(|cb| CodebuildLogsParams {
                project_name: cb.definition.project_name.clone(),
                task_id: task.id.clone(),
            }),
            next_token: None,
        }
    }

    /// Cleanup request for the definition.
    pub fn cleanup_params(&self, definition_id: &str) -> CleanupTaskParams {
        CleanupTaskParams {
            ecs: self.ecs.as_ref().map(|_| EcsCleanupParams {
                task_definition: definition_id.to_string(),
            }),
            codebuild: self.codebuild.as_ref().map(|cb| CodebuildCleanupParams {
                project_name: cb.definition.project_name.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct DefineAndLaunchResult {
    #[serde(flatten)]
    pub task: Task,
    pub definition_id: String,
    pub cloudwatch_log_group_name: String,
    pub cloudwatch_stream_prefix: String,
}

// ---------------------------------------------------------------------------
// WaitForTask / GetTaskStatus / StopTask

/// Identifies a launched task; shared by wait, status and stop requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct TaskRefParams {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsTaskRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebuild: Option<CodebuildTaskRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct EcsTaskRef {
    pub cluster_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CodebuildTaskRef {}

pub type WaitForTaskParams = TaskRefParams;
pub type GetTaskStatusParams = TaskRefParams;
pub type StopTaskParams = TaskRefParams;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct WaitForTaskResult {
    pub id: String,
}

pub type GetTaskStatusResult = Task;
pub type StopTaskResult = Task;

// ---------------------------------------------------------------------------
// CleanupTask

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CleanupTaskParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsCleanupParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebuild: Option<CodebuildCleanupParams>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct EcsCleanupParams {
    /// `family:revision` returned by DefineTask.
    pub task_definition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CodebuildCleanupParams {
    pub project_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CleanupTaskResult {}

// ---------------------------------------------------------------------------
// GetTaskLogs

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct GetTaskLogsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecs: Option<EcsLogsParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebuild: Option<CodebuildLogsParams>,
    /// Cursor returned by the previous call, if any.
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct EcsLogsParams {
    pub definition_name: String,
    pub task_arn: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct CodebuildLogsParams {
    pub project_name: String,
    pub task_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct GetTaskLogsResult {
    pub log_lines: Vec<LogLine>,
    #[serde(default)]
    pub next_token: Option<String>,
}

impl_backend_params!(DefineTaskParams, EcsDefineParams, CodebuildDefineParams);
impl_backend_params!(LaunchTaskParams, EcsLaunchParams, CodebuildLaunchParams);
impl_backend_params!(
    DefineAndLaunchParams,
    EcsDefineAndLaunchParams,
    CodebuildDefineAndLaunchParams
);
impl_backend_params!(TaskRefParams, EcsTaskRef, CodebuildTaskRef);
impl_backend_params!(CleanupTaskParams, EcsCleanupParams, CodebuildCleanupParams);
impl_backend_params!(GetTaskLogsParams, EcsLogsParams, CodebuildLogsParams);
