//! ECS calls and wire shapes (JSON-1.1, camelCase).

use chrono::{DateTime, Utc};
use launch_core::aws::timestamp::epoch_seconds_opt;
use launch_core::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The ECS calls the launcher makes.
#[async_trait::async_trait]
pub trait EcsApi: Send + Sync {
    async fn describe_task_definition(
        &self,
        input: DescribeTaskDefinitionInput,
    ) -> Result<DescribeTaskDefinitionOutput, ApiError>;

    async fn register_task_definition(
        &self,
        input: RegisterTaskDefinitionInput,
    ) -> Result<RegisterTaskDefinitionOutput, ApiError>;

    async fn deregister_task_definition(
        &self,
        input: DeregisterTaskDefinitionInput,
    ) -> Result<DeregisterTaskDefinitionOutput, ApiError>;

    async fn run_task(&self, input: RunTaskInput) -> Result<RunTaskOutput, ApiError>;

    async fn describe_tasks(&self, input: DescribeTasksInput) -> Result<DescribeTasksOutput, ApiError>;

    async fn stop_task(&self, input: StopTaskInput) -> Result<StopTaskOutput, ApiError>;
}

pub const LAUNCH_TYPE_FARGATE: &str = "FARGATE";
pub const NETWORK_MODE_AWSVPC: &str = "awsvpc";
pub const LOG_DRIVER_AWSLOGS: &str = "awslogs";
pub const ASSIGN_PUBLIC_IP_ENABLED: &str = "ENABLED";
pub const PLATFORM_VERSION_LATEST: &str = "LATEST";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Name/value pairs sorted by name.
pub fn key_value_pairs(env: &BTreeMap<String, String>) -> Vec<KeyValuePair> {
    env.iter()
        .map(|(name, value)| KeyValuePair {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

pub fn tags(tags: &BTreeMap<String, String>) -> Vec<Tag> {
    tags.iter()
        .map(|(key, value)| Tag {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Task definitions

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValuePair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_configuration: Option<LogConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(default)]
    pub task_definition_arn: Option<String>,
    pub family: String,
    pub revision: i64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub execution_role_arn: Option<String>,
    #[serde(default)]
    pub task_role_arn: Option<String>,
    #[serde(default)]
    pub network_mode: Option<String>,
    #[serde(default)]
    pub requires_compatibilities: Vec<String>,
}

impl TaskDefinition {
    /// `family:revision`, the id used to launch and deregister.
    pub fn id(&self) -> String {
        format!("{}:{}", self.family, self.revision)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTaskDefinitionInput {
    /// Family, `family:revision` or full ARN.
    pub task_definition: String,
    /// `["TAGS"]` to have the definition's tags returned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTaskDefinitionOutput {
    #[serde(default)]
    pub task_definition: Option<TaskDefinition>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTaskDefinitionInput {
    pub family: String,
    pub requires_compatibilities: Vec<String>,
    pub network_mode: String,
    pub cpu: String,
    pub memory: String,
    pub execution_role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_role_arn: Option<String>,
    pub container_definitions: Vec<ContainerDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTaskDefinitionOutput {
    #[serde(default)]
    pub task_definition: Option<TaskDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeregisterTaskDefinitionInput {
    pub task_definition: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeregisterTaskDefinitionOutput {
    #[serde(default)]
    pub task_definition: Option<TaskDefinition>,
}

// ---------------------------------------------------------------------------
// Tasks

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValuePair>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOverride {
    pub container_overrides: Vec<ContainerOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AwsVpcConfiguration {
    pub subnets: Vec<String>,
    pub assign_public_ip: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: AwsVpcConfiguration,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskInput {
    pub cluster: String,
    pub task_definition: String,
    pub launch_type: String,
    pub count: u32,
    pub platform_version: String,
    pub network_configuration: NetworkConfiguration,
    pub overrides: TaskOverride,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EcsTask {
    pub task_arn: String,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub desired_status: Option<String>,
    #[serde(default)]
    pub stop_code: Option<String>,
    #[serde(default)]
    pub stopped_reason: Option<String>,
    #[serde(default, with = "epoch_seconds_opt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "epoch_seconds_opt")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskOutput {
    #[serde(default)]
    pub tasks: Vec<EcsTask>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTasksInput {
    pub cluster: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DescribeTasksOutput {
    #[serde(default)]
    pub tasks: Vec<EcsTask>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StopTaskInput {
    pub cluster: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StopTaskOutput {
    #[serde(default)]
    pub task: Option<EcsTask>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_described_task() {
        let json = r#"{
            "tasks": [{
                "taskArn": "arn:aws:ecs:us-east-1:123456789012:task/cluster-a/0123abcd",
                "lastStatus": "STOPPED",
                "stopCode": "EssentialContainerExited",
                "startedAt": 1700000000.123,
                "stoppedAt": 1700000060.5,
                "containers": [{"name": "job", "exitCode": 0, "lastStatus": "STOPPED"}]
            }],
            "failures": []
        }"#;
        let out: DescribeTasksOutput = serde_json::from_str(json).unwrap();
        let task = &out.tasks[0];
        assert_eq!(task.stop_code.as_deref(), Some("EssentialContainerExited"));
        assert_eq!(task.started_at.unwrap().timestamp_millis(), 1_700_000_000_123);
        assert_eq!(task.containers[0].exit_code, Some(0));
    }

    #[test]
    fn run_task_input_uses_ecs_field_names() {
        let input = RunTaskInput {
            cluster: "cluster-a".into(),
            task_definition: "job-1:1".into(),
            launch_type: LAUNCH_TYPE_FARGATE.into(),
            count: 1,
            platform_version: PLATFORM_VERSION_LATEST.into(),
            network_configuration: NetworkConfiguration {
                awsvpc_configuration: AwsVpcConfiguration {
                    subnets: vec!["subnet-1".into()],
                    assign_public_ip: ASSIGN_PUBLIC_IP_ENABLED.into(),
                },
            },
            overrides: TaskOverride {
                container_overrides: vec![ContainerOverride {
                    name: "job".into(),
                    ..Default::default()
                }],
            },
            tags: tags(&BTreeMap::from([("team".to_string(), "a".to_string())])),
            client_token: None,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["launchType"], "FARGATE");
        assert_eq!(value["networkConfiguration"]["awsvpcConfiguration"]["assignPublicIp"], "ENABLED");
        assert_eq!(value["overrides"]["containerOverrides"][0]["name"], "job");
        assert!(value["overrides"]["containerOverrides"][0].get("cpu").is_none());
        assert_eq!(value["tags"][0]["key"], "team");
        assert!(value.get("clientToken").is_none());
    }
}
