//! CodeBuild calls and wire shapes (JSON-1.1, camelCase).

use chrono::{DateTime, Utc};
use launch_core::aws::timestamp::epoch_seconds_opt;
use launch_core::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[async_trait::async_trait]
pub trait CodeBuildApi: Send + Sync {
    async fn create_project(&self, input: ProjectInput) -> Result<ProjectOutput, ApiError>;

    /// Fails with `ResourceNotFoundException` when the project does not exist.
    async fn update_project(&self, input: ProjectInput) -> Result<ProjectOutput, ApiError>;

    async fn delete_project(&self, input: DeleteProjectInput) -> Result<(), ApiError>;

    async fn start_build(&self, input: StartBuildInput) -> Result<BuildOutput, ApiError>;

    async fn batch_get_builds(&self, input: BatchGetBuildsInput) -> Result<BatchGetBuildsOutput, ApiError>;

    async fn stop_build(&self, input: StopBuildInput) -> Result<BuildOutput, ApiError>;
}

pub const ENVIRONMENT_TYPE_LINUX_CONTAINER: &str = "LINUX_CONTAINER";
pub const ARTIFACTS_TYPE_NO_ARTIFACTS: &str = "NO_ARTIFACTS";
pub const SOURCE_TYPE_NO_SOURCE: &str = "NO_SOURCE";
pub const LOGS_STATUS_ENABLED: &str = "ENABLED";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub value: String,
}

pub fn environment_variables(env: &BTreeMap<String, String>) -> Vec<EnvironmentVariable> {
    env.iter()
        .map(|(name, value)| EnvironmentVariable {
            name: name.clone(),
            value: value.clone(),
            kind: None,
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
// Projects

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEnvironment {
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    pub compute_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<EnvironmentVariable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectArtifacts {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buildspec: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudWatchLogsConfig {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogsConfig {
    pub cloud_watch_logs: CloudWatchLogsConfig,
}

/// Body of both `CreateProject` and `UpdateProject`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub name: String,
    pub environment: ProjectEnvironment,
    pub artifacts: ProjectArtifacts,
    pub source: ProjectSource,
    pub service_role: String,
    pub logs_config: LogsConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutput {
    #[serde(default)]
    pub project: Option<Project>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectInput {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Builds

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartBuildInput {
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment_variables_override: Vec<EnvironmentVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_type_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged_mode_override: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogsLocation {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub stream_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// `<project>:<uuid>`
    pub id: String,
    #[serde(default)]
    pub arn: Option<String>,
    #[serde(default)]
    pub build_status: Option<String>,
    #[serde(default)]
    pub build_complete: bool,
    #[serde(default)]
    pub current_phase: Option<String>,
    #[serde(default, with = "epoch_seconds_opt")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "epoch_seconds_opt")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub logs: Option<LogsLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    #[serde(default)]
    pub build: Option<Build>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetBuildsInput {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetBuildsOutput {
    #[serde(default)]
    pub builds: Vec<Build>,
    #[serde(default)]
    pub builds_not_found: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StopBuildInput {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_input_uses_codebuild_field_names() {
        let input = ProjectInput {
            name: "build-1".into(),
            environment: ProjectEnvironment {
                kind: ENVIRONMENT_TYPE_LINUX_CONTAINER.into(),
                image: "aws/codebuild/standard:7.0".into(),
                compute_type: "BUILD_GENERAL1_SMALL".into(),
                privileged_mode: Some(true),
                environment_variables: environment_variables(&BTreeMap::from([(
                    "A".to_string(),
                    "1".to_string(),
                )])),
            },
            artifacts: ProjectArtifacts {
                kind: ARTIFACTS_TYPE_NO_ARTIFACTS.into(),
            },
            source: ProjectSource {
                kind: SOURCE_TYPE_NO_SOURCE.into(),
                buildspec: Some("version: 0.2".into()),
            },
            service_role: "arn:role".into(),
            logs_config: LogsConfig {
                cloud_watch_logs: CloudWatchLogsConfig {
                    status: LOGS_STATUS_ENABLED.into(),
                    group_name: Some("/aws/codebuild/build-1".into()),
                    stream_name: Some("codebuild".into()),
                },
            },
            tags: vec![],
        };

        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["environment"]["type"], "LINUX_CONTAINER");
        assert_eq!(value["environment"]["privilegedMode"], true);
        assert_eq!(value["environment"]["environmentVariables"][0]["name"], "A");
        assert!(value["environment"]["environmentVariables"][0].get("type").is_none());
        assert_eq!(value["artifacts"]["type"], "NO_ARTIFACTS");
        assert_eq!(value["source"]["buildspec"], "version: 0.2");
        assert_eq!(value["logsConfig"]["cloudWatchLogs"]["streamName"], "codebuild");
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn decodes_build() {
        let json = r#"{
            "builds": [{
                "id": "build-1:6c3c6b33",
                "arn": "arn:aws:codebuild:us-east-1:123456789012:build/build-1:6c3c6b33",
                "buildStatus": "SUCCEEDED",
                "buildComplete": true,
                "startTime": 1700000000.5,
                "endTime": 1700000030.0
            }],
            "buildsNotFound": ["build-1:gone"]
        }"#;
        let out: BatchGetBuildsOutput = serde_json::from_str(json).unwrap();
        assert!(out.builds[0].build_complete);
        assert_eq!(out.builds[0].start_time.unwrap().timestamp_millis(), 1_700_000_000_500);
        assert_eq!(out.builds_not_found, vec!["build-1:gone".to_string()]);
    }
}
