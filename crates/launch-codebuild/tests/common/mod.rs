#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use launch_codebuild::api::*;
use launch_core::error::ApiError;
use launch_core::logs::{
    CloudWatchLogsApi, CreateLogGroupInput, GetLogEventsInput, GetLogEventsOutput, OutputLogEvent,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const ARN_PREFIX: &str = "arn:aws:codebuild:us-east-1:123456789012";

/// In-memory CodeBuild.
///
/// Builds stay `IN_PROGRESS` until fetched `complete_after` times, then
/// finish with `final_status`.
pub struct FakeCodeBuild {
    pub complete_after: usize,
    pub final_status: String,
    pub projects: Mutex<BTreeMap<String, ProjectInput>>,
    pub builds: Mutex<HashMap<String, (Build, usize)>>,
    pub start_inputs: Mutex<Vec<StartBuildInput>>,
    pub calls: Mutex<Vec<&'static str>>,
    next_build: AtomicUsize,
}

impl FakeCodeBuild {
    pub fn new(complete_after: usize, final_status: &str) -> Self {
        Self {
            complete_after,
            final_status: final_status.to_string(),
            projects: Mutex::new(BTreeMap::new()),
            builds: Mutex::new(HashMap::new()),
            start_inputs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_build: AtomicUsize::new(1),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: &'static str) {
        self.calls.lock().unwrap().push(op);
    }

    fn project_output(name: &str) -> ProjectOutput {
        ProjectOutput {
            project: Some(Project {
                name: Some(name.to_string()),
                arn: Some(format!("{}:project/{}", ARN_PREFIX, name)),
            }),
        }
    }

    fn not_found(name: &str) -> ApiError {
        ApiError::service(
            "ResourceNotFoundException",
            format!("Project cannot be found: {}:project/{}", ARN_PREFIX, name),
        )
    }
}

#[async_trait::async_trait]
impl CodeBuildApi for FakeCodeBuild {
    async fn create_project(&self, input: ProjectInput) -> Result<ProjectOutput, ApiError> {
        self.record("CreateProject");
        let mut projects = self.projects.lock().unwrap();
        if projects.contains_key(&input.name) {
            return Err(ApiError::service(
                "ResourceAlreadyExistsException",
                format!("Project already exists: {}", input.name),
            ));
        }
        let name = input.name.clone();
        projects.insert(name.clone(), input);
        Ok(Self::project_output(&name))
    }

    async fn update_project(&self, input: ProjectInput) -> Result<ProjectOutput, ApiError> {
        self.record("UpdateProject");
        let mut projects = self.projects.lock().unwrap();
        let Some(project) = projects.get_mut(&input.name) else {
            return Err(Self::not_found(&input.name));
        };
        let name = input.name.clone();
        *project = input;
        Ok(Self::project_output(&name))
    }

    async fn delete_project(&self, input: DeleteProjectInput) -> Result<(), ApiError> {
        self.record("DeleteProject");
        self.projects.lock().unwrap().remove(&input.name);
        Ok(())
    }

    async fn start_build(&self, input: StartBuildInput) -> Result<BuildOutput, ApiError> {
        self.record("StartBuild");
        if !self.projects.lock().unwrap().contains_key(&input.project_name) {
            return Err(Self::not_found(&input.project_name));
        }

        let n = self.next_build.fetch_add(1, Ordering::SeqCst);
        let build_uuid = format!("{:08x}-0000-4000-8000-000000000000", n);
        let id = format!("{}:{}", input.project_name, build_uuid);
        let build = Build {
            arn: Some(format!("{}:build/{}", ARN_PREFIX, id)),
            id: id.clone(),
            build_status: Some("IN_PROGRESS".into()),
            build_complete: false,
            current_phase: Some("SUBMITTED".into()),
            start_time: Utc.timestamp_opt(1_700_000_000, 0).single(),
            end_time: None,
            logs: Some(LogsLocation {
                group_name: Some(format!("/aws/codebuild/{}", input.project_name)),
                stream_name: Some(format!("codebuild/{}", build_uuid)),
            }),
        };
        self.builds.lock().unwrap().insert(id, (build.clone(), 0));
        self.start_inputs.lock().unwrap().push(input);

        Ok(BuildOutput { build: Some(build) })
    }

    async fn batch_get_builds(&self, input: BatchGetBuildsInput) -> Result<BatchGetBuildsOutput, ApiError> {
        self.record("BatchGetBuilds");
        let mut builds = self.builds.lock().unwrap();
        let mut out = BatchGetBuildsOutput::default();

        for id in &input.ids {
            let Some((build, fetched)) = builds.get_mut(id) else {
                out.builds_not_found.push(id.clone());
                continue;
            };

            *fetched += 1;
            if !build.build_complete && *fetched >= self.complete_after {
                build.build_status = Some(self.final_status.clone());
                build.build_complete = true;
                build.current_phase = Some("COMPLETED".into());
                build.end_time = Utc.timestamp_opt(1_700_000_030, 0).single();
            }
            out.builds.push(build.clone());
        }

        Ok(out)
    }

    async fn stop_build(&self, input: StopBuildInput) -> Result<BuildOutput, ApiError> {
        self.record("StopBuild");
        let mut builds = self.builds.lock().unwrap();
        let (build, _) = builds.get_mut(&input.id).ok_or_else(|| {
            ApiError::service("ResourceNotFoundException", format!("Build {} not found", input.id))
        })?;

        build.build_status = Some("STOPPED".into());
        build.build_complete = true;
        build.end_time = Utc.timestamp_opt(1_700_000_005, 0).single();

        Ok(BuildOutput {
            build: Some(build.clone()),
        })
    }
}

/// In-memory CloudWatch Logs keyed by group and stream.
///
/// Forward tokens are `f/<index>`; an empty page hands back a fresh-looking
/// token the way the service does.
#[derive(Default)]
pub struct FakeLogs {
    pub groups: Mutex<Vec<CreateLogGroupInput>>,
    pub streams: Mutex<HashMap<(String, String), Vec<(i64, String)>>>,
    calls: AtomicUsize,
    /// Returned by every CreateLogGroup when set.
    pub fail_create: Mutex<Option<ApiError>>,
}

impl FakeLogs {
    pub fn push(&self, group: &str, stream: &str, timestamp_ms: i64, message: &str) {
        self.streams
            .lock()
            .unwrap()
            .entry((group.to_string(), stream.to_string()))
            .or_default()
            .push((timestamp_ms, message.to_string()));
    }

    pub fn group_names(&self) -> Vec<String> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .map(|g| g.log_group_name.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl CloudWatchLogsApi for FakeLogs {
    async fn create_log_group(&self, input: CreateLogGroupInput) -> Result<(), ApiError> {
        if let Some(err) = self.fail_create.lock().unwrap().clone() {
            return Err(err);
        }
        let mut groups = self.groups.lock().unwrap();
        if groups.iter().any(|g| g.log_group_name == input.log_group_name) {
            return Err(ApiError::service(
                "ResourceAlreadyExistsException",
                "The specified log group already exists",
            ));
        }
        groups.push(input);
        Ok(())
    }

    async fn get_log_events(&self, input: GetLogEventsInput) -> Result<GetLogEventsOutput, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let streams = self.streams.lock().unwrap();
        let events = streams
            .get(&(input.log_group_name.clone(), input.log_stream_name.clone()))
            .ok_or_else(|| ApiError::service("ResourceNotFoundException", "The specified log stream does not exist."))?;

        let start = input
            .next_token
            .as_deref()
            .and_then(|t| t.strip_prefix("f/"))
            .and_then(|t| t.split('#').next())
            .and_then(|i| i.parse::<usize>().ok())
            .unwrap_or(0);

        let page: Vec<OutputLogEvent> = events
            .iter()
            .skip(start)
            .map(|(ts, msg)| OutputLogEvent {
                timestamp: Some(*ts),
                message: Some(msg.clone()),
                ingestion_time: Some(*ts),
            })
            .collect();

        let next_forward_token = if page.is_empty() {
            format!("f/{}#{}", start, call)
        } else {
            format!("f/{}", start + page.len())
        };

        Ok(GetLogEventsOutput {
            events: page,
            next_forward_token: Some(next_forward_token),
            next_backward_token: Some("b/0".into()),
        })
    }
}
