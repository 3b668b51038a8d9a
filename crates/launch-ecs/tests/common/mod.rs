#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use launch_core::error::ApiError;
use launch_core::logs::{
    CloudWatchLogsApi, CreateLogGroupInput, GetLogEventsInput, GetLogEventsOutput, OutputLogEvent,
};
use launch_ecs::api::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const ACCOUNT_PREFIX: &str = "arn:aws:ecs:us-east-1:123456789012";

/// In-memory ECS control plane.
///
/// Launched tasks report `RUNNING` until they have been described
/// `stop_after` times, then stop with `EssentialContainerExited`.
pub struct FakeEcs {
    pub stop_after: usize,
    pub exit_code: i32,
    pub definitions: Mutex<Vec<TaskDefinition>>,
    /// Tags per `family:revision`.
    pub definition_tags: Mutex<HashMap<String, Vec<Tag>>>,
    pub tasks: Mutex<HashMap<String, (EcsTask, usize)>>,
    pub run_inputs: Mutex<Vec<RunTaskInput>>,
    pub stop_inputs: Mutex<Vec<StopTaskInput>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub fail_describe_definition: Mutex<Option<ApiError>>,
    next_task: AtomicUsize,
}

impl FakeEcs {
    pub fn new(stop_after: usize) -> Self {
        Self {
            stop_after,
            exit_code: 0,
            definitions: Mutex::new(Vec::new()),
            definition_tags: Mutex::new(HashMap::new()),
            tasks: Mutex::new(HashMap::new()),
            run_inputs: Mutex::new(Vec::new()),
            stop_inputs: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_describe_definition: Mutex::new(None),
            next_task: AtomicUsize::new(1),
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

    fn unknown_definition() -> ApiError {
        ApiError::service("ClientException", "Unable to describe task definition.")
    }

    fn find<'a>(definitions: &'a mut [TaskDefinition], id: &str) -> Option<&'a mut TaskDefinition> {
        match id.split_once(':') {
            Some((family, revision)) => definitions
                .iter_mut()
                .find(|d| d.family == family && d.revision.to_string() == revision),
            None => definitions
                .iter_mut()
                .filter(|d| d.family == id && d.status.as_deref() == Some("ACTIVE"))
                .max_by_key(|d| d.revision),
        }
    }
}

#[async_trait::async_trait]
impl EcsApi for FakeEcs {
    async fn describe_task_definition(
        &self,
        input: DescribeTaskDefinitionInput,
    ) -> Result<DescribeTaskDefinitionOutput, ApiError> {
        self.record("DescribeTaskDefinition");
        if let Some(err) = self.fail_describe_definition.lock().unwrap().clone() {
            return Err(err);
        }
        let mut definitions = self.definitions.lock().unwrap();
        let found = Self::find(&mut definitions, &input.task_definition)
            .map(|d| d.clone())
            .ok_or_else(Self::unknown_definition)?;
        let tags = if input.include.iter().any(|i| i == "TAGS") {
            self.definition_tags
                .lock()
                .unwrap()
                .get(&found.id())
                .cloned()
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        Ok(DescribeTaskDefinitionOutput {
            task_definition: Some(found),
            tags,
        })
    }

    async fn register_task_definition(
        &self,
        input: RegisterTaskDefinitionInput,
    ) -> Result<RegisterTaskDefinitionOutput, ApiError> {
        self.record("RegisterTaskDefinition");
        let mut definitions = self.definitions.lock().unwrap();
        let revision = definitions.iter().filter(|d| d.family == input.family).count() as i64 + 1;
        let definition = TaskDefinition {
            task_definition_arn: Some(format!(
                "{}:task-definition/{}:{}",
                ACCOUNT_PREFIX, input.family, revision
            )),
            family: input.family,
            revision,
            status: Some("ACTIVE".into()),
            container_definitions: input.container_definitions,
            cpu: Some(input.cpu),
            memory: Some(input.memory),
            execution_role_arn: Some(input.execution_role_arn),
            task_role_arn: input.task_role_arn,
            network_mode: Some(input.network_mode),
            requires_compatibilities: input.requires_compatibilities,
        };
        self.definition_tags
            .lock()
            .unwrap()
            .insert(definition.id(), input.tags);
        definitions.push(definition.clone());
        Ok(RegisterTaskDefinitionOutput {
            task_definition: Some(definition),
        })
    }

    async fn deregister_task_definition(
        &self,
        input: DeregisterTaskDefinitionInput,
    ) -> Result<DeregisterTaskDefinitionOutput, ApiError> {
        self.record("DeregisterTaskDefinition");
        let mut definitions = self.definitions.lock().unwrap();
        let definition = Self::find(&mut definitions, &input.task_definition).ok_or_else(|| {
            ApiError::service("ClientException", "The specified task definition does not exist.")
        })?;
        definition.status = Some("INACTIVE".into());
        Ok(DeregisterTaskDefinitionOutput {
            task_definition: Some(definition.clone()),
        })
    }

    async fn run_task(&self, input: RunTaskInput) -> Result<RunTaskOutput, ApiError> {
        self.record("RunTask");
        {
            let mut definitions = self.definitions.lock().unwrap();
            if Self::find(&mut definitions, &input.task_definition).is_none() {
                return Err(ApiError::service(
                    "ClientException",
                    "TaskDefinition not found.",
                ));
            }
        }

        let n = self.next_task.fetch_add(1, Ordering::SeqCst);
        let task = EcsTask {
            task_arn: format!("{}:task/{}/{:032x}", ACCOUNT_PREFIX, input.cluster, n),
            last_status: Some("PROVISIONING".into()),
            desired_status: Some("RUNNING".into()),
            containers: vec![Container {
                name: input.overrides.container_overrides.first().map(|o| o.name.clone()),
                last_status: Some("PENDING".into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        self.tasks
            .lock()
            .unwrap()
            .insert(task.task_arn.clone(), (task.clone(), 0));
        self.run_inputs.lock().unwrap().push(input);

        Ok(RunTaskOutput {
            tasks: vec![task],
            failures: vec![],
        })
    }

    async fn describe_tasks(&self, input: DescribeTasksInput) -> Result<DescribeTasksOutput, ApiError> {
        self.record("DescribeTasks");
        let mut tasks = self.tasks.lock().unwrap();
        let mut out = DescribeTasksOutput::default();

        for arn in &input.tasks {
            let Some((task, described)) = tasks.get_mut(arn) else {
                out.failures.push(Failure {
                    arn: Some(arn.clone()),
                    reason: Some("MISSING".into()),
                    detail: None,
                });
                continue;
            };

            *described += 1;
            if task.last_status.as_deref() != Some("STOPPED") {
                task.last_status = Some("RUNNING".into());
                task.started_at = Utc.timestamp_opt(1_700_000_000, 0).single();
                if *described >= self.stop_after {
                    task.last_status = Some("STOPPED".into());
                    task.stop_code = Some("EssentialContainerExited".into());
                    task.stopped_reason = Some("Essential container in task exited".into());
                    task.stopped_at = Utc.timestamp_opt(1_700_000_042, 0).single();
                    for container in &mut task.containers {
                        container.last_status = Some("STOPPED".into());
                        container.exit_code = Some(self.exit_code);
                    }
                }
            }
            out.tasks.push(task.clone());
        }

        Ok(out)
    }

    async fn stop_task(&self, input: StopTaskInput) -> Result<StopTaskOutput, ApiError> {
        self.record("StopTask");
        let mut tasks = self.tasks.lock().unwrap();
        let (task, _) = tasks
            .get_mut(&input.task)
            .ok_or_else(|| ApiError::service("InvalidParameterException", "The referenced task was not found."))?;

        task.desired_status = Some("STOPPED".into());
        task.last_status = Some("STOPPED".into());
        task.stop_code = Some("UserInitiated".into());
        task.stopped_reason = input.reason.clone();
        task.stopped_at = Utc.timestamp_opt(1_700_000_010, 0).single();
        let task = task.clone();
        self.stop_inputs.lock().unwrap().push(input);

        Ok(StopTaskOutput { task: Some(task) })
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
