use crate::api::*;
use launch_core::aws::{AwsJsonClient, SharedCredentials, ECS};
use launch_core::ApiError;

/// [`EcsApi`] over the signed JSON client.
#[derive(Clone)]
pub struct EcsClient {
    client: AwsJsonClient,
}

impl EcsClient {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }

    pub fn connect(
        region: &str,
        endpoint_override: Option<&str>,
        credentials: SharedCredentials,
    ) -> Result<Self, ApiError> {
        Ok(Self::new(AwsJsonClient::new(ECS, region, credentials, endpoint_override)?))
    }
}

#[async_trait::async_trait]
impl EcsApi for EcsClient {
    async fn describe_task_definition(
        &self,
        input: DescribeTaskDefinitionInput,
    ) -> Result<DescribeTaskDefinitionOutput, ApiError> {
        self.client.call("DescribeTaskDefinition", &input).await
    }

    async fn register_task_definition(
        &self,
        input: RegisterTaskDefinitionInput,
    ) -> Result<RegisterTaskDefinitionOutput, ApiError> {
        self.client.call("RegisterTaskDefinition", &input).await
    }

    async fn deregister_task_definition(
        &self,
        input: DeregisterTaskDefinitionInput,
    ) -> Result<DeregisterTaskDefinitionOutput, ApiError> {
        self.client.call("DeregisterTaskDefinition", &input).await
    }

    async fn run_task(&self, input: RunTaskInput) -> Result<RunTaskOutput, ApiError> {
        self.client.call("RunTask", &input).await
    }

    async fn describe_tasks(&self, input: DescribeTasksInput) -> Result<DescribeTasksOutput, ApiError> {
        self.client.call("DescribeTasks", &input).await
    }

    async fn stop_task(&self, input: StopTaskInput) -> Result<StopTaskOutput, ApiError> {
        self.client.call("StopTask", &input).await
    }
}
