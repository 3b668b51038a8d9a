use crate::api::*;
use launch_core::aws::{AwsJsonClient, SharedCredentials, CODEBUILD};
use launch_core::ApiError;
use serde::de::IgnoredAny;

/// [`CodeBuildApi`] over the signed JSON client.
#[derive(Clone)]
pub struct CodeBuildClient {
    client: AwsJsonClient,
}

impl CodeBuildClient {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }

    pub fn connect(
        region: &str,
        endpoint_override: Option<&str>,
        credentials: SharedCredentials,
    ) -> Result<Self, ApiError> {
        Ok(Self::new(AwsJsonClient::new(CODEBUILD, region, credentials, endpoint_override)?))
    }
}

#[async_trait::async_trait]
impl CodeBuildApi for CodeBuildClient {
    async fn create_project(&self, input: ProjectInput) -> Result<ProjectOutput, ApiError> {
        self.client.call("CreateProject", &input).await
    }

    async fn update_project(&self, input: ProjectInput) -> Result<ProjectOutput, ApiError> {
        self.client.call("UpdateProject", &input).await
    }

    async fn delete_project(&self, input: DeleteProjectInput) -> Result<(), ApiError> {
        let _: IgnoredAny = self.client.call("DeleteProject", &input).await?;
        Ok(())
    }

    async fn start_build(&self, input: StartBuildInput) -> Result<BuildOutput, ApiError> {
        self.client.call("StartBuild", &input).await
    }

    async fn batch_get_builds(&self, input: BatchGetBuildsInput) -> Result<BatchGetBuildsOutput, ApiError> {
        self.client.call("BatchGetBuilds", &input).await
    }

    async fn stop_build(&self, input: StopBuildInput) -> Result<BuildOutput, ApiError> {
        self.client.call("StopBuild", &input).await
    }
}
