use super::client::{AwsJsonClient, LOGS};
use super::credentials::SharedCredentials;
use crate::error::ApiError;
use crate::logs::{CloudWatchLogsApi, CreateLogGroupInput, GetLogEventsInput, GetLogEventsOutput};
use serde::de::IgnoredAny;

/// CloudWatch Logs over HTTP.
#[derive(Clone)]
pub struct CloudWatchLogsClient {
    client: AwsJsonClient,
}

impl CloudWatchLogsClient {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }

    pub fn connect(
        region: &str,
        endpoint_override: Option<&str>,
        credentials: SharedCredentials,
    ) -> Result<Self, ApiError> {
        Ok(Self::new(AwsJsonClient::new(LOGS, region, credentials, endpoint_override)?))
    }
}

#[async_trait::async_trait]
impl CloudWatchLogsApi for CloudWatchLogsClient {
    async fn create_log_group(&self, input: CreateLogGroupInput) -> Result<(), ApiError> {
        let _: IgnoredAny = self.client.call("CreateLogGroup", &input).await?;
        Ok(())
    }

    async fn get_log_events(&self, input: GetLogEventsInput) -> Result<GetLogEventsOutput, ApiError> {
        self.client.call("GetLogEvents", &input).await
    }
}
