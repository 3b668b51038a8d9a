use super::credentials::SharedCredentials;
use super::signing::{self, RequestToSign, JSON_CONTENT_TYPE};
use crate::error::ApiError;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Addressing details of one JSON-1.1 service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSpec {
    pub signing_name: &'static str,
    pub endpoint_prefix: &'static str,
    pub target_prefix: &'static str,
}

pub const ECS: ServiceSpec = ServiceSpec {
    signing_name: "ecs",
    endpoint_prefix: "ecs",
    target_prefix: "AmazonEC2ContainerServiceV20141113",
};

pub const CODEBUILD: ServiceSpec = ServiceSpec {
    signing_name: "codebuild",
    endpoint_prefix: "codebuild",
    target_prefix: "CodeBuild_20161006",
};

pub const LOGS: ServiceSpec = ServiceSpec {
    signing_name: "logs",
    endpoint_prefix: "logs",
    target_prefix: "Logs_20140328",
};

/// Signed JSON-1.1 client bound to one service in one region.
#[derive(Clone)]
pub struct AwsJsonClient {
    http: reqwest::Client,
    service: ServiceSpec,
    region: String,
    endpoint: Url,
    credentials: SharedCredentials,
}

impl AwsJsonClient {
    pub fn new(
        service: ServiceSpec,
        region: &str,
        credentials: SharedCredentials,
        endpoint_override: Option<&str>,
    ) -> Result<Self, ApiError> {
        let endpoint = match endpoint_override {
            Some(endpoint) => endpoint.to_string(),
            None => default_endpoint(service, region),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| ApiError::Transport(format!("invalid endpoint {}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            service,
            region: region.to_string(),
            endpoint,
            credentials,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// POST `input` to `operation` and decode the response.
    pub async fn call<I, O>(&self, operation: &str, input: &I) -> Result<O, ApiError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)
            .map_err(|e| ApiError::Transport(format!("failed to encode {}: {}", operation, e)))?;
        let target = format!("{}.{}", self.service.target_prefix, operation);
        let host = host_header(&self.endpoint)?;
        let credentials = self.credentials.provide_credentials().await?;

        let signed = signing::sign(
            &credentials,
            &RequestToSign {
                host: &host,
                target: &target,
                body: &body,
                region: &self.region,
                service: self.service.signing_name,
                time: Utc::now(),
            },
        );

        debug!(target = %target, endpoint = %self.endpoint, "aws request");

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header("x-amz-target", &target)
            .header("x-amz-date", &signed.amz_date)
            .header(AUTHORIZATION, &signed.authorization)
            .body(body);
        if let Some(token) = &signed.security_token {
            request = request.header("x-amz-security-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{} request failed: {}", target, e)))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("{} response unreadable: {}", target, e)))?;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &bytes));
        }

        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        serde_json::from_slice(bytes)
            .map_err(|e| ApiError::Transport(format!("failed to decode {} response: {}", target, e)))
    }
}

fn default_endpoint(service: ServiceSpec, region: &str) -> String {
    format!("https://{}.{}.amazonaws.com/", service.endpoint_prefix, region)
}

fn host_header(url: &Url) -> Result<String, ApiError> {
    let host = url
        .host_str()
        .ok_or_else(|| ApiError::Transport(format!("endpoint {} has no host", url)))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

/// Turn a JSON-1.1 error body into an [`ApiError::Service`].
pub fn parse_error(status: u16, body: &[u8]) -> ApiError {
    let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();

    let code = parsed
        .as_ref()
        .and_then(|b| b.kind.as_deref())
        .map(|kind| {
            // "com.amazonaws.ecs#ClientException:http://..." -> "ClientException"
            let kind = kind.rsplit('#').next().unwrap_or(kind);
            kind.split(':').next().unwrap_or(kind).to_string()
        })
        .unwrap_or_else(|| format!("HttpStatus{}", status));

    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

    ApiError::Service { code, message }
}
