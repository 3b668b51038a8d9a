//! Credential resolution for the signed client.
//!
//! [`CredentialsChain`] tries the sources in the order the AWS CLI does:
//! environment variables, the shared `credentials`/`config` files, the
//! container credentials endpoint (ECS, Fargate, CodeBuild), then EC2
//! instance metadata (IMDSv2). Temporary credentials are cached until shortly
//! before they expire.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

const CONTAINER_HOST: &str = "http://169.254.170.2";
const IMDS_ENDPOINT: &str = "http://169.254.169.254";
const IMDS_TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const IMDS_TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const IMDS_TOKEN_TTL_SECS: &str = "21600";
const DEFAULT_PROFILE: &str = "default";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// AWS credentials, static or temporary.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    /// Set for temporary credentials.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expires_at: None,
        }
    }

    /// True once `now` is within the refresh margin of the expiry.
    pub fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| at - chrono::Duration::minutes(REFRESH_MARGIN_MINUTES) <= now)
    }
}

// keep secrets out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of signing credentials.
#[async_trait::async_trait]
pub trait ProvideCredentials: Send + Sync {
    async fn provide_credentials(&self) -> Result<Credentials, ApiError>;
}

pub type SharedCredentials = Arc<dyn ProvideCredentials>;

#[async_trait::async_trait]
impl ProvideCredentials for Credentials {
    async fn provide_credentials(&self) -> Result<Credentials, ApiError> {
        Ok(self.clone())
    }
}

/// Temporary credentials as served by the container and instance metadata
/// endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TemporaryCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

impl From<TemporaryCredentials> for Credentials {
    fn from(value: TemporaryCredentials) -> Self {
        Self {
            access_key_id: value.access_key_id,
            secret_access_key: value.secret_access_key,
            session_token: value.token,
            expires_at: value.expiration,
        }
    }
}

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Default provider chain.
pub struct CredentialsChain {
    lookup: Lookup,
    home: Option<PathBuf>,
    http: reqwest::Client,
    cached: Mutex<Option<Credentials>>,
}

impl CredentialsChain {
    /// Chain reading the process environment and the user's home directory.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::with_lookup(|name| std::env::var(name).ok(), dirs::home_dir())
    }

    pub fn with_lookup(
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
        home: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            lookup: Arc::new(lookup),
            home,
            http,
            cached: Mutex::new(None),
        })
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    async fn resolve(&self) -> Result<Credentials, ApiError> {
        if let Some(creds) = self.from_environment()? {
            debug!(source = "environment", "resolved aws credentials");
            return Ok(creds);
        }
        if let Some(creds) = self.from_profile()? {
            debug!(source = "profile", "resolved aws credentials");
            return Ok(creds);
        }
        if let Some(creds) = self.from_container().await? {
            debug!(source = "container", "resolved aws credentials");
            return Ok(creds);
        }
        if let Some(creds) = self.from_instance_metadata().await? {
            debug!(source = "instance-metadata", "resolved aws credentials");
            return Ok(creds);
        }

        Err(ApiError::Credentials(
            "no AWS credentials found; set AWS_ACCESS_KEY_ID or AWS_PROFILE, or run with a task or instance role"
                .into(),
        ))
    }

    fn from_environment(&self) -> Result<Option<Credentials>, ApiError> {
        let Some(access_key_id) = self.var("AWS_ACCESS_KEY_ID") else {
            return Ok(None);
        };
        let secret_access_key = self.var("AWS_SECRET_ACCESS_KEY").ok_or_else(|| {
            ApiError::Credentials("AWS_ACCESS_KEY_ID is set but AWS_SECRET_ACCESS_KEY is not".into())
        })?;

        Ok(Some(Credentials::new(
            access_key_id,
            secret_access_key,
            self.var("AWS_SESSION_TOKEN"),
        )))
    }

    fn from_profile(&self) -> Result<Option<Credentials>, ApiError> {
        let explicit = self.var("AWS_PROFILE");
        let profile = explicit.as_deref().unwrap_or(DEFAULT_PROFILE);

        let credentials_file = self
            .var("AWS_SHARED_CREDENTIALS_FILE")
            .map(PathBuf::from)
            .or_else(|| self.home.as_ref().map(|h| h.join(".aws").join("credentials")));
        let config_file = self
            .var("AWS_CONFIG_FILE")
            .map(PathBuf::from)
            .or_else(|| self.home.as_ref().map(|h| h.join(".aws").join("config")));

        // the config file prefixes every section except default with "profile "
        let config_section = if profile == DEFAULT_PROFILE {
            DEFAULT_PROFILE.to_string()
        } else {
            format!("profile {}", profile)
        };

        let mut found = false;
        for (file, section) in [(credentials_file, profile.to_string()), (config_file, config_section)] {
            let Some(contents) = read_optional(file)? else {
                continue;
            };
            let Some(keys) = profile_section(&contents, &section) else {
                continue;
            };
            found = true;

            if let (Some(id), Some(secret)) = (keys.get("aws_access_key_id"), keys.get("aws_secret_access_key")) {
                return Ok(Some(Credentials::new(
                    id.clone(),
                    secret.clone(),
                    keys.get("aws_session_token").cloned(),
                )));
            }
        }

        match explicit {
            Some(name) if !found => Err(ApiError::Credentials(format!("profile '{}' not found", name))),
            Some(name) => Err(ApiError::Credentials(format!(
                "profile '{}' has no aws_access_key_id/aws_secret_access_key",
                name
            ))),
            None => Ok(None),
        }
    }

    fn container_endpoint(&self) -> Option<String> {
        if let Some(relative) = self.var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI") {
            return Some(format!("{}{}", CONTAINER_HOST, relative));
        }
        self.var("AWS_CONTAINER_CREDENTIALS_FULL_URI")
    }

    fn container_token(&self) -> Result<Option<String>, ApiError> {
        if let Some(path) = self.var("AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE") {
            let token = std::fs::read_to_string(&path)
                .map_err(|e| ApiError::Credentials(format!("failed to read {}: {}", path, e)))?;
            return Ok(Some(token.trim().to_string()));
        }
        Ok(self.var("AWS_CONTAINER_AUTHORIZATION_TOKEN"))
    }

    async fn from_container(&self) -> Result<Option<Credentials>, ApiError> {
        let Some(url) = self.container_endpoint() else {
            return Ok(None);
        };

        let mut request = self.http.get(&url);
        if let Some(token) = self.container_token()? {
            request = request.header(AUTHORIZATION, token);
        }

        let response = send(request, "container credentials endpoint").await?;
        let creds: TemporaryCredentials = response
            .json()
            .await
            .map_err(|e| ApiError::Credentials(format!("invalid container credentials: {}", e)))?;
        Ok(Some(creds.into()))
    }

    async fn from_instance_metadata(&self) -> Result<Option<Credentials>, ApiError> {
        if self
            .var("AWS_EC2_METADATA_DISABLED")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(None);
        }

        let base = self
            .var("AWS_EC2_METADATA_SERVICE_ENDPOINT")
            .unwrap_or_else(|| IMDS_ENDPOINT.to_string());
        let base = base.trim_end_matches('/');

        // off EC2 the token request fails to connect; that just ends the chain
        let token = match self
            .http
            .put(format!("{}/latest/api/token", base))
            .header(IMDS_TOKEN_TTL_HEADER, IMDS_TOKEN_TTL_SECS)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response
                .text()
                .await
                .map_err(|e| ApiError::Credentials(format!("instance metadata token unreadable: {}", e)))?,
            Ok(response) => {
                debug!(status = %response.status(), "instance metadata token refused");
                return Ok(None);
            }
            Err(e) => {
                debug!(error = %e, "instance metadata unavailable");
                return Ok(None);
            }
        };

        let roles_url = format!("{}/latest/meta-data/iam/security-credentials/", base);
        let roles = send(
            self.http.get(&roles_url).header(IMDS_TOKEN_HEADER, &token),
            "instance metadata role list",
        )
        .await?
        .text()
        .await
        .map_err(|e| ApiError::Credentials(format!("instance metadata role list unreadable: {}", e)))?;

        let Some(role) = roles.lines().map(str::trim).find(|l| !l.is_empty()) else {
            return Err(ApiError::Credentials("instance has no IAM role attached".into()));
        };

        let creds: TemporaryCredentials = send(
            self.http
                .get(format!("{}{}", roles_url, role))
                .header(IMDS_TOKEN_HEADER, &token),
            "instance metadata credentials",
        )
        .await?
        .json()
        .await
        .map_err(|e| ApiError::Credentials(format!("invalid instance metadata credentials: {}", e)))?;

        Ok(Some(creds.into()))
    }
}

#[async_trait::async_trait]
impl ProvideCredentials for CredentialsChain {
    async fn provide_credentials(&self) -> Result<Credentials, ApiError> {
        let mut cached = self.cached.lock().await;
        if let Some(creds) = cached.as_ref().filter(|c| !c.expires_soon(Utc::now())) {
            return Ok(creds.clone());
        }

        let fresh = self.resolve().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}

async fn send(request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Credentials(format!("{} request failed: {}", what, e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Credentials(format!("{} returned HTTP {}", what, status)));
    }
    Ok(response)
}

fn read_optional(path: Option<PathBuf>) -> Result<Option<String>, ApiError> {
    let Some(path) = path else {
        return Ok(None);
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ApiError::Credentials(format!("failed to read {}: {}", path.display(), e))),
    }
}

/// Keys of one `[section]` of an AWS ini file, or `None` when the section is
/// absent.
fn profile_section(contents: &str, section: &str) -> Option<HashMap<String, String>> {
    let mut found: Option<HashMap<String, String>> = None;
    let mut in_section = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim() == section;
            if in_section {
                found.get_or_insert_with(HashMap::new);
            }
            continue;
        }

        if in_section {
            if let Some((key, value)) = line.split_once('=') {
                found
                    .get_or_insert_with(HashMap::new)
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }

    found
}
