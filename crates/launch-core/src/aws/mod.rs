//! Minimal signed client for the AWS JSON-1.1 protocol used by ECS,
//! CodeBuild and CloudWatch Logs.

pub mod client;
pub mod credentials;
pub mod logs;
pub mod signing;
pub mod timestamp;

pub use client::{AwsJsonClient, ServiceSpec, CODEBUILD, ECS, LOGS};
pub use credentials::{Credentials, CredentialsChain, ProvideCredentials, SharedCredentials};
pub use logs::CloudWatchLogsClient;
