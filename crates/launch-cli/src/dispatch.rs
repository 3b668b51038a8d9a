use anyhow::Context;
use launch_codebuild::{CodeBuildClient, CodeBuildLauncher};
use launch_core::aws::{CloudWatchLogsClient, CredentialsChain, SharedCredentials};
use launch_core::task::BackendKind;
use launch_core::{Config, Dispatcher};
use launch_ecs::{EcsClient, EcsLauncher};
use std::sync::Arc;

/// Region for this invocation: the request's, then config, then environment.
pub fn resolve_region(config: &Config, requested: Option<&str>) -> anyhow::Result<String> {
    config.resolve_region(requested).context(
        "No AWS region: set it in the request, the config file, or AWS_REGION",
    )
}

/// Build a dispatcher with both backends talking to `region`.
pub fn create_dispatcher(config: &Config, region: &str) -> anyhow::Result<Dispatcher> {
    let endpoints = &config.endpoints;
    let credentials: SharedCredentials =
        Arc::new(CredentialsChain::from_env().context("Failed to set up AWS credentials")?);

    let logs = Arc::new(
        CloudWatchLogsClient::connect(region, endpoints.logs.as_deref(), credentials.clone())
            .context("Failed to create CloudWatch Logs client")?,
    );
    let ecs = EcsClient::connect(region, endpoints.ecs.as_deref(), credentials.clone())
        .context("Failed to create ECS client")?;
    let codebuild = CodeBuildClient::connect(region, endpoints.codebuild.as_deref(), credentials)
        .context("Failed to create CodeBuild client")?;

    let ecs = EcsLauncher::new(Arc::new(ecs), logs.clone(), region)
        .with_waiter(config.waiters.for_backend(BackendKind::Ecs));
    let codebuild = CodeBuildLauncher::new(Arc::new(codebuild), logs)
        .with_waiter(config.waiters.for_backend(BackendKind::Codebuild));

    Ok(Dispatcher::new(Arc::new(ecs), Arc::new(codebuild)))
}
