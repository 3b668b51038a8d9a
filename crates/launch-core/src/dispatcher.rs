use crate::backend::BackendParams;
use crate::error::LaunchError;
use crate::launcher::Launcher;
use crate::params::{
    CleanupTaskParams, CleanupTaskResult, DefineAndLaunchParams, DefineAndLaunchResult,
    DefineTaskParams, DefineTaskResult, GetTaskLogsParams, GetTaskLogsResult,
    GetTaskStatusParams, GetTaskStatusResult, LaunchTaskParams, LaunchTaskResult, StopTaskParams,
    StopTaskResult, WaitForTaskParams, WaitForTaskResult,
};
use crate::task::BackendKind;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Routes each request to the launcher for the backend it names.
#[derive(Clone)]
pub struct Dispatcher {
    ecs: Arc<dyn Launcher>,
    codebuild: Arc<dyn Launcher>,
}

impl Dispatcher {
    pub fn new(ecs: Arc<dyn Launcher>, codebuild: Arc<dyn Launcher>) -> Self {
        Self { ecs, codebuild }
    }

    fn launcher(&self, kind: BackendKind) -> &dyn Launcher {
        match kind {
            BackendKind::Ecs => self.ecs.as_ref(),
            BackendKind::Codebuild => self.codebuild.as_ref(),
        }
    }

    fn route<P: BackendParams>(&self, params: &P) -> Result<&dyn Launcher, LaunchError> {
        Ok(self.launcher(params.backend()?.kind()))
    }

    /// Define, then launch the new definition. A failed define never launches.
    pub async fn define_and_launch(
        &self,
        params: &DefineAndLaunchParams,
    ) -> Result<DefineAndLaunchResult, LaunchError> {
        let launcher = self.route(params)?;

        let definition = launcher.define_task(&params.define_params()).await?;
        info!(backend = %launcher.kind(), definition = %definition.id, "definition ready");

        let task = launcher
            .launch_task(&params.launch_params(&definition.id))
            .await?;

        Ok(DefineAndLaunchResult {
            task,
            definition_id: definition.id,
            cloudwatch_log_group_name: definition.cloudwatch_log_group_name,
            cloudwatch_stream_prefix: definition.cloudwatch_stream_prefix,
        })
    }

    pub async fn define_task(&self, params: &DefineTaskParams) -> Result<DefineTaskResult, LaunchError> {
        self.route(params)?.define_task(params).await
    }

    pub async fn launch_task(&self, params: &LaunchTaskParams) -> Result<LaunchTaskResult, LaunchError> {
        self.route(params)?.launch_task(params).await
    }

    pub async fn wait_for_task(
        &self,
        params: &WaitForTaskParams,
        cancel: &CancellationToken,
    ) -> Result<WaitForTaskResult, LaunchError> {
        self.launcher(params.backend_kind_lenient()?)
            .wait_for_task(params, cancel)
            .await
    }

    pub async fn get_task_status(
        &self,
        params: &GetTaskStatusParams,
    ) -> Result<GetTaskStatusResult, LaunchError> {
        self.launcher(params.backend_kind_lenient()?)
            .get_task_status(params)
            .await
    }

    pub async fn stop_task(&self, params: &StopTaskParams) -> Result<StopTaskResult, LaunchError> {
        self.route(params)?.stop_task(params).await
    }

    pub async fn cleanup_task(&self, params: &CleanupTaskParams) -> Result<CleanupTaskResult, LaunchError> {
        self.route(params)?.cleanup_task(params).await
    }

    pub async fn get_task_logs(&self, params: &GetTaskLogsParams) -> Result<GetTaskLogsResult, LaunchError> {
        self.route(params)?.get_task_logs(params).await
    }
}
