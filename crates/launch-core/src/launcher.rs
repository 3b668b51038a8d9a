use crate::error::LaunchError;
use crate::params::{
    CleanupTaskParams, CleanupTaskResult, DefineTaskParams, DefineTaskResult, GetTaskLogsParams,
    GetTaskLogsResult, GetTaskStatusParams, GetTaskStatusResult, LaunchTaskParams,
    LaunchTaskResult, StopTaskParams, StopTaskResult, WaitForTaskParams, WaitForTaskResult,
};
use crate::task::BackendKind;
use tokio_util::sync::CancellationToken;

/// Core launcher trait. Every backend adapter implements this:
///   define, launch, wait, status, stop, cleanup, logs
#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    /// Backend this launcher talks to.
    fn kind(&self) -> BackendKind;

    /// Create or update the backend definition and make sure its log group exists.
    async fn define_task(&self, params: &DefineTaskParams) -> Result<DefineTaskResult, LaunchError>;

    /// Start one execution of a definition.
    async fn launch_task(&self, params: &LaunchTaskParams) -> Result<LaunchTaskResult, LaunchError>;

    /// Block until the backend reports the execution finished. Only the id
    /// comes back; fetch the outcome with `get_task_status`.
    async fn wait_for_task(
        &self,
        params: &WaitForTaskParams,
        cancel: &CancellationToken,
    ) -> Result<WaitForTaskResult, LaunchError>;

    /// Current canonical status and timestamps.
    async fn get_task_status(
        &self,
        params: &GetTaskStatusParams,
    ) -> Result<GetTaskStatusResult, LaunchError>;

    /// Ask the backend to stop a running execution.
    async fn stop_task(&self, params: &StopTaskParams) -> Result<StopTaskResult, LaunchError>;

    /// Remove the backend definition. Log groups are left in place.
    async fn cleanup_task(&self, params: &CleanupTaskParams) -> Result<CleanupTaskResult, LaunchError>;

    /// Read the next page of the task's log stream.
    async fn get_task_logs(&self, params: &GetTaskLogsParams) -> Result<GetTaskLogsResult, LaunchError>;
}
