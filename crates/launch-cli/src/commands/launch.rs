use super::{cancel_on_ctrl_c, exit_code, print_task, read_params};
use crate::dispatch;
use launch_core::params::{CodebuildTaskRef, EcsTaskRef, LaunchTaskParams, TaskRefParams};
use launch_core::Config;
use std::path::Path;
use std::process::ExitCode;

/// Reference to a task started from `params`.
pub fn task_ref(params: &LaunchTaskParams, id: &str) -> TaskRefParams {
    TaskRefParams {
        id: id.to_string(),
        ecs: params.ecs.as_ref().map(|ecs| EcsTaskRef {
            cluster_name: ecs.cluster_name.clone(),
        }),
        codebuild: params.codebuild.as_ref().map(|_| CodebuildTaskRef {}),
    }
}

pub async fn run(config: &Config, file: &Path, no_wait: bool) -> anyhow::Result<ExitCode> {
    let mut params: LaunchTaskParams = read_params(file)?;
    params.tags = config.merged_tags(&params.tags);

    let region = dispatch::resolve_region(config, None)?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;

    let task = dispatcher.launch_task(&params).await?;
    if no_wait {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(ExitCode::SUCCESS);
    }

    let task_ref = task_ref(&params, &task.id);
    let cancel = cancel_on_ctrl_c();
    dispatcher.wait_for_task(&task_ref, &cancel).await?;

    let task = task.refresh(dispatcher.get_task_status(&task_ref).await?);
    print_task(&task);

    Ok(exit_code(task.task_status))
}
