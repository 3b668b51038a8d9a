use super::{cancel_on_ctrl_c, exit_code, print_log_lines, print_task, read_params};
use crate::dispatch;
use launch_core::params::DefineAndLaunchParams;
use launch_core::Config;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Define, launch, wait, then report status and logs.
pub async fn run(config: &Config, file: &Path) -> anyhow::Result<ExitCode> {
    let mut params: DefineAndLaunchParams = read_params(file)?;
    params.tags = config.merged_tags(&params.tags);

    let region = dispatch::resolve_region(config, params.region.as_deref())?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;

    let launched = dispatcher.define_and_launch(&params).await?;
    info!(
        task = %launched.task.id,
        definition = %launched.definition_id,
        log_group = %launched.cloudwatch_log_group_name,
        "task launched"
    );

    let task_ref = params.task_ref(&launched.task.id);
    let cancel = cancel_on_ctrl_c();
    dispatcher.wait_for_task(&task_ref, &cancel).await?;

    let latest = dispatcher.get_task_status(&task_ref).await?;
    let task = launched.task.refresh(latest);
    print_task(&task);

    let logs = dispatcher.get_task_logs(&params.logs_params(&task)).await?;
    if !logs.log_lines.is_empty() {
        println!();
        print_log_lines(&logs.log_lines);
    }

    Ok(exit_code(task.task_status))
}
