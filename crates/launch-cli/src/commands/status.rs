use super::{print_task, read_params};
use crate::dispatch;
use launch_core::params::GetTaskStatusParams;
use launch_core::Config;
use std::path::Path;

pub async fn run(config: &Config, file: &Path, json: bool) -> anyhow::Result<()> {
    let params: GetTaskStatusParams = read_params(file)?;

    let region = dispatch::resolve_region(config, None)?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;
    let task = dispatcher.get_task_status(&params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        print_task(&task);
    }

    Ok(())
}
