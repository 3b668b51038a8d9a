use super::{print_task, read_params};
use crate::dispatch;
use launch_core::params::StopTaskParams;
use launch_core::Config;
use std::path::Path;

pub async fn run(config: &Config, file: &Path) -> anyhow::Result<()> {
    let params: StopTaskParams = read_params(file)?;

    let region = dispatch::resolve_region(config, None)?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;
    let task = dispatcher.stop_task(&params).await?;
    print_task(&task);

    Ok(())
}
