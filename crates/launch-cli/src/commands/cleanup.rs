use super::read_params;
use crate::dispatch;
use launch_core::params::CleanupTaskParams;
use launch_core::Config;
use std::path::Path;

pub async fn run(config: &Config, file: &Path) -> anyhow::Result<()> {
    let params: CleanupTaskParams = read_params(file)?;

    let region = dispatch::resolve_region(config, None)?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;
    dispatcher.cleanup_task(&params).await?;
    println!("Definition removed");

    Ok(())
}
