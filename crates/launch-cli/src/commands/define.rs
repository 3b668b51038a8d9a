use super::read_params;
use crate::dispatch;
use launch_core::params::DefineTaskParams;
use launch_core::Config;
use std::path::Path;

pub async fn run(config: &Config, file: &Path) -> anyhow::Result<()> {
    let mut params: DefineTaskParams = read_params(file)?;
    params.tags = config.merged_tags(&params.tags);

    let region = dispatch::resolve_region(config, params.region.as_deref())?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;

    let definition = dispatcher.define_task(&params).await?;
    println!("{}", serde_json::to_string_pretty(&definition)?);

    Ok(())
}
