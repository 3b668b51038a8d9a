use super::{cancel_on_ctrl_c, print_log_lines, read_params};
use crate::dispatch;
use launch_core::params::GetTaskLogsParams;
use launch_core::Config;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub async fn run(config: &Config, file: &Path, follow: Option<u64>) -> anyhow::Result<()> {
    let mut params: GetTaskLogsParams = read_params(file)?;

    let region = dispatch::resolve_region(config, None)?;
    let dispatcher = dispatch::create_dispatcher(config, &region)?;
    let cancel = cancel_on_ctrl_c();

    loop {
        let page = dispatcher.get_task_logs(&params).await?;
        print_log_lines(&page.log_lines);
        // an empty page hands back the same cursor, so this never skips ahead
        params.next_token = page.next_token;

        let Some(interval) = follow else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
        }
    }

    if let Some(token) = &params.next_token {
        info!(next_token = %token, "resume from this cursor");
    }

    Ok(())
}
