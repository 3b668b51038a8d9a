pub mod cleanup;
pub mod config;
pub mod define;
pub mod launch;
pub mod logs;
pub mod one_task;
pub mod schema;
pub mod status;
pub mod stop;

use anyhow::Context;
use chrono::SecondsFormat;
use launch_core::{LogLine, Task, TaskDetail, TaskStatus};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Read a JSON parameter file and check it against the schema of `T`.
///
/// Every schema violation is logged before the read fails.
pub fn read_params<T: DeserializeOwned + JsonSchema>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let instance: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let schema_value = schema::strict_schema::<T>()?;
    let validator = jsonschema::validator_for(&schema_value)
        .map_err(|e| anyhow::anyhow!("Invalid schema for {}: {}", T::schema_name(), e))?;
    let violations: Vec<(String, String)> = validator
        .iter_errors(&instance)
        .map(|e| (e.instance_path.to_string(), e.to_string()))
        .collect();

    if !violations.is_empty() {
        for (location, message) in &violations {
            warn!(file = %path.display(), path = %location, "{}", message);
        }
        anyhow::bail!(
            "{} does not match {} ({} violation(s))",
            path.display(),
            T::schema_name(),
            violations.len()
        );
    }

    serde_json::from_value(instance).with_context(|| format!("Invalid parameters in {}", path.display()))
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping");
            child.cancel();
        }
    });
    token
}

/// Process exit status for a finished task: zero only on success.
pub fn exit_status(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Succeeded => 0,
        _ => 1,
    }
}

pub fn exit_code(status: TaskStatus) -> ExitCode {
    ExitCode::from(exit_status(status))
}

pub fn print_task(task: &Task) {
    println!("Task:     {}", task.id);
    println!("Status:   {}", task.task_status);
    match &task.detail {
        TaskDetail::Ecs {
            task_arn,
            last_status,
            stop_code,
            ..
        } => {
            println!("Arn:      {}", task_arn);
            println!("Native:   {}", last_status);
            if let Some(code) = stop_code {
                println!("Stop:     {}", code);
            }
        }
        TaskDetail::Codebuild {
            build_arn,
            build_status,
        } => {
            println!("Arn:      {}", build_arn);
            println!("Native:   {}", build_status);
        }
    }
    if let Some(started) = task.start_time {
        println!("Started:  {}", started);
    }
    if let Some(finished) = task.end_time {
        println!("Finished: {}", finished);
    }
    if let Some(elapsed) = task.elapsed() {
        println!("Elapsed:  {}s", elapsed.num_seconds());
    }
}

pub fn format_log_line(line: &LogLine) -> String {
    format!(
        "{} {}",
        line.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        line.message
    )
}

pub fn print_log_lines(lines: &[LogLine]) {
    for line in lines {
        println!("{}", format_log_line(line));
    }
}
