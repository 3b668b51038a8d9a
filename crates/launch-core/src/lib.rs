pub mod aws;
pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod launcher;
pub mod logs;
pub mod params;
pub mod task;
pub mod waiter;

pub use backend::{Backend, BackendParams};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{ApiError, LaunchError};
pub use launcher::Launcher;
pub use logs::{CloudWatchLogsReader, LogLine, LogsReader};
pub use task::{BackendKind, Task, TaskDetail, TaskStatus};
pub use waiter::{Waiter, WaiterConfig};

/// Tag applied to every log group this tool creates.
pub const CREATED_BY_TAG: (&str, &str) = ("createdBy", "aws-launch");
