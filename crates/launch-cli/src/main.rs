use anyhow::Result;
use clap::{Parser, Subcommand};
use launch_core::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "aws-launch")]
#[command(about = "Define, launch and follow tasks on ECS Fargate or CodeBuild", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to <config dir>/aws-launch/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a definition and run it in one shot
    OneTask {
        /// Define-and-launch parameters (JSON)
        file: PathBuf,
    },

    /// Create or update a definition
    DefineTask {
        /// Definition parameters (JSON)
        file: PathBuf,
    },

    /// Launch a task from an existing definition
    LaunchTask {
        /// Launch parameters (JSON)
        file: PathBuf,

        /// Return once the task is launched
        #[arg(long)]
        no_wait: bool,
    },

    /// Stop a running task
    StopTask {
        /// Task reference (JSON)
        file: PathBuf,
    },

    /// Show task status
    TaskStatus {
        /// Task reference (JSON)
        file: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Remove a definition
    CleanupTask {
        /// Cleanup parameters (JSON)
        file: PathBuf,
    },

    /// Print task logs
    GetTaskLogs {
        /// Log parameters (JSON)
        file: PathBuf,

        /// Keep polling every SECS seconds
        #[arg(short, long, value_name = "SECS")]
        follow: Option<u64>,
    },

    /// Write the JSON Schema of a parameter file to stdout
    DumpSchema {
        /// One of DefineAndLaunchParams, DefineTaskParams, LaunchTaskParams,
        /// TaskRefParams, CleanupTaskParams, GetTaskLogsParams
        name: String,
    },

    /// Show or initialize configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Write a sample config file
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match cli.command {
        Commands::OneTask { file } => {
            let config = load_config(cli.config.as_ref())?;
            commands::one_task::run(&config, &file).await?
        }
        Commands::DefineTask { file } => {
            let config = load_config(cli.config.as_ref())?;
            commands::define::run(&config, &file).await?;
            ExitCode::SUCCESS
        }
        Commands::LaunchTask { file, no_wait } => {
            let config = load_config(cli.config.as_ref())?;
            commands::launch::run(&config, &file, no_wait).await?
        }
        Commands::StopTask { file } => {
            let config = load_config(cli.config.as_ref())?;
            commands::stop::run(&config, &file).await?;
            ExitCode::SUCCESS
        }
        Commands::TaskStatus { file, json } => {
            let config = load_config(cli.config.as_ref())?;
            commands::status::run(&config, &file, json).await?;
            ExitCode::SUCCESS
        }
        Commands::CleanupTask { file } => {
            let config = load_config(cli.config.as_ref())?;
            commands::cleanup::run(&config, &file).await?;
            ExitCode::SUCCESS
        }
        Commands::GetTaskLogs { file, follow } => {
            let config = load_config(cli.config.as_ref())?;
            commands::logs::run(&config, &file, follow).await?;
            ExitCode::SUCCESS
        }
        Commands::DumpSchema { name } => {
            commands::schema::run(&name)?;
            ExitCode::SUCCESS
        }
        Commands::Config { path, init } => {
            commands::config::run(cli.config.as_deref(), path, init)?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
