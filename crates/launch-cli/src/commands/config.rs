use launch_core::Config;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# aws-launch configuration

# Falls back to AWS_REGION / AWS_DEFAULT_REGION when unset.
region: us-east-1

# Per-service endpoint overrides, e.g. for a local emulator.
# endpoints:
#   ecs: http://localhost:4566
#   codebuild: http://localhost:4566
#   logs: http://localhost:4566

waiters:
  ecs:
    delay_secs: 6
    max_attempts: 100
  codebuild:
    delay_secs: 6
    max_attempts: 100

# Added to every define and launch request.
tags:
  createdWith: aws-launch
"#;

pub fn run(explicit: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        return init_config(&config_path);
    }

    println!("Config path: {}", config_path.display());
    if config_path.exists() {
        let config = Config::load_from(&config_path)?;
        println!("Region:      {}", config.region.as_deref().unwrap_or("(environment)"));
        println!(
            "Waiters:     ecs {}x{:?}, codebuild {}x{:?}",
            config.waiters.ecs.max_attempts,
            config.waiters.ecs.delay,
            config.waiters.codebuild.max_attempts,
            config.waiters.codebuild.delay
        );
        println!("Tags:        {}", config.tags.len());
    } else {
        println!("Status:      not found");
        println!("Run `aws-launch config --init` to create one.");
    }

    Ok(())
}

fn init_config(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Remove it first if you want to reinitialize.");
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, SAMPLE_CONFIG)?;
    println!("Sample config written to: {}", config_path.display());
    Ok(())
}
