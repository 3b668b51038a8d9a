use crate::error::LaunchError;
use crate::params::Tags;
use crate::task::BackendKind;
use crate::waiter::WaiterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
/// Loaded from ~/.config/aws-launch/config.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub waiters: Waiters,
    /// Merged into the tags of every define and launch request.
    #[serde(default)]
    pub tags: Tags,
}

/// Per-service endpoint overrides, e.g. for a local emulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default)]
    pub ecs: Option<String>,
    #[serde(default)]
    pub codebuild: Option<String>,
    #[serde(default)]
    pub logs: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Waiters {
    #[serde(default)]
    pub ecs: WaiterConfig,
    #[serde(default)]
    pub codebuild: WaiterConfig,
}

impl Waiters {
    pub fn for_backend(&self, kind: BackendKind) -> WaiterConfig {
        match kind {
            BackendKind::Ecs => self.ecs,
            BackendKind::Codebuild => self.codebuild,
        }
    }
}

impl Config {
    /// Load config from the default path, or defaults when it doesn't exist.
    pub fn load_default() -> Result<Self, LaunchError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, LaunchError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), LaunchError> {
        for (name, waiter) in [("ecs", &self.waiters.ecs), ("codebuild", &self.waiters.codebuild)] {
            if waiter.max_attempts == 0 {
                return Err(LaunchError::Config(format!(
                    "waiters.{}.max_attempts must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("aws-launch")
            .join("config.yaml")
    }

    /// Region from the request, then this config, then the AWS environment.
    pub fn resolve_region(&self, requested: Option<&str>) -> Option<String> {
        requested
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| self.region.clone())
            .or_else(|| std::env::var("AWS_REGION").ok())
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
    }

    /// Request tags layered over the configured defaults.
    pub fn merged_tags(&self, request: &Tags) -> Tags {
        let mut tags = self.tags.clone();
        tags.extend(request.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags
    }
}
