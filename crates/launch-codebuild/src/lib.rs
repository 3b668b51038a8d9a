//! Runs definitions as CodeBuild projects with no source and no artifacts.

pub mod api;
pub mod client;
pub mod codebuild_launcher;

pub use api::CodeBuildApi;
pub use client::CodeBuildClient;
pub use codebuild_launcher::CodeBuildLauncher;
