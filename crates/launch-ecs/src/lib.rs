//! Runs definitions as Fargate tasks on an ECS cluster.

pub mod api;
pub mod client;
pub mod ecs_launcher;

pub use api::EcsApi;
pub use client::EcsClient;
pub use ecs_launcher::EcsLauncher;
