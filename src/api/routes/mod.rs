//! Routes HTTP, une sous-module par service

pub mod api_keys;
pub mod auth;
pub mod jobs;
pub mod marketplace;
pub mod middleware;
pub mod projects;
pub mod quantum_apps;
pub mod registry;
pub mod upload;
