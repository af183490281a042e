pub mod api;
pub mod config;
pub mod fake_backend;
pub mod frames;
pub mod http_client;
pub mod model;
pub mod orchestrator;
pub mod persist;
pub mod session_cache;
pub mod share;
pub mod state;
