pub mod aggregate;
pub mod app;
pub mod config;
pub mod demo;
pub mod errors;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod submit;
pub mod tiers;

pub use app::router;
pub use config::AppConfig;
pub use ingest::{spawn_ingest, spawn_ingest_from};
pub use state::AppState;
