pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod middleware;
pub mod openapi;

pub use api::create_router;
pub use config::Settings;
pub use error::{AppError, AppResult};
pub use infrastructure::{connect_store, spawn_cleanup_coordinator, CleanupSchedule};
pub use openapi::{generate_openapi_json, get_openapi_spec};
