// Library exports for testing and reusability

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use error::{AppError, Result};

use services::trip_machine::TripStateMachine;
use std::sync::Arc;

// App state for sharing across the application
pub struct AppState {
    pub machine: Arc<TripStateMachine>,
}
