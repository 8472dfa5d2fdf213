// Library crate for endpoint-probe
// Exports modules for use by the probe binary and tests

pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::{AppError, AppResult};
