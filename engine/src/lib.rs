// Restore navigation and resolution engine for the director console

pub mod config;
pub mod console;
pub mod errors;
pub mod models;
pub mod restore;
pub mod telemetry;
