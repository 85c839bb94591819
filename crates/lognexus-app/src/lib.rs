//! Application services driving the alert lifecycle: rule evaluation,
//! instance management, stuck-execution detection, notification dispatch,
//! and job health queries. Generic over the port traits so the API layer
//! and tests choose the adapters.

pub mod dispatch_service;
pub mod error;
pub mod evaluator;
pub mod health_service;
pub mod instance_service;
pub mod timeout_service;

#[cfg(test)]
mod testing;

pub use error::AppError;
