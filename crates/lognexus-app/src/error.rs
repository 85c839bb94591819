use lognexus_core::error::DomainError;
use lognexus_ports::error::{NotifyError, PortError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("port error: {0}")]
    Port(#[from] PortError),
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
    #[error("misconfigured definition: {0}")]
    Misconfigured(String),
}
