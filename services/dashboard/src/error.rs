//! services/dashboard/src/error.rs
//!
//! Defines the primary error type for the dashboard service.

use crate::config::ConfigError;
use crate::dashboard::DashboardError;
use bookshare_core::controller::ActionError;
use bookshare_core::ports::PortError;


/// The primary error type for the `dashboard` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the rental service port.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// The dashboard could not be loaded; the page shows an error state instead.
    #[error("{0}")]
    Dashboard(#[from] DashboardError),

    /// A card action failed. Recoverable; the card stays interactive.
    #[error("{0}")]
    Action(#[from] ActionError),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
