//! crates/bookshare_core/src/ports.rs
//!
//! Defines the collaborator contract the core consumes.
//! The trait forms the boundary of the hexagonal architecture, so the reconciler and
//! the card controller never see the HTTP client, the credential, or the wire format.

use async_trait::async_trait;
use crate::domain::{Book, RentalRequest};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the transport (status codes, decoding).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request cancelled")]
    Cancelled,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The remote lending API, already bound to the current user's credential.
///
/// Every "mine" call is pre-filtered server-side; the core never filters by owner
/// or renter itself.
#[async_trait]
pub trait RentalService: Send + Sync {
    // --- Read path ---
    async fn books_owned_by_current_user(&self) -> PortResult<Vec<Book>>;

    /// Every listed book. Only used to resolve titles for the renter's list.
    async fn all_books(&self) -> PortResult<Vec<Book>>;

    async fn all_rental_requests(&self) -> PortResult<Vec<RentalRequest>>;

    async fn rental_requests_for_current_user_as_renter(&self) -> PortResult<Vec<RentalRequest>>;

    // --- Owner actions ---
    async fn accept_rental_request(&self, request_id: &str) -> PortResult<()>;

    async fn decline_rental_request(&self, request_id: &str) -> PortResult<()>;

    async fn return_rental(&self, rental_id: &str) -> PortResult<()>;
}
