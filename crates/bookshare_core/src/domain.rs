//! crates/bookshare_core/src/domain.rs
//!
//! Defines the pure, core data structures for the lending dashboard.
//! These structs are independent of any HTTP client or serialization format.

use std::fmt;

/// Opaque book identifier. Numeric ids from the backend are normalized to strings.
pub type BookId = String;

/// Opaque rental request identifier.
pub type RentalId = String;

/// Opaque user identifier.
pub type UserId = String;

/// A book listed for lending, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub owner: Option<UserId>,
    /// The backend's cached availability flag. May lag behind the rental records.
    pub is_available: bool,
}

/// A renter's request to borrow a book for a period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalRequest {
    pub id: RentalId,
    pub book: BookId,
    pub renter: UserId,
    pub lender: Option<UserId>,
    /// Raw backend status string, kept verbatim for the renter's list.
    pub status: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl RentalRequest {
    /// Classifies the raw status. Anything other than pending/accepted is closed.
    pub fn state(&self) -> RentalState {
        RentalState::from_status(&self.status)
    }
}

/// The lifecycle position of a rental request, as far as reconciliation cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalState {
    Pending,
    Accepted,
    /// Declined, returned, or any value the backend invents later.
    Closed,
}

impl RentalState {
    pub fn from_status(status: &str) -> Self {
        let status = status.trim();
        if status.eq_ignore_ascii_case("pending") {
            RentalState::Pending
        } else if status.eq_ignore_ascii_case("accepted") {
            RentalState::Accepted
        } else {
            RentalState::Closed
        }
    }
}

/// The lending status the reconciler guarantees for a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveStatus {
    Available,
    Rented,
}

/// What a book card shows. `Requested` is presentation only and never comes from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Available,
    Rented,
    Requested,
}

impl From<EffectiveStatus> for DisplayStatus {
    fn from(status: EffectiveStatus) -> Self {
        match status {
            EffectiveStatus::Available => DisplayStatus::Available,
            EffectiveStatus::Rented => DisplayStatus::Rented,
        }
    }
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&DisplayStatus::from(*self), f)
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DisplayStatus::Available => "Available",
            DisplayStatus::Rented => "Rented",
            DisplayStatus::Requested => "Requested",
        };
        f.write_str(label)
    }
}

/// A pending request row shown on the owner's book card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequestRow {
    pub id: RentalId,
    pub requester_label: String,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
}

/// Per-book view state derived by the reconciler. Rebuilt wholesale on every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDashboardView {
    pub book: Book,
    pub effective_status: EffectiveStatus,
    /// Backend order, which is not necessarily chronological.
    pub pending_requests: Vec<PendingRequestRow>,
    pub active_rental_id: Option<RentalId>,
}

impl BookDashboardView {
    /// Layers the `Requested` badge on top of an available book with open requests.
    pub fn display_status(&self) -> DisplayStatus {
        display_status(self.effective_status, &self.pending_requests)
    }
}

pub(crate) fn display_status(
    status: EffectiveStatus,
    pending_requests: &[PendingRequestRow],
) -> DisplayStatus {
    match status {
        EffectiveStatus::Available if !pending_requests.is_empty() => DisplayStatus::Requested,
        other => other.into(),
    }
}

/// One row in the renter's own-rentals list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalRowView {
    pub id: RentalId,
    pub book_title: String,
    pub lender_label: String,
    pub status: String,
    pub due_date: String,
}

/// The bearer credential and the user it belongs to.
#[derive(Clone)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

// Fallback labels used when no richer profile data is loaded.

pub fn user_label(user_id: &str) -> String {
    format!("User {}", user_id)
}

pub fn book_label(book_id: &str) -> String {
    format!("Book #{}", book_id)
}
