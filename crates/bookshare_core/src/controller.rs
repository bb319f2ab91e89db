//! crates/bookshare_core/src/controller.rs
//!
//! The per-card state machine that runs owner actions (accept, decline, return)
//! against the `RentalService` port and applies optimistic local updates.
//!
//! Local state is a cache of the last reconciliation. It may disagree with the
//! backend until the next load, and `resync` always wins over optimistic edits.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::domain::{
    display_status, Book, BookDashboardView, DisplayStatus, EffectiveStatus, PendingRequestRow,
    RentalId,
};
use crate::ports::{PortError, RentalService};

/// How long a card keeps showing the last action error, in seconds.
pub const ERROR_VISIBLE_SECS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Accept,
    Decline,
    Return,
}

impl fmt::Display for CardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            CardAction::Accept => "accept",
            CardAction::Decline => "decline",
            CardAction::Return => "return",
        };
        f.write_str(verb)
    }
}

/// `Idle -> Submitting -> Idle`, on success and on failure alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardPhase {
    Idle,
    Submitting { action: CardAction, target: RentalId },
}

/// A recoverable, card-level failure. Local state is never changed when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("No active rental found for this book.")]
    NoActiveRental,
    #[error("Request {0} is not pending on this book.")]
    UnknownRequest(RentalId),
    #[error("Failed to {action} {target}: {source}")]
    Failed {
        action: CardAction,
        target: RentalId,
        #[source]
        source: PortError,
    },
}

#[derive(Debug, Clone)]
struct CardError {
    error: ActionError,
    raised_at: DateTime<Utc>,
}

/// Resets the phase to `Idle` however the submission ends, including when the
/// action future is dropped mid-flight.
struct Submission<'a> {
    phase: &'a mut CardPhase,
}

impl<'a> Submission<'a> {
    fn enter(phase: &'a mut CardPhase, action: CardAction, target: &str) -> Self {
        *phase = CardPhase::Submitting {
            action,
            target: target.to_string(),
        };
        Self { phase }
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        *self.phase = CardPhase::Idle;
    }
}

/// Runs owner actions for one book card.
///
/// Every action takes `&mut self`, so a card can only ever have one request in
/// flight. Different cards share nothing and may run concurrently.
pub struct RentalActionController {
    service: Arc<dyn RentalService>,
    book: Book,
    pending_requests: Vec<PendingRequestRow>,
    effective_status: EffectiveStatus,
    active_rental_id: Option<RentalId>,
    phase: CardPhase,
    last_error: Option<CardError>,
}

impl RentalActionController {
    /// Seeds the card from a reconciled view.
    pub fn new(service: Arc<dyn RentalService>, view: BookDashboardView) -> Self {
        Self {
            service,
            book: view.book,
            pending_requests: view.pending_requests,
            effective_status: view.effective_status,
            active_rental_id: view.active_rental_id,
            phase: CardPhase::Idle,
            last_error: None,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn pending_requests(&self) -> &[PendingRequestRow] {
        &self.pending_requests
    }

    pub fn effective_status(&self) -> EffectiveStatus {
        self.effective_status
    }

    pub fn display_status(&self) -> DisplayStatus {
        display_status(self.effective_status, &self.pending_requests)
    }

    pub fn active_rental_id(&self) -> Option<&str> {
        self.active_rental_id.as_deref()
    }

    pub fn phase(&self) -> &CardPhase {
        &self.phase
    }

    /// The current local state as a view, for rendering.
    pub fn view(&self) -> BookDashboardView {
        BookDashboardView {
            book: self.book.clone(),
            effective_status: self.effective_status,
            pending_requests: self.pending_requests.clone(),
            active_rental_id: self.active_rental_id.clone(),
        }
    }

    /// Replaces all local state with a fresh reconciliation, discarding optimistic edits.
    pub fn resync(&mut self, view: BookDashboardView) {
        self.book = view.book;
        self.pending_requests = view.pending_requests;
        self.effective_status = view.effective_status;
        self.active_rental_id = view.active_rental_id;
    }

    /// The last action error, unless it has been dismissed or has expired by `now`.
    pub fn visible_error(&self, now: DateTime<Utc>) -> Option<&ActionError> {
        self.last_error
            .as_ref()
            .filter(|e| now.signed_duration_since(e.raised_at) < Duration::seconds(ERROR_VISIBLE_SECS))
            .map(|e| &e.error)
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// Accepts a pending request. The book is then shown as rented with the
    /// accepted request as its active rental.
    ///
    /// Sibling requests stay pending locally; whether the backend auto-declines
    /// them shows up on the next reconciliation.
    #[instrument(skip(self, cancel), fields(book = %self.book.id))]
    pub async fn accept(
        &mut self,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        self.require_pending(request_id)?;
        self.submit(CardAction::Accept, request_id, cancel).await?;

        self.pending_requests.retain(|r| r.id != request_id);
        self.effective_status = EffectiveStatus::Rented;
        self.active_rental_id = Some(request_id.to_string());
        info!("Rental request accepted");
        Ok(())
    }

    /// Declines a pending request. The book's status is left alone.
    #[instrument(skip(self, cancel), fields(book = %self.book.id))]
    pub async fn decline(
        &mut self,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        self.require_pending(request_id)?;
        self.submit(CardAction::Decline, request_id, cancel).await?;

        self.pending_requests.retain(|r| r.id != request_id);
        info!("Rental request declined");
        Ok(())
    }

    /// Marks the active rental as returned. Without a known active rental this
    /// fails without touching the network.
    #[instrument(skip(self, cancel), fields(book = %self.book.id))]
    pub async fn return_book(&mut self, cancel: &CancellationToken) -> Result<(), ActionError> {
        let rental_id = match self.active_rental_id.clone() {
            Some(id) => id,
            None => return Err(self.record(ActionError::NoActiveRental)),
        };
        self.submit(CardAction::Return, &rental_id, cancel).await?;

        self.active_rental_id = None;
        self.effective_status = EffectiveStatus::Available;
        info!(rental = %rental_id, "Rental returned");
        Ok(())
    }

    fn require_pending(&mut self, request_id: &str) -> Result<(), ActionError> {
        if self.pending_requests.iter().any(|r| r.id == request_id) {
            Ok(())
        } else {
            Err(self.record(ActionError::UnknownRequest(request_id.to_string())))
        }
    }

    /// Issues one call through the port. Cancellation counts as a failure.
    async fn submit(
        &mut self,
        action: CardAction,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        self.last_error = None;
        let service = Arc::clone(&self.service);

        let result = {
            let _submission = Submission::enter(&mut self.phase, action, target);
            let call = async {
                match action {
                    CardAction::Accept => service.accept_rental_request(target).await,
                    CardAction::Decline => service.decline_rental_request(target).await,
                    CardAction::Return => service.return_rental(target).await,
                }
            };
            cancel
                .run_until_cancelled(call)
                .await
                .unwrap_or(Err(PortError::Cancelled))
        };

        result.map_err(|source| {
            warn!(%action, %target, error = %source, "Card action failed");
            self.record(ActionError::Failed {
                action,
                target: target.to_string(),
                source,
            })
        })
    }

    fn record(&mut self, error: ActionError) -> ActionError {
        self.last_error = Some(CardError {
            error: error.clone(),
            raised_at: Utc::now(),
        });
        error
    }
}

impl fmt::Debug for RentalActionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RentalActionController")
            .field("book", &self.book.id)
            .field("effective_status", &self.effective_status)
            .field("pending_requests", &self.pending_requests.len())
            .field("active_rental_id", &self.active_rental_id)
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RentalRequest;
    use crate::ports::PortResult;
    use crate::reconciler::reconcile_owner_books;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every mutating call and answers with a scripted result.
    #[derive(Default)]
    struct ScriptedService {
        calls: Mutex<Vec<(CardAction, String)>>,
        fail_with: Option<PortError>,
        hang: bool,
    }

    impl ScriptedService {
        fn failing(error: PortError) -> Self {
            Self {
                fail_with: Some(error),
                ..Default::default()
            }
        }

        fn hanging() -> Self {
            Self {
                hang: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(CardAction, String)> {
            self.calls.lock().unwrap().clone()
        }

        async fn answer(&self, action: CardAction, id: &str) -> PortResult<()> {
            self.calls.lock().unwrap().push((action, id.to_string()));
            if self.hang {
                std::future::pending::<()>().await;
            }
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl RentalService for ScriptedService {
        async fn books_owned_by_current_user(&self) -> PortResult<Vec<Book>> {
            Ok(Vec::new())
        }
        async fn all_books(&self) -> PortResult<Vec<Book>> {
            Ok(Vec::new())
        }
        async fn all_rental_requests(&self) -> PortResult<Vec<RentalRequest>> {
            Ok(Vec::new())
        }
        async fn rental_requests_for_current_user_as_renter(
            &self,
        ) -> PortResult<Vec<RentalRequest>> {
            Ok(Vec::new())
        }
        async fn accept_rental_request(&self, request_id: &str) -> PortResult<()> {
            self.answer(CardAction::Accept, request_id).await
        }
        async fn decline_rental_request(&self, request_id: &str) -> PortResult<()> {
            self.answer(CardAction::Decline, request_id).await
        }
        async fn return_rental(&self, rental_id: &str) -> PortResult<()> {
            self.answer(CardAction::Return, rental_id).await
        }
    }

    fn view(is_available: bool, rentals: &[(&str, &str)]) -> BookDashboardView {
        let book = Book {
            id: "1".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            owner: Some("42".to_string()),
            is_available,
        };
        let rentals: Vec<RentalRequest> = rentals
            .iter()
            .map(|(id, status)| RentalRequest {
                id: id.to_string(),
                book: "1".to_string(),
                renter: "9".to_string(),
                lender: Some("42".to_string()),
                status: status.to_string(),
                start_date: Some("2025-01-01".to_string()),
                end_date: Some("2025-01-10".to_string()),
            })
            .collect();
        reconcile_owner_books(&[book], &rentals, "42").remove(0)
    }

    fn pending_ids(controller: &RentalActionController) -> Vec<&str> {
        controller
            .pending_requests()
            .iter()
            .map(|r| r.id.as_str())
            .collect()
    }

    #[tokio::test]
    async fn accept_removes_request_and_marks_rented() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(
            service.clone(),
            view(true, &[("r1", "pending"), ("r2", "pending")]),
        );
        assert_eq!(card.display_status(), DisplayStatus::Requested);

        card.accept("r1", &CancellationToken::new()).await.unwrap();

        assert_eq!(pending_ids(&card), vec!["r2"]);
        assert_eq!(card.effective_status(), EffectiveStatus::Rented);
        assert_eq!(card.active_rental_id(), Some("r1"));
        assert_eq!(card.phase(), &CardPhase::Idle);
        assert_eq!(service.calls(), vec![(CardAction::Accept, "r1".to_string())]);
    }

    #[tokio::test]
    async fn decline_keeps_status() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(
            service.clone(),
            view(true, &[("r1", "pending"), ("r2", "pending")]),
        );

        card.decline("r2", &CancellationToken::new()).await.unwrap();

        assert_eq!(pending_ids(&card), vec!["r1"]);
        assert_eq!(card.effective_status(), EffectiveStatus::Available);
        assert_eq!(card.active_rental_id(), None);
    }

    #[tokio::test]
    async fn return_clears_active_rental() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(service.clone(), view(true, &[("r1", "accepted")]));
        assert_eq!(card.effective_status(), EffectiveStatus::Rented);

        card.return_book(&CancellationToken::new()).await.unwrap();

        assert_eq!(card.active_rental_id(), None);
        assert_eq!(card.effective_status(), EffectiveStatus::Available);
        assert_eq!(service.calls(), vec![(CardAction::Return, "r1".to_string())]);
    }

    #[tokio::test]
    async fn return_without_active_rental_makes_no_call() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(service.clone(), view(false, &[]));

        let err = card.return_book(&CancellationToken::new()).await.unwrap_err();

        assert_eq!(err, ActionError::NoActiveRental);
        assert!(service.calls().is_empty());
        assert_eq!(card.effective_status(), EffectiveStatus::Rented);
        assert_eq!(card.visible_error(Utc::now()), Some(&ActionError::NoActiveRental));
    }

    #[tokio::test]
    async fn unknown_request_is_rejected_locally() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(service.clone(), view(true, &[("r1", "pending")]));

        let err = card.accept("r9", &CancellationToken::new()).await.unwrap_err();

        assert_eq!(err, ActionError::UnknownRequest("r9".to_string()));
        assert!(service.calls().is_empty());
        assert_eq!(pending_ids(&card), vec!["r1"]);
    }

    #[tokio::test]
    async fn failed_action_leaves_state_unchanged() {
        let service = Arc::new(ScriptedService::failing(PortError::Unexpected(
            "500".to_string(),
        )));
        let mut card = RentalActionController::new(service.clone(), view(true, &[("r1", "pending")]));
        let before = card.view();

        let err = card.accept("r1", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(
            err,
            ActionError::Failed {
                action: CardAction::Accept,
                ..
            }
        ));
        assert_eq!(card.view(), before);
        assert_eq!(card.phase(), &CardPhase::Idle);
        assert!(card.visible_error(Utc::now()).is_some());
    }

    #[tokio::test]
    async fn cancellation_is_a_failure() {
        let service = Arc::new(ScriptedService::hanging());
        let mut card = RentalActionController::new(service.clone(), view(true, &[("r1", "accepted")]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = card.return_book(&cancel).await.unwrap_err();

        assert!(matches!(
            err,
            ActionError::Failed {
                source: PortError::Cancelled,
                ..
            }
        ));
        assert_eq!(card.active_rental_id(), Some("r1"));
        assert_eq!(card.phase(), &CardPhase::Idle);
    }

    #[tokio::test]
    async fn dropped_action_returns_to_idle() {
        let service = Arc::new(ScriptedService::hanging());
        let mut card = RentalActionController::new(service.clone(), view(true, &[("r1", "pending")]));

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            card.decline("r1", &CancellationToken::new()),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(card.phase(), &CardPhase::Idle);
        assert_eq!(pending_ids(&card), vec!["r1"]);
    }

    #[tokio::test]
    async fn errors_expire_and_clear_on_success() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(service.clone(), view(true, &[("r1", "pending")]));

        card.return_book(&CancellationToken::new()).await.unwrap_err();
        let later = Utc::now() + Duration::seconds(ERROR_VISIBLE_SECS + 1);
        assert!(card.visible_error(Utc::now()).is_some());
        assert!(card.visible_error(later).is_none());

        card.decline("r1", &CancellationToken::new()).await.unwrap();
        assert!(card.visible_error(Utc::now()).is_none());
    }

    #[tokio::test]
    async fn resync_overwrites_optimistic_state() {
        let service = Arc::new(ScriptedService::default());
        let mut card = RentalActionController::new(
            service.clone(),
            view(true, &[("r1", "pending"), ("r2", "pending")]),
        );
        card.accept("r1", &CancellationToken::new()).await.unwrap();

        // The backend auto-declined the sibling.
        card.resync(view(true, &[("r1", "accepted"), ("r2", "declined")]));

        assert!(card.pending_requests().is_empty());
        assert_eq!(card.active_rental_id(), Some("r1"));
        assert_eq!(card.effective_status(), EffectiveStatus::Rented);
    }
}
