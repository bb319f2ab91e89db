//! services/dashboard/src/dashboard.rs
//!
//! Loads every collection the dashboard needs, waits for all of them to settle,
//! and only then runs reconciliation. A failed collection blocks the page rather
//! than being treated as empty.

use std::fmt;
use std::sync::Arc;

use bookshare_core::controller::RentalActionController;
use bookshare_core::domain::{BookDashboardView, RentalRowView};
use bookshare_core::ports::{PortError, RentalService};
use bookshare_core::reconciler::{reconcile_owner_books, reconcile_renter_rentals};
use futures::future::join4;
use tracing::{info, warn};

/// The collections whose failure blocks the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    OwnedBooks,
    RentalRequests,
    MyRentals,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::OwnedBooks => "your books",
            Collection::RentalRequests => "rental requests",
            Collection::MyRentals => "your rentals",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to load {collection}: {source}")]
pub struct FetchFailure {
    pub collection: Collection,
    #[source]
    pub source: PortError,
}

/// One entry per collection that failed to load.
#[derive(Debug, thiserror::Error)]
#[error("{}", summarize(.failures))]
pub struct DashboardError {
    pub failures: Vec<FetchFailure>,
}

fn summarize(failures: &[FetchFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reconciled, display-ready state for one dashboard load.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub books: Vec<BookDashboardView>,
    pub rentals: Vec<RentalRowView>,
}

impl Dashboard {
    /// One action controller per book card, in card order.
    pub fn controllers(&self, service: Arc<dyn RentalService>) -> Vec<RentalActionController> {
        self.books
            .iter()
            .cloned()
            .map(|view| RentalActionController::new(service.clone(), view))
            .collect()
    }

    pub fn card(&self, book_id: &str) -> Option<&BookDashboardView> {
        self.books.iter().find(|v| v.book.id == book_id)
    }

    /// Overwrites each card's optimistic state with this load's result.
    /// Cards whose book is no longer listed are left alone.
    pub fn resync(&self, cards: &mut [RentalActionController]) {
        for card in cards.iter_mut() {
            if let Some(view) = self.card(&card.book().id) {
                card.resync(view.clone());
            }
        }
    }
}

/// Fetches all collections concurrently and reconciles them.
pub async fn load_dashboard(
    service: &dyn RentalService,
    user_id: &str,
) -> Result<Dashboard, DashboardError> {
    let (owned, requests, mine, catalogue) = join4(
        service.books_owned_by_current_user(),
        service.all_rental_requests(),
        service.rental_requests_for_current_user_as_renter(),
        service.all_books(),
    )
    .await;

    let mut failures = Vec::new();
    let owned = settle(owned, Collection::OwnedBooks, &mut failures);
    let requests = settle(requests, Collection::RentalRequests, &mut failures);
    let mine = settle(mine, Collection::MyRentals, &mut failures);

    let (owned, requests, mine) = match (owned, requests, mine) {
        (Some(owned), Some(requests), Some(mine)) => (owned, requests, mine),
        _ => return Err(DashboardError { failures }),
    };

    // Titles are labels only; without the catalogue the renter's list falls back to "Book #id".
    let mut title_source = catalogue.unwrap_or_else(|e| {
        warn!(error = %e, "Book catalogue unavailable, using fallback titles");
        Vec::new()
    });
    title_source.extend(owned.iter().cloned());

    let books = reconcile_owner_books(&owned, &requests, user_id);
    let rentals = reconcile_renter_rentals(&mine, &title_source);
    info!(books = books.len(), rentals = rentals.len(), "Dashboard loaded");

    Ok(Dashboard { books, rentals })
}

fn settle<T>(
    result: Result<T, PortError>,
    collection: Collection,
    failures: &mut Vec<FetchFailure>,
) -> Option<T> {
    match result {
        Ok(items) => Some(items),
        Err(source) => {
            warn!(%collection, error = %source, "Dashboard collection failed to load");
            failures.push(FetchFailure { collection, source });
            None
        }
    }
}
