//! crates/bookshare_core/src/reconciler.rs
//!
//! Joins raw book and rental request collections into display-ready view state.
//! Both functions are pure: the caller fetches the collections and owns the output.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::domain::{
    book_label, user_label, Book, BookDashboardView, EffectiveStatus, PendingRequestRow,
    RentalRequest, RentalRowView, RentalState,
};

/// Requests grouped under one book, in input order.
#[derive(Default)]
struct BookRentals<'a> {
    active: Option<&'a RentalRequest>,
    pending: Vec<&'a RentalRequest>,
}

/// Builds one dashboard view per owned book, in the order the books were given.
///
/// `books` must already be restricted to the current user's books. Requests that
/// point at a book outside that set are ignored. An accepted request marks the book
/// `Rented` even when the backend's availability flag still says otherwise.
#[instrument(skip_all, fields(user = %current_user_id, books = books.len(), rentals = rentals.len()))]
pub fn reconcile_owner_books(
    books: &[Book],
    rentals: &[RentalRequest],
    current_user_id: &str,
) -> Vec<BookDashboardView> {
    let mut by_book: HashMap<&str, BookRentals<'_>> = HashMap::new();
    for rental in rentals {
        match rental.state() {
            RentalState::Accepted => {
                let entry = by_book.entry(rental.book.as_str()).or_default();
                match entry.active {
                    // First match in input order wins if the backend reports two.
                    Some(existing) => warn!(
                        book = %rental.book,
                        kept = %existing.id,
                        ignored = %rental.id,
                        "More than one accepted rental for a book"
                    ),
                    None => entry.active = Some(rental),
                }
            }
            RentalState::Pending => by_book
                .entry(rental.book.as_str())
                .or_default()
                .pending
                .push(rental),
            RentalState::Closed => {}
        }
    }

    let views: Vec<BookDashboardView> = books
        .iter()
        .map(|book| {
            let grouped = by_book.get(book.id.as_str());
            let active_rental_id = grouped.and_then(|g| g.active).map(|r| r.id.clone());
            let pending_requests = grouped
                .map(|g| g.pending.iter().map(|r| pending_row(r)).collect())
                .unwrap_or_default();

            let effective_status = if active_rental_id.is_some() || !book.is_available {
                EffectiveStatus::Rented
            } else {
                EffectiveStatus::Available
            };

            BookDashboardView {
                book: book.clone(),
                effective_status,
                pending_requests,
                active_rental_id,
            }
        })
        .collect();

    let owned: HashSet<&str> = books.iter().map(|b| b.id.as_str()).collect();
    let unmatched = by_book.keys().filter(|id| !owned.contains(**id)).count();
    if unmatched > 0 {
        debug!(unmatched, "Ignored open requests for books outside the owner's set");
    }

    views
}

/// Builds the renter's own-rentals list, resolving book titles from `books`.
///
/// A request whose book is not in `books` gets a `Book #{id}` title instead of failing.
#[instrument(skip_all, fields(rentals = rentals.len(), books = books.len()))]
pub fn reconcile_renter_rentals(rentals: &[RentalRequest], books: &[Book]) -> Vec<RentalRowView> {
    let titles: HashMap<&str, &str> = books
        .iter()
        .map(|b| (b.id.as_str(), b.title.as_str()))
        .collect();

    rentals
        .iter()
        .map(|rental| {
            let book_title = match titles.get(rental.book.as_str()) {
                Some(title) => (*title).to_string(),
                None => {
                    debug!(rental = %rental.id, book = %rental.book, "No title for rented book");
                    book_label(&rental.book)
                }
            };
            let lender_label = match &rental.lender {
                Some(lender) => user_label(lender),
                None => {
                    debug!(rental = %rental.id, "Rental has no lender reference");
                    String::new()
                }
            };

            RentalRowView {
                id: rental.id.clone(),
                book_title,
                lender_label,
                status: rental.status.clone(),
                due_date: rental.end_date.clone().unwrap_or_default(),
            }
        })
        .collect()
}

fn pending_row(rental: &RentalRequest) -> PendingRequestRow {
    let start_date = rental.start_date.clone().unwrap_or_default();
    let end_date = rental.end_date.clone().unwrap_or_default();
    check_period(rental, &start_date, &end_date);

    PendingRequestRow {
        id: rental.id.clone(),
        requester_label: user_label(&rental.renter),
        period: format!("{} to {}", start_date, end_date),
        start_date,
        end_date,
    }
}

/// The backend is trusted on periods; an inverted one is only logged.
fn check_period(rental: &RentalRequest, start: &str, end: &str) {
    let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    if let (Some(start), Some(end)) = (parse(start), parse(end)) {
        if end < start {
            warn!(rental = %rental.id, %start, %end, "Rental period ends before it starts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, title: &str, is_available: bool) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            author: String::new(),
            owner: None,
            is_available,
        }
    }

    fn rental(id: &str, book: &str, renter: &str, status: &str) -> RentalRequest {
        RentalRequest {
            id: id.to_string(),
            book: book.to_string(),
            renter: renter.to_string(),
            lender: None,
            status: status.to_string(),
            start_date: Some("2025-01-01".to_string()),
            end_date: Some("2025-01-10".to_string()),
        }
    }

    #[test]
    fn single_pending_request_end_to_end() {
        let books = vec![book("1", "Dune", true)];
        let rentals = vec![rental("r1", "1", "9", "pending")];

        let views = reconcile_owner_books(&books, &rentals, "42");

        assert_eq!(views.len(), 1);
        let view = &views[0];
        assert_eq!(view.effective_status, EffectiveStatus::Available);
        assert_eq!(view.active_rental_id, None);
        assert_eq!(
            view.pending_requests,
            vec![PendingRequestRow {
                id: "r1".to_string(),
                requester_label: "User 9".to_string(),
                period: "2025-01-01 to 2025-01-10".to_string(),
                start_date: "2025-01-01".to_string(),
                end_date: "2025-01-10".to_string(),
            }]
        );
    }

    #[test]
    fn output_follows_book_order() {
        let books = vec![book("3", "C", true), book("1", "A", true), book("2", "B", false)];
        let rentals = vec![rental("r1", "2", "9", "accepted"), rental("r2", "1", "9", "pending")];

        let ids: Vec<_> = reconcile_owner_books(&books, &rentals, "42")
            .into_iter()
            .map(|v| v.book.id)
            .collect();

        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[test]
    fn accepted_rental_overrides_availability_flag() {
        let books = vec![book("1", "Dune", true)];
        let rentals = vec![rental("r1", "1", "9", "accepted")];

        let views = reconcile_owner_books(&books, &rentals, "42");

        assert_eq!(views[0].effective_status, EffectiveStatus::Rented);
        assert_eq!(views[0].active_rental_id.as_deref(), Some("r1"));
    }

    #[test]
    fn unavailable_flag_without_rental_is_rented() {
        let views = reconcile_owner_books(&[book("1", "Dune", false)], &[], "42");

        assert_eq!(views[0].effective_status, EffectiveStatus::Rented);
        assert_eq!(views[0].active_rental_id, None);
    }

    #[test]
    fn book_without_requests_is_available() {
        let books = vec![book("1", "Dune", true), book("2", "Emma", true)];
        let rentals = vec![rental("r1", "2", "9", "pending")];

        let views = reconcile_owner_books(&books, &rentals, "42");

        assert_eq!(views[0].effective_status, EffectiveStatus::Available);
        assert!(views[0].pending_requests.is_empty());
    }

    #[test]
    fn pending_list_keeps_only_pending_in_input_order() {
        let books = vec![book("1", "Dune", true)];
        let rentals = vec![
            rental("r3", "1", "7", "pending"),
            rental("r1", "1", "8", "declined"),
            rental("r4", "1", "6", "accepted"),
            rental("r2", "1", "5", "pending"),
            rental("r5", "1", "4", "returned"),
        ];

        let views = reconcile_owner_books(&books, &rentals, "42");
        let pending: Vec<_> = views[0].pending_requests.iter().map(|r| r.id.as_str()).collect();

        assert_eq!(pending, vec!["r3", "r2"]);
    }

    #[test]
    fn duplicate_accepted_picks_first_in_input_order() {
        let books = vec![book("1", "Dune", true)];
        let rentals = vec![rental("r7", "1", "9", "accepted"), rental("r2", "1", "8", "accepted")];

        let views = reconcile_owner_books(&books, &rentals, "42");

        assert_eq!(views[0].active_rental_id.as_deref(), Some("r7"));
    }

    #[test]
    fn requests_for_unknown_books_are_ignored() {
        let books = vec![book("1", "Dune", true)];
        let rentals = vec![rental("r1", "99", "9", "accepted"), rental("r2", "99", "9", "pending")];

        let views = reconcile_owner_books(&books, &rentals, "42");

        assert_eq!(views.len(), 1);
        assert_eq!(views[0].effective_status, EffectiveStatus::Available);
        assert!(views[0].pending_requests.is_empty());
    }

    #[test]
    fn missing_and_inverted_dates_do_not_fail() {
        let books = vec![book("1", "Dune", true)];
        let mut undated = rental("r1", "1", "9", "pending");
        undated.start_date = None;
        undated.end_date = None;
        let mut inverted = rental("r2", "1", "9", "pending");
        inverted.start_date = Some("2025-02-01".to_string());
        inverted.end_date = Some("2025-01-01".to_string());

        let views = reconcile_owner_books(&books, &[undated, inverted], "42");

        assert_eq!(views[0].pending_requests[0].period, " to ");
        assert_eq!(views[0].pending_requests[1].period, "2025-02-01 to 2025-01-01");
    }

    #[test]
    fn renter_rows_resolve_titles_and_fall_back() {
        let books = vec![book("1", "Dune", true)];
        let mut known = rental("r1", "1", "42", "accepted");
        known.lender = Some("7".to_string());
        let mut unknown = rental("r2", "55", "42", "Pending");
        unknown.end_date = None;

        let rows = reconcile_renter_rentals(&[known, unknown], &books);

        assert_eq!(
            rows,
            vec![
                RentalRowView {
                    id: "r1".to_string(),
                    book_title: "Dune".to_string(),
                    lender_label: "User 7".to_string(),
                    status: "accepted".to_string(),
                    due_date: "2025-01-10".to_string(),
                },
                RentalRowView {
                    id: "r2".to_string(),
                    book_title: "Book #55".to_string(),
                    lender_label: String::new(),
                    status: "Pending".to_string(),
                    due_date: String::new(),
                },
            ]
        );
    }
}
