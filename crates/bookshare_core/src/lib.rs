pub mod controller;
pub mod domain;
pub mod ports;
pub mod reconciler;

pub use controller::{ActionError, CardAction, CardPhase, RentalActionController};
pub use domain::{
    Book, BookDashboardView, DisplayStatus, EffectiveStatus, PendingRequestRow, RentalRequest,
    RentalRowView, RentalState, Session,
};
pub use ports::{PortError, PortResult, RentalService};
pub use reconciler::{reconcile_owner_books, reconcile_renter_rentals};
