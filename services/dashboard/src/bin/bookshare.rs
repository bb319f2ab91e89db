//! services/dashboard/src/bin/bookshare.rs

use std::sync::Arc;

use bookshare_core::controller::RentalActionController;
use bookshare_core::domain::Session;
use bookshare_core::ports::RentalService;
use clap::{Parser, Subcommand};
use dashboard_lib::{
    adapters::http::{build_client, HttpRentalService},
    config::{Config, Credentials},
    dashboard::{load_dashboard, Dashboard},
    error::ApiError,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bookshare", about = "Lending dashboard for BookShare")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show your books and your rentals.
    Dashboard,
    /// Accept a pending request on one of your books.
    Accept { book_id: String, request_id: String },
    /// Decline a pending request on one of your books.
    Decline { book_id: String, request_id: String },
    /// Mark the active rental of one of your books as returned.
    Return { book_id: String },
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let cli = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!(api = %config.api_url, "Configuration loaded");

    // --- 2. Resolve the Session & Build the Adapter ---
    let client = build_client(config.request_timeout)?;
    let session = match &config.credentials {
        Credentials::Token { token, user_id } => Session {
            user_id: user_id.clone().unwrap_or_default(),
            token: token.clone(),
        },
        Credentials::Login { email, password } => {
            info!("No token configured, logging in...");
            HttpRentalService::login(&client, &config.api_url, email, password).await?
        }
    };
    let service: Arc<dyn RentalService> = Arc::new(HttpRentalService::with_client(
        client,
        config.api_url.clone(),
        session.token.clone(),
    ));

    // --- 3. Load & Reconcile ---
    let dashboard = load_dashboard(service.as_ref(), &session.user_id).await?;

    // --- 4. Run the Requested Action ---
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.command.unwrap_or(Command::Dashboard) {
        Command::Dashboard => print_dashboard(&dashboard),
        Command::Accept { book_id, request_id } => {
            let mut card = card_for(&dashboard, service, &book_id)?;
            card.accept(&request_id, &cancel).await?;
            print_card(&card);
        }
        Command::Decline { book_id, request_id } => {
            let mut card = card_for(&dashboard, service, &book_id)?;
            card.decline(&request_id, &cancel).await?;
            print_card(&card);
        }
        Command::Return { book_id } => {
            let mut card = card_for(&dashboard, service, &book_id)?;
            card.return_book(&cancel).await?;
            print_card(&card);
        }
    }

    Ok(())
}

fn card_for(
    dashboard: &Dashboard,
    service: Arc<dyn RentalService>,
    book_id: &str,
) -> Result<RentalActionController, ApiError> {
    let view = dashboard
        .card(book_id)
        .ok_or_else(|| ApiError::Internal(format!("Book {} is not one of your books", book_id)))?;
    Ok(RentalActionController::new(service, view.clone()))
}

fn print_card(card: &RentalActionController) {
    let book = card.book();
    println!("{} by {} [{}]", book.title, book.author, card.display_status());
    if let Some(rental_id) = card.active_rental_id() {
        println!("    active rental: {}", rental_id);
    }
    for request in card.pending_requests() {
        println!(
            "    request {} from {}: {}",
            request.id, request.requester_label, request.period
        );
    }
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("My books");
    if dashboard.books.is_empty() {
        println!("    You don't have any books listed for sharing yet.");
    }
    for view in &dashboard.books {
        let book = &view.book;
        println!("  {} ({}) by {} [{}]", book.title, book.id, book.author, view.display_status());
        if let Some(rental_id) = &view.active_rental_id {
            println!("    active rental: {}", rental_id);
        }
        for request in &view.pending_requests {
            println!(
                "    request {} from {}: {}",
                request.id, request.requester_label, request.period
            );
        }
    }

    println!();
    println!("My rentals");
    if dashboard.rentals.is_empty() {
        println!("    You currently have no borrowed books.");
    }
    for row in &dashboard.rentals {
        println!(
            "  {:<32} {:<12} {:<10} {}",
            row.book_title, row.lender_label, row.status, row.due_date
        );
    }
}
