//! services/dashboard/src/adapters/http.rs
//!
//! This module contains the HTTP adapter for the lending REST API.
//! It implements the `RentalService` port from the `core` crate using `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use bookshare_core::domain::{Book, RentalRequest, Session};
use bookshare_core::ports::{PortError, PortResult, RentalService};
use reqwest::header::ACCEPT;
use reqwest::{Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::wire::{decode_list, BookRecord, LoginRequest, LoginResponse, RentalRecord};

const OWNED_BOOKS: &str = "book/books/mine/";
const ALL_BOOKS: &str = "book/books/";
const ALL_RENTALS: &str = "rental/rentals/";
const MY_RENTALS: &str = "rental/rentals/mine/";
const LOGIN: &str = "user/login/";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `RentalService` port over HTTP.
///
/// The bearer credential is injected at construction and attached to every call.
#[derive(Clone)]
pub struct HttpRentalService {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl HttpRentalService {
    /// Creates a new `HttpRentalService` with its own client.
    pub fn new(base_url: Url, token: impl Into<String>, timeout: Duration) -> PortResult<Self> {
        Ok(Self::with_client(build_client(timeout)?, base_url, token))
    }

    /// Creates a new `HttpRentalService` sharing an existing client.
    pub fn with_client(client: reqwest::Client, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            token: token.into(),
        }
    }

    /// Exchanges email and password for a bearer token and the user's id.
    pub async fn login(
        client: &reqwest::Client,
        base_url: &Url,
        email: &str,
        password: &str,
    ) -> PortResult<Session> {
        let url = endpoint(base_url, LOGIN)?;
        debug!(%url, "Logging in");
        let response = client
            .post(url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(transport_error)?;
        let body = check_status(response, "login").await?;
        let login: LoginResponse =
            serde_json::from_slice(&body).map_err(|e| PortError::Malformed(e.to_string()))?;

        Ok(Session {
            user_id: login.user.id.into_string(),
            token: login.token,
        })
    }

    async fn get_bytes(&self, path: &str) -> PortResult<Vec<u8>> {
        let url = endpoint(&self.base_url, path)?;
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, path).await
    }

    /// Owner actions share one shape: `POST rental/rentals/{id}/{verb}/` with no body.
    async fn post_action(&self, rental_id: &str, verb: &str) -> PortResult<()> {
        let path = format!("{}{}/{}/", ALL_RENTALS, rental_id, verb);
        let url = endpoint(&self.base_url, &path)?;
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, &path).await.map(|_| ())
    }
}

/// Builds the shared HTTP client. The timeout here is the only one that applies.
pub fn build_client(timeout: Duration) -> PortResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PortError::Unexpected(format!("Failed to build HTTP client: {}", e)))
}

fn endpoint(base_url: &Url, path: &str) -> PortResult<Url> {
    base_url
        .join(path)
        .map_err(|e| PortError::Unexpected(format!("Invalid API URL for {}: {}", path, e)))
}

fn transport_error(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Unexpected("Request timed out".to_string())
    } else {
        PortError::Unexpected(e.to_string())
    }
}

/// Maps the status code onto the port's error vocabulary and returns the body.
async fn check_status(response: Response, what: &str) -> PortResult<Vec<u8>> {
    let status = response.status();
    if status.is_success() {
        return response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| PortError::Malformed(format!("Failed to read body: {}", e)));
    }

    warn!(%status, what, "API call failed");
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
        StatusCode::NOT_FOUND => Err(PortError::NotFound(what.to_string())),
        _ => Err(PortError::Unexpected(format!("API returned {} for {}", status, what))),
    }
}

//=========================================================================================
// `RentalService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RentalService for HttpRentalService {
    async fn books_owned_by_current_user(&self) -> PortResult<Vec<Book>> {
        let body = self.get_bytes(OWNED_BOOKS).await?;
        decode_list(&body, BookRecord::to_domain)
    }

    async fn all_books(&self) -> PortResult<Vec<Book>> {
        let body = self.get_bytes(ALL_BOOKS).await?;
        decode_list(&body, BookRecord::to_domain)
    }

    async fn all_rental_requests(&self) -> PortResult<Vec<RentalRequest>> {
        let body = self.get_bytes(ALL_RENTALS).await?;
        decode_list(&body, RentalRecord::to_domain)
    }

    async fn rental_requests_for_current_user_as_renter(&self) -> PortResult<Vec<RentalRequest>> {
        let body = self.get_bytes(MY_RENTALS).await?;
        decode_list(&body, RentalRecord::to_domain)
    }

    async fn accept_rental_request(&self, request_id: &str) -> PortResult<()> {
        self.post_action(request_id, "accept").await
    }

    async fn decline_rental_request(&self, request_id: &str) -> PortResult<()> {
        self.post_action(request_id, "decline").await
    }

    async fn return_rental(&self, rental_id: &str) -> PortResult<()> {
        self.post_action(rental_id, "return").await
    }
}
