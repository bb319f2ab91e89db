//! services/dashboard/src/adapters/wire.rs
//!
//! "Impure" JSON record structs for the lending API and their conversion into
//! the core domain types. A record missing a required field fails the whole
//! collection, so a half-decoded list never reaches the reconciler.

use bookshare_core::domain::{Book, RentalRequest};
use bookshare_core::ports::{PortError, PortResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Ids arrive as JSON strings or integers depending on the endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl WireId {
    pub fn into_string(self) -> String {
        match self {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

/// List endpoints may answer with a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> ListBody<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) => items,
            ListBody::Paged { results } => results,
        }
    }
}

#[derive(Deserialize)]
pub struct BookRecord {
    id: WireId,
    title: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    owner: Option<WireId>,
    is_available: bool,
}
impl BookRecord {
    pub fn to_domain(self) -> Book {
        Book {
            id: self.id.into_string(),
            title: self.title,
            author: self.author.unwrap_or_default(),
            owner: self.owner.map(WireId::into_string),
            is_available: self.is_available,
        }
    }
}

#[derive(Deserialize)]
pub struct RentalRecord {
    id: WireId,
    book: WireId,
    renter: WireId,
    #[serde(default)]
    lender: Option<WireId>,
    status: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}
impl RentalRecord {
    pub fn to_domain(self) -> RentalRequest {
        RentalRequest {
            id: self.id.into_string(),
            book: self.book.into_string(),
            renter: self.renter.into_string(),
            lender: self.lender.map(WireId::into_string),
            status: self.status,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Deserialize)]
pub struct LoginUser {
    pub id: WireId,
}

/// Decodes a list body and converts every record, or fails with `Malformed`.
pub fn decode_list<R, T>(body: &[u8], to_domain: fn(R) -> T) -> PortResult<Vec<T>>
where
    R: DeserializeOwned,
{
    let list: ListBody<R> =
        serde_json::from_slice(body).map_err(|e| PortError::Malformed(e.to_string()))?;
    Ok(list.into_items().into_iter().map(to_domain).collect())
}
