//! Thin async HTTP client for the planner API.
//!
//! Every call takes the server's base url and the user id sent in the
//! `x-user-id` header.

pub mod goals;
pub mod planner;
pub mod sections;
pub mod stats;
pub mod tasks;

pub use goals::*;
pub use planner::*;
pub use sections::*;
pub use stats::*;
pub use tasks::*;

use crate::USER_HEADER;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unexpected server error: {0}")]
    ServerError(String),
}

pub(crate) fn request(method: Method, url: String, user: &str) -> RequestBuilder {
    reqwest::Client::new()
        .request(method, url)
        .header(USER_HEADER, user)
}

/// Maps error statuses onto [`ClientError`], keeping the server's message.
pub(crate) async fn check(response: Response, what: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(what.to_string()),
        s if s.is_client_error() => ClientError::Rejected(body),
        _ => ClientError::ServerError(body),
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    what: &str,
) -> Result<T, ClientError> {
    Ok(check(response, what).await?.json::<T>().await?)
}
