//! HTTP clients for the collaborators the daemon talks to.
//!
//! Each client implements one of the [`traits`](crate::traits) seams over a
//! small JSON API. Non-success statuses are mapped onto [`BackendError`]
//! here; the gateway never sees a raw HTTP status.

mod account;
mod features;
mod jobs;
mod publisher;

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

pub use account::HttpAccountSource;
pub use features::HttpFeatureSource;
pub use jobs::HttpJobRunner;
pub use publisher::HttpPublisher;

use crate::error::BackendError;

/// Default per-request timeout of the backend clients.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Base URL plus a shared connection pool.
#[derive(Clone)]
pub(crate) struct HttpBase {
    http: Client,
    base_url: String,
}

impl HttpBase {
    pub(crate) fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn client(&self) -> &Client {
        &self.http
    }
}

/// Map a non-success status onto the collaborator error taxonomy.
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    Err(match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => BackendError::ResourceExhausted(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            BackendError::Unavailable(message)
        }
        _ => BackendError::Other(message),
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|e| BackendError::Other(format!("invalid response body: {e}")))
}
