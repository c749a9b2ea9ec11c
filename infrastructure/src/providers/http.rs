//! Shared HTTP plumbing for provider adapters: error classification and
//! JSON request execution.

use alchemy_application::ProviderError;
use alchemy_domain::core::string::truncate;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Longest error body excerpt kept in error messages
const MAX_ERROR_BODY: usize = 200;

/// Map a non-success HTTP status to a provider error kind.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = format!(
        "HTTP {} {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
        truncate(body.trim(), MAX_ERROR_BODY)
    );
    match status.as_u16() {
        429 => ProviderError::rate_limited(message),
        401 | 403 => ProviderError::auth(message),
        408 | 504 => ProviderError::timeout(message),
        400 | 404 | 422 => ProviderError::invalid(message),
        500..=599 => ProviderError::network(message),
        _ => ProviderError::invalid(message),
    }
}

/// Map a transport-level reqwest failure to a provider error kind.
pub fn classify_transport(error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::timeout(error.to_string())
    } else if error.is_decode() || error.is_builder() {
        ProviderError::invalid(error.to_string())
    } else {
        ProviderError::network(error.to_string())
    }
}

/// Send a request and decode a JSON success body.
pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_transport(&e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::invalid(format!("Malformed response body: {}", e)))
}

pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
