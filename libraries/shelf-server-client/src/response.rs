//! Shared request/response handling for the sub-clients.

use crate::error::{Result, ServerClientError};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Send a request, classifying transport failures.
pub(crate) async fn send(request: RequestBuilder) -> Result<Response> {
    request
        .send()
        .await
        .map_err(ServerClientError::from_transport)
}

/// Fail on any non-2xx status.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ServerClientError::AuthRequired);
    }

    let message = response.text().await.unwrap_or_default();
    Err(ServerClientError::ServerError {
        status: status.as_u16(),
        message,
    })
}

/// Read a 2xx body as JSON. `what` names the payload in parse errors.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let response = ensure_success(response).await?;
    let body = response
        .bytes()
        .await
        .map_err(ServerClientError::from_transport)?;

    serde_json::from_slice(&body)
        .map_err(|e| ServerClientError::ParseError(format!("Failed to parse {}: {}", what, e)))
}
