//! Authentication against the audiobook server.

use crate::error::{Result, ServerClientError};
use crate::response;
use crate::types::{LoginRequest, LoginResponse};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Authentication client.
pub struct AuthClient<'a> {
    http: &'a Client,
    base_url: &'a str,
}

impl<'a> AuthClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str) -> Self {
        Self { http, base_url }
    }

    /// Login with username and password.
    ///
    /// Returns the user with its bearer token on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/login", self.base_url);
        debug!(url = %url, username = %username, "Attempting login");

        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = response::send(self.http.post(&url).json(&request)).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(username = %username, "Login failed: invalid credentials");
            return Err(ServerClientError::AuthFailed(
                "Invalid username or password".to_string(),
            ));
        }

        let login: LoginResponse = response::read_json(response, "login response").await?;

        info!(
            username = %login.user.username,
            user_id = %login.user.id,
            "Login successful"
        );

        Ok(login)
    }
}
