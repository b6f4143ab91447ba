//! Main audiobook server client.

use crate::auth::AuthClient;
use crate::error::{Result, ServerClientError};
use crate::library::LibraryClient;
use crate::progress::ProgressClient;
use crate::types::{LoginResponse, ServerConfig};
use async_trait::async_trait;
use reqwest::Client;
use shelf_core::types::{AudioTrack, AudiobookRecord, Library};
use shelf_core::ProgressGateway;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Client for an Audiobookshelf-compatible server.
///
/// Holds the base URL and bearer token; every call is a stateless
/// request/response. Implements [`ProgressGateway`] for the sync engine.
///
/// # Example
///
/// ```ignore
/// use shelf_server_client::{ServerConfig, ShelfServerClient};
///
/// let client = ShelfServerClient::new(ServerConfig::new("https://abs.example.com"))?;
/// client.login("user", "password").await?;
///
/// for library in client.libraries().await? {
///     println!("{}", library.name);
/// }
/// ```
#[derive(Clone)]
pub struct ShelfServerClient {
    http: Client,
    config: Arc<RwLock<ServerConfig>>,
}

impl ShelfServerClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServerConfig) -> Result<Self> {
        if config.url.is_empty() {
            return Err(ServerClientError::InvalidUrl("URL cannot be empty".into()));
        }

        let url = config.url.trim_end_matches('/').to_string();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ServerClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }
        url::Url::parse(&url).map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .user_agent(format!("ShelfSync/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ServerClientError::Request)?;

        Ok(Self {
            http,
            config: Arc::new(RwLock::new(ServerConfig { url, ..config })),
        })
    }

    /// Get the server URL.
    pub async fn url(&self) -> String {
        self.config.read().await.url.clone()
    }

    /// Check if the client has a token.
    pub async fn is_authenticated(&self) -> bool {
        self.config.read().await.token.is_some()
    }

    /// Current bearer token, if any.
    pub async fn token(&self) -> Option<String> {
        self.config.read().await.token.clone()
    }

    /// Set the token directly (e.g., from stored credentials).
    pub async fn set_token(&self, token: impl Into<String>) {
        self.config.write().await.token = Some(token.into());
    }

    /// Clear the stored token.
    pub async fn logout(&self) {
        self.config.write().await.token = None;
        info!("Logged out");
    }

    /// Login with username and password; the token is kept for later calls.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = self.url().await;

        let response = AuthClient::new(&self.http, &url)
            .login(username, password)
            .await?;

        self.config.write().await.token = Some(response.user.token.clone());
        Ok(response)
    }

    async fn session(&self) -> Result<(String, String)> {
        let config = self.config.read().await;
        let token = config
            .token
            .clone()
            .ok_or(ServerClientError::AuthRequired)?;
        Ok((config.url.clone(), token))
    }

    /// List libraries.
    pub async fn libraries(&self) -> Result<Vec<Library>> {
        let (url, token) = self.session().await?;
        LibraryClient::new(&self.http, &url, &token)
            .get_libraries()
            .await
    }

    /// List the items of a library, most recently updated first.
    pub async fn library_items(&self, library_id: &str) -> Result<Vec<AudiobookRecord>> {
        let (url, token) = self.session().await?;
        LibraryClient::new(&self.http, &url, &token)
            .get_library_items(library_id)
            .await
    }

    /// Get one item with the server's progress embedded.
    pub async fn get_item(&self, item_id: &str) -> Result<AudiobookRecord> {
        let (url, token) = self.session().await?;
        LibraryClient::new(&self.http, &url, &token)
            .get_item(item_id)
            .await
    }

    /// Push a playback position to the server.
    pub async fn update_progress(
        &self,
        item_id: &str,
        current_time: f64,
        last_update: i64,
    ) -> Result<()> {
        let (url, token) = self.session().await?;
        ProgressClient::new(&self.http, &url, &token)
            .update_progress(item_id, current_time, last_update)
            .await
    }

    /// Authenticated URL a player can stream `track` from.
    pub async fn stream_url(&self, track: &AudioTrack) -> Result<String> {
        let (url, token) = self.session().await?;
        Ok(format!("{}{}?token={}", url, track.content_url, token))
    }
}

#[async_trait]
impl ProgressGateway for ShelfServerClient {
    async fn fetch_item(&self, item_id: &str) -> shelf_core::Result<AudiobookRecord> {
        Ok(self.get_item(item_id).await?)
    }

    async fn patch_progress(
        &self,
        item_id: &str,
        current_time: f64,
        last_update: i64,
    ) -> shelf_core::Result<()> {
        Ok(self
            .update_progress(item_id, current_time, last_update)
            .await?)
    }
}
