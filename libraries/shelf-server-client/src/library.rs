//! Library and item reads.

use crate::error::Result;
use crate::response;
use crate::types::{LibrariesResponse, LibraryItemsResponse, ServerLibraryItem};
use reqwest::Client;
use shelf_core::types::{AudiobookRecord, Library};
use tracing::debug;

/// Library client.
pub struct LibraryClient<'a> {
    http: &'a Client,
    base_url: &'a str,
    token: &'a str,
}

impl<'a> LibraryClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str, token: &'a str) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    /// List all libraries the user can access.
    pub async fn get_libraries(&self) -> Result<Vec<Library>> {
        let url = format!("{}/api/libraries", self.base_url);
        debug!(url = %url, "Fetching libraries");

        let response = response::send(self.http.get(&url).bearer_auth(self.token)).await?;
        let body: LibrariesResponse = response::read_json(response, "libraries response").await?;

        debug!(count = body.libraries.len(), "Fetched libraries");
        Ok(body.libraries.into_iter().map(Library::from).collect())
    }

    /// List the items of one library, most recently updated first.
    pub async fn get_library_items(&self, library_id: &str) -> Result<Vec<AudiobookRecord>> {
        let url = format!(
            "{}/api/libraries/{}/items?sort=updatedAt",
            self.base_url, library_id
        );
        debug!(url = %url, library_id = %library_id, "Fetching library items");

        let response = response::send(self.http.get(&url).bearer_auth(self.token)).await?;
        let body: LibraryItemsResponse =
            response::read_json(response, "library items response").await?;

        debug!(count = body.results.len(), "Fetched library items");

        // Server sorts ascending by updatedAt
        Ok(body
            .results
            .into_iter()
            .rev()
            .map(ServerLibraryItem::into_record)
            .collect())
    }

    /// Get one item, expanded, with the user's progress embedded.
    pub async fn get_item(&self, item_id: &str) -> Result<AudiobookRecord> {
        let url = format!(
            "{}/api/items/{}?expanded=1&include=progress",
            self.base_url, item_id
        );
        debug!(url = %url, item_id = %item_id, "Fetching item");

        let response = response::send(self.http.get(&url).bearer_auth(self.token)).await?;
        let item: ServerLibraryItem = response::read_json(response, "item response").await?;

        Ok(item.into_record())
    }
}
