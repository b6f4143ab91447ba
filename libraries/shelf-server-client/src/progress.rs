//! Progress upload.

use crate::error::Result;
use crate::response;
use crate::types::ProgressUpdate;
use reqwest::Client;
use tracing::debug;

/// Progress client.
pub struct ProgressClient<'a> {
    http: &'a Client,
    base_url: &'a str,
    token: &'a str,
}

impl<'a> ProgressClient<'a> {
    pub(crate) fn new(http: &'a Client, base_url: &'a str, token: &'a str) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    /// Write a playback position for `item_id`. The response body is ignored.
    pub async fn update_progress(
        &self,
        item_id: &str,
        current_time: f64,
        last_update: i64,
    ) -> Result<()> {
        let url = format!("{}/api/me/progress/{}", self.base_url, item_id);
        debug!(
            item_id = %item_id,
            current_time,
            last_update,
            "Uploading progress"
        );

        let body = ProgressUpdate {
            current_time,
            last_update,
        };
        let response =
            response::send(self.http.patch(&url).bearer_auth(self.token).json(&body)).await?;
        response::ensure_success(response).await?;

        debug!(item_id = %item_id, "Progress uploaded");
        Ok(())
    }
}
