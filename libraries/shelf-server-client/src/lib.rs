//! Shelf Sync Server Client
//!
//! HTTP client for an Audiobookshelf-compatible server: the remote progress
//! gateway of the sync engine.
//!
//! # Features
//!
//! - **Authentication**: login with username/password, bearer token
//! - **Library browsing**: libraries, items, one expanded item with progress
//! - **Progress upload**: `PATCH /api/me/progress/{id}`
//! - **Streaming**: authenticated stream URLs for tracks
//!
//! Transport failures are classified so the engine can tell a timeout or an
//! unreachable server from a server rejection or a malformed payload.
//!
//! # Example
//!
//! ```ignore
//! use shelf_server_client::{ServerConfig, ShelfServerClient};
//! use shelf_core::ProgressGateway;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ShelfServerClient::new(ServerConfig::new("https://abs.example.com"))?;
//!     client.login("user", "password").await?;
//!
//!     let item = client.fetch_item("li_123").await?;
//!     println!("{} at {}s", item.title(), item.progress.current_time);
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod error;
mod library;
mod progress;
mod response;
mod types;

pub use client::ShelfServerClient;
pub use error::{Result, ServerClientError};
pub use types::{default_timeout, LoginResponse, ServerConfig, ServerLibraryItem, UserInfo};

pub use auth::AuthClient;
pub use library::LibraryClient;
pub use progress::ProgressClient;
