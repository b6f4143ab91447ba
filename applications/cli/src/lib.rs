//! Shelf Sync command line host
//!
//! Wires configuration, logging, the local store, the server client and
//! the sync engine together for the `shelf` binary.

pub mod config;
pub mod credentials;
pub mod downloader;
pub mod error;

pub use config::ShelfConfig;
pub use downloader::HttpDownloadEngine;
pub use error::{CliError, Result};
