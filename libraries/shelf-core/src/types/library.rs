use serde::{Deserialize, Serialize};

/// A server-side library (a collection of audiobooks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    /// "book" or "podcast"
    pub media_type: String,
    pub display_order: i32,
}
