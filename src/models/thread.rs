// src/models/thread.rs

//! Thread metadata collected while harvesting a board's listing pages.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A thread discovered on a listing page.
///
/// Stored as a JSON payload under `reid:<thread_id>` until the thread is
/// archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    /// Thread id, unique within a board
    #[serde(rename = "reid")]
    pub thread_id: String,

    pub title: String,

    pub author: String,

    /// Owning board code
    pub section: String,
}

impl ThreadRef {
    /// Encode the payload for the key-value store.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a payload read back from the key-value store.
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
