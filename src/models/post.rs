//! Archived thread document.

use serde::{Deserialize, Serialize};

/// Full content of a thread as written to the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedPost {
    /// Thread id; unique within a board's collection
    #[serde(rename = "reid")]
    pub thread_id: String,

    pub title: String,

    pub section: String,

    /// Raw page bodies in page order
    pub pages: Vec<String>,
}
