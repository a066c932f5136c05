//! MongoDB document store.
//!
//! One database holds one collection per board. Every collection carries a
//! unique index on `reid`, so a second insert of the same thread is rejected
//! by the server with a duplicate-key error.

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use crate::error::Result;
use crate::models::ArchivedPost;
use crate::storage::{DocumentStore, InsertOutcome};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// One board's collection in MongoDB.
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    collection: Collection<ArchivedPost>,
}

impl MongoDocumentStore {
    /// Connect to `uri` and open `board` in `database`, creating the unique
    /// `reid` index if it is missing.
    pub async fn open(uri: &str, database: &str, board: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let collection = client
            .database(database)
            .collection::<ArchivedPost>(board);
        collection.create_index(unique_reid_index()).await?;
        log::debug!("Opened collection {}.{}", database, board);
        Ok(Self { collection })
    }
}

/// Unique ascending index on the thread id.
fn unique_reid_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "reid": 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert(&self, post: &ArchivedPost) -> Result<InsertOutcome> {
        match self.collection.insert_one(post).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn contains(&self, thread_id: &str) -> Result<bool> {
        let found = self
            .collection
            .count_documents(doc! { "reid": thread_id })
            .await?;
        Ok(found > 0)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.collection.count_documents(doc! {}).await? as usize)
    }
}
