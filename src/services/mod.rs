//! Service layer for the archiver.
//!
//! One service per stage:
//! - Board discovery (`BoardCatalog`)
//! - Thread-id harvesting (`ReidHarvester`)
//! - Thread archiving (`PostFetcher`)
//!
//! Each stage is opened from a `StageContext`, run, then consumed by
//! `close`.

mod boards;
mod context;
pub mod parse;
mod posts;
mod reids;

pub use boards::BoardCatalog;
pub use context::StageContext;
pub use posts::{FetchSummary, PostFetcher};
pub use reids::{HarvestSummary, ReidHarvester};
