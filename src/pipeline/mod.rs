//! Pipeline entry points for archiver commands.
//!
//! - `run_boards`: Register boards from the site's board index
//! - `run_reids`: Harvest thread ids of the given boards
//! - `run_posts`: Archive pending threads, optionally harvesting first
//! - `run_reset`: Clear pending sets so boards are harvested again
//! - `run_info`: Report per-board progress

mod boards;
mod info;
pub mod pool;
mod posts;
mod reids;
mod reset;

pub use boards::run_boards;
pub use info::{BoardInfo, run_info};
pub use pool::{PoolReport, WorkerPool};
pub use posts::run_posts;
pub use reids::run_reids;
pub use reset::run_reset;

use crate::error::{AppError, Result};

fn require_boards(boards: &[String]) -> Result<()> {
    if boards.is_empty() {
        return Err(AppError::validation("no boards given; pass --boards"));
    }
    Ok(())
}
