//! Board discovery from the site's board index.

use crate::error::Result;
use crate::services::StageContext;
use crate::services::parse;
use crate::storage::BoardStorage;
use crate::utils::retry::RetryingFetch;
use crate::utils::url::SiteUrls;

/// Seeds the board set from the board index page.
pub struct BoardCatalog {
    fetch: RetryingFetch,
    urls: SiteUrls,
    boards: BoardStorage,
}

impl BoardCatalog {
    pub async fn open(ctx: &StageContext) -> Result<Self> {
        let store = ctx.backends.key_value().await?;
        Ok(Self {
            fetch: ctx.retrying_fetch(),
            urls: ctx.urls(),
            boards: BoardStorage::new(store),
        })
    }

    /// Fetch the board index and register every board on it.
    ///
    /// New boards start `Pending`; known boards keep their status.
    /// Returns the number of boards listed on the index.
    pub async fn fetch_boards(&self) -> Result<usize> {
        let url = self.urls.board_index();
        log::info!("Fetching board index: {}", url);

        let html = self.fetch.fetch(&url).await?;
        let codes = parse::board_index(&html)?;
        if codes.is_empty() {
            log::warn!("Board index lists no boards");
        }

        let mut added = 0;
        for code in &codes {
            if self.boards.register(code).await? {
                log::debug!("New board: {}", code);
                added += 1;
            }
        }

        log::info!("Board index lists {} boards, {} new", codes.len(), added);
        Ok(codes.len())
    }

    /// Release the store handle taken at `open`.
    pub fn close(self) {
        drop(self.boards);
        log::debug!("Board catalog closed");
    }
}
