// src/utils/url.rs

//! URL templates of the upstream site.

/// Builds the URLs of the pages the archiver reads.
///
/// # Examples
/// ```
/// use bbs_archiver::utils::url::SiteUrls;
///
/// let urls = SiteUrls::new("https://bbs.example.edu/");
/// assert_eq!(
///     urls.thread_page("Linux", "1187654321", 2),
///     "https://bbs.example.edu/bbstcon,board,Linux,reid,1187654321,page,2.html"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SiteUrls {
    base: String,
}

impl SiteUrls {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Index page listing every board.
    pub fn board_index(&self) -> String {
        format!("{}/bbsall", self.base)
    }

    /// First listing page of a board, which carries the thread total.
    pub fn board_initial(&self, board: &str) -> String {
        format!("{}/bbstdoc,board,{board}.html", self.base)
    }

    /// Listing page `page` (1-based) of a board.
    ///
    /// The site numbers listing pages from zero.
    pub fn listing(&self, board: &str, page: usize) -> String {
        format!(
            "{}/bbstdoc,board,{board},page,{}.html",
            self.base,
            page.saturating_sub(1)
        )
    }

    /// Content page `page` (1-based) of a thread.
    pub fn thread_page(&self, board: &str, thread_id: &str, page: usize) -> String {
        format!(
            "{}/bbstcon,board,{board},reid,{thread_id},page,{page}.html",
            self.base
        )
    }
}

/// Extract the thread id from a listing link such as
/// `bbstcon,board,Linux,reid,1187654321.html`.
///
/// Takes the last path segment, then its last comma-separated field, and
/// drops the file extension.
pub fn thread_id_from_link(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let field = segment.rsplit(',').next()?;
    let id = field.split('.').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
