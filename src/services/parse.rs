// src/services/parse.rs

//! Extraction of boards, threads and counts from the site's markup.
//!
//! The site renders everything as plain tables, so rows are read by cell
//! position. Any deviation from the expected shape is a `Parse` error: it
//! means the upstream layout changed and nothing should be stored from it.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::SiteConfig;
use crate::utils::url::thread_id_from_link;

/// Compiled text patterns used to read counts.
#[derive(Debug, Clone)]
pub struct Patterns {
    board_total: Regex,
    post_pages: Regex,
}

impl Patterns {
    pub fn compile(site: &SiteConfig) -> Result<Self> {
        let compile = |name: &str, pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| AppError::config(format!("site.{name} is not a valid regex: {e}")))
        };
        Ok(Self {
            board_total: compile("board_total_pattern", &site.board_total_pattern)?,
            post_pages: compile("post_pages_pattern", &site.post_pages_pattern)?,
        })
    }

    /// Thread total announced on a board's first page.
    ///
    /// The count sits in one of the `<center>` blocks; group 1 of the
    /// pattern holds it.
    pub fn thread_total(&self, html: &str) -> Result<usize> {
        let document = Html::parse_document(html);
        let center = selector("center")?;
        document
            .select(&center)
            .map(|el| el.text().collect::<String>())
            .find_map(|text| capture_number(&self.board_total, &text, 1))
            .ok_or_else(|| AppError::parse("board page", "thread total pattern not found"))
    }

    /// Page total announced on a thread's first page (group 2 of the pattern).
    pub fn page_total(&self, html: &str) -> Result<usize> {
        capture_number(&self.post_pages, html, 2)
            .ok_or_else(|| AppError::parse("thread page", "page total pattern not found"))
    }
}

/// Number of listing pages to harvest for `total_threads`.
///
/// Integer division: a trailing partial page is not counted.
pub fn listing_pages(total_threads: usize, items_per_page: usize) -> usize {
    total_threads / items_per_page.max(1)
}

/// One thread row of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub thread_id: String,
    pub title: String,
    pub author: String,
}

/// Board codes from the board index page, header row excluded.
pub fn board_index(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let rows = table_rows(&document, "board index")?;

    rows.iter()
        .enumerate()
        .map(|(i, cells)| {
            let cell = cells.get(1).ok_or_else(|| {
                AppError::parse("board index", format!("row {} has no board cell", i + 1))
            })?;
            let code = link_text(cell).unwrap_or_else(|| text_of(cell));
            if code.is_empty() {
                return Err(AppError::parse(
                    "board index",
                    format!("row {} has an empty board code", i + 1),
                ));
            }
            Ok(code)
        })
        .collect()
}

/// Thread rows of a listing page, header row excluded.
///
/// Cell 3 holds the author link, cell 5 the title link. Titles carry a
/// marker of `title_prefix_len` bytes that is stripped.
pub fn listing(html: &str, title_prefix_len: usize) -> Result<Vec<ListingRow>> {
    let document = Html::parse_document(html);
    let rows = table_rows(&document, "listing page")?;
    let link = selector("a")?;

    rows.iter()
        .enumerate()
        .map(|(i, cells)| {
            let row_error = |message: &str| {
                AppError::parse("listing page", format!("row {}: {message}", i + 1))
            };

            if cells.len() < 5 {
                return Err(row_error(&format!("expected 5 cells, found {}", cells.len())));
            }

            let author = link_text(&cells[2]).unwrap_or_else(|| text_of(&cells[2]));
            let anchor = cells[4]
                .select(&link)
                .next()
                .ok_or_else(|| row_error("title cell has no link"))?;
            let href = anchor
                .value()
                .attr("href")
                .ok_or_else(|| row_error("title link has no target"))?;
            let thread_id =
                thread_id_from_link(href).ok_or_else(|| row_error("cannot read thread id"))?;

            let raw_title: String = anchor.text().collect();
            let title = strip_marker(&raw_title, title_prefix_len).to_string();

            Ok(ListingRow {
                thread_id,
                title,
                author,
            })
        })
        .collect()
}

/// Drop the leading marker of a listing title.
///
/// A title too short for the marker, or whose marker length falls inside a
/// character, has no marker: it is kept whole.
fn strip_marker(raw: &str, prefix_len: usize) -> &str {
    match raw.get(prefix_len..) {
        Some(rest) => rest.trim(),
        None => {
            log::debug!("title without marker kept as is: {raw:?}");
            raw.trim()
        }
    }
}

/// Cells of every row of the first table body, header row dropped.
fn table_rows<'a>(document: &'a Html, context: &str) -> Result<Vec<Vec<ElementRef<'a>>>> {
    let tbody = selector("tbody")?;
    let body = document
        .select(&tbody)
        .next()
        .ok_or_else(|| AppError::parse(context, "no table found"))?;

    let rows: Vec<Vec<ElementRef<'a>>> = body
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .map(|tr| {
            tr.children()
                .filter_map(ElementRef::wrap)
                .filter(|el| matches!(el.value().name(), "td" | "th"))
                .collect()
        })
        .collect();

    if rows.is_empty() {
        return Err(AppError::parse(context, "table has no header row"));
    }
    Ok(rows.into_iter().skip(1).collect())
}

fn link_text(cell: &ElementRef) -> Option<String> {
    let link = Selector::parse("a").ok()?;
    let text: String = cell.select(&link).next()?.text().collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn capture_number(pattern: &Regex, text: &str, group: usize) -> Option<usize> {
    pattern.captures(text)?.get(group)?.as_str().parse().ok()
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::parse("selector", format!("'{s}': {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{board_index_html, board_initial_html, listing_html, thread_page_html};

    fn patterns() -> Patterns {
        Patterns::compile(&SiteConfig::default()).unwrap()
    }

    fn row(id: &str, title: &str, author: &str) -> (String, String, String) {
        (id.into(), title.into(), author.into())
    }

    #[test]
    fn test_board_index_skips_header() {
        let boards = board_index(&board_index_html(&["Linux", "Script", "Love"])).unwrap();
        assert_eq!(boards, vec!["Linux", "Script", "Love"]);
    }

    #[test]
    fn test_board_index_without_table_is_fatal() {
        let err = board_index("<html><body><p>请先登录</p></body></html>").unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_board_index_short_row_is_fatal() {
        let html = "<table><tbody>\
            <tr><td>h1</td><td>h2</td></tr>\
            <tr><td>1</td></tr>\
            </tbody></table>";
        assert!(board_index(html).is_err());
    }

    #[test]
    fn test_listing_rows() {
        let html = listing_html(
            "Linux",
            &[
                row("1187654321", "内核编译问题", "alice"),
                row("1187654322", "Re: 求助", "bob"),
            ],
        );
        let rows = listing(&html, 3).unwrap();
        assert_eq!(
            rows,
            vec![
                ListingRow {
                    thread_id: "1187654321".into(),
                    title: "内核编译问题".into(),
                    author: "alice".into(),
                },
                ListingRow {
                    thread_id: "1187654322".into(),
                    title: "Re: 求助".into(),
                    author: "bob".into(),
                },
            ]
        );
    }

    #[test]
    fn test_listing_title_without_marker_is_kept() {
        let html = "<table><tbody>\
            <tr><td>序号</td><td>状态</td><td>作者</td><td>日期</td><td>标题</td></tr>\
            <tr><td>1</td><td>N</td><td><a href=\"bbsqry?userid=bob\">bob</a></td><td>Oct 19</td>\
            <td><a href=\"bbstcon,board,Linux,reid,1187654323.html\">Re标题</a></td></tr>\
            <tr><td>2</td><td>N</td><td><a href=\"bbsqry?userid=eve\">eve</a></td><td>Oct 19</td>\
            <td><a href=\"bbstcon,board,Linux,reid,1187654324.html\">ab</a></td></tr>\
            </tbody></table>";
        let rows = listing(html, 3).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].thread_id, "1187654323");
        assert_eq!(rows[0].title, "Re标题");
        assert_eq!(rows[1].title, "ab");
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("○ 内核", 3), "内核");
        assert_eq!(strip_marker("Re标题", 3), "Re标题");
        assert_eq!(strip_marker("○", 3), "");
        assert_eq!(strip_marker("", 3), "");
    }

    #[test]
    fn test_listing_header_only_is_empty() {
        assert!(listing(&listing_html("Linux", &[]), 3).unwrap().is_empty());
    }

    #[test]
    fn test_listing_row_without_link_is_fatal() {
        let html = "<table><tbody>\
            <tr><td>序号</td><td>状态</td><td>作者</td><td>日期</td><td>标题</td></tr>\
            <tr><td>1</td><td>N</td><td>alice</td><td>Oct 19</td><td>○ no link</td></tr>\
            </tbody></table>";
        assert!(matches!(listing(html, 3), Err(AppError::Parse { .. })));
    }

    #[test]
    fn test_thread_total_and_truncated_pages() {
        let total = patterns().thread_total(&board_initial_html(42)).unwrap();
        assert_eq!(total, 42);
        assert_eq!(listing_pages(total, 20), 2);
        assert_eq!(listing_pages(19, 20), 0);
        assert_eq!(listing_pages(40, 20), 2);
    }

    #[test]
    fn test_thread_total_missing_is_fatal() {
        let err = patterns()
            .thread_total("<center>nothing here</center>")
            .unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }

    #[test]
    fn test_page_total() {
        let html = thread_page_html(3, 1, "hello");
        assert_eq!(patterns().page_total(&html).unwrap(), 3);
        assert!(patterns().page_total("<html>moved</html>").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let site = SiteConfig {
            post_pages_pattern: "(unclosed".into(),
            ..SiteConfig::default()
        };
        assert!(matches!(Patterns::compile(&site), Err(AppError::Config(_))));
    }
}
