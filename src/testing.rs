//! Test doubles shared by the stage tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::services::StageContext;
use crate::storage::MemoryBackends;
use crate::utils::http::PageFetcher;
use crate::utils::shutdown::{Shutdown, ShutdownTrigger};
use crate::utils::url::SiteUrls;

/// Serves canned pages, injects transport failures and records every call.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    pages: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
    shutdown_on_call: Mutex<Option<(usize, ShutdownTrigger)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn page(&self, url: impl Into<String>, body: impl Into<String>) {
        self.pages.lock().unwrap().insert(url.into(), body.into());
    }

    /// Make the next `times` fetches of `url` fail with a transport error.
    pub fn fail_times(&self, url: impl Into<String>, times: usize) {
        self.failures.lock().unwrap().insert(url.into(), times);
    }

    /// Request shutdown while serving the `call`-th fetch (1-based).
    ///
    /// That fetch still returns its page.
    pub fn shutdown_on_call(&self, call: usize, trigger: ShutdownTrigger) {
        *self.shutdown_on_call.lock().unwrap() = Some((call, trigger));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(url.to_string());
            calls.len()
        };
        {
            let mut shutdown_on_call = self.shutdown_on_call.lock().unwrap();
            if matches!(*shutdown_on_call, Some((n, _)) if n == call) {
                if let Some((_, trigger)) = shutdown_on_call.take() {
                    trigger.trigger();
                }
            }
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(url) {
                if *left > 0 {
                    *left -= 1;
                    return Err(AppError::transport(url, "connection reset"));
                }
            }
        }

        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::transport(url, "404 Not Found"))
    }
}

/// Default configuration with a 1 ms retry delay and four workers.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.retry.delay_ms = 1;
    config.crawler.workers = Some(4);
    config
}

/// Stage wiring over a scripted fetcher and shared in-memory stores.
pub fn stage_context(fetcher: &Arc<ScriptedFetcher>, backends: &MemoryBackends) -> StageContext {
    stage_context_with_shutdown(fetcher, backends, Shutdown::never())
}

/// Same as `stage_context`, observing `shutdown`.
pub fn stage_context_with_shutdown(
    fetcher: &Arc<ScriptedFetcher>,
    backends: &MemoryBackends,
    shutdown: Shutdown,
) -> StageContext {
    StageContext::new(
        Arc::new(test_config()),
        Arc::clone(fetcher) as Arc<dyn PageFetcher>,
        Arc::new(backends.clone()),
        shutdown,
    )
}

/// URLs of the default site.
pub fn site_urls() -> SiteUrls {
    SiteUrls::new(&Config::default().site.base_url)
}

/// Board index page with a header row followed by one row per board.
pub fn board_index_html(codes: &[&str]) -> String {
    let rows: String = codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            format!(
                "<tr><td>{}</td>\
                 <td><a href=\"bbsdoc,board,{code}.html\">{code}</a></td>\
                 <td>{code} 讨论区</td></tr>",
                i + 1
            )
        })
        .collect();
    format!(
        "<html><body><table><tbody>\
         <tr><td>序号</td><td>讨论区名称</td><td>中文描述</td></tr>\
         {rows}</tbody></table></body></html>"
    )
}

/// First page of a board announcing its thread total.
pub fn board_initial_html(total_threads: usize) -> String {
    format!(
        "<html><body>\
         <center>Linux 讨论区 [主题{total_threads}个] 版主: someone</center>\
         </body></html>"
    )
}

/// Listing page with a header row and one row per `(id, title, author)`.
pub fn listing_html(board: &str, threads: &[(String, String, String)]) -> String {
    let rows: String = threads
        .iter()
        .enumerate()
        .map(|(i, (id, title, author))| {
            format!(
                "<tr><td>{}</td><td>N</td>\
                 <td><a href=\"bbsqry?userid={author}\">{author}</a></td>\
                 <td>Oct 19</td>\
                 <td><a href=\"bbstcon,board,{board},reid,{id}.html\">○ {title}</a></td></tr>",
                i + 1
            )
        })
        .collect();
    format!(
        "<html><body><table><tbody>\
         <tr><td>序号</td><td>状态</td><td>作者</td><td>日期</td><td>标题</td></tr>\
         {rows}</tbody></table></body></html>"
    )
}

/// Content page of a thread announcing its page total.
pub fn thread_page_html(total_pages: usize, page: usize, body: &str) -> String {
    format!(
        "<html><body>\
         本主题共有 {} 篇文章，分 {total_pages} 页, 当前显示第 {page} 页\
         <pre>{body}</pre></body></html>",
        total_pages * 10
    )
}
