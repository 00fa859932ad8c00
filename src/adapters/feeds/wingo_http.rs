//! WinGo HTTP Feed - Paged Draw History over HTTPS
//!
//! Polls the game's `GetHistoryIssuePage.json` endpoint. The same API
//! is mirrored on several domains; every request walks the list,
//! starting from the domain that answered last, and returns the first
//! well-formed page. Any failure on every domain is an error for the
//! caller to treat as "no data this cycle".

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument, warn};

use crate::ports::draw_feed::{DrawFeed, RawDraw};

/// Configuration for the WinGo feed.
#[derive(Debug, Clone)]
pub struct WinGoFeedConfig {
    /// Mirror base URLs, tried in order.
    pub domains: Vec<String>,
    /// Endpoint path appended to every domain.
    pub api_path: String,
    /// Rows per page.
    pub page_size: u32,
    /// Timeout for the live poll.
    pub poll_timeout: Duration,
    /// Timeout for history pages during warm-up.
    pub history_timeout: Duration,
    /// Site the API expects as Referer/Origin.
    pub site_origin: String,
    pub user_agent: String,
}

impl Default for WinGoFeedConfig {
    fn default() -> Self {
        Self {
            domains: vec![
                "https://draw.ar-lottery01.com".to_string(),
                "https://draw.ar-lottery02.com".to_string(),
                "https://draw.ar-lottery03.com".to_string(),
            ],
            api_path: "/WinGo/WinGo_1M/GetHistoryIssuePage.json".to_string(),
            page_size: 10,
            poll_timeout: Duration::from_secs(5),
            history_timeout: Duration::from_secs(3),
            site_origin: "https://damangames.run".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

/// Response envelope: `{"data": {"list": [...]}}`.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Option<HistoryData>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    list: Option<Vec<IssueRow>>,
}

#[derive(Debug, Deserialize)]
struct IssueRow {
    #[serde(rename = "issueNumber", deserialize_with = "string_or_number")]
    issue_number: String,
    #[serde(deserialize_with = "string_or_number")]
    number: String,
}

/// Accept `"123"` and `123` alike.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Parse one page body into draws, newest first.
///
/// Rows whose `number` is not an integer are skipped; range checks
/// are left to the domain.
pub fn parse_page(body: &str) -> Result<Vec<RawDraw>> {
    let response: HistoryResponse =
        serde_json::from_str(body).context("Failed to parse history page")?;
    let rows = response
        .data
        .and_then(|d| d.list)
        .ok_or_else(|| anyhow!("history page has no data.list"))?;

    Ok(rows
        .into_iter()
        .filter_map(|row| match row.number.trim().parse::<i64>() {
            Ok(number) => Some(RawDraw::new(row.issue_number, number)),
            Err(_) => {
                debug!(period = %row.issue_number, number = %row.number, "Skipping non-numeric row");
                None
            }
        })
        .collect())
}

/// HTTP draw feed with domain failover.
pub struct WinGoHttpFeed {
    http: Client,
    config: WinGoFeedConfig,
    /// Index of the domain that answered last.
    preferred: AtomicUsize,
    healthy: AtomicBool,
}

impl WinGoHttpFeed {
    pub fn new(config: WinGoFeedConfig) -> Result<Self> {
        anyhow::ensure!(!config.domains.is_empty(), "at least one feed domain is required");

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(
            REFERER,
            HeaderValue::from_str(&format!("{}/", config.site_origin))
                .context("Invalid site origin")?,
        );
        headers.insert(
            ORIGIN,
            HeaderValue::from_str(&config.site_origin).context("Invalid site origin")?,
        );

        let http = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            config,
            preferred: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
        })
    }

    async fn fetch_from(&self, domain: &str, page: u32, timeout: Duration) -> Result<Vec<RawDraw>> {
        let url = format!("{}{}", domain.trim_end_matches('/'), self.config.api_path);
        let ts = Utc::now().timestamp_millis().to_string();
        let page = page.to_string();
        let size = self.config.page_size.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("no", page.as_str()),
                ("size", size.as_str()),
                ("language", "en"),
                ("ts", ts.as_str()),
            ])
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;

        let body = response.text().await.context("Failed to read response body")?;
        parse_page(&body)
    }

    /// Walk the domains starting at the preferred one.
    async fn fetch_page(&self, page: u32, timeout: Duration) -> Result<Vec<RawDraw>> {
        let n = self.config.domains.len();
        let start = self.preferred.load(Ordering::Relaxed) % n;
        let mut last_error = None;

        for offset in 0..n {
            let index = (start + offset) % n;
            let domain = &self.config.domains[index];
            match self.fetch_from(domain, page, timeout).await {
                Ok(rows) => {
                    self.preferred.store(index, Ordering::Relaxed);
                    self.healthy.store(true, Ordering::Relaxed);
                    return Ok(rows);
                }
                Err(e) => {
                    debug!(domain = %domain, error = %e, "Feed domain failed");
                    last_error = Some(e);
                }
            }
        }

        self.healthy.store(false, Ordering::Relaxed);
        let err = last_error.unwrap_or_else(|| anyhow!("no feed domains configured"));
        warn!(page, error = %err, "All feed domains failed");
        Err(err.context(format!("page {page} unavailable on {n} domains")))
    }
}

#[async_trait]
impl DrawFeed for WinGoHttpFeed {
    #[instrument(skip(self))]
    async fn latest(&self) -> Result<Option<RawDraw>> {
        let rows = self.fetch_page(1, self.config.poll_timeout).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn history_page(&self, page: u32) -> Result<Vec<RawDraw>> {
        self.fetch_page(page, self.config.history_timeout).await
    }

    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;

    const PAGE: &str = r#"{"data":{"list":[
        {"issueNumber":"20240101100010125","number":"7","color":"green"},
        {"issueNumber":20240101100010124,"number":0},
        {"issueNumber":"20240101100010123","number":"x"}
    ]},"code":0}"#;

    #[test]
    fn test_parse_page_accepts_strings_and_numbers() {
        let rows = parse_page(PAGE).unwrap();
        assert_eq!(
            rows,
            vec![
                RawDraw::new("20240101100010125", 7),
                RawDraw::new("20240101100010124", 0),
            ]
        );
    }

    #[test]
    fn test_parse_page_requires_list() {
        assert!(parse_page(r#"{"code":401,"msg":"denied"}"#).is_err());
        assert!(parse_page(r#"{"data":{}}"#).is_err());
        assert!(parse_page("<html>").is_err());
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{addr}")
    }

    fn config(domains: Vec<String>) -> WinGoFeedConfig {
        WinGoFeedConfig {
            domains,
            api_path: "/history.json".to_string(),
            poll_timeout: Duration::from_secs(2),
            history_timeout: Duration::from_secs(2),
            ..WinGoFeedConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fails_over_to_next_domain() {
        let broken = serve(Router::new().route("/history.json", get(|| async { "{}" }))).await;
        let good = serve(Router::new().route(
            "/history.json",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("size").map(String::as_str), Some("10"));
                assert!(q.contains_key("ts"));
                PAGE
            }),
        ))
        .await;

        let feed = WinGoHttpFeed::new(config(vec![broken, good])).unwrap();
        let latest = feed.latest().await.unwrap();
        assert_eq!(latest, Some(RawDraw::new("20240101100010125", 7)));
        assert!(feed.is_healthy().await);
        assert_eq!(feed.preferred.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_all_domains_down_is_error() {
        let broken = serve(Router::new().route("/history.json", get(|| async { "nope" }))).await;
        let feed = WinGoHttpFeed::new(config(vec![broken])).unwrap();
        assert!(feed.history_page(3).await.is_err());
        assert!(!feed.is_healthy().await);
    }
}
