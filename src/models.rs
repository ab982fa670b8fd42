//! Data models shared by the resolver, the collector, and the outputs.
//!
//! - [`SourceSelection`]: where the list of URLs to crawl comes from
//! - [`CrawlConfig`]: crawl parameters, fixed for a whole run
//! - [`PageRecord`] / [`PageMetadata`]: page records as returned by the crawl service
//! - [`LinkCandidate`]: a `{url, title}` pair extracted from a crawled page
//! - [`LinkReport`]: the serialized result of one run
//!
//! The crawl service speaks camelCase JSON, so its records carry serde
//! renames rather than matching our field names.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The origin of the URL list for a run.
///
/// Exactly one variant is active per run; the CLI enforces the mutual
/// exclusion of `--url`, `--file`, `--sitemap` and `--default`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    /// A single literal URL.
    SingleUrl(String),
    /// A file holding one URL per line.
    UrlFile(PathBuf),
    /// A sitemap to expand, optionally filtered by a case-sensitive substring.
    Sitemap { url: String, filter: Option<String> },
    /// The configured default URL.
    Default,
}

/// Crawl parameters passed unchanged to every crawl-service invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Maximum number of pages the service may crawl from one URL.
    pub limit: u32,
    /// Ask the service to strip navigation, footers and similar chrome.
    pub only_main_content: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            only_main_content: true,
        }
    }
}

/// A single page produced by the crawl service.
///
/// Records are partial more often than not, so every field defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageRecord {
    #[serde(default)]
    pub metadata: PageMetadata,
}

/// The subset of page metadata this tool reads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageMetadata {
    /// OpenGraph URL of the page.
    #[serde(rename = "ogUrl", default)]
    pub og_url: Option<String>,
    /// Page title.
    #[serde(default)]
    pub title: Option<String>,
    /// URL the service actually fetched.
    #[serde(rename = "sourceURL", default)]
    pub source_url: Option<String>,
}

/// A possible article discovered while crawling a source URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkCandidate {
    pub url: String,
    pub title: String,
}

/// Everything one run produced, as written by `--output`.
#[derive(Debug, Deserialize, Serialize)]
pub struct LinkReport {
    /// RFC-3339 timestamp of when the report was assembled.
    pub generated_at: String,
    /// Number of source URLs handed to the crawl service.
    pub urls_processed: usize,
    /// Source URLs whose crawl failed.
    pub urls_failed: Vec<String>,
    /// Collected candidates in collection order.
    pub links: Vec<LinkCandidate>,
}
