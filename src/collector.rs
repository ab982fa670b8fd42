//! Link collection: crawl each source URL and keep the `{url, title}` pairs
//! found in the returned page metadata.

use crate::crawl::CrawlService;
use crate::models::{CrawlConfig, LinkCandidate, PageRecord};
use crate::outputs::console;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Candidates from a batch of page records, in record order.
///
/// A record contributes only when both `ogUrl` and `title` are non-empty and
/// `ogUrl` is not the crawled page itself. Nothing is deduplicated.
pub fn extract_candidates(records: &[PageRecord], source_url: &str) -> Vec<LinkCandidate> {
    records
        .iter()
        .filter_map(|record| {
            let url = record.metadata.og_url.as_deref().filter(|u| !u.is_empty())?;
            let title = record.metadata.title.as_deref().filter(|t| !t.is_empty())?;
            (url != source_url).then(|| LinkCandidate {
                url: url.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}

/// Crawl `source_url` and extract its link candidates.
///
/// An empty or absent crawl result is not an error: it is reported on the
/// console and comes back as `Ok(None)`, meaning no candidates. Service
/// errors are returned untouched.
#[instrument(level = "info", skip(service, config))]
pub async fn collect_links<S: CrawlService>(
    service: &S,
    source_url: &str,
    config: &CrawlConfig,
) -> Result<Option<Vec<LinkCandidate>>, S::Error> {
    let records = match service.crawl(source_url, config).await? {
        Some(records) if !records.is_empty() => records,
        _ => {
            warn!("Crawl result is empty; no links found");
            console::print_nothing_found(source_url);
            return Ok(None);
        }
    };

    debug!(
        pages = ?records
            .iter()
            .filter_map(|r| r.metadata.source_url.as_deref())
            .collect::<Vec<_>>(),
        "Crawled pages"
    );
    let links = extract_candidates(&records, source_url);
    info!(
        pages = records.len(),
        links = links.len(),
        "Collected potential links"
    );
    debug!(links = ?links, "Link candidates");
    Ok(Some(links))
}

/// Result of crawling every resolved URL.
#[derive(Debug, Default)]
pub struct CollectionOutcome {
    /// Candidates from all URLs, concatenated in URL order.
    pub links: Vec<LinkCandidate>,
    /// Number of URLs handed to the crawl service.
    pub processed: usize,
    /// URLs whose crawl failed.
    pub failed: Vec<String>,
    /// URLs whose crawl came back empty or without data.
    pub empty: Vec<String>,
}

/// Crawl `urls` one after another, pausing `delay` between requests.
///
/// A failed crawl is logged and skipped; the remaining URLs are still
/// processed.
#[instrument(level = "info", skip_all, fields(urls = urls.len()))]
pub async fn collect_all<S: CrawlService>(
    service: &S,
    urls: &[String],
    config: &CrawlConfig,
    delay: Duration,
) -> CollectionOutcome {
    let mut outcome = CollectionOutcome::default();

    for (i, url) in urls.iter().enumerate() {
        info!(index = i + 1, total = urls.len(), %url, "Processing URL");
        match collect_links(service, url, config).await {
            Ok(Some(links)) => outcome.links.extend(links),
            Ok(None) => outcome.empty.push(url.clone()),
            Err(e) => {
                error!(%url, error = %e, "Crawl failed; skipping URL");
                outcome.failed.push(url.clone());
            }
        }
        outcome.processed += 1;

        if i + 1 < urls.len() && !delay.is_zero() {
            debug!(?delay, "Pausing before next request");
            sleep(delay).await;
        }
    }

    outcome
}
