//! # Link Harvester
//!
//! Collects candidate article links (`{url, title}` pairs) by sending pages
//! to the Firecrawl crawling service and reading the metadata of every page
//! it returns.
//!
//! ## Usage
//!
//! ```sh
//! link_harvester --sitemap https://example.com/sitemap.xml --filter /blog/
//! ```
//!
//! ## Architecture
//!
//! 1. **Resolving**: turn `--url`, `--file`, `--sitemap` or the default into a URL list
//! 2. **Collecting**: crawl each URL in turn, pausing between requests
//! 3. **Selecting** (optional): ask an LLM to keep only article links
//! 4. **Output**: print the links and a summary, optionally write a JSON report

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod collector;
mod config;
mod crawl;
mod models;
mod outputs;
mod sources;
mod utils;

use api::{AnthropicAsk, RetryAsk, select_articles};
use cli::Cli;
use config::Settings;
use crawl::{CrawlService, FirecrawlClient};
use outputs::{console, json};
use sources::{Resolution, SourceResolver};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();

    // .env feeds the env fallbacks of the credential flags.
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env"),
    }

    let args = Cli::parse();
    debug!(?args.config, ?args.output, select_articles = args.select_articles, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(api_url) = &args.firecrawl_api_url {
        settings.firecrawl.api_url = api_url.clone();
    }
    info!(
        limit = settings.crawl.limit,
        only_main_content = settings.crawl.only_main_content,
        "link_harvester starting up"
    );

    let firecrawl = FirecrawlClient::new(
        &settings.firecrawl.api_url,
        args.firecrawl_api_key.clone(),
        settings.poll_interval(),
    )?;
    let outcome = run(&args, &settings, &firecrawl).await?;

    let elapsed = start_time.elapsed();
    info!(?elapsed, ?outcome, "Execution complete");

    Ok(())
}

/// How a run ended.
#[derive(Debug, PartialEq, Eq)]
enum RunOutcome {
    /// The URL list could not be read; nothing was crawled.
    Aborted,
    /// No URLs were resolved; nothing was crawled.
    NoUrls,
    /// Every URL was handed to the crawl service and the summary printed.
    Completed { summary: String },
}

/// Resolve the sources, crawl every URL through `service`, and print the
/// results.
///
/// # Arguments
/// * `args` - Parsed command line; picks the source, output and selection.
/// * `settings` - Loaded settings, already merged with CLI overrides.
/// * `service` - The crawl service each resolved URL is sent to.
///
/// # Returns
/// * `Ok(RunOutcome::Aborted)` after printing the error when the URL list
///   cannot be read.
/// * `Ok(RunOutcome::NoUrls)` after printing usage guidance when no URL
///   was resolved.
/// * `Ok(RunOutcome::Completed)` carrying the printed summary otherwise.
/// * `Err` if the sitemap HTTP client cannot be built.
#[instrument(level = "info", skip_all)]
async fn run<S: CrawlService>(
    args: &Cli,
    settings: &Settings,
    service: &S,
) -> Result<RunOutcome, Box<dyn Error>> {
    // ---- Resolve sources ----
    let selection = args.source_selection();
    let resolver = SourceResolver::new(settings)?;
    let urls = match resolver.resolve(&selection).await {
        Ok(resolution) => {
            if let Resolution::Degraded { error } = &resolution {
                warn!(error = %error, "Source degraded to an empty URL list");
            }
            resolution.into_urls()
        }
        Err(e) => {
            error!(error = %e, "Could not resolve URLs; aborting");
            console::print_fatal(&e);
            return Ok(RunOutcome::Aborted);
        }
    };

    if urls.is_empty() {
        warn!("No URLs to process");
        console::print_no_urls();
        return Ok(RunOutcome::NoUrls);
    }

    // ---- Collect ----
    let crawl_config = settings.crawl_config();
    let outcome = collector::collect_all(service, &urls, &crawl_config, settings.request_delay()).await;

    // ---- Select (optional) ----
    let links = if args.select_articles {
        let asker = RetryAsk::new(
            AnthropicAsk::new(&settings.llm, args.anthropic_api_key.clone()),
            settings.llm.max_retries,
            Duration::from_secs(1),
        );
        let source = describe_selection(&urls);
        select_articles(&asker, &source, outcome.links.clone()).await
    } else {
        outcome.links.clone()
    };

    // ---- Output ----
    console::print_links(&links);

    if let Some(path) = &args.output {
        let report = json::build_report(outcome.processed, outcome.failed.clone(), links.clone());
        if let Err(e) = json::write_report(&report, path).await {
            error!(path = %path.display(), error = %e, "Failed to write JSON report");
        }
    }

    let summary = console::format_summary(&outcome, links.len());
    println!("{summary}");
    info!(
        urls_processed = outcome.processed,
        urls_failed = outcome.failed.len(),
        urls_empty = outcome.empty.len(),
        links = links.len(),
        "Run summary"
    );

    Ok(RunOutcome::Completed { summary })
}

/// How the crawled pages are described to the LLM.
fn describe_selection(urls: &[String]) -> String {
    match urls {
        [single] => single.clone(),
        [first, rest @ ..] => format!("{first} and {} other page(s)", rest.len()),
        [] => String::from("no pages"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CrawlConfig, PageMetadata, PageRecord};
    use std::cell::RefCell;
    use std::convert::Infallible;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Crawl service that records every URL and returns one fixed page.
    #[derive(Default)]
    struct RecordingService {
        calls: RefCell<Vec<String>>,
    }

    impl CrawlService for RecordingService {
        type Error = Infallible;

        async fn crawl(
            &self,
            url: &str,
            _config: &CrawlConfig,
        ) -> Result<Option<Vec<PageRecord>>, Infallible> {
            self.calls.borrow_mut().push(url.to_string());
            Ok(Some(vec![PageRecord {
                metadata: PageMetadata {
                    og_url: Some(format!("{url}/post")),
                    title: Some("Post".into()),
                    source_url: Some(url.to_string()),
                },
            }]))
        }
    }

    fn args(flags: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("link_harvester").chain(flags.iter().copied()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_missing_url_file_aborts_before_crawling() {
        let service = RecordingService::default();
        let outcome = run(
            &args(&["--file", "/nonexistent/urls.txt"]),
            &Settings::default(),
            &service,
        )
        .await
        .unwrap();

        assert_eq!(outcome, RunOutcome::Aborted);
        assert!(service.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_run_blank_url_file_prints_guidance_only() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\n   \n\n").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let service = RecordingService::default();
        let outcome = run(&args(&["--file", &path]), &Settings::default(), &service)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::NoUrls);
        assert!(service.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_run_unavailable_sitemap_prints_guidance_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let sitemap = format!("{}/sitemap.xml", server.uri());

        let service = RecordingService::default();
        let outcome = run(&args(&["--sitemap", &sitemap]), &Settings::default(), &service)
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::NoUrls);
        assert!(service.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_run_single_url_prints_summary() {
        let service = RecordingService::default();
        let outcome = run(
            &args(&["--url", "http://src.example"]),
            &Settings::default(),
            &service,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Completed {
                summary: "Processed 1 URL(s), collected 1 potential link(s)".into()
            }
        );
        assert_eq!(service.calls.borrow().as_slice(), ["http://src.example"]);
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("out/links.json");
        let service = RecordingService::default();

        run(
            &args(&["--url", "http://src.example", "-o", report.to_str().unwrap()]),
            &Settings::default(),
            &service,
        )
        .await
        .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(written["urls_processed"], 1);
        assert_eq!(written["links"][0]["url"], "http://src.example/post");
    }

    #[test]
    fn test_describe_selection() {
        assert_eq!(describe_selection(&["http://a.com".into()]), "http://a.com");
        assert_eq!(
            describe_selection(&["http://a.com".into(), "http://b.com".into()]),
            "http://a.com and 1 other page(s)"
        );
        assert_eq!(describe_selection(&[]), "no pages");
    }
}
