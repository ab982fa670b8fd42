//! User-facing messages on stdout. Diagnostics go through `tracing` on stderr.

use crate::collector::CollectionOutcome;
use crate::models::LinkCandidate;

/// One line per candidate.
pub fn format_links(links: &[LinkCandidate]) -> String {
    links
        .iter()
        .map(|link| format!("URL: {}, Title: {}\n", link.url, link.title))
        .collect()
}

/// The closing summary line.
///
/// # Arguments
/// * `outcome` - Supplies the processed and failed URL counts.
/// * `links` - Number of links kept, which differs from `outcome.links`
///   after article selection.
///
/// # Returns
/// * `Processed <n> URL(s), collected <m> potential link(s)`, followed by
///   the failed count when any crawl failed.
pub fn format_summary(outcome: &CollectionOutcome, links: usize) -> String {
    let mut summary = format!(
        "Processed {} URL(s), collected {} potential link(s)",
        outcome.processed, links
    );
    if !outcome.failed.is_empty() {
        summary.push_str(&format!(" ({} URL(s) failed)", outcome.failed.len()));
    }
    summary
}

/// Status line for a URL whose crawl came back empty or without data.
pub fn format_nothing_found(url: &str) -> String {
    format!("No links found for {url}: crawl result is empty")
}

pub fn print_nothing_found(url: &str) {
    println!("{}", format_nothing_found(url));
}

pub fn print_links(links: &[LinkCandidate]) {
    if links.is_empty() {
        return;
    }
    println!("Collected {} potential links:", links.len());
    print!("{}", format_links(links));
}

pub fn print_no_urls() {
    println!(
        "No URLs to process. Pass --url <URL>, --file <PATH>, or --sitemap <URL> \
         (optionally with --filter <TEXT>), or run with --default."
    );
}

pub fn print_fatal(error: &dyn std::error::Error) {
    println!("Error: {error}");
}
