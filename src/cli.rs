//! Command-line interface definitions.
//!
//! Credentials can come from flags, the environment, or a `.env` file
//! (loaded before parsing). A missing credential is an empty string; the
//! service that needs it rejects it on first use.

use crate::models::SourceSelection;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::warn;

/// Collect candidate article links by crawling pages through Firecrawl.
///
/// # Examples
///
/// ```sh
/// # Crawl the default URL
/// link_harvester
///
/// # Crawl every blog page listed in a sitemap and save the result
/// link_harvester --sitemap https://example.com/sitemap.xml --filter /blog/ -o links.json
///
/// # Crawl a list of URLs and let the LLM keep only articles
/// link_harvester --file urls.txt --select-articles
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(
    ArgGroup::new("source")
        .args(["url", "file", "sitemap", "use_default"])
        .multiple(false)
))]
pub struct Cli {
    /// Single URL to crawl
    #[arg(long)]
    pub url: Option<String>,

    /// File with one URL per line
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Sitemap URL to expand into the list of URLs to crawl
    #[arg(long)]
    pub sitemap: Option<String>,

    /// Crawl the default URL (also the behavior when no source is given)
    #[arg(long = "default")]
    pub use_default: bool,

    /// Only keep sitemap URLs containing this text (case-sensitive; needs --sitemap)
    #[arg(long)]
    pub filter: Option<String>,

    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the collected links to this JSON file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ask the LLM to keep only links that look like articles
    #[arg(long)]
    pub select_articles: bool,

    /// Firecrawl API key
    #[arg(long, env = "FIRECRAWL_API_KEY", default_value = "", hide_env_values = true)]
    pub firecrawl_api_key: String,

    /// Firecrawl API base URL (overrides the settings file)
    #[arg(long, env = "FIRECRAWL_API_URL")]
    pub firecrawl_api_url: Option<String>,

    /// Anthropic API key, used by --select-articles
    #[arg(long, env = "ANTHROPIC_API_KEY", default_value = "", hide_env_values = true)]
    pub anthropic_api_key: String,
}

impl Cli {
    /// The source chosen on the command line.
    pub fn source_selection(&self) -> SourceSelection {
        if self.filter.is_some() && self.sitemap.is_none() {
            warn!("--filter only applies to --sitemap; ignoring it");
        }

        if let Some(url) = &self.url {
            SourceSelection::SingleUrl(url.clone())
        } else if let Some(path) = &self.file {
            SourceSelection::UrlFile(path.clone())
        } else if let Some(url) = &self.sitemap {
            SourceSelection::Sitemap {
                url: url.clone(),
                filter: self.filter.clone(),
            }
        } else {
            SourceSelection::Default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("link_harvester").chain(args.iter().copied())).unwrap()
    }

    fn parse_err(args: &[&str]) -> ErrorKind {
        Cli::try_parse_from(std::iter::once("link_harvester").chain(args.iter().copied()))
            .unwrap_err()
            .kind()
    }

    #[test]
    fn test_no_source_is_default() {
        assert_eq!(parse(&[]).source_selection(), SourceSelection::Default);
        assert_eq!(parse(&["--default"]).source_selection(), SourceSelection::Default);
    }

    #[test]
    fn test_single_url() {
        assert_eq!(
            parse(&["--url", "https://a.example"]).source_selection(),
            SourceSelection::SingleUrl("https://a.example".into())
        );
    }

    #[test]
    fn test_file() {
        assert_eq!(
            parse(&["--file", "urls.txt"]).source_selection(),
            SourceSelection::UrlFile(PathBuf::from("urls.txt"))
        );
    }

    #[test]
    fn test_sitemap_with_filter() {
        assert_eq!(
            parse(&["--sitemap", "https://x.com/sitemap.xml", "--filter", "blog"]).source_selection(),
            SourceSelection::Sitemap {
                url: "https://x.com/sitemap.xml".into(),
                filter: Some("blog".into()),
            }
        );
    }

    #[test]
    fn test_filter_ignored_without_sitemap() {
        assert_eq!(
            parse(&["--url", "https://a.example", "--filter", "blog"]).source_selection(),
            SourceSelection::SingleUrl("https://a.example".into())
        );
    }

    #[test]
    fn test_sources_are_mutually_exclusive() {
        assert_eq!(
            parse_err(&["--url", "https://a.example", "--file", "urls.txt"]),
            ErrorKind::ArgumentConflict
        );
        assert_eq!(
            parse_err(&["--sitemap", "https://x.com/sitemap.xml", "--url", "https://a.example"]),
            ErrorKind::ArgumentConflict
        );
        assert_eq!(
            parse_err(&["--file", "urls.txt", "--default"]),
            ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_options() {
        let cli = parse(&[
            "--url",
            "https://a.example",
            "-c",
            "settings.yaml",
            "-o",
            "out/links.json",
            "--select-articles",
            "--firecrawl-api-key",
            "fc-key",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("settings.yaml")));
        assert_eq!(cli.output, Some(PathBuf::from("out/links.json")));
        assert!(cli.select_articles);
        assert_eq!(cli.firecrawl_api_key, "fc-key");
    }
}
