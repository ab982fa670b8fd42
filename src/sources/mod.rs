//! Source resolution: turning a [`SourceSelection`] into the ordered list of
//! URLs to crawl.
//!
//! | Selection | Module | Failure policy |
//! |-----------|--------|----------------|
//! | `--url` | here | cannot fail |
//! | `--file` | [`file`] | fatal: the run stops before crawling anything |
//! | `--sitemap` | [`sitemap`] | degraded: logged, resolves to no URLs |
//! | `--default` / nothing | here | cannot fail |
//!
//! The two policies are kept apart in the types: fatal failures come back
//! as `Err(SourceError)`, absorbed ones as [`Resolution::Degraded`].

pub mod file;
pub mod sitemap;

use crate::config::Settings;
use crate::models::SourceSelection;
use reqwest::Client;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read URL list {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to fetch sitemap {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("failed to parse sitemap: {0}")]
    Parse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Outcome of a non-fatal resolution.
#[derive(Debug)]
pub enum Resolution {
    Resolved(Vec<String>),
    /// The source failed in a way that is absorbed; it contributes no URLs.
    Degraded { error: SourceError },
}

impl Resolution {
    /// The URL list to crawl.
    ///
    /// # Returns
    /// * The resolved URLs in order, or an empty list for a degraded source.
    pub fn into_urls(self) -> Vec<String> {
        match self {
            Resolution::Resolved(urls) => urls,
            Resolution::Degraded { .. } => Vec::new(),
        }
    }
}

/// Resolves a [`SourceSelection`] into URLs.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    client: Client,
    default_url: String,
}

impl SourceResolver {
    /// Build a resolver whose HTTP client times out after the configured
    /// sitemap timeout.
    ///
    /// # Arguments
    /// * `settings` - Supplies `sitemap_timeout_secs` and `default_url`.
    ///
    /// # Returns
    /// * `Ok(SourceResolver)` on success.
    /// * `Err(SourceError::Client)` if the HTTP client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(settings.sitemap_timeout())
            .build()?;
        Ok(Self::with_client(client, settings.default_url.clone()))
    }

    /// Build a resolver around an existing client.
    ///
    /// # Arguments
    /// * `client` - Used for sitemap downloads; any timeout is its own.
    /// * `default_url` - The URL resolved for `--default` or no source flag.
    pub fn with_client(client: Client, default_url: String) -> Self {
        Self {
            client,
            default_url,
        }
    }

    /// Resolve `selection` into an ordered URL list.
    ///
    /// Returns `Err` only for fatal failures; see the module docs.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve(&self, selection: &SourceSelection) -> Result<Resolution, SourceError> {
        let urls = match selection {
            SourceSelection::SingleUrl(url) => vec![url.clone()],
            SourceSelection::UrlFile(path) => file::read_url_file(path).await?,
            SourceSelection::Sitemap { url, filter } => {
                match self.resolve_sitemap(url, filter.as_deref()).await {
                    Ok(urls) => urls,
                    Err(error) => {
                        error!(%url, error = %error, "Sitemap unavailable; continuing with no URLs");
                        return Ok(Resolution::Degraded { error });
                    }
                }
            }
            SourceSelection::Default => vec![self.default_url.clone()],
        };

        info!(count = urls.len(), "Resolved URLs");
        Ok(Resolution::Resolved(urls))
    }

    async fn resolve_sitemap(
        &self,
        url: &str,
        filter: Option<&str>,
    ) -> Result<Vec<String>, SourceError> {
        let body = sitemap::fetch_sitemap(&self.client, url).await?;
        let urls = sitemap::parse_sitemap(&body)?;
        info!(count = urls.len(), "Found URLs in sitemap");

        Ok(match filter {
            Some(needle) => {
                let filtered = sitemap::filter_urls(urls, needle);
                info!(
                    kept = filtered.kept.len(),
                    total = filtered.total,
                    filter = needle,
                    "{}",
                    filtered.summary()
                );
                filtered.kept
            }
            None => urls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver() -> SourceResolver {
        SourceResolver::with_client(Client::new(), "https://default.example/blog".to_string())
    }

    async fn sitemap_server(body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_single_url() {
        let urls = resolver()
            .resolve(&SourceSelection::SingleUrl("https://a.example".into()))
            .await
            .unwrap()
            .into_urls();
        assert_eq!(urls, vec!["https://a.example"]);
    }

    #[tokio::test]
    async fn test_default_url() {
        let urls = resolver()
            .resolve(&SourceSelection::Default)
            .await
            .unwrap()
            .into_urls();
        assert_eq!(urls, vec!["https://default.example/blog"]);
    }

    #[tokio::test]
    async fn test_url_file_keeps_order_and_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "http://a.com\n\n  http://b.com  \nhttp://a.com\n").unwrap();
        let selection = SourceSelection::UrlFile(file.path().to_path_buf());

        let first = resolver().resolve(&selection).await.unwrap().into_urls();
        assert_eq!(first, vec!["http://a.com", "http://b.com", "http://a.com"]);

        let second = resolver().resolve(&selection).await.unwrap().into_urls();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_missing_url_file_is_fatal() {
        let selection = SourceSelection::UrlFile(PathBuf::from("/nonexistent/urls.txt"));
        let err = resolver().resolve(&selection).await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[tokio::test]
    async fn test_sitemap_with_empty_loc() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>http://x.com/only</loc></url>
  <url><loc></loc></url>
</urlset>"#;
        let server = sitemap_server(xml, 200).await;
        let selection = SourceSelection::Sitemap {
            url: format!("{}/sitemap.xml", server.uri()),
            filter: None,
        };

        let urls = resolver().resolve(&selection).await.unwrap().into_urls();
        assert_eq!(urls, vec!["http://x.com/only"]);
    }

    #[tokio::test]
    async fn test_sitemap_with_filter() {
        let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>http://x.com/blog/1</loc></url>
  <url><loc>http://x.com/docs/1</loc></url>
</urlset>"#;
        let server = sitemap_server(xml, 200).await;
        let selection = SourceSelection::Sitemap {
            url: format!("{}/sitemap.xml", server.uri()),
            filter: Some("blog".into()),
        };

        let urls = resolver().resolve(&selection).await.unwrap().into_urls();
        assert_eq!(urls, vec!["http://x.com/blog/1"]);
    }

    #[tokio::test]
    async fn test_sitemap_http_failure_degrades() {
        let server = sitemap_server("", 500).await;
        let selection = SourceSelection::Sitemap {
            url: format!("{}/sitemap.xml", server.uri()),
            filter: None,
        };

        let resolution = resolver().resolve(&selection).await.unwrap();
        assert!(matches!(
            resolution,
            Resolution::Degraded {
                error: SourceError::Network { .. }
            }
        ));
        assert!(resolution.into_urls().is_empty());
    }

    #[tokio::test]
    async fn test_sitemap_parse_failure_degrades() {
        let server = sitemap_server("<urlset><url>", 200).await;
        let selection = SourceSelection::Sitemap {
            url: format!("{}/sitemap.xml", server.uri()),
            filter: None,
        };

        let resolution = resolver().resolve(&selection).await.unwrap();
        assert!(matches!(
            resolution,
            Resolution::Degraded {
                error: SourceError::Parse(_)
            }
        ));
        assert!(!matches!(resolution, Resolution::Resolved(_)));
    }
}
