//! Crawl-service client.
//!
//! [`CrawlService`] is the seam the collector talks to; [`FirecrawlClient`]
//! implements it against the Firecrawl v1 HTTP API:
//!
//! 1. `POST /v1/crawl` starts a job and returns its `id`
//! 2. `GET /v1/crawl/{id}` is polled until the job completes
//!
//! There is no retry and no overall deadline; a job that stays active keeps
//! being polled.

use crate::models::{CrawlConfig, PageRecord};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, instrument};
use url::Url;

/// Something that crawls a URL and returns the pages it found.
pub trait CrawlService {
    type Error: std::error::Error;

    /// Crawl `url`. `Ok(None)` means the service finished without returning
    /// any data.
    async fn crawl(
        &self,
        url: &str,
        config: &CrawlConfig,
    ) -> Result<Option<Vec<PageRecord>>, Self::Error>;
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid crawl service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("crawl request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to {stage}: status {status}: {message}")]
    Status {
        stage: &'static str,
        status: u16,
        message: String,
    },

    #[error("crawl service did not return a job id")]
    MissingJobId,

    #[error("crawl service refused to start the job")]
    NotStarted,

    #[error("crawl job failed or was stopped, status: {status}")]
    JobFailed { status: String },
}

/// Job states that mean "poll again".
const IN_PROGRESS: &[&str] = &["scraping", "active", "pending", "queued", "waiting"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CrawlRequest<'a> {
    url: &'a str,
    limit: u32,
    scrape_options: ScrapeOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeOptions {
    only_main_content: bool,
}

impl<'a> CrawlRequest<'a> {
    fn new(url: &'a str, config: &CrawlConfig) -> Self {
        Self {
            url,
            limit: config.limit,
            scrape_options: ScrapeOptions {
                only_main_content: config.only_main_content,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    completed: Option<u32>,
    total: Option<u32>,
    #[serde(default)]
    data: Option<Vec<PageRecord>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Firecrawl API client.
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    client: Client,
    api_url: Url,
    api_key: String,
    poll_interval: Duration,
}

impl FirecrawlClient {
    /// Build a client for the API rooted at `api_url`.
    ///
    /// An empty `api_key` is accepted; the service rejects it on first use.
    pub fn new(api_url: &str, api_key: String, poll_interval: Duration) -> Result<Self, CrawlError> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let mut base = api_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client: Client::new(),
            api_url: Url::parse(&base)?,
            api_key,
            poll_interval,
        })
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn start_job(&self, url: &str, config: &CrawlConfig) -> Result<String, CrawlError> {
        let endpoint = self.api_url.join("v1/crawl")?;
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(&self.api_key)
            .json(&CrawlRequest::new(url, config))
            .send()
            .await?;
        let response = check_status(response, "start crawl job").await?;

        let body: StartResponse = response.json().await?;
        if !body.success {
            return Err(CrawlError::NotStarted);
        }
        let job_id = body.id.ok_or(CrawlError::MissingJobId)?;
        info!(%job_id, "Started crawl job");
        Ok(job_id)
    }

    #[instrument(level = "info", skip(self))]
    async fn wait_for_job(&self, job_id: &str) -> Result<Option<Vec<PageRecord>>, CrawlError> {
        let endpoint = self
            .api_url
            .join(&format!("v1/crawl/{}", urlencoding::encode(job_id)))?;

        loop {
            let response = self
                .client
                .get(endpoint.clone())
                .bearer_auth(&self.api_key)
                .send()
                .await?;
            let response = check_status(response, "check crawl status").await?;
            let body: StatusResponse = response.json().await?;

            match body.status.as_str() {
                "completed" => {
                    info!(
                        pages = body.data.as_ref().map_or(0, Vec::len),
                        "Crawl job completed"
                    );
                    return Ok(body.data);
                }
                status if IN_PROGRESS.contains(&status) => {
                    debug!(
                        %status,
                        completed = ?body.completed,
                        total = ?body.total,
                        delay = ?self.poll_interval,
                        "Crawl job still running"
                    );
                    sleep(self.poll_interval).await;
                }
                other => {
                    return Err(CrawlError::JobFailed {
                        status: other.to_string(),
                    });
                }
            }
        }
    }
}

impl CrawlService for FirecrawlClient {
    type Error = CrawlError;

    async fn crawl(
        &self,
        url: &str,
        config: &CrawlConfig,
    ) -> Result<Option<Vec<PageRecord>>, CrawlError> {
        let job_id = self.start_job(url, config).await?;
        self.wait_for_job(&job_id).await
    }
}

/// Turn a non-2xx response into [`CrawlError::Status`], keeping the
/// service's own `error` message when it sent one.
async fn check_status(response: Response, stage: &'static str) -> Result<Response, CrawlError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or(text);
    Err(CrawlError::Status {
        stage,
        status: status.as_u16(),
        message,
    })
}
