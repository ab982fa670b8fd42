//! Optional LLM step that narrows collected links down to articles.
//!
//! This runs only with `--select-articles`, after collection has finished.
//! It never changes what the collector does.
//!
//! # Architecture
//!
//! - [`AskAsync`]: send a prompt, get text back
//! - [`AnthropicAsk`]: [`AskAsync`] over the Anthropic Messages API
//! - [`RetryAsk`]: decorator adding exponential backoff to any [`AskAsync`]
//! - [`select_articles`]: builds the prompt and filters the candidates
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay

use crate::config::LlmSettings;
use crate::models::LinkCandidate;
use crate::utils::{extract_json_array, looks_truncated, truncate_for_log};
use itertools::Itertools;
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Async text-in, text-out LLM interaction.
pub trait AskAsync {
    /// Send `text` to the model and return its reply.
    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>>;
}

/// Adds exponential backoff retries to an [`AskAsync`] implementation.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: AskAsync> RetryAsk<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        self.base_delay
            .saturating_mul(1 << shift)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: AskAsync> AskAsync for RetryAsk<T> {
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_total = total_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + Duration::from_millis(jitter_ms);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// [`AskAsync`] backed by the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicAsk {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicAsk {
    pub fn new(settings: &LlmSettings, api_key: String) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/v1/messages", settings.api_url.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        }
    }
}

impl AskAsync for AnthropicAsk {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: [Message {
                role: "user",
                content: text,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis(),
                status = status.as_u16(),
                "API call failed"
            );
            return Err(format!(
                "LLM request failed with status {}: {}",
                status,
                truncate_for_log(&detail, 300)
            )
            .into());
        }

        let parsed: MessagesResponse = response.json().await?;
        Ok(parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .join(""))
    }
}

fn build_prompt(source: &str, candidates: &[LinkCandidate]) -> String {
    let listing = candidates
        .iter()
        .map(|c| format!("- {} | {}", c.url, c.title))
        .join("\n");
    format!(
        "The following links were collected while crawling {source}.\n\
         Each line is `URL | title`.\n\n\
         {listing}\n\n\
         Return a JSON array of strings containing only the URLs that point to an \
         individual article or blog post. Respond with the JSON array and nothing else."
    )
}

fn parse_selection(reply: &str) -> Result<Vec<String>, serde_json::Error> {
    serde_json::from_str(extract_json_array(reply).unwrap_or(reply))
}

/// Ask the model which candidates are articles and keep only those.
///
/// The candidates' order is preserved. When the model can't be reached or
/// its reply can't be understood, every candidate is kept.
#[instrument(level = "info", skip_all, fields(%source, candidates = candidates.len()))]
pub async fn select_articles<A: AskAsync>(
    asker: &A,
    source: &str,
    candidates: Vec<LinkCandidate>,
) -> Vec<LinkCandidate> {
    if candidates.is_empty() {
        return candidates;
    }

    let prompt = build_prompt(source, &candidates);
    let reply = match asker.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Article selection unavailable; keeping all links");
            return candidates;
        }
    };

    let mut parsed = parse_selection(&reply);
    if let Err(ref e) = parsed {
        if looks_truncated(e) {
            warn!(error = %e, "Truncated selection reply; re-asking once");
            match asker.ask(&prompt).await {
                Ok(second) => parsed = parse_selection(&second),
                Err(e2) => warn!(error = %e2, "Re-ask failed"),
            }
        }
    }

    let selected: HashSet<String> = match parsed {
        Ok(urls) => urls.into_iter().collect(),
        Err(e) => {
            warn!(
                error = %e,
                reply_preview = %truncate_for_log(&reply, 300),
                "Model returned a non-conforming selection; keeping all links"
            );
            return candidates;
        }
    };

    let total = candidates.len();
    let kept: Vec<LinkCandidate> = candidates
        .into_iter()
        .filter(|c| selected.contains(&c.url))
        .collect();
    info!(kept = kept.len(), total, "Selected article links");
    kept
}
