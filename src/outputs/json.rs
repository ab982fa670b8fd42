//! JSON report output.
//!
//! ```json
//! {
//!   "generated_at": "2025-05-06T20:30:00+00:00",
//!   "urls_processed": 2,
//!   "urls_failed": [],
//!   "links": [{ "url": "https://example.com/post", "title": "Post" }]
//! }
//! ```

use crate::models::{LinkCandidate, LinkReport};
use chrono::Utc;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Assemble a report stamped with the current time.
pub fn build_report(processed: usize, failed: Vec<String>, links: Vec<LinkCandidate>) -> LinkReport {
    LinkReport {
        generated_at: Utc::now().to_rfc3339(),
        urls_processed: processed,
        urls_failed: failed,
        links,
    }
}

/// Write `report` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(report: &LinkReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create report dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(links = report.links.len(), "Wrote JSON report");
    Ok(())
}
