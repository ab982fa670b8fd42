//! Sitemap download and `<loc>` extraction.
//!
//! Sitemaps are supposed to declare the sitemaps.org namespace, but plenty
//! of real ones don't. Extraction therefore prefers `url/loc` elements in
//! that namespace and only falls back to un-namespaced `loc` elements when
//! the document has no namespaced ones at all.

use super::SourceError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use reqwest::Client;
use tracing::{debug, info, instrument};

/// Namespace of the sitemaps.org 0.9 schema.
pub const SITEMAP_NS: &[u8] = b"http://www.sitemaps.org/schemas/sitemap/0.9";

/// Download a sitemap document.
///
/// The timeout is whatever `client` was built with.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn fetch_sitemap(client: &Client, url: &str) -> Result<String, SourceError> {
    let network = |source: reqwest::Error| SourceError::Network {
        url: url.to_string(),
        source,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(network)?
        .error_for_status()
        .map_err(network)?;
    let body = response.text().await.map_err(network)?;

    info!(bytes = body.len(), "Downloaded sitemap");
    Ok(body)
}

/// Extract page URLs from a sitemap document, in document order.
///
/// Empty `<loc>` elements are skipped. Malformed XML is an error.
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>, SourceError> {
    let locs = scan_locs(xml)?;

    let namespaced: Vec<&Loc> = locs.iter().filter(|l| l.kind == LocKind::Sitemap).collect();
    let matched = if namespaced.is_empty() {
        debug!("No namespaced url/loc elements; falling back to bare loc");
        locs.iter().filter(|l| l.kind == LocKind::Bare).collect()
    } else {
        namespaced
    };

    Ok(matched
        .into_iter()
        .map(|l| l.text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect())
}

/// Sitemap URLs left after filtering, with the count before it.
#[derive(Debug, PartialEq, Eq)]
pub struct Filtered {
    pub kept: Vec<String>,
    pub total: usize,
}

impl Filtered {
    /// `Kept <k> of <n> sitemap URLs`
    pub fn summary(&self) -> String {
        format!("Kept {} of {} sitemap URLs", self.kept.len(), self.total)
    }
}

/// Keep the URLs that contain `needle` (case-sensitive, no wildcards).
pub fn filter_urls(urls: Vec<String>, needle: &str) -> Filtered {
    let total = urls.len();
    let kept = urls.into_iter().filter(|u| u.contains(needle)).collect();
    Filtered { kept, total }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocKind {
    /// `loc` in the sitemap namespace whose parent is a namespaced `url`.
    Sitemap,
    /// `loc` without any namespace.
    Bare,
}

#[derive(Debug)]
struct Loc {
    kind: LocKind,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Sitemap,
    Unbound,
    Other,
}

impl Ns {
    fn of(resolved: &ResolveResult<'_>) -> Self {
        match resolved {
            ResolveResult::Bound(Namespace(ns)) if *ns == SITEMAP_NS => Ns::Sitemap,
            ResolveResult::Unbound => Ns::Unbound,
            _ => Ns::Other,
        }
    }
}

struct Open {
    is_sitemap_url: bool,
    loc: Option<Capture>,
}

struct Capture {
    kind: LocKind,
    text: String,
    /// Set once a child element starts; only leading text counts.
    sealed: bool,
}

impl Capture {
    fn push(&mut self, s: &str) {
        if !self.sealed {
            self.text.push_str(s);
        }
    }
}

fn parse_error(e: impl std::fmt::Display) -> SourceError {
    SourceError::Parse(e.to_string())
}

fn classify(local: &[u8], ns: Ns, parent: Option<&Open>) -> Option<LocKind> {
    if local != b"loc" {
        return None;
    }
    match ns {
        Ns::Sitemap if parent.is_some_and(|p| p.is_sitemap_url) => Some(LocKind::Sitemap),
        Ns::Unbound => Some(LocKind::Bare),
        _ => None,
    }
}

/// Walk the whole document once, recording every candidate `loc` element.
fn scan_locs(xml: &str) -> Result<Vec<Loc>, SourceError> {
    let mut reader = NsReader::from_str(xml);
    let mut stack: Vec<Open> = Vec::new();
    let mut locs = Vec::new();
    let mut saw_root = false;

    loop {
        let (resolved, event) = reader.read_resolved_event().map_err(parse_error)?;
        let ns = Ns::of(&resolved);

        match event {
            Event::Start(e) => {
                saw_root = true;
                let local = e.local_name();
                if let Some(capture) = stack.last_mut().and_then(|o| o.loc.as_mut()) {
                    capture.sealed = true;
                }
                let kind = classify(local.as_ref(), ns, stack.last());
                stack.push(Open {
                    is_sitemap_url: ns == Ns::Sitemap && local.as_ref() == b"url",
                    loc: kind.map(|kind| Capture {
                        kind,
                        text: String::new(),
                        sealed: false,
                    }),
                });
            }
            Event::Empty(e) => {
                saw_root = true;
                if let Some(capture) = stack.last_mut().and_then(|o| o.loc.as_mut()) {
                    capture.sealed = true;
                }
                if let Some(kind) = classify(e.local_name().as_ref(), ns, stack.last()) {
                    locs.push(Loc {
                        kind,
                        text: String::new(),
                    });
                }
            }
            Event::End(_) => {
                if let Some(Capture { kind, text, .. }) = stack.pop().and_then(|o| o.loc) {
                    locs.push(Loc { kind, text });
                }
            }
            Event::Text(t) => {
                if let Some(capture) = stack.last_mut().and_then(|o| o.loc.as_mut()) {
                    capture.push(&t.decode().map_err(parse_error)?);
                }
            }
            Event::CData(c) => {
                if let Some(capture) = stack.last_mut().and_then(|o| o.loc.as_mut()) {
                    capture.push(&String::from_utf8_lossy(&c));
                }
            }
            Event::GeneralRef(r) => {
                if stack.is_empty() {
                    return Err(SourceError::Parse("entity reference outside root element".into()));
                }
                let resolved = match r.resolve_char_ref().map_err(parse_error)? {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = r.decode().map_err(parse_error)?;
                        resolve_predefined_entity(&name)
                            .ok_or_else(|| SourceError::Parse(format!("undefined entity &{name};")))?
                            .to_string()
                    }
                };
                if let Some(capture) = stack.last_mut().and_then(|o| o.loc.as_mut()) {
                    capture.push(&resolved);
                }
            }
            Event::Eof => {
                if !stack.is_empty() {
                    return Err(SourceError::Parse(
                        "unexpected end of document: unclosed element".into(),
                    ));
                }
                if !saw_root {
                    return Err(SourceError::Parse("no root element found".into()));
                }
                break;
            }
            _ => {}
        }
    }

    Ok(locs)
}
