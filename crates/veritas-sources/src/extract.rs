//! Page download and main-content extraction
//!
//! Every failure here is per-source and soft: callers drop the candidate.

use crate::{domain_of, BROWSER_USER_AGENT};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};
use veritas_domain::{ContentFetcher, ExtractedPage, ExtractionFailure};

/// Default fetch timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default cap on body length, in characters
pub const DEFAULT_MAX_BODY_CHARS: usize = 20_000;

/// Markers of a login wall or bot check near the top of the page
const RESTRICTION_MARKERS: &[&str] = &[
    "subscribe",
    "log in",
    "sign in",
    "register",
    "access denied",
    "are you a robot",
];

/// How many leading characters are checked for restriction markers
const RESTRICTION_WINDOW: usize = 100;

/// Elements whose text never belongs to the article
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "footer", "header", "aside", "form", "iframe", "svg",
];

/// Containers tried, in order, before falling back to `<body>`
const MAIN_SELECTORS: &[&str] = &["article", "main", "[role='main']", "#content", ".post-content"];

/// HTTP fetcher plus [`parse_page`]
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    client: reqwest::Client,
    max_body_chars: usize,
}

impl HtmlExtractor {
    /// Create an extractor with the given timeout and body cap
    pub fn new(timeout: Duration, max_body_chars: usize) -> Result<Self, crate::SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| {
                crate::SourceError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            max_body_chars,
        })
    }
}

#[async_trait]
impl ContentFetcher for HtmlExtractor {
    async fn fetch(&self, url: &str) -> Result<ExtractedPage, ExtractionFailure> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionFailure::Timeout
            } else {
                ExtractionFailure::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if matches!(status, 401..=403) {
            warn!("Access denied for {} with status {}", url, status);
            return Err(ExtractionFailure::Paywalled { status });
        }
        if !response.status().is_success() {
            return Err(ExtractionFailure::Http { status });
        }

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionFailure::Timeout
            } else {
                ExtractionFailure::Network(e.to_string())
            }
        })?;

        parse_page(url, &html, self.max_body_chars)
    }
}

/// Parse title, body and domain out of raw HTML
///
/// # Examples
///
/// ```
/// use veritas_sources::parse_page;
///
/// let html = "<html><head><title>Bag ban</title></head>\
///             <body><nav>Menu</nav><article>The city banned plastic bags.</article></body></html>";
/// let page = parse_page("https://news.example.com/bags", html, 1000).unwrap();
/// assert_eq!(page.title, "Bag ban");
/// assert_eq!(page.body, "The city banned plastic bags.");
/// assert_eq!(page.domain, "news.example.com");
/// ```
pub fn parse_page(
    url: &str,
    html: &str,
    max_body_chars: usize,
) -> Result<ExtractedPage, ExtractionFailure> {
    let domain = domain_of(url).map_err(|e| ExtractionFailure::Malformed(e.to_string()))?;
    let document = Html::parse_document(html);

    let title = select_first(&document, "title")
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractionFailure::Malformed("missing <title>".to_string()))?;

    let root = MAIN_SELECTORS
        .iter()
        .find_map(|s| select_first(&document, s))
        .or_else(|| select_first(&document, "body"))
        .unwrap_or_else(|| document.root_element());
    let body = visible_text(root);

    if body.is_empty() {
        return Err(ExtractionFailure::Malformed("empty body".to_string()));
    }

    let head: String = body.chars().take(RESTRICTION_WINDOW).collect::<String>().to_lowercase();
    if RESTRICTION_MARKERS.iter().any(|m| head.contains(m)) {
        debug!("Content appears restricted for {}", url);
        return Err(ExtractionFailure::Restricted);
    }

    Ok(ExtractedPage {
        url: url.to_string(),
        domain,
        title,
        body: truncate_chars(&body, max_body_chars),
    })
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let excluded = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| EXCLUDED_TAGS.contains(&el.name()))
        });
        if !excluded {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }
    }
    collapse_whitespace(&parts.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
