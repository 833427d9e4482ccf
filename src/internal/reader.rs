use std::fmt;
use std::io::Cursor;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::api::{self, FetchError};
use crate::config::{READER_BODY_CAP, READER_TIMEOUT};
use crate::internal::models::Article;
use crate::utils::html::sanitize_article_html;
use crate::utils::ssrf::{self, Blocked};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";
const EXCERPT_FALLBACK_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum ReaderError {
    /// Not an absolute http/https URL with a host.
    BadUrl(String),
    /// The SSRF guard refused the target (before or after redirects).
    Blocked(Blocked),
    /// Origin answered non-2xx.
    Upstream(u16),
    /// Origin did not serve HTML.
    NotHtml(String),
    /// The body exceeded the reader byte cap.
    TooLarge,
    Timeout,
    Transport(String),
    /// Readability produced nothing usable.
    Extract(String),
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::BadUrl(msg) => write!(f, "invalid url: {msg}"),
            ReaderError::Blocked(why) => write!(f, "refusing to fetch: {why}"),
            ReaderError::Upstream(code) => write!(f, "origin returned status {code}"),
            ReaderError::NotHtml(ct) => write!(f, "origin served {ct:?}, not HTML"),
            ReaderError::TooLarge => write!(f, "article exceeds the size cap"),
            ReaderError::Timeout => write!(f, "article fetch timed out"),
            ReaderError::Transport(msg) => write!(f, "article fetch failed: {msg}"),
            ReaderError::Extract(msg) => write!(f, "could not extract an article: {msg}"),
        }
    }
}

impl std::error::Error for ReaderError {}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Skip the address classification so tests can fetch from a local
    /// mock origin. The scheme check still applies. Never set in
    /// production paths.
    pub allow_private_hosts: bool,
}

/// Fetch a page and produce the sanitized reader view.
///
/// Pipeline: parse → SSRF guard → bounded streamed GET (10 s deadline,
/// redirects followed) → guard again on the final URL → content-type
/// gate → readability extraction → sanitize + metadata.
#[tracing::instrument(skip(client, raw_url, opts), fields(url = %raw_url))]
pub async fn fetch_article(
    client: &Client,
    raw_url: &str,
    opts: ReaderOptions,
) -> Result<Article, ReaderError> {
    let url = Url::parse(raw_url).map_err(|e| ReaderError::BadUrl(e.to_string()))?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ReaderError::BadUrl("missing host".into()));
    }
    guard(&url, opts).await?;

    let response = client
        .get(url.clone())
        .timeout(READER_TIMEOUT)
        .header(ACCEPT, ACCEPT_HTML)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                ReaderError::Timeout
            } else {
                ReaderError::Transport(e.to_string())
            }
        })?;

    // redirects may have moved us; the final target must pass too
    let final_url = response.url().clone();
    guard(&final_url, opts).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ReaderError::Upstream(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains("text/html") && !content_type.contains("application/xhtml+xml") {
        return Err(ReaderError::NotHtml(content_type));
    }

    let body = api::read_bounded(response, READER_BODY_CAP)
        .await
        .map_err(|e| match e {
            FetchError::TooLarge => ReaderError::TooLarge,
            FetchError::Timeout => ReaderError::Timeout,
            other => ReaderError::Transport(other.to_string()),
        })?;
    let html = String::from_utf8_lossy(&body).into_owned();

    let product = readability::extractor::extract(&mut Cursor::new(html.as_bytes()), &final_url)
        .map_err(|e| ReaderError::Extract(e.to_string()))?;
    if product.content.trim().is_empty() && product.text.trim().is_empty() {
        return Err(ReaderError::Extract("empty document".into()));
    }

    let content = sanitize_article_html(&product.content, &final_url);
    let meta = DocumentMeta::from_html(&html);
    let text_content = product.text;

    let title = if product.title.trim().is_empty() {
        meta.title
    } else {
        product.title
    };
    let excerpt = if meta.excerpt.is_empty() {
        text_content.chars().take(EXCERPT_FALLBACK_CHARS).collect()
    } else {
        meta.excerpt
    };

    Ok(Article {
        url: raw_url.to_string(),
        final_url: final_url.to_string(),
        title,
        byline: meta.byline,
        site_name: meta.site_name,
        excerpt,
        length: text_content.chars().count(),
        content,
        text_content,
    })
}

async fn guard(url: &Url, opts: ReaderOptions) -> Result<(), ReaderError> {
    if opts.allow_private_hosts {
        return match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ReaderError::Blocked(Blocked::Scheme(other.to_string()))),
        };
    }
    ssrf::ensure_public_url(url).await.map_err(ReaderError::Blocked)
}

/// Page metadata readability does not surface, read off the raw
/// document: byline, site name, description, `<title>` fallback.
struct DocumentMeta {
    title: String,
    byline: String,
    site_name: String,
    excerpt: String,
}

impl DocumentMeta {
    fn from_html(html: &str) -> Self {
        let doc = Html::parse_document(html);
        Self {
            title: select_text(&doc, "title"),
            byline: first_meta(&doc, &["meta[name=\"author\"]", "meta[property=\"article:author\"]"]),
            site_name: first_meta(&doc, &["meta[property=\"og:site_name\"]"]),
            excerpt: first_meta(
                &doc,
                &["meta[name=\"description\"]", "meta[property=\"og:description\"]"],
            ),
        }
    }
}

fn select_text(doc: &Html, selector: &str) -> String {
    let selector = Selector::parse(selector).unwrap();
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn first_meta(doc: &Html, selectors: &[&str]) -> String {
    for raw in selectors {
        let selector = Selector::parse(raw).unwrap();
        if let Some(content) = doc
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
        {
            let content = content.trim();
            if !content.is_empty() {
                return content.to_string();
            }
        }
    }
    String::new()
}
