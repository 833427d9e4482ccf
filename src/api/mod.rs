mod error;

pub use error::FetchError;

use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use reqwest::Client;
use strum_macros::Display;

use crate::config::{
    self, HN_API_BASE_URL, ITEM_TTL, LIST_ID_CAP, LIST_TTL, UPSTREAM_BODY_CAP,
};
use crate::internal::cache::Cache;
use crate::internal::models::{CacheValue, Item};

/// The story feeds this service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Feed {
    Best,
    Top,
    New,
}

impl Feed {
    fn as_api_str(self) -> &'static str {
        match self {
            Self::Best => "beststories",
            Self::Top => "topstories",
            Self::New => "newstories",
        }
    }
}

impl FromStr for Feed {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best" => Ok(Self::Best),
            "top" => Ok(Self::Top),
            "new" => Ok(Self::New),
            _ => Err(()),
        }
    }
}

/// Type alias for in-flight request tracking map
type InflightMap = Arc<DashMap<String, Shared<BoxFuture<'static, Result<Arc<String>, FetchError>>>>>;

/// Upstream access for the whole service: one shared pooled client, one
/// shared TTL+LRU cache, and single-flight deduplication of raw GETs.
///
/// Cache read, miss resolution, and cache write are three separate
/// critical sections; a racing duplicate write is harmless because
/// upstream is idempotent and writes are last-writer-wins.
#[derive(Clone)]
pub struct ApiService {
    client: Client,
    cache: Cache,
    // Exposed for integration tests
    pub base_url: Option<String>,
    inflight: InflightMap,
}

impl ApiService {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(config::UPSTREAM_TIMEOUT)
            .connect_timeout(config::UPSTREAM_CONNECT_TIMEOUT)
            .pool_max_idle_per_host(config::POOL_MAX_IDLE_PER_HOST)
            .user_agent(config::USER_AGENT)
            .build()
            .expect("failed to build the upstream HTTP client");

        Self {
            client,
            cache: Cache::new(config::MAX_CACHE_ENTRIES),
            base_url: None,
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Helper to create a service with a custom base URL (for testing).
    pub fn with_base_url(base_url: String) -> Self {
        let mut service = Self::new();
        service.base_url = Some(base_url);
        service
    }

    fn base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(HN_API_BASE_URL)
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// The shared pooled client; the reader pipeline issues its own
    /// bounded GETs through it.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Raw GET with single-flight deduplication: concurrent callers for
    /// the same URL share one in-flight request and clone its result.
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch_text(&self, url: String) -> Result<Arc<String>, FetchError> {
        let shared = match self.inflight.get(&url) {
            Some(existing) => {
                tracing::trace!("joining in-flight request");
                existing.clone()
            }
            None => {
                let client = self.client.clone();
                let target = url.clone();
                let fut = async move { fetch_text_inner(client, target).await }
                    .boxed()
                    .shared();
                self.inflight.insert(url.clone(), fut.clone());
                fut
            }
        };

        let result = shared.await;
        // drop the map entry so later callers fetch fresh data
        self.inflight.remove(&url);
        result
    }

    /// Cache-through item fetch. Upstream `null` is remembered as a
    /// negative entry so repeat lookups for dead ids stay local.
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn fetch_item(&self, id: u32) -> Result<Option<Item>, FetchError> {
        if id == 0 {
            return Err(FetchError::InvalidId(id));
        }

        let key = format!("item:{id}");
        match self.cache.get(&key) {
            Some(CacheValue::Item(item)) => {
                tracing::trace!("cache hit");
                return Ok(Some(item));
            }
            Some(CacheValue::Missing) => {
                tracing::trace!("negative cache hit");
                return Ok(None);
            }
            Some(_) | None => {}
        }

        let url = format!("{}item/{}.json", self.base(), id);
        let body = self.fetch_text(url).await?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "null" {
            self.cache.set(key, CacheValue::Missing, ITEM_TTL);
            return Ok(None);
        }

        let item: Item =
            serde_json::from_str(trimmed).map_err(|e| FetchError::Decode(e.to_string()))?;
        self.cache.set(key, CacheValue::Item(item.clone()), ITEM_TTL);
        Ok(Some(item))
    }

    /// Cached ID list for a feed, truncated to the page-able window.
    #[tracing::instrument(skip(self), fields(feed = %feed))]
    pub async fn fetch_story_ids(&self, feed: Feed) -> Result<Vec<u32>, FetchError> {
        let key = format!("list:{feed}");
        if let Some(CacheValue::Ids(ids)) = self.cache.get(&key) {
            tracing::trace!(count = ids.len(), "cache hit");
            return Ok(ids);
        }

        let url = format!("{}{}.json", self.base(), feed.as_api_str());
        let body = self.fetch_text(url).await?;
        let mut ids: Vec<u32> =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        ids.truncate(LIST_ID_CAP);

        tracing::debug!(feed = %feed, count = ids.len(), "fetched story ids");
        self.cache.set(key, CacheValue::Ids(ids.clone()), LIST_TTL);
        Ok(ids)
    }
}

impl Default for ApiService {
    fn default() -> Self {
        Self::new()
    }
}

async fn fetch_text_inner(client: Client, url: String) -> Result<Arc<String>, FetchError> {
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(FetchError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let body = read_bounded(response, UPSTREAM_BODY_CAP).await?;
    let text = String::from_utf8(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(Arc::new(text))
}

/// Stream a response body into memory, failing as soon as the byte cap
/// is exceeded; the connection is dropped with the stream.
pub(crate) async fn read_bounded(
    response: reqwest::Response,
    cap: usize,
) -> Result<Vec<u8>, FetchError> {
    let mut body: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::from_reqwest)?;
        if body.len() + chunk.len() > cap {
            return Err(FetchError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

#[cfg(test)]
pub fn item_url(base: &str, id: u32) -> String {
    format!("{base}item/{id}.json")
}
