use std::time::Duration;

/// Upstream Hacker News API base. Overridable per `ApiService` instance
/// for tests.
pub const HN_API_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/";

pub const USER_AGENT: &str = concat!("hn-edge/", env!("CARGO_PKG_VERSION"));

/// TTL for cached story-ID lists (`list:<feed>`).
pub const LIST_TTL: Duration = Duration::from_secs(5 * 60);
/// TTL for cached items and negative markers (`item:<id>`).
pub const ITEM_TTL: Duration = Duration::from_secs(3 * 60);
/// How often the cache janitor sweeps expired entries.
pub const JANITOR_INTERVAL: Duration = Duration::from_secs(30);
/// Upper bound on cached entries; LRU eviction kicks in past this.
pub const MAX_CACHE_ENTRIES: usize = 10_000;

/// Worker-pool width for story-list hydration.
pub const LIST_CONCURRENCY: usize = 8;
/// Semaphore capacity shared across all levels of one comment-forest
/// hydration.
pub const THREAD_CONCURRENCY: usize = 8;

/// A feed list is truncated to this many IDs before caching.
pub const LIST_ID_CAP: usize = 120;
pub const DEFAULT_PAGE_LIMIT: usize = 30;
pub const MAX_PAGE_LIMIT: usize = 120;

/// Byte cap on upstream list/item JSON bodies.
pub const UPSTREAM_BODY_CAP: usize = 4 * 1024 * 1024;
/// Byte cap on reader-view article bodies.
pub const READER_BODY_CAP: usize = 2 * 1024 * 1024;
/// Hard deadline for one reader fetch.
pub const READER_TIMEOUT: Duration = Duration::from_secs(10);

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
pub const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const POOL_MAX_IDLE_PER_HOST: usize = 20;

pub const STORIES_CACHE_CONTROL: &str = "public, max-age=60, stale-while-revalidate=30";
pub const ITEM_CACHE_CONTROL: &str = "public, max-age=120, stale-while-revalidate=60";

const DEFAULT_PORT: u16 = 8080;

/// Listen port, from `PORT` (default 8080). The only runtime knob.
pub fn port() -> u16 {
    match std::env::var("PORT") {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("PORT={raw:?} is not a valid port, using {DEFAULT_PORT}");
            DEFAULT_PORT
        }),
        Err(_) => DEFAULT_PORT,
    }
}
