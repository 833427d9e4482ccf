use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiService, Feed, FetchError};
use crate::config::{LIST_CONCURRENCY, MAX_PAGE_LIMIT};
use crate::internal::models::{Item, Story};
use crate::utils::html::sanitize_comment_html;

/// Hydrate one page of a feed: cached ID list, clamped slice, bounded
/// ordered fan-out. The first item error cancels the siblings and fails
/// the whole page; deleted, dead, and missing items are dropped.
#[tracing::instrument(skip(api, token), fields(feed = %feed))]
pub async fn stories_page(
    api: &ApiService,
    feed: Feed,
    offset: usize,
    limit: usize,
    token: &CancellationToken,
) -> Result<Vec<Story>, FetchError> {
    let ids = api.fetch_story_ids(feed).await?;
    let page = page_slice(&ids, offset, limit);
    if page.is_empty() {
        return Ok(Vec::new());
    }

    let child = token.child_token();
    let items: Vec<Option<Item>> = stream::iter(page.iter().copied())
        .map(|id| {
            let api = api.clone();
            let child = child.clone();
            async move {
                if child.is_cancelled() {
                    return Err(FetchError::Cancelled);
                }
                api.fetch_item(id).await.inspect_err(|_| child.cancel())
            }
        })
        .buffered(LIST_CONCURRENCY)
        .try_collect()
        .await?;

    let stories: Vec<Story> = items
        .iter()
        .flatten()
        .filter(|item| !item.deleted && !item.dead)
        .map(project_story)
        .collect();

    tracing::debug!(requested = page.len(), hydrated = stories.len(), "hydrated page");
    Ok(stories)
}

fn project_story(item: &Item) -> Story {
    let text = item
        .text
        .as_deref()
        .map(sanitize_comment_html)
        .unwrap_or_default();
    Story::from_item(item, text)
}

/// Clamp offset into the list and limit into [1, MAX_PAGE_LIMIT], then
/// slice. An offset at or past the end yields an empty page.
fn page_slice(ids: &[u32], offset: usize, limit: usize) -> Vec<u32> {
    if offset >= ids.len() {
        return Vec::new();
    }
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);
    let end = (offset + limit).min(ids.len());
    ids[offset..end].to_vec()
}
