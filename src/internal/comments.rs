use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiService, FetchError};
use crate::config::THREAD_CONCURRENCY;
use crate::internal::models::{CommentNode, Item};
use crate::utils::html::sanitize_comment_html;

/// Hydrate a comment forest depth-first. One semaphore is shared across
/// every recursion level of the request, so total in-flight fetches stay
/// bounded no matter how the tree is shaped. The first error cancels the
/// token and fails the whole forest; missing and non-comment items are
/// compacted away, preserving sibling order.
#[tracing::instrument(skip(api, kid_ids, token), fields(roots = kid_ids.len()))]
pub async fn comment_forest(
    api: &ApiService,
    kid_ids: &[u32],
    token: &CancellationToken,
) -> Result<Vec<CommentNode>, FetchError> {
    let semaphore = Arc::new(Semaphore::new(THREAD_CONCURRENCY));
    let child = token.child_token();
    hydrate_level(api, kid_ids, &semaphore, &child).await
}

async fn hydrate_level(
    api: &ApiService,
    ids: &[u32],
    semaphore: &Arc<Semaphore>,
    token: &CancellationToken,
) -> Result<Vec<CommentNode>, FetchError> {
    let nodes = try_join_all(
        ids.iter()
            .map(|id| hydrate_node(api.clone(), *id, semaphore.clone(), token.clone())),
    )
    .await?;
    Ok(nodes.into_iter().flatten().collect())
}

/// Boxed for recursion. The permit guards only the fetch itself and is
/// dropped before descending so a deep branch cannot starve its
/// siblings out of the pool.
fn hydrate_node(
    api: ApiService,
    id: u32,
    semaphore: Arc<Semaphore>,
    token: CancellationToken,
) -> BoxFuture<'static, Result<Option<CommentNode>, FetchError>> {
    async move {
        if token.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let fetched = {
            let permit = tokio::select! {
                permit = semaphore.acquire() => permit.map_err(|_| FetchError::Cancelled)?,
                _ = token.cancelled() => return Err(FetchError::Cancelled),
            };
            let result = api.fetch_item(id).await;
            drop(permit);
            result
        };

        let item = match fetched {
            Ok(item) => item,
            Err(err) => {
                token.cancel();
                return Err(err);
            }
        };
        let Some(item) = item else {
            return Ok(None);
        };
        if !item.is_comment() {
            tracing::trace!(id, kind = %item.kind, "skipping non-comment kid");
            return Ok(None);
        }

        let kids = match hydrate_level(&api, &item.kids, &semaphore, &token).await {
            Ok(kids) => kids,
            Err(err) => {
                token.cancel();
                return Err(err);
            }
        };

        Ok(Some(build_node(&item, kids)))
    }
    .boxed()
}

fn build_node(item: &Item, kids: Vec<CommentNode>) -> CommentNode {
    // deleted and dead comments keep their slot but carry no text
    let text = if item.deleted || item.dead {
        String::new()
    } else {
        item.text
            .as_deref()
            .map(sanitize_comment_html)
            .unwrap_or_default()
    };
    CommentNode {
        id: item.id,
        by: item.by.clone().unwrap_or_default(),
        time: item.time,
        text,
        kids,
        kind: item.kind.clone(),
        deleted: item.deleted,
        dead: item.dead,
    }
}
