use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::{Feed, FetchError};
use crate::config::{DEFAULT_PAGE_LIMIT, ITEM_CACHE_CONTROL, MAX_PAGE_LIMIT, STORIES_CACHE_CONTROL};
use crate::internal::comments::comment_forest;
use crate::internal::models::{Item, ItemResponse, Story, ThreadResponse};
use crate::internal::reader::{self, ReaderError};
use crate::internal::stories::stories_page;
use crate::server::AppState;
use crate::utils::html::sanitize_comment_html;

pub type ApiResult = Result<Response, ApiError>;

/// Handler-layer error taxonomy. This is the only place internal error
/// kinds become HTTP statuses; every variant serializes to the
/// `{"error": "..."}` envelope.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge(String),
    UnsupportedMediaType(String),
    BadGateway(String),
    GatewayTimeout(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidId(_) => ApiError::BadRequest(err.to_string()),
            FetchError::Status(404) => ApiError::NotFound("not found upstream".into()),
            FetchError::Status(_) => ApiError::BadGateway(err.to_string()),
            FetchError::Timeout | FetchError::Cancelled => {
                ApiError::GatewayTimeout("upstream request timed out".into())
            }
            FetchError::TooLarge | FetchError::Decode(_) | FetchError::Transport(_) => {
                tracing::warn!(error = %err, "upstream failure");
                ApiError::BadGateway("upstream failure".into())
            }
        }
    }
}

impl From<ReaderError> for ApiError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::BadUrl(_) | ReaderError::Blocked(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ReaderError::TooLarge => ApiError::PayloadTooLarge(err.to_string()),
            ReaderError::NotHtml(_) => ApiError::UnsupportedMediaType(err.to_string()),
            ReaderError::Timeout => ApiError::GatewayTimeout(err.to_string()),
            ReaderError::Upstream(_) | ReaderError::Extract(_) => {
                ApiError::BadGateway(err.to_string())
            }
            ReaderError::Transport(_) => {
                tracing::warn!(error = %err, "reader transport failure");
                ApiError::BadGateway("article fetch failed".into())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoriesQuery {
    feed: Option<String>,
    offset: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    url: Option<String>,
}

/// GET /api/stories?feed=&offset=&limit=
pub async fn stories(
    State(state): State<AppState>,
    Query(query): Query<StoriesQuery>,
) -> ApiResult {
    let feed = parse_feed(query.feed.as_deref())?;
    let offset = parse_offset(query.offset.as_deref())?;
    let limit = parse_limit(query.limit.as_deref())?;

    let token = CancellationToken::new();
    let page = stories_page(&state.api, feed, offset, limit, &token).await?;
    cached_json(&page, STORIES_CACHE_CONTROL)
}

/// GET /api/item?id=
pub async fn item(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult {
    let id = parse_id(query.id.as_deref())?;
    let item = state
        .api
        .fetch_item(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("item {id} not found")))?;

    let response = ItemResponse::from_item(&item, display_text(&item));
    cached_json(&response, ITEM_CACHE_CONTROL)
}

/// GET /api/thread?id=  — the root must be a story; its comment forest
/// is hydrated under one shared per-request concurrency bound.
pub async fn thread(State(state): State<AppState>, Query(query): Query<IdQuery>) -> ApiResult {
    let id = parse_id(query.id.as_deref())?;
    let item = state
        .api
        .fetch_item(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("item {id} not found")))?;
    if !item.is_story() {
        return Err(ApiError::BadRequest(format!("item {id} is not a story")));
    }

    let token = CancellationToken::new();
    let comments = comment_forest(&state.api, &item.kids, &token).await?;
    let response = ThreadResponse {
        story: Story::from_item(&item, display_text(&item)),
        comments,
    };
    cached_json(&response, ITEM_CACHE_CONTROL)
}

/// GET /api/reader?url=
pub async fn reader(State(state): State<AppState>, Query(query): Query<ReaderQuery>) -> ApiResult {
    let raw = query
        .url
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("url is required".into()))?;

    let article = reader::fetch_article(state.api.client(), raw, state.reader_options).await?;

    let mut response = cached_json(&article, ITEM_CACHE_CONTROL)?;
    if let Ok(value) = HeaderValue::from_str(&article.final_url) {
        response.headers_mut().insert("x-reader-final-url", value);
    }
    Ok(response)
}

/// Build a JSON response by hand so both the charset and the caching
/// policy are explicit.
fn cached_json<T: Serialize>(payload: &T, cache_control: &'static str) -> ApiResult {
    let body = serde_json::to_vec(payload)
        .map_err(|e| ApiError::BadGateway(format!("failed to encode response: {e}")))?;
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
    Ok(response)
}

fn display_text(item: &Item) -> String {
    if item.deleted || item.dead {
        return String::new();
    }
    item.text
        .as_deref()
        .map(sanitize_comment_html)
        .unwrap_or_default()
}

fn parse_feed(raw: Option<&str>) -> Result<Feed, ApiError> {
    match raw {
        None => Ok(Feed::Best),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("unknown feed {raw:?}"))),
    }
}

fn parse_offset(raw: Option<&str>) -> Result<usize, ApiError> {
    match raw {
        None => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest("offset must be a non-negative integer".into())),
    }
}

fn parse_limit(raw: Option<&str>) -> Result<usize, ApiError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_PAGE_LIMIT);
    };
    match raw.parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit.min(MAX_PAGE_LIMIT)),
        _ => Err(ApiError::BadRequest("limit must be a positive integer".into())),
    }
}

fn parse_id(raw: Option<&str>) -> Result<u32, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::BadRequest("id is required".into()))?;
    match raw.parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest("id must be a positive integer".into())),
    }
}
