use std::path::Path;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use crate::api::Feed;
use crate::config::DEFAULT_PAGE_LIMIT;
use crate::internal::stories::stories_page;
use crate::server::AppState;

pub const PUBLIC_DIR: &str = "public";

/// Marker in index.html replaced by the preload payload.
const PRELOAD_SLOT: &str = "<!-- preload -->";

/// Serve the index page with the default first page of stories injected
/// as a JSON script tag, so the client paints without a round trip. A
/// failed hydration serves the page unmodified.
pub async fn index(State(state): State<AppState>) -> Response {
    let path = Path::new(PUBLIC_DIR).join("index.html");
    let html = match tokio::fs::read_to_string(&path).await {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "index.html unavailable");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let html = inject_preload(&state, html).await;

    let mut response = Response::new(Body::from(html));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

async fn inject_preload(state: &AppState, html: String) -> String {
    if !html.contains(PRELOAD_SLOT) {
        return html;
    }

    let token = CancellationToken::new();
    let stories = match stories_page(&state.api, Feed::Best, 0, DEFAULT_PAGE_LIMIT, &token).await {
        Ok(stories) => stories,
        Err(err) => {
            tracing::debug!(error = %err, "preload hydration failed, serving bare index");
            return html;
        }
    };

    match serde_json::to_string(&stories) {
        // "</" must not appear verbatim inside a script element
        Ok(json) => html.replace(
            PRELOAD_SLOT,
            &format!(
                r#"<script id="preload" type="application/json">{}</script>"#,
                json.replace("</", r"<\/")
            ),
        ),
        Err(_) => html,
    }
}
