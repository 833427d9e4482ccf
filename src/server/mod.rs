pub mod assets;
pub mod handlers;

use axum::extract::Request;
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::ApiService;
use crate::internal::reader::ReaderOptions;

#[derive(Clone)]
pub struct AppState {
    pub api: ApiService,
    pub reader_options: ReaderOptions,
}

impl AppState {
    pub fn new(api: ApiService) -> Self {
        Self {
            api,
            reader_options: ReaderOptions::default(),
        }
    }
}

/// Assemble the full surface: API routes, index with preload, static
/// fallback. Inside out: gzip, CORS decoration, the method guard
/// (which also answers OPTIONS, so the CORS layer never sees one),
/// request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/stories", get(handlers::stories))
        .route("/api/item", get(handlers::item))
        .route("/api/thread", get(handlers::thread))
        .route("/api/reader", get(handlers::reader))
        .route("/", get(assets::index))
        .fallback_service(ServeDir::new(assets::PUBLIC_DIR))
        .layer(CompressionLayer::new())
        .layer(cors())
        .layer(middleware::from_fn(method_guard))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// The surface is read-only: GET goes through, OPTIONS short-circuits
/// with 204 and the CORS preflight headers, everything else gets the
/// 405 envelope with `Allow: GET`.
async fn method_guard(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    if method == Method::GET {
        return next.run(req).await;
    }

    if method == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, OPTIONS"),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        );
        return response;
    }

    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "only GET is supported" })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET"));
    response
}
