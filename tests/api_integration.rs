use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use hn_edge::api::{ApiService, Feed};
use hn_edge::internal::comments::comment_forest;
use hn_edge::internal::models::CacheValue;
use hn_edge::internal::stories::stories_page;

fn item_body(id: u32, kind: &str, extra: &str) -> String {
    format!(r#"{{"id":{id},"type":"{kind}","time":1600000000{extra}}}"#)
}

#[tokio::test]
async fn list_page_is_ordered_and_served_from_cache_on_repeat() {
    let mut server = mockito::Server::new_async().await;
    let list = server
        .mock("GET", "/beststories.json")
        .with_status(200)
        .with_body("[10, 20, 30]")
        .expect(1)
        .create_async()
        .await;
    let mut item_mocks = Vec::new();
    for id in [10u32, 20, 30] {
        let mock = server
            .mock("GET", format!("/item/{id}.json").as_str())
            .with_status(200)
            .with_body(item_body(id, "story", r#","title":"t","score":3"#))
            .expect(1)
            .create_async()
            .await;
        item_mocks.push(mock);
    }

    let api = ApiService::with_base_url(format!("{}/", server.url()));
    let token = CancellationToken::new();

    let first = stories_page(&api, Feed::Best, 0, 3, &token).await.unwrap();
    let second = stories_page(&api, Feed::Best, 0, 3, &token).await.unwrap();

    let ids: Vec<u32> = first.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);
    assert_eq!(first, second);

    // one upstream round per resource, the repeat page came from cache
    list.assert_async().await;
    for mock in item_mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn missing_item_leaves_a_gap_and_a_negative_entry() {
    let mut server = mockito::Server::new_async().await;
    let _list = server
        .mock("GET", "/beststories.json")
        .with_status(200)
        .with_body("[10, 20, 30]")
        .create_async()
        .await;
    let mut item_mocks = Vec::new();
    for (id, body) in [
        (10u32, item_body(10, "story", r#","title":"ten""#)),
        (20, "null".to_string()),
        (30, item_body(30, "story", r#","title":"thirty""#)),
    ] {
        let mock = server
            .mock("GET", format!("/item/{id}.json").as_str())
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;
        item_mocks.push(mock);
    }

    let api = ApiService::with_base_url(format!("{}/", server.url()));
    let token = CancellationToken::new();

    let page = stories_page(&api, Feed::Best, 0, 3, &token).await.unwrap();
    let ids: Vec<u32> = page.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![10, 30]);

    // the null answer was remembered; this lookup stays local
    assert_eq!(api.cache().get("item:20"), Some(CacheValue::Missing));
    assert_eq!(api.fetch_item(20).await.unwrap(), None);
}

#[tokio::test]
async fn forest_preorder_matches_upstream_restricted_to_comments() {
    let mut server = mockito::Server::new_async().await;
    let mocks = [
        (1u32, item_body(1, "comment", r#","text":"a","kids":[11,12]"#)),
        (11, item_body(11, "comment", r#","text":"a1""#)),
        (12, item_body(12, "comment", r#","text":"a2""#)),
        (2, item_body(2, "story", r#","title":"not a comment""#)),
        (3, item_body(3, "comment", r#","text":"c""#)),
    ];
    let mut item_mocks = Vec::new();
    for (id, body) in mocks {
        let mock = server
            .mock("GET", format!("/item/{id}.json").as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        item_mocks.push(mock);
    }

    let api = ApiService::with_base_url(format!("{}/", server.url()));
    let token = CancellationToken::new();
    let forest = comment_forest(&api, &[1, 2, 3], &token).await.unwrap();

    fn preorder(nodes: &[hn_edge::internal::models::CommentNode], out: &mut Vec<u32>) {
        for node in nodes {
            out.push(node.id);
            preorder(&node.kids, out);
        }
    }
    let mut ids = Vec::new();
    preorder(&forest, &mut ids);
    assert_eq!(ids, vec![1, 11, 12, 3]);
}

#[tokio::test]
async fn thread_hydration_keeps_at_most_eight_fetches_in_flight() {
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::Uri;
    use axum::response::IntoResponse;
    use axum::Router;

    let current = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let upstream = {
        let current = current.clone();
        let max_seen = max_seen.clone();
        Router::new().fallback(move |uri: Uri| {
            let current = current.clone();
            let max_seen = max_seen.clone();
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(25)).await;
                current.fetch_sub(1, Ordering::SeqCst);

                let id: u32 = uri
                    .path()
                    .trim_start_matches("/item/")
                    .trim_end_matches(".json")
                    .parse()
                    .unwrap_or(0);
                (
                    [(CONTENT_TYPE, "application/json")],
                    Body::from(format!(r#"{{"id":{id},"type":"comment","text":"c"}}"#)),
                )
                    .into_response()
            }
        })
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let api = ApiService::with_base_url(format!("http://{addr}/"));
    let token = CancellationToken::new();
    let kids: Vec<u32> = (1..=40).collect();
    let forest = comment_forest(&api, &kids, &token).await.unwrap();

    assert_eq!(forest.len(), 40);
    assert!(
        max_seen.load(Ordering::SeqCst) <= 8,
        "saw {} concurrent fetches",
        max_seen.load(Ordering::SeqCst)
    );

    server.abort();
}

#[tokio::test]
async fn list_errors_discard_partial_successes() {
    let mut server = mockito::Server::new_async().await;
    let _list = server
        .mock("GET", "/topstories.json")
        .with_status(200)
        .with_body("[1, 2, 3]")
        .create_async()
        .await;
    let _one = server
        .mock("GET", "/item/1.json")
        .with_status(200)
        .with_body(item_body(1, "story", r#","title":"one""#))
        .create_async()
        .await;
    let _two = server
        .mock("GET", "/item/2.json")
        .with_status(503)
        .create_async()
        .await;
    let _three = server
        .mock("GET", "/item/3.json")
        .with_status(200)
        .with_body(item_body(3, "story", r#","title":"three""#))
        .create_async()
        .await;

    let api = ApiService::with_base_url(format!("{}/", server.url()));
    let token = CancellationToken::new();
    let result = stories_page(&api, Feed::Top, 0, 3, &token).await;
    assert!(result.is_err(), "partial success must not be returned");
}
