use url::Url;

use hn_edge::utils::html::{sanitize_article_html, sanitize_comment_html};

fn base() -> Url {
    Url::parse("https://news.example.com/story/42").unwrap()
}

#[test]
fn article_sanitization_snapshot() {
    let input = concat!(
        "<article><h1>Title</h1>",
        r#"<p class="lead">Intro &amp; more</p>"#,
        "<div><p>Body</p></div>",
        r#"<a href="/rel">go</a>"#,
        r#"<img src="/img.png" alt="pic">"#,
        "</article>",
    );
    let out = sanitize_article_html(input, &base());
    insta::assert_snapshot!(out, @r#"<article><h1>Title</h1><p>Intro &amp; more</p><p>Body</p><a href="https://news.example.com/rel" target="_blank" rel="noopener noreferrer">go</a><img src="https://news.example.com/img.png" alt="pic" loading="lazy" decoding="async" referrerpolicy="no-referrer"></article>"#);
}

#[test]
fn article_sanitization_strips_active_content() {
    let input = concat!(
        r#"<p onmouseover="steal()">safe</p>"#,
        r#"<iframe src="https://evil.example/"></iframe>"#,
        r#"<a href="javascript:run()">trap</a>"#,
    );
    let out = sanitize_article_html(input, &base());
    insta::assert_snapshot!(out, @r#"<p>safe</p><a target="_blank" rel="noopener noreferrer">trap</a>"#);
}

#[test]
fn comment_sanitization_snapshot() {
    let input = concat!(
        r#"<p>Look at <a href="https://example.com/page?a=1&b=2" rel="nofollow">this</a> &amp; <i>that</i></p>"#,
        "<pre><code>let x = 1;</code></pre>",
    );
    let out = sanitize_comment_html(input);
    insta::assert_snapshot!(out, @r#"<p>Look at <a href="https://example.com/page?a=1&amp;b=2" target="_blank" rel="noopener noreferrer">this</a> &amp; <i>that</i></p><pre><code>let x = 1;</code></pre>"#);
}

#[test]
fn comment_sanitization_drops_article_only_tags() {
    let input = r#"<h2>heading</h2><table><tr><td>cell</td></tr></table><span>kept</span>"#;
    let out = sanitize_comment_html(input);
    insta::assert_snapshot!(out, @"headingcell<span>kept</span>");
}

#[test]
fn sanitizers_are_stable_across_runs() {
    let input = r#"<div><a href="x">1</a><img src="y.png"><p>z</p></div>"#;
    let first = sanitize_article_html(input, &base());
    for _ in 0..16 {
        assert_eq!(sanitize_article_html(input, &base()), first);
    }
}
