use std::collections::HashSet;

use once_cell::sync::Lazy;
use ego_tree::NodeRef;
use scraper::node::{Element, Node};
use scraper::Html;
use url::Url;

/// Tags that survive article sanitization. Everything else is unwrapped:
/// the element goes away, its children stay.
static ARTICLE_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "a", "article", "blockquote", "br", "code", "em", "figcaption", "figure", "h1", "h2",
        "h3", "h4", "h5", "h6", "hr", "img", "li", "ol", "p", "pre", "section", "small", "strong",
        "sub", "sup", "table", "tbody", "td", "th", "thead", "tr", "ul",
    ])
});

/// The narrower set for user-posted comment HTML.
static COMMENT_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "a", "b", "blockquote", "br", "code", "em", "i", "li", "ol", "p", "pre", "span", "strong",
        "ul",
    ])
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Article,
    Comment,
}

impl Mode {
    fn allows(self, tag: &str) -> bool {
        match self {
            Mode::Article => ARTICLE_TAGS.contains(tag),
            Mode::Comment => COMMENT_TAGS.contains(tag),
        }
    }
}

/// Sanitize extracted article HTML against the reader allow-list.
/// `href`/`src` are resolved against `base` and must come out http or
/// https. Pure: identical input yields identical output.
pub fn sanitize_article_html(html: &str, base: &Url) -> String {
    sanitize(html, Mode::Article, Some(base))
}

/// Sanitize user-posted comment HTML: the small tag set, `a[href]` as
/// the only attribute, absolute http/https links only.
pub fn sanitize_comment_html(html: &str) -> String {
    sanitize(html, Mode::Comment, None)
}

fn sanitize(html: &str, mode: Mode, base: Option<&Url>) -> String {
    let doc = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    walk(doc.tree.root(), mode, base, &mut out);
    out
}

fn walk(node: NodeRef<'_, Node>, mode: Mode, base: Option<&Url>, out: &mut String) {
    match node.value() {
        Node::Document | Node::Fragment => {
            for child in node.children() {
                walk(child, mode, base, out);
            }
        }
        Node::Text(text) => push_escaped(out, &text, false),
        Node::Element(el) => {
            let tag = el.name();
            if !mode.allows(tag) {
                // unwrap: children preserved, element removed
                for child in node.children() {
                    walk(child, mode, base, out);
                }
                return;
            }
            match tag {
                "img" => emit_img(&el, base, out),
                "a" => {
                    emit_anchor(&el, mode, base, out);
                    for child in node.children() {
                        walk(child, mode, base, out);
                    }
                    out.push_str("</a>");
                }
                "br" | "hr" => {
                    out.push('<');
                    out.push_str(tag);
                    out.push('>');
                }
                _ => {
                    out.push('<');
                    out.push_str(tag);
                    if matches!(tag, "td" | "th") && mode == Mode::Article {
                        push_attr_if_present(out, &el, "colspan");
                        push_attr_if_present(out, &el, "rowspan");
                    }
                    out.push('>');
                    for child in node.children() {
                        walk(child, mode, base, out);
                    }
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
        // comments, doctypes, processing instructions are dropped
        _ => {}
    }
}

fn emit_anchor(el: &Element, mode: Mode, base: Option<&Url>, out: &mut String) {
    out.push_str("<a");
    if let Some(href) = el.attr("href")
        && let Some(safe) = resolve_web_url(href, if mode == Mode::Article { base } else { None })
    {
        out.push_str(" href=\"");
        push_escaped(out, &safe, true);
        out.push('"');
    }
    out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\">");
}

fn emit_img(el: &Element, base: Option<&Url>, out: &mut String) {
    // an image without a safe source is removed entirely
    let Some(src) = el.attr("src") else {
        return;
    };
    let Some(safe) = resolve_web_url(src, base) else {
        return;
    };

    out.push_str("<img src=\"");
    push_escaped(out, &safe, true);
    out.push('"');
    push_attr_if_present(out, el, "alt");
    push_attr_if_present(out, el, "title");
    out.push_str(" loading=\"lazy\" decoding=\"async\" referrerpolicy=\"no-referrer\">");
}

fn push_attr_if_present(out: &mut String, el: &Element, name: &str) {
    if let Some(value) = el.attr(name) {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        push_escaped(out, value, true);
        out.push('"');
    }
}

/// Resolve a link target (against `base` when given) and keep it only
/// when the result is an absolute http/https URL.
fn resolve_web_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let resolved = match base {
        Some(base) => base.join(raw).ok()?,
        None => Url::parse(raw).ok()?,
    };
    match resolved.scheme() {
        "http" | "https" => Some(resolved.into()),
        _ => None,
    }
}

fn push_escaped(out: &mut String, text: &str, in_attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
