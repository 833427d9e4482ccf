use serde::{Deserialize, Serialize};

use crate::utils::url::domain_of;

/// One upstream item as the Hacker News API returns it. Fields are
/// defaulted so sparse payloads (jobs, deleted items) still decode.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Item {
    pub id: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub by: Option<String>,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub descendants: u32,
    #[serde(default)]
    pub kids: Vec<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub dead: bool,
}

impl Item {
    pub fn is_comment(&self) -> bool {
        self.kind == "comment"
    }

    pub fn is_story(&self) -> bool {
        self.kind == "story"
    }
}

/// What the shared cache holds. `Missing` is the negative-result marker:
/// upstream answered `null` for this key, which is different from the
/// key not being cached at all.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Item(Item),
    Ids(Vec<u32>),
    Missing,
}

/// Story list element. Every field is always emitted; zero-valued
/// numerics serialize as 0 and `kids` is never null.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Story {
    pub id: u32,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub score: u32,
    pub by: String,
    pub time: i64,
    pub descendants: u32,
    pub kids: Vec<u32>,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Story {
    /// Project an upstream item into the list shape. `text` must already
    /// be sanitized by the caller.
    pub fn from_item(item: &Item, text: String) -> Self {
        let url = item.url.clone().unwrap_or_default();
        Self {
            id: item.id,
            title: item.title.clone().unwrap_or_default(),
            domain: domain_of(&url),
            url,
            score: item.score,
            by: item.by.clone().unwrap_or_default(),
            time: item.time,
            descendants: item.descendants,
            kids: item.kids.clone(),
            text,
            kind: item.kind.clone(),
        }
    }
}

/// Single-item response: the story shape plus moderation flags and the
/// optional parent pointer.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ItemResponse {
    #[serde(flatten)]
    pub story: Story,
    pub deleted: bool,
    pub dead: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u32>,
}

impl ItemResponse {
    pub fn from_item(item: &Item, text: String) -> Self {
        Self {
            story: Story::from_item(item, text),
            deleted: item.deleted,
            dead: item.dead,
            parent: item.parent,
        }
    }
}

/// One node of a hydrated comment forest. `kids` recurses and is never
/// null; deleted or dead nodes keep their place with empty text.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentNode {
    pub id: u32,
    pub by: String,
    pub time: i64,
    pub text: String,
    pub kids: Vec<CommentNode>,
    #[serde(rename = "type")]
    pub kind: String,
    pub deleted: bool,
    pub dead: bool,
}

/// Thread response: the root story plus its comment forest.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ThreadResponse {
    #[serde(flatten)]
    pub story: Story,
    pub comments: Vec<CommentNode>,
}

/// Reader-view extraction result. `content` has passed the article
/// sanitizer; `length` is the character count of `text_content`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Article {
    pub url: String,
    pub final_url: String,
    pub title: String,
    pub byline: String,
    pub site_name: String,
    pub excerpt: String,
    pub content: String,
    pub text_content: String,
    pub length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        serde_json::from_str(
            r#"{
                "id": 8863,
                "type": "story",
                "by": "dhouston",
                "time": 1175714200,
                "url": "https://www.getdropbox.com/u/2/screencast.html",
                "score": 104,
                "title": "My YC app: Dropbox",
                "descendants": 71,
                "kids": [9224, 8917]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn sparse_item_decodes_with_defaults() {
        let item: Item = serde_json::from_str(r#"{"id": 1, "type": "story", "deleted": true}"#)
            .unwrap();
        assert_eq!(item.id, 1);
        assert!(item.deleted);
        assert!(!item.dead);
        assert!(item.kids.is_empty());
        assert_eq!(item.score, 0);
    }

    #[test]
    fn story_projection_fills_every_field() {
        let story = Story::from_item(&sample_item(), String::new());
        assert_eq!(story.id, 8863);
        assert_eq!(story.domain, "getdropbox.com");
        assert_eq!(story.kids, vec![9224, 8917]);

        let json = serde_json::to_value(&story).unwrap();
        assert_eq!(json["kids"], serde_json::json!([9224, 8917]));
        assert_eq!(json["text"], "");
    }

    #[test]
    fn item_response_omits_absent_parent() {
        let resp = ItemResponse::from_item(&sample_item(), String::new());
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("parent").is_none());
        assert_eq!(json["deleted"], false);
        // flattened story fields sit at the top level
        assert_eq!(json["id"], 8863);
    }

    #[test]
    fn zero_numerics_serialize_as_zero() {
        let item: Item = serde_json::from_str(r#"{"id": 2, "type": "job"}"#).unwrap();
        let json = serde_json::to_value(Story::from_item(&item, String::new())).unwrap();
        assert_eq!(json["score"], 0);
        assert_eq!(json["descendants"], 0);
        assert_eq!(json["time"], 0);
    }
}
