use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::content::{
    ArticleCursor, ContentError, ContentItem, ContentRequest, ContentSource, Volume,
};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Content service reached over HTTP (`/api/generate`, `/api/volumes`).
pub struct RemoteSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    #[serde(rename = "type")]
    category: &'a str,
    mistakes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    article_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_index: Option<u32>,
}

impl<'a> GenerateBody<'a> {
    fn from_request(request: &'a ContentRequest) -> Self {
        Self {
            category: request.category.as_str(),
            mistakes: request.mistakes.iter().map(|c| c.to_string()).collect(),
            article_id: request.next_from.map(|c| c.article_id),
            line_index: request.next_from.map(|c| c.line_index),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    article: Option<ArticlePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlePayload {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    content: Vec<String>,
    line_index: u32,
    total_lines: u32,
}

impl GenerateResponse {
    /// An article's lines are numbered from its `lineIndex`.
    fn into_items(self) -> Result<Vec<ContentItem>, ContentError> {
        if let Some(article) = self.article {
            let items: Vec<ContentItem> = article
                .content
                .into_iter()
                .enumerate()
                .filter(|(_, text)| !text.trim().is_empty())
                .map(|(i, text)| -> Result<ContentItem, ContentError> {
                    let line_index = u32::try_from(i)
                        .ok()
                        .and_then(|i| article.line_index.checked_add(i))
                        .ok_or_else(|| {
                            ContentError::Payload(format!(
                                "line {i} past lineIndex {} is out of range",
                                article.line_index
                            ))
                        })?;
                    Ok(ContentItem {
                        text,
                        title: article.title.clone(),
                        article: Some(ArticleCursor {
                            article_id: article.id,
                            line_index,
                            total_lines: article.total_lines,
                        }),
                    })
                })
                .collect::<Result<_, ContentError>>()?;
            if items.is_empty() {
                return Err(ContentError::Empty);
            }
            return Ok(items);
        }
        match self.content {
            Some(text) if !text.trim().is_empty() => Ok(vec![ContentItem::sentence(text.trim())]),
            Some(_) => Err(ContentError::Empty),
            None => Err(ContentError::Payload(
                "neither content nor article present".to_string(),
            )),
        }
    }
}

impl RemoteSource {
    pub fn new(base_url: &str) -> Result<Self, ContentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| ContentError::Request(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ContentSource for RemoteSource {
    fn fetch(&self, request: &ContentRequest) -> Result<Vec<ContentItem>, ContentError> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&GenerateBody::from_request(request))
            .send()
            .map_err(|e| ContentError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ContentError::Request(format!("HTTP {}", response.status())));
        }
        let body: GenerateResponse = response
            .json()
            .map_err(|e| ContentError::Payload(e.to_string()))?;
        body.into_items()
    }

    fn volumes(&self) -> Result<Vec<Volume>, ContentError> {
        let response = self
            .client
            .get(self.url("/api/volumes"))
            .send()
            .map_err(|e| ContentError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ContentError::Request(format!("HTTP {}", response.status())));
        }
        response
            .json()
            .map_err(|e| ContentError::Payload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Category, ReservedCategory};

    fn parse(json: &str) -> Result<Vec<ContentItem>, ContentError> {
        serde_json::from_str::<GenerateResponse>(json).unwrap().into_items()
    }

    #[test]
    fn test_request_body_for_mistake_review() {
        let request = ContentRequest {
            category: Category::Builtin(ReservedCategory::Mistake),
            mistakes: vec!['那', '哪'],
            next_from: None,
        };
        let json = serde_json::to_value(GenerateBody::from_request(&request)).unwrap();
        assert_eq!(json["type"], "mistake");
        assert_eq!(json["mistakes"], serde_json::json!(["那", "哪"]));
        assert!(json.get("articleId").is_none());
    }

    #[test]
    fn test_request_body_for_next_line() {
        let request = ContentRequest {
            category: Category::parse("grade-1-vol-1"),
            mistakes: Vec::new(),
            next_from: Some(ArticleCursor {
                article_id: 4,
                line_index: 2,
                total_lines: 6,
            }),
        };
        let json = serde_json::to_value(GenerateBody::from_request(&request)).unwrap();
        assert_eq!(json["type"], "grade-1-vol-1");
        assert_eq!(json["articleId"], 4);
        assert_eq!(json["lineIndex"], 2);
    }

    #[test]
    fn test_parse_sentence() {
        let items = parse(r#"{"content":" 亡羊补牢，为时未晚 "}"#).unwrap();
        assert_eq!(items, vec![ContentItem::sentence("亡羊补牢，为时未晚")]);
    }

    #[test]
    fn test_parse_article() {
        let items = parse(
            r#"{"article":{"id":7,"title":"江南","content":["鱼戏莲叶间","鱼戏莲叶东"],"lineIndex":1,"totalLines":4}}"#,
        )
        .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title.as_deref(), Some("江南"));
        let cursor = items[1].article.unwrap();
        assert_eq!((cursor.article_id, cursor.line_index, cursor.total_lines), (7, 2, 4));
    }

    #[test]
    fn test_parse_article_line_index_out_of_range() {
        let json = format!(
            r#"{{"article":{{"id":7,"content":["鱼戏莲叶间","鱼戏莲叶东"],"lineIndex":{},"totalLines":4}}}}"#,
            u32::MAX
        );
        assert!(matches!(parse(&json), Err(ContentError::Payload(_))));
    }

    #[test]
    fn test_parse_empty_or_malformed() {
        assert!(matches!(parse(r#"{"content":"  "}"#), Err(ContentError::Empty)));
        assert!(matches!(parse(r#"{}"#), Err(ContentError::Payload(_))));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let source = RemoteSource::new("http://localhost:8787/").unwrap();
        assert_eq!(source.url("/api/volumes"), "http://localhost:8787/api/volumes");
    }
}
