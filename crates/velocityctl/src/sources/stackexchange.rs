//! StackExchange search excerpts adapter (QA_SITE).

use super::{get_json, strip_html};
use async_trait::async_trait;
use serde::Deserialize;
use velocity_core::{AdapterError, SourceAdapter, SourceCategory, SourceHit};

const API_URL: &str = "https://api.stackexchange.com/2.3/search/excerpts";
const SITE: &str = "stackoverflow";

#[derive(Debug, Deserialize)]
struct ExcerptPage {
    #[serde(default)]
    items: Vec<Excerpt>,
}

#[derive(Debug, Deserialize)]
struct Excerpt {
    question_id: u64,
    #[serde(default)]
    answer_id: Option<u64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    is_accepted: bool,
}

pub struct StackExchangeAdapter {
    http: reqwest::Client,
}

impl StackExchangeAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn hits_from(page: ExcerptPage, max_results: usize) -> Vec<SourceHit> {
    let mut items = page.items;
    // Accepted answers first, API relevance order otherwise
    items.sort_by_key(|item| !item.is_accepted);
    items
        .into_iter()
        .filter_map(|item| {
            let excerpt = strip_html(&item.excerpt);
            if excerpt.is_empty() {
                return None;
            }
            let id = match item.answer_id {
                Some(answer) => format!("{}:{}#{}", SITE, item.question_id, answer),
                None => format!("{}:{}", SITE, item.question_id),
            };
            Some(SourceHit::new(&id, &format!("{}. {}", strip_html(&item.title), excerpt)))
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl SourceAdapter for StackExchangeAdapter {
    fn category(&self) -> SourceCategory {
        SourceCategory::QaSite
    }

    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError> {
        let page_size = max_results.to_string();
        let request = self.http.get(API_URL).query(&[
            ("order", "desc"),
            ("sort", "relevance"),
            ("q", text),
            ("site", SITE),
            ("pagesize", page_size.as_str()),
        ]);
        let page: ExcerptPage = get_json(request).await?;
        Ok(hits_from(page, max_results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_answers_first() {
        let page: ExcerptPage = serde_json::from_str(
            r#"{"items": [
                {"question_id": 1, "title": "Borrow checker error", "excerpt": "The <span class=\"highlight\">borrow</span> ends here", "is_accepted": false},
                {"question_id": 2, "answer_id": 20, "title": "Why does the value move?", "excerpt": "Because String is not Copy", "is_accepted": true}
            ]}"#,
        )
        .unwrap();
        let hits = hits_from(page, 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source_id, "stackoverflow:2#20");
        assert!(hits[1].content.starts_with("Borrow checker error."));
        assert!(!hits[1].content.contains("<span"));
    }

    #[test]
    fn test_empty_excerpts_dropped() {
        let page: ExcerptPage =
            serde_json::from_str(r#"{"items": [{"question_id": 3, "title": "t", "excerpt": ""}]}"#).unwrap();
        assert!(hits_from(page, 3).is_empty());
    }
}
