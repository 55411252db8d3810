//! Wikipedia REST summary adapter (ENCYCLOPEDIC).

use super::get_json;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use velocity_core::{AdapterError, SourceAdapter, SourceCategory, SourceHit};

const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    /// "standard", "disambiguation", ...
    #[serde(default, rename = "type")]
    kind: String,
}

pub struct WikipediaAdapter {
    http: reqwest::Client,
}

impl WikipediaAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

/// REST summary URL for a free-text topic
fn summary_url(text: &str) -> Result<Url, AdapterError> {
    let title = text.split_whitespace().collect::<Vec<_>>().join("_");
    if title.is_empty() {
        return Err(AdapterError::Empty);
    }
    let mut url = Url::parse(SUMMARY_URL).map_err(|e| AdapterError::Malformed(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| AdapterError::Malformed("summary URL cannot take a path".to_string()))?
        .pop_if_empty()
        .push(&title);
    Ok(url)
}

fn hits_from(summary: Summary) -> Vec<SourceHit> {
    if summary.kind == "disambiguation" || summary.extract.trim().is_empty() {
        return Vec::new();
    }
    vec![SourceHit::new(&format!("wikipedia:{}", summary.title), &summary.extract)]
}

#[async_trait]
impl SourceAdapter for WikipediaAdapter {
    fn category(&self) -> SourceCategory {
        SourceCategory::Encyclopedic
    }

    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError> {
        let url = summary_url(text)?;
        let summary: Summary = get_json(self.http.get(url)).await?;
        let mut hits = hits_from(summary);
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_url_joins_words() {
        let url = summary_url("black  hole").unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/api/rest_v1/page/summary/black_hole");
    }

    #[test]
    fn test_summary_url_encodes_non_ascii() {
        let url = summary_url("kuantum bilgisayar ş").unwrap();
        assert!(url.as_str().ends_with("kuantum_bilgisayar_%C5%9F"));
    }

    #[test]
    fn test_disambiguation_yields_nothing() {
        let summary: Summary = serde_json::from_str(
            r#"{"type": "disambiguation", "title": "Mercury", "extract": "Mercury may refer to:"}"#,
        )
        .unwrap();
        assert!(hits_from(summary).is_empty());
    }

    #[test]
    fn test_standard_page_is_one_hit() {
        let summary: Summary = serde_json::from_str(
            r#"{"type": "standard", "title": "Rust (programming language)", "extract": "Rust is a general-purpose programming language."}"#,
        )
        .unwrap();
        let hits = hits_from(summary);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source_id, "wikipedia:Rust (programming language)");
    }
}
