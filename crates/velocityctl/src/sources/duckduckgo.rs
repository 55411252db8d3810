//! DuckDuckGo instant answer adapter.
//!
//! Registered once per category it serves (FORMAL_DOCS, NEWS, GENERAL); the
//! category only changes how the engine weighs the results.

use super::get_json;
use async_trait::async_trait;
use serde::Deserialize;
use velocity_core::{AdapterError, SourceAdapter, SourceCategory, SourceHit};

const API_URL: &str = "https://api.duckduckgo.com/";

/// Abstracts shorter than this are usually bare titles
const MIN_ABSTRACT_CHARS: usize = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic or a named group of topics
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "FirstURL")]
    first_url: String,
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

pub struct DuckDuckGoAdapter {
    http: reqwest::Client,
    category: SourceCategory,
}

impl DuckDuckGoAdapter {
    pub fn new(http: reqwest::Client, category: SourceCategory) -> Self {
        Self { http, category }
    }
}

fn flatten<'a>(topics: &'a [RelatedTopic], out: &mut Vec<&'a RelatedTopic>) {
    for topic in topics {
        if topic.topics.is_empty() {
            out.push(topic);
        } else {
            flatten(&topic.topics, out);
        }
    }
}

fn hits_from(answer: &InstantAnswer, max_results: usize) -> Vec<SourceHit> {
    let mut hits = Vec::new();
    if answer.abstract_text.chars().count() > MIN_ABSTRACT_CHARS {
        let id = if answer.abstract_url.is_empty() {
            &answer.heading
        } else {
            &answer.abstract_url
        };
        hits.push(SourceHit::new(&format!("duckduckgo:{}", id), &answer.abstract_text));
    }

    let mut related = Vec::new();
    flatten(&answer.related_topics, &mut related);
    for topic in related {
        if hits.len() >= max_results {
            break;
        }
        if topic.text.trim().is_empty() || topic.first_url.is_empty() {
            continue;
        }
        hits.push(SourceHit::new(&format!("duckduckgo:{}", topic.first_url), &topic.text));
    }
    hits.truncate(max_results);
    hits
}

#[async_trait]
impl SourceAdapter for DuckDuckGoAdapter {
    fn category(&self) -> SourceCategory {
        self.category
    }

    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError> {
        let request = self.http.get(API_URL).query(&[
            ("q", text),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ]);
        let answer: InstantAnswer = get_json(request).await?;
        Ok(hits_from(&answer, max_results))
    }
}
