//! GitHub repository search adapter (CODE_REPOSITORY).

use super::get_json;
use async_trait::async_trait;
use serde::Deserialize;
use velocity_core::{AdapterError, SourceAdapter, SourceCategory, SourceHit};

const API_URL: &str = "https://api.github.com/search/repositories";

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Repository>,
}

#[derive(Debug, Deserialize)]
struct Repository {
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
}

impl Repository {
    fn summary(&self) -> Option<String> {
        let description = self.description.as_deref()?.trim();
        if description.is_empty() {
            return None;
        }
        let mut text = format!("{}: {}", self.full_name, description);
        if !text.ends_with('.') {
            text.push('.');
        }
        match &self.language {
            Some(language) => text.push_str(&format!(
                " Written in {} with {} stars.",
                language, self.stargazers_count
            )),
            None => text.push_str(&format!(" {} stars.", self.stargazers_count)),
        }
        Some(text)
    }
}

pub struct GitHubAdapter {
    http: reqwest::Client,
}

impl GitHubAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn hits_from(page: SearchPage, max_results: usize) -> Vec<SourceHit> {
    page.items
        .iter()
        .filter_map(|repo| {
            repo.summary()
                .map(|text| SourceHit::new(&format!("github:{}", repo.full_name), &text))
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl SourceAdapter for GitHubAdapter {
    fn category(&self) -> SourceCategory {
        SourceCategory::CodeRepository
    }

    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError> {
        let per_page = max_results.to_string();
        let request = self
            .http
            .get(API_URL)
            .header("Accept", "application/vnd.github+json")
            .query(&[("q", text), ("sort", "stars"), ("per_page", per_page.as_str())]);
        let page: SearchPage = get_json(request).await?;
        Ok(hits_from(page, max_results))
    }
}
