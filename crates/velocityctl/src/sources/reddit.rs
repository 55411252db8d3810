//! Reddit search adapter (FORUM).

use super::{get_json, truncate_chars};
use async_trait::async_trait;
use serde::Deserialize;
use velocity_core::{AdapterError, SourceAdapter, SourceCategory, SourceHit};

const SEARCH_URL: &str = "https://www.reddit.com/search.json";

/// Self posts can be very long; keep the opening
const MAX_POST_CHARS: usize = 600;

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    over_18: bool,
}

pub struct RedditAdapter {
    http: reqwest::Client,
}

impl RedditAdapter {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn hits_from(listing: Listing, max_results: usize) -> Vec<SourceHit> {
    listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .filter(|post| !post.over_18 && !post.title.trim().is_empty())
        .map(|post| {
            let body = truncate_chars(post.selftext.trim(), MAX_POST_CHARS);
            let content = if body.is_empty() {
                post.title.clone()
            } else if post.title.ends_with(['.', '?', '!']) {
                format!("{} {}", post.title, body)
            } else {
                format!("{}. {}", post.title, body)
            };
            SourceHit::new(&format!("reddit:r/{}/{}", post.subreddit, post.id), &content)
        })
        .take(max_results)
        .collect()
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn category(&self) -> SourceCategory {
        SourceCategory::Forum
    }

    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError> {
        let limit = max_results.to_string();
        let request = self
            .http
            .get(SEARCH_URL)
            .query(&[("q", text), ("sort", "relevance"), ("limit", limit.as_str())]);
        let listing: Listing = get_json(request).await?;
        Ok(hits_from(listing, max_results))
    }
}
