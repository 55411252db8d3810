//! HTTP source adapters.
//!
//! One adapter per source category, all sharing a single `reqwest` client.
//! Every failure maps onto `AdapterError`; the engine treats those as
//! "zero evidence" and keeps going.

mod duckduckgo;
mod github;
mod reddit;
mod stackexchange;
mod wikipedia;

pub use duckduckgo::DuckDuckGoAdapter;
pub use github::GitHubAdapter;
pub use reddit::RedditAdapter;
pub use stackexchange::StackExchangeAdapter;
pub use wikipedia::WikipediaAdapter;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use velocity_core::{AdapterError, AdapterRegistry, SourceCategory};

/// Sent with every request; several APIs reject anonymous clients
pub const USER_AGENT: &str = concat!(
    "Velocity/",
    env!("CARGO_PKG_VERSION"),
    " (epistemic research engine; +https://github.com/velocity-nnei/velocity)"
);

/// Column width handed to html2text before whitespace is collapsed
const HTML_WIDTH: usize = 1000;

pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// Registry with a live adapter for every source category
pub fn registry(http: reqwest::Client) -> AdapterRegistry {
    AdapterRegistry::new()
        .with(Arc::new(WikipediaAdapter::new(http.clone())))
        .with(Arc::new(StackExchangeAdapter::new(http.clone())))
        .with(Arc::new(GitHubAdapter::new(http.clone())))
        .with(Arc::new(RedditAdapter::new(http.clone())))
        .with(Arc::new(DuckDuckGoAdapter::new(http.clone(), SourceCategory::FormalDocs)))
        .with(Arc::new(DuckDuckGoAdapter::new(http.clone(), SourceCategory::News)))
        .with(Arc::new(DuckDuckGoAdapter::new(http, SourceCategory::General)))
}

fn transport(e: reqwest::Error) -> AdapterError {
    if e.is_timeout() {
        AdapterError::Timeout
    } else {
        AdapterError::Transport(e.to_string())
    }
}

/// Send a request and decode its JSON body. 404 counts as "nothing found".
async fn get_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, AdapterError> {
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AdapterError::Empty);
    }
    if !status.is_success() {
        return Err(AdapterError::Transport(format!("HTTP {}", status)));
    }
    debug!("GET {} -> {}", response.url(), status);
    response
        .json::<T>()
        .await
        .map_err(|e| AdapterError::Malformed(e.to_string()))
}

/// Plain text of an HTML fragment on a single line
pub fn strip_html(html: &str) -> String {
    let text = html2text::from_read(html.as_bytes(), HTML_WIDTH);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters on a word boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(pos) if pos > 0 => format!("{}...", cut[..pos].trim_end()),
        _ => format!("{}...", cut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_removes_markup() {
        let text = strip_html("<span class=\"highlight\">Rust</span> ownership\n\n  and <b>borrowing</b>");
        assert!(!text.contains('<'));
        assert!(text.contains("ownership"));
        assert!(text.contains("borrowing"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_truncate_on_word_boundary() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("one two three four", 10), "one two...");
    }

    #[test]
    fn test_registry_covers_every_category() {
        let registry = registry(reqwest::Client::new());
        for category in SourceCategory::ALL {
            assert!(registry.contains(category), "missing {}", category);
        }
    }
}
