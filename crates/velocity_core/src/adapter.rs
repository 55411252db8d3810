//! Source adapter seam.
//!
//! The engine never talks to the network directly. Each source category is
//! served by one [`SourceAdapter`] registered in an [`AdapterRegistry`];
//! production adapters live in the CLI crate, and [`StaticSourceAdapter`]
//! provides scripted responses for deterministic tests.

use crate::error::AdapterError;
use crate::evidence::SourceHit;
use crate::trust::SourceCategory;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Source Adapter Trait
// ============================================================================

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Category this adapter serves
    fn category(&self) -> SourceCategory;

    /// Query the source. An empty result set is `Ok(vec![])` or
    /// `Err(AdapterError::Empty)`; the scheduler treats both the same.
    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError>;
}

/// Lookup table from category to adapter
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<SourceCategory, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own category, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.category(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, category: SourceCategory) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&category).cloned()
    }

    pub fn contains(&self, category: SourceCategory) -> bool {
        self.adapters.contains_key(&category)
    }

    pub fn categories(&self) -> Vec<SourceCategory> {
        let mut categories: Vec<_> = self.adapters.keys().copied().collect();
        categories.sort();
        categories
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("categories", &self.categories())
            .finish()
    }
}

// ============================================================================
// Static Source Adapter (Testing)
// ============================================================================

type Scripted = Result<Vec<SourceHit>, AdapterError>;

/// Adapter with pre-configured responses, for tests and offline demos.
///
/// Scripted responses are consumed one per call in order; once the script is
/// exhausted every call returns the fallback response.
///
/// ```rust,ignore
/// let wiki = StaticSourceAdapterBuilder::new(SourceCategory::Encyclopedic)
///     .hit("wiki:rust", "Rust is a systems programming language.")
///     .delay(Duration::from_millis(50))
///     .build();
/// ```
pub struct StaticSourceAdapter {
    category: SourceCategory,
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    delay: Option<Duration>,
    /// Query texts received, in call order
    calls: Arc<Mutex<Vec<String>>>,
}

impl StaticSourceAdapter {
    /// Adapter that always returns `hits`
    pub fn returning(category: SourceCategory, hits: Vec<SourceHit>) -> Self {
        StaticSourceAdapterBuilder::new(category).hits(hits).build()
    }

    /// Adapter whose every call fails with `error`
    pub fn failing(category: SourceCategory, error: AdapterError) -> Self {
        StaticSourceAdapterBuilder::new(category)
            .fallback_error(error)
            .build()
    }

    /// Number of calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Query texts received so far
    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Shared handle to the call log, usable after the adapter moved into a registry
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    fn next_response(&self) -> Scripted {
        let scripted = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        scripted.unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl SourceAdapter for StaticSourceAdapter {
    fn category(&self) -> SourceCategory {
        self.category
    }

    async fn query(&self, text: &str, max_results: usize) -> Result<Vec<SourceHit>, AdapterError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
        let response = self.next_response();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response.map(|mut hits| {
            hits.truncate(max_results);
            hits
        })
    }
}

/// Builder for StaticSourceAdapter
pub struct StaticSourceAdapterBuilder {
    category: SourceCategory,
    script: VecDeque<Scripted>,
    fallback: Scripted,
    delay: Option<Duration>,
}

impl StaticSourceAdapterBuilder {
    /// New builder whose fallback is an empty result set
    pub fn new(category: SourceCategory) -> Self {
        Self {
            category,
            script: VecDeque::new(),
            fallback: Ok(Vec::new()),
            delay: None,
        }
    }

    /// Add one hit to the fallback response
    pub fn hit(mut self, source_id: &str, content: &str) -> Self {
        if let Ok(hits) = &mut self.fallback {
            hits.push(SourceHit::new(source_id, content));
        } else {
            self.fallback = Ok(vec![SourceHit::new(source_id, content)]);
        }
        self
    }

    /// Replace the fallback response with `hits`
    pub fn hits(mut self, hits: Vec<SourceHit>) -> Self {
        self.fallback = Ok(hits);
        self
    }

    pub fn fallback_error(mut self, error: AdapterError) -> Self {
        self.fallback = Err(error);
        self
    }

    /// Queue a response for the next unscripted call
    pub fn then(mut self, response: Result<Vec<SourceHit>, AdapterError>) -> Self {
        self.script.push_back(response);
        self
    }

    /// Delay every response, to exercise timeouts
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn build(self) -> StaticSourceAdapter {
        StaticSourceAdapter {
            category: self.category,
            script: Mutex::new(self.script),
            fallback: self.fallback,
            delay: self.delay,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
