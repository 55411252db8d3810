//! Source categories and the trust table.
//!
//! The trust table is built once from configuration and shared read-only
//! (behind an `Arc`) by every component of a query run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of external knowledge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Encyclopedic,
    CodeRepository,
    QaSite,
    Forum,
    FormalDocs,
    News,
    /// Best-effort generic web search, used when routing finds nothing better
    General,
}

impl SourceCategory {
    pub const ALL: [SourceCategory; 7] = [
        Self::Encyclopedic,
        Self::CodeRepository,
        Self::QaSite,
        Self::Forum,
        Self::FormalDocs,
        Self::News,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encyclopedic => "encyclopedic",
            Self::CodeRepository => "code_repository",
            Self::QaSite => "qa_site",
            Self::Forum => "forum",
            Self::FormalDocs => "formal_docs",
            Self::News => "news",
            Self::General => "general",
        }
    }

    /// Cost and freshness heuristics for this category
    pub fn profile(&self) -> CategoryProfile {
        match self {
            Self::Encyclopedic => CategoryProfile::new(1.0, 0.3, 3),
            Self::CodeRepository => CategoryProfile::new(1.5, 0.6, 3),
            Self::QaSite => CategoryProfile::new(1.2, 0.5, 3),
            Self::Forum => CategoryProfile::new(1.0, 0.7, 3),
            Self::FormalDocs => CategoryProfile::new(1.0, 0.4, 3),
            Self::News => CategoryProfile::new(1.3, 1.0, 3),
            Self::General => CategoryProfile::new(0.8, 0.5, 2),
        }
    }

    fn default_trust(&self) -> f64 {
        match self {
            Self::Encyclopedic => 0.85,
            Self::CodeRepository => 0.75,
            Self::QaSite => 0.7,
            Self::Forum => 0.5,
            Self::FormalDocs => 0.9,
            Self::News => 0.6,
            Self::General => 0.4,
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SourceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .copied()
            .ok_or_else(|| format!("unknown source category '{}'", s))
    }
}

/// Static per-category heuristics used by the router.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    /// Relative cost of one query against this category
    pub cost_weight: f64,
    /// How current the category's content tends to be, in [0, 1]
    pub freshness: f64,
    /// Default number of queries a hypothesis may issue to this category
    pub max_queries: u32,
}

impl CategoryProfile {
    const fn new(cost_weight: f64, freshness: f64, max_queries: u32) -> Self {
        Self {
            cost_weight,
            freshness,
            max_queries,
        }
    }
}

/// Mapping of source category to trust weight in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustTable {
    weights: BTreeMap<SourceCategory, f64>,
}

impl Default for TrustTable {
    fn default() -> Self {
        Self {
            weights: SourceCategory::ALL
                .iter()
                .map(|c| (*c, c.default_trust()))
                .collect(),
        }
    }
}

impl TrustTable {
    /// Built-in table with configured overrides merged on top
    pub fn with_overrides(overrides: &BTreeMap<SourceCategory, f64>) -> Self {
        let mut table = Self::default();
        for (category, weight) in overrides {
            table.weights.insert(*category, weight.clamp(0.0, 1.0));
        }
        table
    }

    pub fn weight(&self, category: SourceCategory) -> f64 {
        self.weights
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_trust())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceCategory, f64)> + '_ {
        self.weights.iter().map(|(c, w)| (*c, *w))
    }
}
