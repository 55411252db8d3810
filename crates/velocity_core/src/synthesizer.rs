//! State synthesizer: merges surviving hypotheses into one result.

use crate::evidence::Evidence;
use crate::hypothesis::{HypothesisArena, HypothesisId};
use crate::text::{clean, dedup_sentences, segment_sentences};
use crate::trace::TraceStep;
use crate::trust::SourceCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Summary used when no survivor holds any evidence
pub const INSUFFICIENT_EVIDENCE: &str = "Insufficient evidence to reach a decision.";

/// Number of key facts extracted from the merged evidence
pub const MAX_KEY_FACTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Uncertainty {
    Low,
    Medium,
    High,
    VeryHigh,
    Unknown,
}

impl Uncertainty {
    /// Step function of confidence and the number of distinct source categories
    pub fn assess(confidence: f64, categories: usize, has_evidence: bool) -> Self {
        if !has_evidence {
            Self::Unknown
        } else if confidence < 0.2 {
            Self::VeryHigh
        } else if confidence >= 0.7 && categories >= 2 {
            Self::Low
        } else if confidence >= 0.4 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for Uncertainty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very high",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Final record of one query run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub decision_summary: String,
    pub confidence: f64,
    pub uncertainty: Uncertainty,
    /// Merged evidence of all survivors, deduplicated by source id
    pub evidence: Vec<Evidence>,
    pub source_breakdown: BTreeMap<SourceCategory, usize>,
    pub reasoning_trace: Vec<TraceStep>,
    pub key_facts: Vec<String>,
    /// Formatter output; `decision_summary` is never replaced by it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_answer: Option<String>,
}

impl ExecutionResult {
    /// Result for a run that gathered nothing
    pub fn insufficient(reasoning_trace: Vec<TraceStep>) -> Self {
        Self {
            decision_summary: INSUFFICIENT_EVIDENCE.to_string(),
            confidence: 0.0,
            uncertainty: Uncertainty::Unknown,
            evidence: Vec::new(),
            source_breakdown: BTreeMap::new(),
            reasoning_trace,
            key_facts: Vec::new(),
            natural_answer: None,
        }
    }

    pub fn confidence_label(&self) -> &'static str {
        if self.confidence >= 0.8 {
            "High"
        } else if self.confidence >= 0.55 {
            "Moderate"
        } else if self.confidence >= 0.3 {
            "Low"
        } else {
            "Very Low"
        }
    }

    /// Formatted answer when available, else the raw summary
    pub fn answer(&self) -> &str {
        self.natural_answer.as_deref().unwrap_or(&self.decision_summary)
    }
}

/// Sentences of `evidence`, most relevant item first, cleaned and deduplicated
fn sentences_of<'a, I>(evidence: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Evidence>,
{
    let mut items: Vec<&Evidence> = evidence.into_iter().collect();
    items.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    dedup_sentences(items.iter().flat_map(|e| segment_sentences(&clean(&e.content))))
}

/// Merge `survivors` (in rank order) into a result.
pub fn synthesize(arena: &HypothesisArena, survivors: &[HypothesisId], summary_sentences: usize) -> ExecutionResult {
    let ranked: Vec<_> = survivors
        .iter()
        .filter_map(|id| arena.get(*id))
        .filter(|h| !h.evidence.is_empty())
        .collect();

    let Some(top) = ranked.first() else {
        return ExecutionResult::insufficient(vec![TraceStep::Synthesized {
            survivors: survivors.len(),
            evidence: 0,
            confidence: 0.0,
        }]);
    };

    // A lone survivor keeps its own confidence exactly
    let confidence = if ranked.len() == 1 {
        top.confidence
    } else {
        let total: usize = ranked.iter().map(|h| h.evidence.len()).sum();
        let weighted: f64 = ranked
            .iter()
            .map(|h| h.confidence * h.evidence.len() as f64)
            .sum();
        (weighted / total as f64).clamp(0.0, 1.0)
    };

    let mut seen = HashSet::new();
    let evidence: Vec<Evidence> = ranked
        .iter()
        .flat_map(|h| h.evidence.iter())
        .filter(|e| seen.insert(e.source_id.clone()))
        .cloned()
        .collect();

    let mut source_breakdown = BTreeMap::new();
    for e in &evidence {
        *source_breakdown.entry(e.category).or_insert(0) += 1;
    }
    let categories: BTreeSet<SourceCategory> = evidence.iter().map(|e| e.category).collect();

    let mut summary = sentences_of(&top.evidence);
    summary.truncate(summary_sentences);
    let decision_summary = if summary.is_empty() {
        // Fragments too short to count as sentences: keep the best raw text
        let mut items: Vec<&Evidence> = top.evidence.iter().collect();
        items.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        items
            .iter()
            .map(|e| clean(&e.content))
            .find(|c| !c.is_empty())
            .unwrap_or_else(|| INSUFFICIENT_EVIDENCE.to_string())
    } else {
        summary.join(" ")
    };

    let mut key_facts = sentences_of(&evidence);
    key_facts.truncate(MAX_KEY_FACTS);

    ExecutionResult {
        decision_summary,
        confidence,
        uncertainty: Uncertainty::assess(confidence, categories.len(), true),
        reasoning_trace: vec![TraceStep::Synthesized {
            survivors: survivors.len(),
            evidence: evidence.len(),
            confidence,
        }],
        evidence,
        source_breakdown,
        key_facts,
        natural_answer: None,
    }
}
