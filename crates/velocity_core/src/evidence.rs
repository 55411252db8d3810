//! Evidence records and the confidence function.

use crate::trust::SourceCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One raw result returned by a source adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceHit {
    pub content: String,
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
}

impl SourceHit {
    pub fn new(source_id: &str, content: &str) -> Self {
        Self {
            content: content.to_string(),
            source_id: source_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// A piece of retrieved content tagged with trust and relevance.
/// Appended to a hypothesis and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: Uuid,
    pub content: String,
    pub source_id: String,
    pub category: SourceCategory,
    pub trust_weight: f64,
    pub relevance_score: f64,
    pub timestamp: DateTime<Utc>,
}

impl Evidence {
    pub fn from_hit(
        hit: SourceHit,
        category: SourceCategory,
        trust_weight: f64,
        relevance_score: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: hit.content,
            source_id: hit.source_id,
            category,
            trust_weight: trust_weight.clamp(0.0, 1.0),
            relevance_score: relevance_score.clamp(0.0, 1.0),
            timestamp: hit.timestamp,
        }
    }

    /// Trust-weighted relevance of this item
    pub fn weight(&self) -> f64 {
        self.trust_weight * self.relevance_score
    }
}

/// Confidence of an evidence set: mean of trust × relevance, each item scaled
/// by its discount (1.0 unless down-weighted). Always within [0, 1].
pub fn confidence_of(evidence: &[Evidence], discounts: &BTreeMap<Uuid, f64>) -> f64 {
    if evidence.is_empty() {
        return 0.0;
    }
    let total: f64 = evidence
        .iter()
        .map(|e| e.weight() * discounts.get(&e.id).copied().unwrap_or(1.0))
        .sum();
    (total / evidence.len() as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(trust: f64, relevance: f64) -> Evidence {
        Evidence::from_hit(
            SourceHit::new("test:1", "content"),
            SourceCategory::Encyclopedic,
            trust,
            relevance,
        )
    }

    #[test]
    fn test_empty_evidence_has_zero_confidence() {
        assert_eq!(confidence_of(&[], &BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_confidence_is_mean_weight() {
        let evidence = vec![item(0.8, 1.0), item(0.5, 0.4)];
        let c = confidence_of(&evidence, &BTreeMap::new());
        assert!((c - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_discount_lowers_confidence() {
        let evidence = vec![item(1.0, 1.0), item(1.0, 1.0)];
        let mut discounts = BTreeMap::new();
        discounts.insert(evidence[1].id, 0.5);
        let c = confidence_of(&evidence, &discounts);
        assert!((c - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let e = item(1.4, -0.2);
        assert_eq!(e.trust_weight, 1.0);
        assert_eq!(e.relevance_score, 0.0);
    }
}
