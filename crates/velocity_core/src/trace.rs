//! Reasoning trace.
//!
//! An ordered, structured record of what the engine did for one query:
//! which stages ran, which sources failed, where hypotheses forked or died.
//! Only enums, ids and counts, plus the elapsed time of an expired run, so two
//! runs against the same fake sources produce the same trace.

use crate::hypothesis::HypothesisId;
use crate::intent::DecisionType;
use crate::trust::SourceCategory;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceStep {
    Classified {
        decision_type: DecisionType,
        topic: String,
    },
    Routed {
        categories: Vec<SourceCategory>,
    },
    Generated {
        count: usize,
    },
    /// One query round for one hypothesis
    Round {
        hypothesis: HypothesisId,
        round: u32,
        new_evidence: usize,
        confidence: f64,
    },
    AdapterFailure {
        hypothesis: HypothesisId,
        category: SourceCategory,
        reason: String,
    },
    ContradictionRecorded {
        hypothesis: HypothesisId,
        divergence: f64,
        /// Set when the conflicting items belong to different hypotheses
        across: Option<HypothesisId>,
    },
    Fork {
        parent: HypothesisId,
        child: HypothesisId,
        divergence: f64,
    },
    ForkRefused {
        hypothesis: HypothesisId,
        live: usize,
    },
    DownWeighted {
        hypothesis: HypothesisId,
        source_id: String,
    },
    Eliminated {
        hypothesis: HypothesisId,
        confidence: f64,
    },
    Survived {
        hypothesis: HypothesisId,
        confidence: f64,
    },
    /// Least-bad hypothesis kept so synthesis has something to merge
    Revived {
        hypothesis: HypothesisId,
    },
    WallClockExpired {
        elapsed_ms: u64,
    },
    Synthesized {
        survivors: usize,
        evidence: usize,
        confidence: f64,
    },
    Formatted,
    FormatFallback {
        reason: String,
    },
}

impl std::fmt::Display for TraceStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classified { decision_type, topic } => {
                write!(f, "classified as {} (topic: {})", decision_type, topic)
            }
            Self::Routed { categories } => {
                let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
                write!(f, "routed to [{}]", names.join(", "))
            }
            Self::Generated { count } => write!(f, "generated {} hypotheses", count),
            Self::Round {
                hypothesis,
                round,
                new_evidence,
                confidence,
            } => write!(
                f,
                "{} round {}: +{} evidence, confidence {:.2}",
                hypothesis, round, new_evidence, confidence
            ),
            Self::AdapterFailure {
                hypothesis,
                category,
                reason,
            } => write!(f, "{} {} source failed: {}", hypothesis, category, reason),
            Self::ContradictionRecorded {
                hypothesis,
                divergence,
                across,
            } => match across {
                Some(other) => write!(
                    f,
                    "contradiction between {} and {} (divergence {:.2})",
                    hypothesis, other, divergence
                ),
                None => write!(
                    f,
                    "contradiction in {} (divergence {:.2})",
                    hypothesis, divergence
                ),
            },
            Self::Fork {
                parent,
                child,
                divergence,
            } => write!(f, "{} forked into {} (divergence {:.2})", parent, child, divergence),
            Self::ForkRefused { hypothesis, live } => {
                write!(f, "{} fork refused, {} hypotheses live", hypothesis, live)
            }
            Self::DownWeighted {
                hypothesis,
                source_id,
            } => write!(f, "{} down-weighted {}", hypothesis, source_id),
            Self::Eliminated {
                hypothesis,
                confidence,
            } => write!(f, "{} eliminated (confidence {:.2})", hypothesis, confidence),
            Self::Survived {
                hypothesis,
                confidence,
            } => write!(f, "{} survived (confidence {:.2})", hypothesis, confidence),
            Self::Revived { hypothesis } => write!(f, "{} revived as least-bad", hypothesis),
            Self::WallClockExpired { elapsed_ms } => {
                write!(f, "wall clock expired after {}ms", elapsed_ms)
            }
            Self::Synthesized {
                survivors,
                evidence,
                confidence,
            } => write!(
                f,
                "synthesized {} survivors, {} evidence, confidence {:.2}",
                survivors, evidence, confidence
            ),
            Self::Formatted => write!(f, "formatted answer"),
            Self::FormatFallback { reason } => write!(f, "formatter fallback: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_serializes_tagged() {
        let step = TraceStep::Fork {
            parent: HypothesisId(0),
            child: HypothesisId(2),
            divergence: 0.75,
        };
        let json = serde_json::to_string(&step).unwrap();
        assert!(json.contains("\"step\":\"fork\""));
        let back: TraceStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(
            TraceStep::Generated { count: 2 }.to_string(),
            "generated 2 hypotheses"
        );
        assert_eq!(
            TraceStep::Revived {
                hypothesis: HypothesisId(1)
            }
            .to_string(),
            "h1 revived as least-bad"
        );
    }
}
