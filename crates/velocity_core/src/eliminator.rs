//! Hypothesis elimination and ranking.

use crate::hypothesis::{Hypothesis, HypothesisArena, HypothesisId, HypothesisStatus};
use crate::trace::TraceStep;
use std::cmp::Ordering;
use tracing::debug;

pub const CONFIDENCE_FACTOR: f64 = 0.6;
pub const EVIDENCE_FACTOR: f64 = 0.3;
pub const COST_FACTOR: f64 = 0.1;

/// Survivors in rank order plus the eliminated set
#[derive(Debug, Clone, Default)]
pub struct Elimination {
    pub survivors: Vec<HypothesisId>,
    pub eliminated: Vec<HypothesisId>,
    pub trace: Vec<TraceStep>,
}

/// Normalisers for the multi-factor score, taken over the whole arena
#[derive(Debug, Clone, Copy)]
struct Scale {
    max_evidence: usize,
    max_cost: f64,
}

impl Scale {
    fn of(arena: &HypothesisArena) -> Self {
        Self {
            max_evidence: arena.iter().map(|h| h.evidence.len()).max().unwrap_or(0),
            max_cost: arena.iter().map(|h| h.cost_used).fold(0.0, f64::max),
        }
    }
}

fn normalized(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn score(h: &Hypothesis, scale: Scale) -> f64 {
    h.confidence * CONFIDENCE_FACTOR
        + normalized(h.evidence.len() as f64, scale.max_evidence as f64) * EVIDENCE_FACTOR
        - normalized(h.cost_used, scale.max_cost) * COST_FACTOR
}

/// `confidence * 0.6 + evidence_count_norm * 0.3 - cost_norm * 0.1`, with
/// counts and costs normalised by the arena maximum
pub fn multi_factor_score(h: &Hypothesis, arena: &HypothesisArena) -> f64 {
    score(h, Scale::of(arena))
}

/// Descending score, then lower cost, then earlier creation
fn rank(a: (&Hypothesis, f64), b: (&Hypothesis, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then(a.0.cost_used.total_cmp(&b.0.cost_used))
        .then(a.0.id.cmp(&b.0.id))
}

/// Settle every hypothesis into SURVIVED or ELIMINATED and rank survivors.
///
/// Hypotheses still ACTIVE have run out of rounds; they are eliminated when
/// their confidence is below `min_confidence`. If nothing survives, the
/// least-bad hypothesis is revived, preferring ones that hold evidence.
pub fn eliminate(arena: &mut HypothesisArena, min_confidence: f64) -> Elimination {
    let mut result = Elimination::default();

    for h in arena.iter_mut() {
        if h.status == HypothesisStatus::Active {
            h.status = if h.confidence < min_confidence {
                HypothesisStatus::Eliminated
            } else {
                HypothesisStatus::Survived
            };
        }
    }

    let scale = Scale::of(arena);
    let mut survivors: Vec<(&Hypothesis, f64)> = arena
        .iter()
        .filter(|h| h.status == HypothesisStatus::Survived)
        .map(|h| (h, score(h, scale)))
        .collect();
    survivors.sort_by(|a, b| rank(*a, *b));

    let mut revived = None;
    if survivors.is_empty() {
        let mut candidates: Vec<(&Hypothesis, f64)> =
            arena.iter().map(|h| (h, score(h, scale))).collect();
        candidates.sort_by(|a, b| {
            a.0.evidence
                .is_empty()
                .cmp(&b.0.evidence.is_empty())
                .then(rank(*a, *b))
        });
        revived = candidates.first().map(|(h, _)| h.id);
    }
    result.survivors = survivors.iter().map(|(h, _)| h.id).collect();

    if let Some(id) = revived {
        if let Some(h) = arena.get_mut(id) {
            debug!("No survivors, reviving {}", id);
            h.status = HypothesisStatus::Survived;
        }
        result.survivors.push(id);
        result.trace.push(TraceStep::Revived { hypothesis: id });
    }

    for h in arena.iter() {
        match h.status {
            HypothesisStatus::Eliminated => {
                result.eliminated.push(h.id);
                result.trace.push(TraceStep::Eliminated {
                    hypothesis: h.id,
                    confidence: h.confidence,
                });
            }
            _ => result.trace.push(TraceStep::Survived {
                hypothesis: h.id,
                confidence: h.confidence,
            }),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{Evidence, SourceHit};
    use crate::trust::SourceCategory;

    fn with_evidence(focus: &str, items: usize, trust: f64, cost: f64) -> Hypothesis {
        let mut h = Hypothesis::new(HypothesisId(0), focus.into(), vec![]);
        for i in 0..items {
            h.evidence.push(Evidence::from_hit(
                SourceHit::new(&format!("{}:{}", focus, i), "content"),
                SourceCategory::Encyclopedic,
                trust,
                1.0,
            ));
        }
        h.cost_used = cost;
        h.iterations_used = 3;
        h.recompute_confidence();
        h
    }

    #[test]
    fn test_low_confidence_is_eliminated() {
        let mut arena = HypothesisArena::new();
        arena.push(with_evidence("a", 2, 0.9, 2.0));
        arena.push(with_evidence("b", 2, 0.1, 2.0));

        let result = eliminate(&mut arena, 0.3);
        assert_eq!(result.survivors, vec![HypothesisId(0)]);
        assert_eq!(result.eliminated, vec![HypothesisId(1)]);
    }

    #[test]
    fn test_least_bad_is_revived() {
        let mut arena = HypothesisArena::new();
        arena.push(with_evidence("a", 0, 0.0, 1.0));
        arena.push(with_evidence("b", 1, 0.2, 1.0));

        let result = eliminate(&mut arena, 0.3);
        assert_eq!(result.survivors, vec![HypothesisId(1)]);
        assert_eq!(arena.get(HypothesisId(1)).unwrap().status, HypothesisStatus::Survived);
        assert!(result.trace.contains(&TraceStep::Revived { hypothesis: HypothesisId(1) }));
    }

    #[test]
    fn test_ties_break_on_cost_then_creation() {
        let mut arena = HypothesisArena::new();
        arena.push(with_evidence("a", 1, 0.8, 2.0));
        arena.push(with_evidence("b", 1, 0.8, 2.0));
        arena.push(with_evidence("c", 1, 0.8, 2.0));

        let result = eliminate(&mut arena, 0.3);
        assert_eq!(result.survivors, vec![HypothesisId(0), HypothesisId(1), HypothesisId(2)]);
    }
}
