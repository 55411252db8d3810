//! Contradiction detection and resolution.
//!
//! Two evidence items conflict when both are strongly on-topic but share
//! almost no other vocabulary: they discuss the same thing and say different
//! things about it.
//!
//! - semantic overlap: Jaccard similarity of the items' keywords, with the
//!   hypothesis focus keywords removed
//! - topical match: the lower of the two items' relevance scores
//! - divergence: `topical * (1 - overlap)`
//!
//! Only pairs involving at least one item added since the last inspection are
//! checked, and each hypothesis yields at most one within-hypothesis record
//! per round (the most divergent pair).

use crate::config::ContradictionConfig;
use crate::evidence::Evidence;
use crate::hypothesis::{HypothesisArena, HypothesisId, HypothesisStatus};
use crate::relevance::RelevanceScorer;
use crate::text::jaccard;
use crate::trace::TraceStep;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictScope {
    /// Both items belong to `hypothesis_id`
    Within,
    /// The second item belongs to another hypothesis; recorded for the trace only
    Across(HypothesisId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionRecord {
    pub hypothesis_id: HypothesisId,
    pub conflicting_evidence_ids: BTreeSet<Uuid>,
    pub divergence_score: f64,
    pub scope: ConflictScope,
}

/// What resolution did to the arena
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub trace: Vec<TraceStep>,
    /// (parent, child) for every fork performed
    pub forks: Vec<(HypothesisId, HypothesisId)>,
    /// Hypotheses whose evidence or discounts changed
    pub touched: Vec<HypothesisId>,
}

pub struct ContradictionDetector {
    scorer: Arc<dyn RelevanceScorer>,
    config: ContradictionConfig,
}

impl ContradictionDetector {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, config: ContradictionConfig) -> Self {
        Self { scorer, config }
    }

    /// Keywords of an item beyond the ones it shares with the focus
    fn claim_keywords(&self, content: &str, focus: &BTreeSet<String>) -> BTreeSet<String> {
        self.scorer
            .keywords(content)
            .into_iter()
            .filter(|k| !focus.contains(k))
            .collect()
    }

    /// Divergence of two items if they conflict
    fn divergence(&self, a: (&Evidence, &BTreeSet<String>), b: (&Evidence, &BTreeSet<String>)) -> Option<f64> {
        if a.1.is_empty() || b.1.is_empty() {
            return None;
        }
        let overlap = jaccard(a.1, b.1);
        let topical = a.0.relevance_score.min(b.0.relevance_score);
        if overlap < self.config.overlap_low && topical > self.config.topical_high {
            Some(topical * (1.0 - overlap))
        } else {
            None
        }
    }

    /// Find conflicts among not-eliminated hypotheses with uninspected evidence
    pub fn detect(&self, arena: &HypothesisArena) -> Vec<ContradictionRecord> {
        let mut records = Vec::new();

        let candidates: Vec<_> = arena
            .iter()
            .filter(|h| h.status != HypothesisStatus::Eliminated)
            .collect();
        let keywords: HashMap<HypothesisId, Vec<BTreeSet<String>>> = candidates
            .iter()
            .map(|h| {
                let focus = self.scorer.keywords(&h.focus);
                let kws = h
                    .evidence
                    .iter()
                    .map(|e| self.claim_keywords(&e.content, &focus))
                    .collect();
                (h.id, kws)
            })
            .collect();

        for h in &candidates {
            let Some(kws) = keywords.get(&h.id) else { continue };
            let mut best: Option<(usize, usize, f64)> = None;
            for j in h.inspected..h.evidence.len() {
                for i in 0..j {
                    let Some(d) = self.divergence((&h.evidence[i], &kws[i]), (&h.evidence[j], &kws[j])) else {
                        continue;
                    };
                    if best.map_or(true, |(_, _, top)| d > top) {
                        best = Some((i, j, d));
                    }
                }
            }
            if let Some((i, j, d)) = best {
                records.push(ContradictionRecord {
                    hypothesis_id: h.id,
                    conflicting_evidence_ids: [h.evidence[i].id, h.evidence[j].id].into_iter().collect(),
                    divergence_score: d,
                    scope: ConflictScope::Within,
                });
            }
        }

        // Across hypotheses: new items of `a` against everything in `b`
        for a in &candidates {
            let Some(akw) = keywords.get(&a.id) else { continue };
            for b in &candidates {
                if a.id == b.id || a.focus != b.focus {
                    continue;
                }
                let Some(bkw) = keywords.get(&b.id) else { continue };
                let mut best: Option<(Uuid, Uuid, f64)> = None;
                for i in a.inspected..a.evidence.len() {
                    for j in 0..b.evidence.len() {
                        if j >= b.inspected && b.id < a.id {
                            // Already compared from b's side
                            continue;
                        }
                        if a.evidence[i].source_id == b.evidence[j].source_id {
                            continue;
                        }
                        let Some(d) = self.divergence((&a.evidence[i], &akw[i]), (&b.evidence[j], &bkw[j])) else {
                            continue;
                        };
                        if best.map_or(true, |(_, _, top)| d > top) {
                            best = Some((a.evidence[i].id, b.evidence[j].id, d));
                        }
                    }
                }
                if let Some((x, y, d)) = best {
                    records.push(ContradictionRecord {
                        hypothesis_id: a.id,
                        conflicting_evidence_ids: [x, y].into_iter().collect(),
                        divergence_score: d,
                        scope: ConflictScope::Across(b.id),
                    });
                }
            }
        }

        records
    }

    /// Apply the fork / down-weight policy, then mark all evidence inspected.
    pub fn resolve(
        &self,
        arena: &mut HypothesisArena,
        records: &[ContradictionRecord],
        max_hypotheses: usize,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        for record in records {
            let across = match record.scope {
                ConflictScope::Within => None,
                ConflictScope::Across(other) => Some(other),
            };
            resolution.trace.push(TraceStep::ContradictionRecorded {
                hypothesis: record.hypothesis_id,
                divergence: record.divergence_score,
                across,
            });
            if across.is_some() || record.divergence_score <= self.config.fork_threshold {
                continue;
            }

            let live = arena.live_count();
            if live < max_hypotheses {
                if let Some(child) = self.fork(arena, record) {
                    info!(
                        "{} forked into {} (divergence {:.2})",
                        record.hypothesis_id, child, record.divergence_score
                    );
                    resolution.trace.push(TraceStep::Fork {
                        parent: record.hypothesis_id,
                        child,
                        divergence: record.divergence_score,
                    });
                    resolution.forks.push((record.hypothesis_id, child));
                    resolution.touched.push(record.hypothesis_id);
                    resolution.touched.push(child);
                }
            } else {
                debug!("{} fork refused at {} live hypotheses", record.hypothesis_id, live);
                resolution.trace.push(TraceStep::ForkRefused {
                    hypothesis: record.hypothesis_id,
                    live,
                });
                if let Some(source_id) = self.down_weight(arena, record) {
                    resolution.trace.push(TraceStep::DownWeighted {
                        hypothesis: record.hypothesis_id,
                        source_id,
                    });
                    resolution.touched.push(record.hypothesis_id);
                }
            }
        }

        for h in arena.iter_mut() {
            h.inspected = h.evidence.len();
        }
        resolution
    }

    /// Split the evidence of a hypothesis between itself and a new branch.
    /// Items closer to the first conflicting item stay, items closer to the
    /// second move to the branch, neutral items go to both.
    fn fork(&self, arena: &mut HypothesisArena, record: &ContradictionRecord) -> Option<HypothesisId> {
        let (keep, branch) = {
            let h = arena.get(record.hypothesis_id)?;
            let mut sides: Vec<usize> = h
                .evidence
                .iter()
                .enumerate()
                .filter(|(_, e)| record.conflicting_evidence_ids.contains(&e.id))
                .map(|(i, _)| i)
                .collect();
            if sides.len() != 2 {
                return None;
            }
            sides.sort_unstable();
            let (a, b) = (sides[0], sides[1]);

            let focus = self.scorer.keywords(&h.focus);
            let kws: Vec<BTreeSet<String>> = h
                .evidence
                .iter()
                .map(|e| self.claim_keywords(&e.content, &focus))
                .collect();

            let mut keep = Vec::new();
            let mut branch = Vec::new();
            for (i, e) in h.evidence.iter().enumerate() {
                let to_a = jaccard(&kws[i], &kws[a]);
                let to_b = jaccard(&kws[i], &kws[b]);
                if i == a || (i != b && to_a > to_b) {
                    keep.push(e.clone());
                } else if i == b || to_b > to_a {
                    branch.push(e.clone());
                } else {
                    keep.push(e.clone());
                    branch.push(e.clone());
                }
            }
            (keep, branch)
        };

        let keep_only = exclusive_sources(&keep, &branch);
        let branch_only = exclusive_sources(&branch, &keep);
        let child = arena.fork(record.hypothesis_id, branch, keep_only)?;
        if let Some(h) = arena.get_mut(record.hypothesis_id) {
            h.excluded.extend(branch_only);
            h.discounts.retain(|id, _| keep.iter().any(|e| e.id == *id));
            h.evidence = keep;
            h.inspected = h.evidence.len();
            h.recompute_confidence();
            h.status = HypothesisStatus::Active;
        }
        Some(child)
    }

    /// Discount the lower-trust item of the pair (lower relevance on a tie,
    /// then the later item). Returns its source id.
    fn down_weight(&self, arena: &mut HypothesisArena, record: &ContradictionRecord) -> Option<String> {
        let factor = self.config.downweight_factor;
        let h = arena.get_mut(record.hypothesis_id)?;
        let target = h
            .evidence
            .iter()
            .enumerate()
            .filter(|(_, e)| record.conflicting_evidence_ids.contains(&e.id))
            .min_by(|(i, x), (j, y)| {
                x.trust_weight
                    .total_cmp(&y.trust_weight)
                    .then(x.relevance_score.total_cmp(&y.relevance_score))
                    .then(j.cmp(i))
            })
            .map(|(_, e)| (e.id, e.source_id.clone()))?;

        let discount = h.discounts.entry(target.0).or_insert(1.0);
        *discount *= factor;
        h.recompute_confidence();
        Some(target.1)
    }
}

/// Source ids present in `side` but not in `other`
fn exclusive_sources(side: &[Evidence], other: &[Evidence]) -> BTreeSet<String> {
    side.iter()
        .filter(|e| !other.iter().any(|o| o.source_id == e.source_id))
        .map(|e| e.source_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::SourceHit;
    use crate::hypothesis::Hypothesis;
    use crate::relevance::TermFrequencyScorer;
    use crate::trust::SourceCategory;

    fn evidence(source: &str, content: &str, trust: f64, relevance: f64) -> Evidence {
        Evidence::from_hit(SourceHit::new(source, content), SourceCategory::Encyclopedic, trust, relevance)
    }

    fn detector() -> ContradictionDetector {
        ContradictionDetector::new(Arc::new(TermFrequencyScorer::new()), ContradictionConfig::default())
    }

    fn conflicting_arena() -> HypothesisArena {
        let mut arena = HypothesisArena::new();
        let mut h = Hypothesis::new(HypothesisId(0), "coffee".into(), vec![]);
        h.evidence.push(evidence("a", "Coffee improves alertness and memory", 0.9, 0.9));
        h.evidence.push(evidence("b", "Coffee causes insomnia plus anxiety", 0.6, 0.9));
        h.recompute_confidence();
        arena.push(h);
        arena
    }

    #[test]
    fn test_detects_single_within_record() {
        let records = detector().detect(&conflicting_arena());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scope, ConflictScope::Within);
        assert_eq!(records[0].conflicting_evidence_ids.len(), 2);
        assert!((records[0].divergence_score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_similar_claims_do_not_conflict() {
        let mut arena = HypothesisArena::new();
        let mut h = Hypothesis::new(HypothesisId(0), "coffee".into(), vec![]);
        h.evidence.push(evidence("a", "Coffee improves alertness", 0.9, 0.9));
        h.evidence.push(evidence("b", "Coffee improves alertness greatly", 0.9, 0.9));
        arena.push(h);
        assert!(detector().detect(&arena).is_empty());
    }

    #[test]
    fn test_inspected_evidence_is_not_rechecked() {
        let mut arena = conflicting_arena();
        let d = detector();
        let records = d.detect(&arena);
        d.resolve(&mut arena, &records, 1);
        assert!(d.detect(&arena).is_empty());
    }

    #[test]
    fn test_fork_splits_evidence() {
        let mut arena = conflicting_arena();
        let d = detector();
        let records = d.detect(&arena);
        let resolution = d.resolve(&mut arena, &records, 2);

        assert_eq!(resolution.forks, vec![(HypothesisId(0), HypothesisId(1))]);
        let parent = arena.get(HypothesisId(0)).unwrap();
        let child = arena.get(HypothesisId(1)).unwrap();
        assert_eq!(parent.evidence.len(), 1);
        assert_eq!(parent.evidence[0].source_id, "a");
        assert_eq!(child.evidence.len(), 1);
        assert_eq!(child.evidence[0].source_id, "b");
        assert_eq!(child.parent_id, Some(HypothesisId(0)));
        assert!(parent.excluded.contains("b"));
        assert!(child.excluded.contains("a"));
    }

    #[test]
    fn test_ceiling_down_weights_lower_trust() {
        let mut arena = conflicting_arena();
        let d = detector();
        let records = d.detect(&arena);
        let before = arena.get(HypothesisId(0)).unwrap().confidence;
        let resolution = d.resolve(&mut arena, &records, 1);

        assert!(resolution.forks.is_empty());
        assert_eq!(arena.len(), 1);
        assert!(resolution
            .trace
            .contains(&TraceStep::DownWeighted { hypothesis: HypothesisId(0), source_id: "b".into() }));
        assert!(arena.get(HypothesisId(0)).unwrap().confidence < before);
    }
}
