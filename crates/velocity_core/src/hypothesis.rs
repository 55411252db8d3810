//! Hypotheses, the append-only hypothesis arena, and the generator.
//!
//! Forks form a tree. Each hypothesis keeps the arena index of its parent
//! instead of a pointer, so the arena can be read by index from anywhere and
//! sibling branches never share an evidence list.

use crate::evidence::{confidence_of, Evidence};
use crate::intent::{DecisionType, Intent, LanguageTag};
use crate::router::SourceStrategy;
use crate::trust::SourceCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Index of a hypothesis in its arena. Also its creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HypothesisId(pub usize);

impl std::fmt::Display for HypothesisId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HypothesisStatus {
    Active,
    Eliminated,
    Survived,
}

impl std::fmt::Display for HypothesisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Eliminated => "eliminated",
            Self::Survived => "survived",
        };
        write!(f, "{}", s)
    }
}

/// One candidate line of reasoning with its own evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: HypothesisId,
    pub parent_id: Option<HypothesisId>,
    /// Text sent to source adapters
    pub focus: String,
    pub strategies: Vec<SourceStrategy>,
    pub evidence: Vec<Evidence>,
    pub confidence: f64,
    pub status: HypothesisStatus,
    pub iterations_used: u32,
    pub cost_used: f64,
    /// Queries issued per category, for quota accounting
    pub queries_issued: BTreeMap<SourceCategory, u32>,
    /// Down-weighting applied to specific evidence after refused forks
    pub discounts: BTreeMap<Uuid, f64>,
    /// Evidence already examined by the contradiction detector
    pub inspected: usize,
    /// Sources handed to the other side of a fork; never re-collected here
    #[serde(default)]
    pub excluded: BTreeSet<String>,
}

impl Hypothesis {
    pub fn new(id: HypothesisId, focus: String, strategies: Vec<SourceStrategy>) -> Self {
        Self {
            id,
            parent_id: None,
            focus,
            strategies,
            evidence: Vec::new(),
            confidence: 0.0,
            status: HypothesisStatus::Active,
            iterations_used: 0,
            cost_used: 0.0,
            queries_issued: BTreeMap::new(),
            discounts: BTreeMap::new(),
            inspected: 0,
            excluded: BTreeSet::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == HypothesisStatus::Active
    }

    pub fn total_queries(&self) -> u32 {
        self.queries_issued.values().sum()
    }

    /// Strategies that still have query quota
    pub fn open_strategies(&self) -> Vec<SourceStrategy> {
        self.strategies
            .iter()
            .filter(|s| self.queries_issued.get(&s.category).copied().unwrap_or(0) < s.max_queries)
            .cloned()
            .collect()
    }

    /// Recompute confidence from this hypothesis's own evidence
    pub fn recompute_confidence(&mut self) {
        self.confidence = confidence_of(&self.evidence, &self.discounts);
    }

    pub fn has_source(&self, source_id: &str) -> bool {
        self.evidence.iter().any(|e| e.source_id == source_id)
    }

    /// Source ids a round must not append: ones already held plus ones
    /// given away at a fork
    pub fn known_sources(&self) -> BTreeSet<String> {
        self.evidence
            .iter()
            .map(|e| e.source_id.clone())
            .chain(self.excluded.iter().cloned())
            .collect()
    }
}

/// Append-only store of every hypothesis created during one query run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypothesisArena {
    nodes: Vec<Hypothesis>,
}

impl HypothesisArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> HypothesisId {
        HypothesisId(self.nodes.len())
    }

    /// Append a hypothesis, assigning it the next id
    pub fn push(&mut self, mut hypothesis: Hypothesis) -> HypothesisId {
        let id = self.next_id();
        hypothesis.id = id;
        self.nodes.push(hypothesis);
        id
    }

    pub fn get(&self, id: HypothesisId) -> Option<&Hypothesis> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: HypothesisId) -> Option<&mut Hypothesis> {
        self.nodes.get_mut(id.0)
    }

    /// Write back a hypothesis that was taken out for a round
    pub fn replace(&mut self, hypothesis: Hypothesis) {
        if let Some(slot) = self.nodes.get_mut(hypothesis.id.0) {
            *slot = hypothesis;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hypothesis> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Hypothesis> {
        self.nodes.iter_mut()
    }

    pub fn active_ids(&self) -> Vec<HypothesisId> {
        self.nodes.iter().filter(|h| h.is_active()).map(|h| h.id).collect()
    }

    /// Hypotheses not yet eliminated; counted against the fork ceiling
    pub fn live_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|h| h.status != HypothesisStatus::Eliminated)
            .count()
    }

    /// Fork `parent`: the child copies the parent's strategies, counters and
    /// exclusions, and receives its own copy of `evidence`. `excluded` adds
    /// the sources that stay with the parent only.
    pub fn fork(
        &mut self,
        parent: HypothesisId,
        evidence: Vec<Evidence>,
        excluded: BTreeSet<String>,
    ) -> Option<HypothesisId> {
        let source = self.get(parent)?;
        let mut child = Hypothesis::new(self.next_id(), source.focus.clone(), source.strategies.clone());
        child.parent_id = Some(parent);
        child.iterations_used = source.iterations_used;
        child.cost_used = source.cost_used;
        child.queries_issued = source.queries_issued.clone();
        child.discounts = source
            .discounts
            .iter()
            .filter(|(id, _)| evidence.iter().any(|e| e.id == **id))
            .map(|(id, d)| (*id, *d))
            .collect();
        child.excluded = source.excluded.iter().cloned().chain(excluded).collect();
        child.inspected = evidence.len();
        child.evidence = evidence;
        child.recompute_confidence();
        Some(self.push(child))
    }
}

/// Query text for a hypothesis angle
fn focus_text(subject: &str, intent: &Intent) -> String {
    match (intent.decision_type, intent.language) {
        (DecisionType::Generative, lang) if lang != LanguageTag::Unspecified => {
            if subject.to_lowercase().split_whitespace().any(|w| w == lang.as_str()) {
                subject.to_string()
            } else {
                format!("{} {}", subject, lang)
            }
        }
        _ => subject.to_string(),
    }
}

/// Create the initial competing hypotheses.
///
/// COMPARATIVE intents with two or more subgoals get one hypothesis per
/// compared item, up to `n`, each using every routed strategy. Otherwise `n`
/// hypotheses are created and the strategies dealt round-robin over them, so
/// the union covers the routed list. When there are fewer strategies than
/// hypotheses, the extra ones reuse a strategy but search with the query as
/// the user wrote it instead of the extracted topic.
pub fn generate(intent: &Intent, strategies: &[SourceStrategy], n: usize) -> Vec<Hypothesis> {
    if strategies.is_empty() || n == 0 {
        return Vec::new();
    }

    if intent.decision_type == DecisionType::Comparative && intent.subgoals.len() >= 2 && n >= 2 {
        return intent
            .subgoals
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, subgoal)| {
                Hypothesis::new(HypothesisId(i), focus_text(subgoal, intent), strategies.to_vec())
            })
            .collect();
    }

    let dealt = n.min(strategies.len());
    let mut buckets: Vec<Vec<SourceStrategy>> = vec![Vec::new(); dealt];
    for (i, strategy) in strategies.iter().enumerate() {
        buckets[i % dealt].push(strategy.clone());
    }

    let focus = focus_text(&intent.topic, intent);
    let mut hypotheses: Vec<Hypothesis> = buckets
        .into_iter()
        .enumerate()
        .map(|(i, bucket)| Hypothesis::new(HypothesisId(i), focus.clone(), bucket))
        .collect();

    let query = intent.query.trim();
    let alternate = if query.is_empty() {
        focus.clone()
    } else {
        focus_text(query, intent)
    };
    for i in dealt..n {
        let strategy = strategies[i % strategies.len()].clone();
        hypotheses.push(Hypothesis::new(HypothesisId(i), alternate.clone(), vec![strategy]));
    }
    hypotheses
}
