//! Epistemic router.
//!
//! Decides which source categories to interrogate for an intent, in what
//! order, within a cost budget. Pure decision function over the intent, the
//! trust table and static category profiles.

use crate::config::Budget;
use crate::intent::{DecisionType, Intent};
use crate::trust::{SourceCategory, TrustTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Weight of trust in the strategy score
pub const TRUST_WEIGHT: f64 = 0.6;
/// Weight of freshness in the strategy score
pub const FRESHNESS_WEIGHT: f64 = 0.25;
/// Penalty weight of cost in the strategy score
pub const COST_WEIGHT: f64 = 0.15;

/// A chosen source category with its routing weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStrategy {
    pub category: SourceCategory,
    /// 0 is the highest priority
    pub priority: u32,
    pub trust_weight: f64,
    pub cost_weight: f64,
    pub max_queries: u32,
}

impl SourceStrategy {
    /// Cost of running this strategy to its query limit
    pub fn projected_cost(&self) -> f64 {
        self.cost_weight * self.max_queries as f64
    }
}

/// Candidate categories per decision type, before scoring
pub fn candidate_categories(decision_type: DecisionType) -> &'static [SourceCategory] {
    use SourceCategory::*;
    match decision_type {
        DecisionType::Factual => &[Encyclopedic, FormalDocs],
        DecisionType::Comparative => &[Encyclopedic, News, Forum],
        DecisionType::Predictive => &[News, Forum, Encyclopedic],
        DecisionType::Strategic => &[QaSite, Forum, FormalDocs],
        DecisionType::Analytical => &[Encyclopedic, FormalDocs, News],
        DecisionType::Procedural => &[FormalDocs, QaSite, CodeRepository],
        DecisionType::Generative => &[CodeRepository, QaSite, FormalDocs],
        DecisionType::Social | DecisionType::Meta => &[],
    }
}

/// How much a decision type cares about recent content
fn freshness_emphasis(decision_type: DecisionType) -> f64 {
    match decision_type {
        DecisionType::Predictive => 1.5,
        DecisionType::Comparative | DecisionType::Strategic => 1.2,
        DecisionType::Factual | DecisionType::Generative => 0.8,
        _ => 1.0,
    }
}

pub struct EpistemicRouter {
    trust: Arc<TrustTable>,
}

impl EpistemicRouter {
    pub fn new(trust: Arc<TrustTable>) -> Self {
        Self { trust }
    }

    /// Score of a category for a decision type:
    /// `trust * w1 + freshness * w2 - cost * w3`
    pub fn score(&self, category: SourceCategory, decision_type: DecisionType) -> f64 {
        let profile = category.profile();
        let freshness = profile.freshness * freshness_emphasis(decision_type);
        self.trust.weight(category) * TRUST_WEIGHT + freshness * FRESHNESS_WEIGHT
            - profile.cost_weight * COST_WEIGHT
    }

    fn strategy(&self, category: SourceCategory, priority: u32) -> SourceStrategy {
        let profile = category.profile();
        SourceStrategy {
            category,
            priority,
            trust_weight: self.trust.weight(category),
            cost_weight: profile.cost_weight,
            max_queries: profile.max_queries,
        }
    }

    /// Ordered strategies for an intent. Empty only for a degenerate intent.
    pub fn route(&self, intent: &Intent, budget: &Budget) -> Vec<SourceStrategy> {
        if intent.is_degenerate() {
            return Vec::new();
        }

        let mut scored: Vec<(SourceCategory, f64)> = candidate_categories(intent.decision_type)
            .iter()
            .map(|c| (*c, self.score(*c, intent.decision_type)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        // Stable sort keeps table order for equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(budget.max_strategies.max(1));

        let mut strategies: Vec<SourceStrategy> = scored
            .iter()
            .enumerate()
            .map(|(i, (c, _))| self.strategy(*c, i as u32))
            .collect();

        while !strategies.is_empty() && total_projected_cost(&strategies) > budget.max_cost {
            if let Some(dropped) = strategies.pop() {
                debug!("Dropping {} strategy to fit cost budget", dropped.category);
            }
        }

        if strategies.is_empty() {
            debug!("No routed strategy for {}, using best-effort", intent.decision_type);
            strategies.push(self.best_effort(budget));
        }
        strategies
    }

    /// Generic strategy, shrunk to fit the budget but never below one query
    fn best_effort(&self, budget: &Budget) -> SourceStrategy {
        let mut strategy = self.strategy(SourceCategory::General, 0);
        if strategy.cost_weight > 0.0 {
            let affordable = (budget.max_cost / strategy.cost_weight).floor() as u32;
            strategy.max_queries = strategy.max_queries.min(affordable).max(1);
        }
        strategy
    }
}

pub fn total_projected_cost(strategies: &[SourceStrategy]) -> f64 {
    strategies.iter().map(SourceStrategy::projected_cost).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::classify;

    fn router() -> EpistemicRouter {
        EpistemicRouter::new(Arc::new(TrustTable::default()))
    }

    #[test]
    fn test_factual_routes_encyclopedic_and_docs() {
        let strategies = router().route(&classify("What is Rust?"), &Budget::default());
        let categories: Vec<_> = strategies.iter().map(|s| s.category).collect();
        assert_eq!(categories.len(), 2);
        assert!(categories.contains(&SourceCategory::Encyclopedic));
        assert!(categories.contains(&SourceCategory::FormalDocs));
        assert_eq!(strategies[0].priority, 0);
        assert_eq!(strategies[1].priority, 1);
    }

    #[test]
    fn test_truncates_to_max_strategies() {
        let budget = Budget {
            max_strategies: 1,
            max_cost: 100.0,
        };
        let strategies = router().route(&classify("compare rust vs go"), &budget);
        assert_eq!(strategies.len(), 1);
    }

    #[test]
    fn test_cost_budget_drops_tail() {
        let budget = Budget {
            max_strategies: 3,
            max_cost: 3.5,
        };
        let strategies = router().route(&classify("write C code for fibonacci"), &budget);
        assert!(total_projected_cost(&strategies) <= 3.5);
        assert!(!strategies.is_empty());
    }

    #[test]
    fn test_social_falls_back_to_best_effort() {
        let strategies = router().route(&classify("hello"), &Budget::default());
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].category, SourceCategory::General);
    }

    #[test]
    fn test_degenerate_intent_routes_nothing() {
        assert!(router().route(&classify(""), &Budget::default()).is_empty());
    }
}
