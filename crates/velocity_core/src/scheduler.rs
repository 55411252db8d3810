//! Interrogation scheduler.
//!
//! Runs query rounds for one hypothesis. A round fans out one query per
//! strategy that still has quota, each under its own timeout, and waits for
//! all of them (or the run deadline). Evidence is committed in strategy
//! priority order, so completion order never changes the outcome.

use crate::adapter::AdapterRegistry;
use crate::config::EngineConfig;
use crate::error::AdapterError;
use crate::evidence::{Evidence, SourceHit};
use crate::hypothesis::{Hypothesis, HypothesisId, HypothesisStatus};
use crate::relevance::RelevanceScorer;
use crate::router::SourceStrategy;
use crate::trace::TraceStep;
use crate::trust::SourceCategory;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

/// Stopping thresholds the scheduler needs from the engine config
#[derive(Debug, Clone, Copy)]
struct Limits {
    max_iterations: u32,
    confidence_threshold: f64,
    cost_budget: f64,
    per_query_timeout: Duration,
    max_results: usize,
}

/// Outcome of one query round
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub hypothesis: HypothesisId,
    /// 1-based round number for this hypothesis
    pub round: u32,
    pub queries_issued: usize,
    pub new_evidence: usize,
    pub confidence: f64,
    pub failures: Vec<(SourceCategory, AdapterError)>,
    /// The run deadline fired before every query returned
    pub cut_short: bool,
}

impl RoundReport {
    pub fn trace_steps(&self) -> Vec<TraceStep> {
        let mut steps: Vec<TraceStep> = self
            .failures
            .iter()
            .map(|(category, error)| TraceStep::AdapterFailure {
                hypothesis: self.hypothesis,
                category: *category,
                reason: error.reason().to_string(),
            })
            .collect();
        steps.push(TraceStep::Round {
            hypothesis: self.hypothesis,
            round: self.round,
            new_evidence: self.new_evidence,
            confidence: self.confidence,
        });
        steps
    }
}

#[derive(Clone)]
pub struct InterrogationScheduler {
    adapters: AdapterRegistry,
    scorer: Arc<dyn RelevanceScorer>,
    limits: Limits,
}

impl InterrogationScheduler {
    pub fn new(engine: &EngineConfig, adapters: AdapterRegistry, scorer: Arc<dyn RelevanceScorer>) -> Self {
        Self {
            adapters,
            scorer,
            limits: Limits {
                max_iterations: engine.max_iterations,
                confidence_threshold: engine.confidence_threshold,
                cost_budget: engine.per_hypothesis_cost_budget,
                per_query_timeout: engine.per_query_timeout(),
                max_results: engine.max_results_per_query,
            },
        }
    }

    /// No further round can run: iteration budget spent or no quota left
    pub fn is_exhausted(&self, hypothesis: &Hypothesis) -> bool {
        hypothesis.iterations_used >= self.limits.max_iterations
            || hypothesis.open_strategies().is_empty()
    }

    /// Whether the hypothesis should take part in the next round
    pub fn wants_round(&self, hypothesis: &Hypothesis) -> bool {
        hypothesis.is_active() && !self.is_exhausted(hypothesis)
    }

    /// Run rounds until the hypothesis stops or exhausts its budgets
    pub async fn run(&self, mut hypothesis: Hypothesis) -> (Hypothesis, Vec<RoundReport>) {
        let mut reports = Vec::new();
        while self.wants_round(&hypothesis) {
            reports.push(self.run_round(&mut hypothesis, None).await);
        }
        (hypothesis, reports)
    }

    /// Run exactly one round. Results that arrive before `deadline` are kept;
    /// queries still outstanding at the deadline are cancelled.
    pub async fn run_round(&self, hypothesis: &mut Hypothesis, deadline: Option<Instant>) -> RoundReport {
        let round = hypothesis.iterations_used + 1;
        let mut report = RoundReport {
            hypothesis: hypothesis.id,
            round,
            queries_issued: 0,
            new_evidence: 0,
            confidence: hypothesis.confidence,
            failures: Vec::new(),
            cut_short: false,
        };

        let mut join_set = JoinSet::new();
        for (order, strategy) in hypothesis.open_strategies().into_iter().enumerate() {
            let Some(adapter) = self.adapters.get(strategy.category) else {
                report
                    .failures
                    .push((strategy.category, AdapterError::Unregistered(strategy.category)));
                continue;
            };

            *hypothesis.queries_issued.entry(strategy.category).or_insert(0) += 1;
            hypothesis.cost_used += strategy.cost_weight;
            report.queries_issued += 1;

            let text = hypothesis.focus.clone();
            let per_query = self.limits.per_query_timeout;
            let max_results = self.limits.max_results;
            join_set.spawn(async move {
                let result = match timeout(per_query, adapter.query(&text, max_results)).await {
                    Ok(result) => result,
                    Err(_) => Err(AdapterError::Timeout),
                };
                (order, strategy, result)
            });
        }

        let mut arrived: Vec<(usize, SourceStrategy, Result<Vec<SourceHit>, AdapterError>)> = Vec::new();
        loop {
            let next = match deadline {
                Some(deadline) => match timeout_at(deadline, join_set.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        report.cut_short = true;
                        join_set.abort_all();
                        break;
                    }
                },
                None => join_set.join_next().await,
            };
            match next {
                Some(Ok(item)) => arrived.push(item),
                Some(Err(e)) => warn!("{} query task failed: {}", hypothesis.id, e),
                None => break,
            }
        }
        arrived.sort_by_key(|(order, _, _)| *order);

        let mut seen = hypothesis.known_sources();
        for (_, strategy, result) in arrived {
            let hits = match result {
                Ok(hits) if hits.is_empty() => {
                    report.failures.push((strategy.category, AdapterError::Empty));
                    continue;
                }
                Ok(hits) => hits,
                Err(e) => {
                    debug!("{} {} query failed: {}", hypothesis.id, strategy.category, e);
                    report.failures.push((strategy.category, e));
                    continue;
                }
            };
            for hit in hits {
                if hit.content.trim().is_empty() || !seen.insert(hit.source_id.clone()) {
                    continue;
                }
                let relevance = self.scorer.score(&hit.content, &hypothesis.focus);
                hypothesis
                    .evidence
                    .push(Evidence::from_hit(hit, strategy.category, strategy.trust_weight, relevance));
                report.new_evidence += 1;
            }
        }

        hypothesis.iterations_used = round;
        hypothesis.recompute_confidence();
        report.confidence = hypothesis.confidence;
        if report.new_evidence == 0 {
            debug!("{} round {} produced no new evidence", hypothesis.id, round);
        }
        self.apply_stop_conditions(hypothesis);
        report
    }

    /// Re-evaluate the stop conditions after evidence changed outside a round,
    /// e.g. after a fork split it
    pub fn settle(&self, hypothesis: &mut Hypothesis) {
        if hypothesis.status == HypothesisStatus::Eliminated {
            return;
        }
        hypothesis.status = HypothesisStatus::Active;
        self.apply_stop_conditions(hypothesis);
    }

    fn apply_stop_conditions(&self, hypothesis: &mut Hypothesis) {
        if !hypothesis.is_active() {
            return;
        }
        if hypothesis.confidence >= self.limits.confidence_threshold {
            hypothesis.status = HypothesisStatus::Survived;
            debug!(
                "{} reached threshold ({:.2} >= {:.2})",
                hypothesis.id, hypothesis.confidence, self.limits.confidence_threshold
            );
        } else if hypothesis.cost_used >= self.limits.cost_budget {
            hypothesis.status = if hypothesis.confidence > 0.0 {
                HypothesisStatus::Survived
            } else {
                HypothesisStatus::Eliminated
            };
            debug!("{} spent its cost budget, now {}", hypothesis.id, hypothesis.status);
        }
    }
}
