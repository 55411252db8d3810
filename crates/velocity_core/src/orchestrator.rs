//! Core orchestrator.
//!
//! Sequences one query run end to end:
//!
//! 1. classify the query
//! 2. route it to source strategies
//! 3. generate competing hypotheses into an arena
//! 4. run global rounds: every hypothesis that still wants a round runs one,
//!    concurrently, on a pool bounded by `max_hypotheses`; contradictions are
//!    detected and resolved once all of them have committed
//! 5. eliminate, synthesize, and optionally format
//!
//! The whole-query deadline cancels outstanding queries; evidence that already
//! arrived is kept and the run proceeds straight to elimination.

use crate::adapter::AdapterRegistry;
use crate::config::VelocityConfig;
use crate::contradiction::ContradictionDetector;
use crate::eliminator::eliminate;
use crate::error::Result;
use crate::formatter::AnswerFormatter;
use crate::hypothesis::{generate, HypothesisArena, HypothesisId, HypothesisStatus};
use crate::intent::{classify, Intent};
use crate::relevance::RelevanceScorer;
use crate::router::{EpistemicRouter, SourceStrategy};
use crate::scheduler::{InterrogationScheduler, RoundReport};
use crate::synthesizer::{synthesize, ExecutionResult};
use crate::trace::TraceStep;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub struct Orchestrator {
    config: VelocityConfig,
    router: EpistemicRouter,
    scheduler: InterrogationScheduler,
    detector: ContradictionDetector,
    formatter: Option<Arc<dyn AnswerFormatter>>,
}

impl Orchestrator {
    /// Build an orchestrator. Malformed configuration is rejected here,
    /// before any query runs.
    pub fn new(
        config: VelocityConfig,
        adapters: AdapterRegistry,
        scorer: Arc<dyn RelevanceScorer>,
    ) -> Result<Self> {
        config.validate()?;
        let trust = Arc::new(config.trust_table()?);
        Ok(Self {
            router: EpistemicRouter::new(trust),
            scheduler: InterrogationScheduler::new(&config.engine, adapters, Arc::clone(&scorer)),
            detector: ContradictionDetector::new(scorer, config.contradiction),
            formatter: None,
            config,
        })
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn AnswerFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn config(&self) -> &VelocityConfig {
        &self.config
    }

    pub fn classify(&self, query: &str) -> Intent {
        classify(query)
    }

    pub fn route(&self, intent: &Intent) -> Vec<SourceStrategy> {
        self.router.route(intent, &self.config.router)
    }

    /// Answer one query. Never fails: every failure mode degrades into the
    /// result's confidence, uncertainty and trace.
    pub async fn execute(&self, query: &str) -> ExecutionResult {
        let started = Instant::now();
        let deadline = started + self.config.engine.wall_clock_timeout();
        let mut trace = Vec::new();

        let intent = classify(query);
        info!("Query classified as {} (topic: {:?})", intent.decision_type, intent.topic);
        trace.push(TraceStep::Classified {
            decision_type: intent.decision_type,
            topic: intent.topic.clone(),
        });

        let strategies = self.route(&intent);
        trace.push(TraceStep::Routed {
            categories: strategies.iter().map(|s| s.category).collect(),
        });

        let mut arena = HypothesisArena::new();
        for h in generate(&intent, &strategies, self.config.engine.generated_hypotheses()) {
            arena.push(h);
        }
        trace.push(TraceStep::Generated { count: arena.len() });
        if arena.is_empty() {
            info!("Nothing to research");
            return ExecutionResult::insufficient(trace);
        }

        let mut expired = false;
        let mut global_round = 0u32;
        loop {
            let ready: Vec<HypothesisId> = arena
                .iter()
                .filter(|h| self.scheduler.wants_round(h))
                .map(|h| h.id)
                .collect();
            if ready.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                expired = true;
                break;
            }
            global_round += 1;
            debug!("Global round {} over {} hypotheses", global_round, ready.len());

            let reports = self.run_global_round(&mut arena, &ready, deadline).await;
            expired = reports.iter().any(|r| r.cut_short);
            for report in &reports {
                trace.extend(report.trace_steps());
            }

            let records = self.detector.detect(&arena);
            let resolution = self
                .detector
                .resolve(&mut arena, &records, self.config.engine.max_hypotheses);
            trace.extend(resolution.trace);
            for id in resolution.touched {
                if let Some(h) = arena.get_mut(id) {
                    self.scheduler.settle(h);
                }
            }

            if expired {
                break;
            }
        }

        if expired {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            warn!("Wall clock budget expired after {}ms", elapsed_ms);
            trace.push(TraceStep::WallClockExpired { elapsed_ms });
        }

        let elimination = eliminate(&mut arena, self.config.engine.min_confidence);
        trace.extend(elimination.trace);

        let mut result = synthesize(&arena, &elimination.survivors, self.config.engine.summary_sentences);
        trace.append(&mut result.reasoning_trace);
        result.reasoning_trace = trace;

        if !result.evidence.is_empty() {
            self.format(&intent, &mut result).await;
        }

        info!(
            "Query finished in {}ms: confidence {:.2}, {} evidence",
            started.elapsed().as_millis(),
            result.confidence,
            result.evidence.len()
        );
        result
    }

    /// One round for each ready hypothesis, at most `max_hypotheses` at a time.
    /// Each task works on its own copy, written back when the round commits.
    async fn run_global_round(
        &self,
        arena: &mut HypothesisArena,
        ready: &[HypothesisId],
        deadline: Instant,
    ) -> Vec<RoundReport> {
        let pool = Arc::new(Semaphore::new(self.config.engine.max_hypotheses));
        let mut join_set = JoinSet::new();
        let mut pending: BTreeSet<HypothesisId> = BTreeSet::new();

        for id in ready {
            let Some(h) = arena.get(*id) else { continue };
            let mut hypothesis = h.clone();
            let scheduler = self.scheduler.clone();
            let pool = Arc::clone(&pool);
            pending.insert(*id);
            join_set.spawn(async move {
                let _permit = pool.acquire_owned().await.ok();
                let report = scheduler.run_round(&mut hypothesis, Some(deadline)).await;
                (hypothesis, report)
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((hypothesis, report)) => {
                    pending.remove(&hypothesis.id);
                    arena.replace(hypothesis);
                    reports.push(report);
                }
                Err(e) => warn!("Hypothesis round task failed: {}", e),
            }
        }

        // A task that died cannot make progress; retire its hypothesis
        for id in pending {
            if let Some(h) = arena.get_mut(id) {
                h.status = HypothesisStatus::Eliminated;
            }
        }

        reports.sort_by_key(|r| r.hypothesis);
        reports
    }

    async fn format(&self, intent: &Intent, result: &mut ExecutionResult) {
        let Some(formatter) = &self.formatter else {
            return;
        };
        match formatter.format(&result.decision_summary, intent.locale).await {
            Ok(text) if !text.trim().is_empty() => {
                result.natural_answer = Some(text);
                result.reasoning_trace.push(TraceStep::Formatted);
            }
            Ok(_) => {
                debug!("Formatter returned nothing, keeping raw summary");
                result.reasoning_trace.push(TraceStep::FormatFallback {
                    reason: "empty response".to_string(),
                });
            }
            Err(e) => {
                debug!("Formatter failed ({}), keeping raw summary", e);
                result.reasoning_trace.push(TraceStep::FormatFallback { reason: e.to_string() });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{SourceAdapter, StaticSourceAdapter};
    use crate::error::AdapterError;
    use crate::evidence::SourceHit;
    use crate::hypothesis::Hypothesis;
    use crate::relevance::TermFrequencyScorer;
    use crate::trust::SourceCategory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Slow adapter that records how many queries overlap
    #[derive(Default)]
    struct GaugeAdapter {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SourceAdapter for GaugeAdapter {
        fn category(&self) -> SourceCategory {
            SourceCategory::Encyclopedic
        }

        async fn query(&self, text: &str, _max_results: usize) -> std::result::Result<Vec<SourceHit>, AdapterError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![SourceHit::new(&format!("wiki:{}", text), "an encyclopedic fact")])
        }
    }

    fn wiki_strategy() -> SourceStrategy {
        SourceStrategy {
            category: SourceCategory::Encyclopedic,
            priority: 0,
            trust_weight: 0.85,
            cost_weight: 1.0,
            max_queries: 3,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_parallelism_bounded_by_ceiling() {
        let gauge = Arc::new(GaugeAdapter::default());
        let registry = AdapterRegistry::new().with(gauge.clone());
        let orchestrator =
            Orchestrator::new(VelocityConfig::default(), registry, Arc::new(TermFrequencyScorer::new())).unwrap();
        assert_eq!(orchestrator.config().engine.max_hypotheses, 2);

        let mut arena = HypothesisArena::new();
        for focus in ["rust", "go", "zig"] {
            arena.push(Hypothesis::new(HypothesisId(0), focus.into(), vec![wiki_strategy()]));
        }
        let ready = arena.active_ids();
        let started = Instant::now();
        let reports = orchestrator
            .run_global_round(&mut arena, &ready, started + Duration::from_secs(30))
            .await;

        assert_eq!(reports.len(), 3);
        assert_eq!(gauge.peak.load(Ordering::SeqCst), 2);
        // Two waves of 100ms
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(arena.iter().all(|h| h.evidence.len() == 1 && h.iterations_used == 1));
    }

    #[test]
    fn test_rejects_zero_hypotheses() {
        let mut config = VelocityConfig::default();
        config.engine.max_hypotheses = 0;
        let result = Orchestrator::new(config, AdapterRegistry::new(), Arc::new(TermFrequencyScorer::new()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_degenerate_query_is_insufficient() {
        let registry = AdapterRegistry::new().with(Arc::new(StaticSourceAdapter::returning(
            crate::trust::SourceCategory::General,
            vec![],
        )));
        let orchestrator =
            Orchestrator::new(VelocityConfig::default(), registry, Arc::new(TermFrequencyScorer::new())).unwrap();
        let result = orchestrator.execute("   ").await;
        assert_eq!(result.confidence, 0.0);
        assert!(result.evidence.is_empty());
        assert!(result.reasoning_trace.contains(&TraceStep::Generated { count: 0 }));
    }
}
