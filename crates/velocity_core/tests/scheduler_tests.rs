//! Interrogation scheduler tests.
//!
//! Tests verify:
//! - Early stop once the confidence threshold is reached
//! - Query counts stay within strategy quotas and the iteration budget
//! - Cost budget exhaustion
//! - Adapter failures never abort a hypothesis

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use velocity_core::adapter::{AdapterRegistry, StaticSourceAdapter, StaticSourceAdapterBuilder};
use velocity_core::config::EngineConfig;
use velocity_core::error::AdapterError;
use velocity_core::evidence::SourceHit;
use velocity_core::hypothesis::{Hypothesis, HypothesisId, HypothesisStatus};
use velocity_core::relevance::RelevanceScorer;
use velocity_core::router::SourceStrategy;
use velocity_core::scheduler::InterrogationScheduler;
use velocity_core::trust::SourceCategory;

/// Scores every item the same, so confidence equals the strategy trust
struct FlatScorer(f64);

impl RelevanceScorer for FlatScorer {
    fn score(&self, _content: &str, _topic: &str) -> f64 {
        self.0
    }

    fn keywords(&self, text: &str) -> BTreeSet<String> {
        text.split_whitespace().map(|w| w.to_lowercase()).collect()
    }
}

fn strategy(category: SourceCategory, trust: f64, max_queries: u32) -> SourceStrategy {
    SourceStrategy {
        category,
        priority: 0,
        trust_weight: trust,
        cost_weight: 1.0,
        max_queries,
    }
}

#[tokio::test]
async fn test_threshold_reached_in_first_round_stops_immediately() {
    let wiki = Arc::new(
        StaticSourceAdapterBuilder::new(SourceCategory::Encyclopedic)
            .hit("wiki:1", "first encyclopedic fact")
            .build(),
    );
    let docs = Arc::new(
        StaticSourceAdapterBuilder::new(SourceCategory::FormalDocs)
            .hit("docs:1", "first documentation fact")
            .build(),
    );
    let mut registry = AdapterRegistry::new();
    registry.register(wiki.clone());
    registry.register(docs.clone());

    let scheduler = InterrogationScheduler::new(&EngineConfig::default(), registry, Arc::new(FlatScorer(1.0)));
    let h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![
            strategy(SourceCategory::Encyclopedic, 0.65, 3),
            strategy(SourceCategory::FormalDocs, 0.65, 3),
        ],
    );

    let (h, reports) = scheduler.run(h).await;

    assert!((h.confidence - 0.65).abs() < 1e-9);
    assert_eq!(h.status, HypothesisStatus::Survived);
    assert_eq!(h.iterations_used, 1);
    assert_eq!(reports.len(), 1);
    assert_eq!(wiki.call_count(), 1);
    assert_eq!(docs.call_count(), 1);
}

#[tokio::test]
async fn test_query_count_bounded_by_quota() {
    let forum = Arc::new(
        StaticSourceAdapterBuilder::new(SourceCategory::Forum)
            .hit("forum:1", "same thread every time")
            .build(),
    );
    let mut registry = AdapterRegistry::new();
    registry.register(forum.clone());

    let scheduler = InterrogationScheduler::new(&EngineConfig::default(), registry, Arc::new(FlatScorer(0.0)));
    let h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![strategy(SourceCategory::Forum, 0.5, 2)],
    );

    let (h, _) = scheduler.run(h).await;

    let bound = 2 * EngineConfig::default().max_iterations as usize;
    assert!(forum.call_count() <= bound);
    assert_eq!(forum.call_count(), 2);
    assert_eq!(h.total_queries(), 2);
    assert_eq!(h.evidence.len(), 1);
}

#[tokio::test]
async fn test_iteration_budget_ends_the_loop() {
    let news = Arc::new(StaticSourceAdapter::failing(
        SourceCategory::News,
        AdapterError::Transport("connection refused".into()),
    ));
    let mut registry = AdapterRegistry::new();
    registry.register(news.clone());

    let engine = EngineConfig {
        max_iterations: 2,
        ..EngineConfig::default()
    };
    let scheduler = InterrogationScheduler::new(&engine, registry, Arc::new(FlatScorer(1.0)));
    let h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![strategy(SourceCategory::News, 0.6, 3)],
    );

    let (h, reports) = scheduler.run(h).await;

    assert_eq!(h.iterations_used, 2);
    assert_eq!(news.call_count(), 2);
    assert_eq!(h.confidence, 0.0);
    // Exhausted but undecided: the eliminator settles it
    assert_eq!(h.status, HypothesisStatus::Active);
    assert!(reports.iter().all(|r| r.failures.len() == 1));
}

#[tokio::test]
async fn test_cost_budget_without_confidence_eliminates() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(StaticSourceAdapter::returning(SourceCategory::QaSite, vec![])));

    let engine = EngineConfig {
        per_hypothesis_cost_budget: 1.5,
        ..EngineConfig::default()
    };
    let scheduler = InterrogationScheduler::new(&engine, registry, Arc::new(FlatScorer(1.0)));
    let h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![strategy(SourceCategory::QaSite, 0.7, 3)],
    );

    let (h, _) = scheduler.run(h).await;

    assert_eq!(h.iterations_used, 2);
    assert_eq!(h.status, HypothesisStatus::Eliminated);
}

#[tokio::test]
async fn test_cost_budget_with_evidence_survives() {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(
        StaticSourceAdapterBuilder::new(SourceCategory::QaSite)
            .hit("qa:1", "an accepted answer")
            .build(),
    ));

    let engine = EngineConfig {
        per_hypothesis_cost_budget: 1.0,
        ..EngineConfig::default()
    };
    let scheduler = InterrogationScheduler::new(&engine, registry, Arc::new(FlatScorer(0.2)));
    let h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![strategy(SourceCategory::QaSite, 0.7, 3)],
    );

    let (h, _) = scheduler.run(h).await;

    assert_eq!(h.iterations_used, 1);
    assert_eq!(h.status, HypothesisStatus::Survived);
    assert!(h.confidence > 0.0);
}

#[tokio::test]
async fn test_soft_failure_keeps_confidence() {
    let adapter = StaticSourceAdapterBuilder::new(SourceCategory::Encyclopedic)
        .then(Ok(vec![SourceHit::new("wiki:1", "useful")]))
        .fallback_error(AdapterError::Timeout)
        .build();
    let registry = AdapterRegistry::new().with(Arc::new(adapter));
    let scheduler = InterrogationScheduler::new(&EngineConfig::default(), registry, Arc::new(FlatScorer(0.5)));
    let mut h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![strategy(SourceCategory::Encyclopedic, 0.8, 3)],
    );

    scheduler.run_round(&mut h, None).await;
    let after_first = h.confidence;
    let report = scheduler.run_round(&mut h, None).await;

    assert_eq!(report.new_evidence, 0);
    assert_eq!(h.iterations_used, 2);
    assert!((h.confidence - after_first).abs() < 1e-12);
    assert!(after_first > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_slow_strategy_does_not_block_fast_one() {
    let slow = StaticSourceAdapterBuilder::new(SourceCategory::News)
        .hit("news:1", "late story")
        .delay(Duration::from_secs(30))
        .build();
    let fast = StaticSourceAdapterBuilder::new(SourceCategory::Forum)
        .hit("forum:1", "quick reply")
        .build();
    let registry = AdapterRegistry::new().with(Arc::new(slow)).with(Arc::new(fast));

    let engine = EngineConfig {
        per_query_timeout_ms: 2_000,
        ..EngineConfig::default()
    };
    let scheduler = InterrogationScheduler::new(&engine, registry, Arc::new(FlatScorer(0.5)));
    let mut h = Hypothesis::new(
        HypothesisId(0),
        "topic".into(),
        vec![
            strategy(SourceCategory::News, 0.6, 3),
            strategy(SourceCategory::Forum, 0.5, 3),
        ],
    );

    let report = scheduler.run_round(&mut h, None).await;

    assert_eq!(report.new_evidence, 1);
    assert_eq!(h.evidence[0].source_id, "forum:1");
    assert_eq!(report.failures, vec![(SourceCategory::News, AdapterError::Timeout)]);
}
