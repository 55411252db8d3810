//! Velocity core: an epistemic reasoning engine.
//!
//! A query is classified into an intent, routed to source categories, and
//! researched by competing hypotheses that gather evidence concurrently.
//! Conflicting evidence forks hypotheses, weak ones are eliminated, and the
//! survivors are merged into a confidence-calibrated result.

pub mod adapter;
pub mod config;
pub mod contradiction;
pub mod eliminator;
pub mod error;
pub mod evidence;
pub mod formatter;
pub mod hypothesis;
pub mod intent;
pub mod orchestrator;
pub mod relevance;
pub mod router;
pub mod scheduler;
pub mod synthesizer;
pub mod text;
pub mod trace;
pub mod trust;

pub use adapter::{AdapterRegistry, SourceAdapter, StaticSourceAdapter, StaticSourceAdapterBuilder};
pub use config::{Budget, ContradictionConfig, EngineConfig, VelocityConfig};
pub use error::{AdapterError, FormatError, Result, VelocityError};
pub use evidence::{Evidence, SourceHit};
pub use formatter::AnswerFormatter;
pub use hypothesis::{Hypothesis, HypothesisArena, HypothesisId, HypothesisStatus};
pub use intent::{classify, DecisionType, Intent, LanguageTag, Locale, UncertaintyHint};
pub use orchestrator::Orchestrator;
pub use relevance::{RelevanceScorer, TermFrequencyScorer};
pub use router::{EpistemicRouter, SourceStrategy};
pub use synthesizer::{ExecutionResult, Uncertainty};
pub use trace::TraceStep;
pub use trust::{SourceCategory, TrustTable};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
