//! Engine configuration.
//!
//! Consumed once when the orchestrator is built. Every field has a serde
//! default so a partial TOML file loads; `validate` rejects malformed values
//! before any query runs.

use crate::error::{Result, VelocityError};
use crate::trust::{SourceCategory, TrustTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Global run budgets and stopping thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling on live hypotheses, also the worker pool size
    #[serde(default = "default_max_hypotheses")]
    pub max_hypotheses: usize,

    /// Hypotheses generated per query, capped at `max_hypotheses`
    #[serde(default = "default_initial_hypotheses")]
    pub initial_hypotheses: usize,

    /// Confidence at which a hypothesis stops early as SURVIVED
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Query rounds per hypothesis
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Cost a single hypothesis may spend before it is stopped
    #[serde(default = "default_cost_budget")]
    pub per_hypothesis_cost_budget: f64,

    /// Whole-query wall clock budget in milliseconds
    #[serde(default = "default_wall_clock_timeout")]
    pub wall_clock_timeout_ms: u64,

    /// Per source query timeout in milliseconds
    #[serde(default = "default_per_query_timeout")]
    pub per_query_timeout_ms: u64,

    /// Exhausted hypotheses below this confidence are eliminated
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Results requested from an adapter per query
    #[serde(default = "default_max_results")]
    pub max_results_per_query: usize,

    /// Sentence budget of the raw decision summary
    #[serde(default = "default_summary_sentences")]
    pub summary_sentences: usize,
}

fn default_max_hypotheses() -> usize {
    2
}

fn default_initial_hypotheses() -> usize {
    2
}

fn default_confidence_threshold() -> f64 {
    0.6
}

fn default_max_iterations() -> u32 {
    3
}

fn default_cost_budget() -> f64 {
    6.0
}

fn default_wall_clock_timeout() -> u64 {
    10_000
}

fn default_per_query_timeout() -> u64 {
    10_000
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_max_results() -> usize {
    3
}

fn default_summary_sentences() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hypotheses: default_max_hypotheses(),
            initial_hypotheses: default_initial_hypotheses(),
            confidence_threshold: default_confidence_threshold(),
            max_iterations: default_max_iterations(),
            per_hypothesis_cost_budget: default_cost_budget(),
            wall_clock_timeout_ms: default_wall_clock_timeout(),
            per_query_timeout_ms: default_per_query_timeout(),
            min_confidence: default_min_confidence(),
            max_results_per_query: default_max_results(),
            summary_sentences: default_summary_sentences(),
        }
    }
}

impl EngineConfig {
    /// Number of hypotheses the generator creates
    pub fn generated_hypotheses(&self) -> usize {
        self.initial_hypotheses.min(self.max_hypotheses)
    }

    pub fn wall_clock_timeout(&self) -> Duration {
        Duration::from_millis(self.wall_clock_timeout_ms)
    }

    pub fn per_query_timeout(&self) -> Duration {
        Duration::from_millis(self.per_query_timeout_ms)
    }
}

/// Router budget: how many strategies and how much projected cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default = "default_max_strategies")]
    pub max_strategies: usize,

    #[serde(default = "default_max_cost")]
    pub max_cost: f64,
}

fn default_max_strategies() -> usize {
    2
}

fn default_max_cost() -> f64 {
    12.0
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_strategies: default_max_strategies(),
            max_cost: default_max_cost(),
        }
    }
}

/// Contradiction detection thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContradictionConfig {
    /// Divergence above which a hypothesis forks
    #[serde(default = "default_fork_threshold")]
    pub fork_threshold: f64,

    /// Semantic overlap below this counts as "asserting different things"
    #[serde(default = "default_overlap_low")]
    pub overlap_low: f64,

    /// Topical match above this counts as "discussing the same thing"
    #[serde(default = "default_topical_high")]
    pub topical_high: f64,

    /// Multiplier applied to lower-trust evidence when a fork is refused
    #[serde(default = "default_downweight_factor")]
    pub downweight_factor: f64,
}

fn default_fork_threshold() -> f64 {
    0.5
}

fn default_overlap_low() -> f64 {
    0.15
}

fn default_topical_high() -> f64 {
    0.5
}

fn default_downweight_factor() -> f64 {
    0.5
}

impl Default for ContradictionConfig {
    fn default() -> Self {
        Self {
            fork_threshold: default_fork_threshold(),
            overlap_low: default_overlap_low(),
            topical_high: default_topical_high(),
            downweight_factor: default_downweight_factor(),
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub router: Budget,

    #[serde(default)]
    pub contradiction: ContradictionConfig,

    /// Per-category trust overrides, keyed by category name
    #[serde(default)]
    pub trust: BTreeMap<String, f64>,
}

impl VelocityConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| VelocityError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Reject malformed values eagerly
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        if engine.max_hypotheses < 1 {
            return Err(invalid("engine.max_hypotheses must be at least 1"));
        }
        if engine.initial_hypotheses < 1 {
            return Err(invalid("engine.initial_hypotheses must be at least 1"));
        }
        if engine.max_iterations < 1 {
            return Err(invalid("engine.max_iterations must be at least 1"));
        }
        check_unit("engine.confidence_threshold", engine.confidence_threshold)?;
        check_unit("engine.min_confidence", engine.min_confidence)?;
        check_non_negative("engine.per_hypothesis_cost_budget", engine.per_hypothesis_cost_budget)?;
        if engine.wall_clock_timeout_ms == 0 {
            return Err(invalid("engine.wall_clock_timeout_ms must be positive"));
        }
        if engine.per_query_timeout_ms == 0 {
            return Err(invalid("engine.per_query_timeout_ms must be positive"));
        }
        if engine.max_results_per_query == 0 {
            return Err(invalid("engine.max_results_per_query must be at least 1"));
        }
        if engine.summary_sentences == 0 {
            return Err(invalid("engine.summary_sentences must be at least 1"));
        }

        if self.router.max_strategies < 1 {
            return Err(invalid("router.max_strategies must be at least 1"));
        }
        check_non_negative("router.max_cost", self.router.max_cost)?;

        let c = &self.contradiction;
        check_unit("contradiction.fork_threshold", c.fork_threshold)?;
        check_unit("contradiction.overlap_low", c.overlap_low)?;
        check_unit("contradiction.topical_high", c.topical_high)?;
        check_unit("contradiction.downweight_factor", c.downweight_factor)?;

        self.trust_overrides().map(|_| ())
    }

    /// Parsed trust overrides
    pub fn trust_overrides(&self) -> Result<BTreeMap<SourceCategory, f64>> {
        let mut parsed = BTreeMap::new();
        for (name, weight) in &self.trust {
            let category: SourceCategory = name.parse().map_err(VelocityError::InvalidConfig)?;
            check_unit(&format!("trust.{}", name), *weight)?;
            parsed.insert(category, *weight);
        }
        Ok(parsed)
    }

    pub fn trust_table(&self) -> Result<TrustTable> {
        Ok(TrustTable::with_overrides(&self.trust_overrides()?))
    }
}

fn invalid(msg: &str) -> VelocityError {
    VelocityError::InvalidConfig(msg.to_string())
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(VelocityError::InvalidConfig(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(VelocityError::InvalidConfig(format!(
            "{} must be non-negative, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = VelocityConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.max_hypotheses, 2);
        assert_eq!(config.engine.max_iterations, 3);
        assert_eq!(config.router.max_strategies, 2);
        assert_eq!(config.contradiction.fork_threshold, 0.5);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = VelocityConfig::from_toml("[engine]\nmax_iterations = 5\n").unwrap();
        assert_eq!(config.engine.max_iterations, 5);
        assert_eq!(config.engine.confidence_threshold, 0.6);
        assert_eq!(config.router, Budget::default());
    }

    #[test]
    fn test_zero_hypotheses_rejected() {
        let mut config = VelocityConfig::default();
        config.engine.max_hypotheses = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, VelocityError::InvalidConfig(_)));
    }

    #[test]
    fn test_generated_hypotheses_capped_by_ceiling() {
        let mut engine = EngineConfig::default();
        assert_eq!(engine.generated_hypotheses(), 2);
        engine.max_hypotheses = 1;
        assert_eq!(engine.generated_hypotheses(), 1);
        engine.max_hypotheses = 4;
        engine.initial_hypotheses = 3;
        assert_eq!(engine.generated_hypotheses(), 3);
    }

    #[test]
    fn test_unknown_trust_category_rejected() {
        let config = VelocityConfig::from_toml("[trust]\nlibrary = 0.5\n").unwrap();
        assert!(config.validate().is_err());
    }
}
