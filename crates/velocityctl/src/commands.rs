//! Subcommand implementations.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use velocity_core::{classify, AnswerFormatter, ExecutionResult, Orchestrator, TermFrequencyScorer};

use crate::cache::QueryCache;
use crate::config::{CliConfig, FormatterProvider, GROQ_KEY_ENV};
use crate::conversation::ConversationBuffer;
use crate::formatter::{GroqFormatter, OllamaFormatter};
use crate::render;
use crate::sources;

const REPL_PROMPT: &str = "velocity> ";

/// Flags shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub no_format: bool,
    pub verbose: bool,
}

impl GlobalOptions {
    fn load_config(&self) -> Result<CliConfig> {
        CliConfig::resolve(self.config.as_deref())
    }
}

fn build_orchestrator(config: &CliConfig) -> Result<Orchestrator> {
    let http = sources::http_client(config.velocity.engine.per_query_timeout())?;
    Orchestrator::new(
        config.velocity.clone(),
        sources::registry(http),
        Arc::new(TermFrequencyScorer::new()),
    )
    .context("Invalid engine configuration")
}

/// Attach the configured formatter if its provider answers a health check.
/// An unreachable provider leaves answers as raw summaries.
async fn attach_formatter(orchestrator: Orchestrator, config: &CliConfig, no_format: bool) -> Result<Orchestrator> {
    let provider = config.formatter.provider;
    if no_format || provider == FormatterProvider::None {
        return Ok(orchestrator);
    }
    let http = sources::http_client(config.formatter.timeout())?;
    let (formatter, healthy): (Arc<dyn AnswerFormatter>, bool) = match provider {
        FormatterProvider::None => return Ok(orchestrator),
        FormatterProvider::Ollama => {
            let formatter = OllamaFormatter::new(http, &config.formatter);
            let healthy = formatter.health_check().await;
            (Arc::new(formatter), healthy)
        }
        FormatterProvider::Groq => {
            let Some(key) = config.formatter.groq_key(std::env::var(GROQ_KEY_ENV).ok()) else {
                warn!("Groq formatter needs an api_key or ${}; answers stay unformatted", GROQ_KEY_ENV);
                return Ok(orchestrator);
            };
            let formatter = GroqFormatter::new(http, &config.formatter, key);
            let healthy = formatter.health_check().await;
            (Arc::new(formatter), healthy)
        }
    };

    if !healthy {
        warn!("{} formatter is not reachable; answers stay unformatted", provider);
        return Ok(orchestrator);
    }
    info!("Formatting answers with {}", provider);
    Ok(orchestrator.with_formatter(formatter))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

pub async fn ask(opts: &GlobalOptions, query: &str, json: bool) -> Result<()> {
    let config = opts.load_config()?;
    let orchestrator = attach_formatter(build_orchestrator(&config)?, &config, opts.no_format).await?;
    let result = orchestrator.execute(query).await;
    if json {
        print_json(&result)
    } else {
        render::print_result(&result, opts.verbose);
        Ok(())
    }
}

/// One line of REPL input
#[derive(Debug, Clone, PartialEq)]
pub enum ReplInput {
    Exit,
    Help,
    History,
    CacheStats,
    Clear,
    Query(String),
}

impl ReplInput {
    /// None for a blank line
    pub fn parse(line: &str) -> Option<Self> {
        let input = line.trim();
        if input.is_empty() {
            return None;
        }
        if is_exit(input) {
            return Some(Self::Exit);
        }
        let command = match input.to_lowercase().as_str() {
            "help" | "yardım" => Self::Help,
            "history" | "geçmiş" => Self::History,
            "cache" => Self::CacheStats,
            "clear" | "temizle" => Self::Clear,
            _ => Self::Query(input.to_string()),
        };
        Some(command)
    }
}

/// Answer from a REPL turn
pub struct ReplAnswer {
    pub result: ExecutionResult,
    /// Query as sent to the engine, after follow-up enrichment
    pub effective_query: String,
    pub cached: bool,
}

/// State one REPL session keeps between questions
pub struct ReplSession {
    orchestrator: Orchestrator,
    cache: Option<QueryCache>,
    conversation: Option<ConversationBuffer>,
}

impl ReplSession {
    pub fn new(orchestrator: Orchestrator, config: &CliConfig) -> Self {
        Self {
            orchestrator,
            cache: QueryCache::from_config(&config.cache),
            conversation: config
                .conversation
                .enabled
                .then(|| ConversationBuffer::new(&config.conversation)),
        }
    }

    pub async fn ask(&mut self, query: &str) -> ReplAnswer {
        let effective_query = match &self.conversation {
            Some(conversation) => conversation.enrich_query(query),
            None => query.to_string(),
        };

        let cached = self.cache.as_mut().and_then(|c| c.get(&effective_query));
        let (result, cached) = match cached {
            Some(result) => (result, true),
            None => {
                let result = self.orchestrator.execute(&effective_query).await;
                // Failed lookups are retried next time rather than remembered
                if let Some(cache) = self.cache.as_mut().filter(|_| !result.evidence.is_empty()) {
                    cache.put(&effective_query, result.clone());
                }
                (result, false)
            }
        };

        if let Some(conversation) = self.conversation.as_mut() {
            let topic = self.orchestrator.classify(&effective_query).topic;
            conversation.add_user(query, &topic);
            conversation.add_assistant(result.answer(), result.confidence);
        }

        ReplAnswer {
            result,
            effective_query,
            cached,
        }
    }

    pub fn history(&self) -> String {
        self.conversation
            .as_ref()
            .map(|c| c.transcript())
            .unwrap_or_default()
    }

    pub fn cache_stats(&self) -> String {
        self.cache
            .as_ref()
            .map(|c| c.stats_line())
            .unwrap_or_else(|| "cache disabled".to_string())
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
        if let Some(conversation) = self.conversation.as_mut() {
            conversation.clear();
        }
    }
}

fn print_repl_help() {
    println!("Commands:");
    println!("  exit, quit  - leave");
    println!("  history     - show the conversation so far");
    println!("  cache       - show answer cache statistics");
    println!("  clear       - forget the conversation and cached answers");
    println!("  help        - show this help");
    println!("  <question>  - ask Velocity");
}

pub async fn repl(opts: &GlobalOptions) -> Result<()> {
    let config = opts.load_config()?;
    let orchestrator = attach_formatter(build_orchestrator(&config)?, &config, opts.no_format).await?;
    let mut session = ReplSession::new(orchestrator, &config);
    println!("Velocity {} - type a question, 'help' for commands, or 'exit' to leave", velocity_core::VERSION);

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", REPL_PROMPT);
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("Failed to read input")?;
        let Some(input) = ReplInput::parse(&line) else {
            continue;
        };
        match input {
            ReplInput::Exit => break,
            ReplInput::Help => print_repl_help(),
            ReplInput::History => {
                let history = session.history();
                if history.is_empty() {
                    println!("No conversation yet");
                } else {
                    println!("{}", history);
                }
            }
            ReplInput::CacheStats => println!("{}", session.cache_stats()),
            ReplInput::Clear => {
                session.clear();
                println!("Conversation and cache cleared");
            }
            ReplInput::Query(query) => {
                let answer = session.ask(&query).await;
                render::print_answer_notes(&query, &answer.effective_query, answer.cached);
                render::print_result(&answer.result, opts.verbose);
            }
        }
    }
    Ok(())
}

pub fn is_exit(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "exit" | "quit" | "çıkış")
}

pub fn classify_query(query: &str, json: bool) -> Result<()> {
    let intent = classify(query);
    if json {
        print_json(&intent)
    } else {
        render::print_intent(&intent);
        Ok(())
    }
}

pub fn route(opts: &GlobalOptions, query: &str, json: bool) -> Result<()> {
    let config = opts.load_config()?;
    let orchestrator = build_orchestrator(&config)?;
    let intent = orchestrator.classify(query);
    let strategies = orchestrator.route(&intent);
    if json {
        print_json(&strategies)
    } else {
        render::print_intent(&intent);
        println!();
        render::print_route(&strategies);
        Ok(())
    }
}

pub fn show_config(opts: &GlobalOptions) -> Result<()> {
    let config = opts.load_config()?;
    config.velocity.validate().context("Invalid engine configuration")?;
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use velocity_core::{AdapterRegistry, SourceCategory, StaticSourceAdapter, StaticSourceAdapterBuilder};

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit(" QUIT "));
        assert!(is_exit("çıkış"));
        assert!(!is_exit("exit strategy for startups"));
    }

    #[test]
    fn test_repl_input_commands() {
        assert_eq!(ReplInput::parse("   "), None);
        assert_eq!(ReplInput::parse("quit"), Some(ReplInput::Exit));
        assert_eq!(ReplInput::parse("History"), Some(ReplInput::History));
        assert_eq!(ReplInput::parse("temizle"), Some(ReplInput::Clear));
        assert_eq!(
            ReplInput::parse(" history of rome "),
            Some(ReplInput::Query("history of rome".to_string()))
        );
    }

    #[test]
    fn test_orchestrator_builds_from_defaults() {
        assert!(build_orchestrator(&CliConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_engine_config_is_reported() {
        let mut config = CliConfig::default();
        config.velocity.engine.max_hypotheses = 0;
        let err = build_orchestrator(&config).err().unwrap();
        assert!(format!("{:#}", err).contains("max_hypotheses"));
    }

    #[tokio::test]
    async fn test_disabled_formatter_skips_health_check() {
        let config = CliConfig::default();
        let orchestrator = attach_formatter(build_orchestrator(&config).unwrap(), &config, false).await;
        assert!(orchestrator.is_ok());
    }

    fn python_session(config: &CliConfig) -> (ReplSession, Arc<StaticSourceAdapter>) {
        let wiki = Arc::new(
            StaticSourceAdapterBuilder::new(SourceCategory::Encyclopedic)
                .hit("wiki:python", "Python is a programming language created by Guido van Rossum.")
                .build(),
        );
        let docs = Arc::new(
            StaticSourceAdapterBuilder::new(SourceCategory::FormalDocs)
                .hit("docs:python", "Python is a programming language with clear syntax.")
                .build(),
        );
        let registry = AdapterRegistry::new().with(wiki.clone()).with(docs);
        let orchestrator =
            Orchestrator::new(config.velocity.clone(), registry, Arc::new(TermFrequencyScorer::new())).unwrap();
        (ReplSession::new(orchestrator, config), wiki)
    }

    #[tokio::test]
    async fn test_repeated_question_served_from_cache() {
        let (mut session, wiki) = python_session(&CliConfig::default());
        let first = session.ask("What is Python?").await;
        let calls = wiki.call_count();
        let second = session.ask("what is   python?").await;

        assert!(!first.cached);
        assert!(!first.result.evidence.is_empty());
        assert!(second.cached);
        assert_eq!(wiki.call_count(), calls);
        assert_eq!(second.result, first.result);
    }

    #[tokio::test]
    async fn test_follow_up_carries_previous_topic() {
        let (mut session, wiki) = python_session(&CliConfig::default());
        session.ask("What is Python?").await;
        let answer = session.ask("Who created it?").await;

        assert_eq!(answer.effective_query, "Who created it? (Python)");
        assert!(wiki.queries().last().unwrap().contains("Python"));
        assert!(session.history().starts_with("User: What is Python?"));
    }

    #[tokio::test]
    async fn test_session_without_memory_or_cache() {
        let mut config = CliConfig::default();
        config.cache.enabled = false;
        config.conversation.enabled = false;
        let (mut session, _) = python_session(&config);
        session.ask("What is Python?").await;
        let answer = session.ask("Who created it?").await;

        assert_eq!(answer.effective_query, "Who created it?");
        assert!(!answer.cached);
        assert_eq!(session.history(), "");
        assert_eq!(session.cache_stats(), "cache disabled");
    }
}
