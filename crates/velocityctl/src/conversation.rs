//! Conversation memory for the REPL.
//!
//! The engine answers every query from scratch. Follow-up questions such as
//! "who created it?" only make sense next to the previous turn, so the REPL
//! keeps a bounded transcript and appends the last topic to queries that
//! refer back to it.

use std::collections::VecDeque;

use crate::config::ConversationConfig;

/// Words that point back at an earlier subject (English and Turkish)
const REFERENCE_WORDS: &[&str] = &[
    "it", "its", "they", "them", "their", "this", "that", "these", "those", "he", "she", "his", "her",
    "o", "onu", "onun", "bu", "bunu", "bunun", "şu", "şunu",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Topic the classifier extracted, for user turns
    pub topic: Option<String>,
    /// Answer confidence, for assistant turns
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: VecDeque<Turn>,
    max_turns: usize,
    context_window: usize,
}

impl ConversationBuffer {
    pub fn new(config: &ConversationConfig) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: config.max_turns.max(2),
            context_window: config.context_window,
        }
    }

    pub fn add_user(&mut self, content: &str, topic: &str) {
        let topic = topic.trim();
        self.push(Turn {
            role: Role::User,
            content: content.to_string(),
            topic: (!topic.is_empty()).then(|| topic.to_string()),
            confidence: None,
        });
    }

    pub fn add_assistant(&mut self, content: &str, confidence: f64) {
        self.push(Turn {
            role: Role::Assistant,
            content: content.to_string(),
            topic: None,
            confidence: Some(confidence),
        });
    }

    /// Over the limit, keep only the most recent half
    fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns / 2;
            self.turns.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn recent(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().skip(self.turns.len().saturating_sub(self.context_window))
    }

    /// Topic of the latest user turn inside the context window
    pub fn last_topic(&self) -> Option<&str> {
        self.recent()
            .filter(|t| t.role == Role::User)
            .filter_map(|t| t.topic.as_deref())
            .last()
    }

    /// Query with the previous topic attached when it refers back to it.
    /// Self-contained queries and first turns come back unchanged.
    pub fn enrich_query(&self, query: &str) -> String {
        let Some(topic) = self.last_topic() else {
            return query.to_string();
        };
        let lower = query.to_lowercase();
        if lower.contains(&topic.to_lowercase()) || !refers_back(&lower) {
            return query.to_string();
        }
        format!("{} ({})", query.trim_end(), topic)
    }

    /// Recent turns as a transcript
    pub fn transcript(&self) -> String {
        let mut lines = Vec::new();
        for turn in self.recent() {
            let line = match (turn.role, turn.confidence) {
                (Role::User, _) => format!("User: {}", turn.content),
                (Role::Assistant, Some(c)) => format!("Velocity ({:.0}%): {}", c * 100.0, turn.content),
                (Role::Assistant, None) => format!("Velocity: {}", turn.content),
            };
            lines.push(line);
        }
        lines.join("\n")
    }
}

fn refers_back(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| REFERENCE_WORDS.contains(&word))
}
