//! Intent classifier.
//!
//! Turns raw query text into a structured [`Intent`] using ordered phrase
//! rules. Classification is a pure function of the text: the same query
//! always yields the same intent, and no input is rejected.
//!
//! Rule priority: SOCIAL and META short-circuit first, then GENERATIVE,
//! COMPARATIVE, PREDICTIVE, STRATEGIC, ANALYTICAL, PROCEDURAL, and FACTUAL
//! as the default. English and Turkish vocabularies are recognised.

use crate::text::tokenize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionType {
    Factual,
    Comparative,
    Predictive,
    Strategic,
    Analytical,
    Procedural,
    Generative,
    Social,
    Meta,
}

impl std::fmt::Display for DecisionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Factual => "factual",
            Self::Comparative => "comparative",
            Self::Predictive => "predictive",
            Self::Strategic => "strategic",
            Self::Analytical => "analytical",
            Self::Procedural => "procedural",
            Self::Generative => "generative",
            Self::Social => "social",
            Self::Meta => "meta",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UncertaintyHint {
    Low,
    Medium,
    High,
}

/// Natural language the query was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    English,
    Turkish,
}

impl Locale {
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Turkish => "Turkish",
        }
    }
}

/// Target programming language of a GENERATIVE request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageTag {
    Unspecified,
    Python,
    JavaScript,
    TypeScript,
    C,
    Cpp,
    CSharp,
    Java,
    Go,
    Rust,
    Php,
    Ruby,
    Swift,
    Kotlin,
    Sql,
    Html,
    Css,
    Bash,
}

impl LanguageTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unspecified => "unspecified",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Java => "java",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Php => "php",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
            Self::Kotlin => "kotlin",
            Self::Sql => "sql",
            Self::Html => "html",
            Self::Css => "css",
            Self::Bash => "bash",
        }
    }

    /// Resolve a single lowercase token against the fixed vocabulary
    pub fn from_token(token: &str) -> Option<Self> {
        let tag = match token {
            "python" | "py" | "python3" => Self::Python,
            "javascript" | "js" | "node" | "nodejs" => Self::JavaScript,
            "typescript" | "ts" => Self::TypeScript,
            "c" => Self::C,
            "c++" | "cpp" => Self::Cpp,
            "c#" | "csharp" => Self::CSharp,
            "java" => Self::Java,
            "go" | "golang" => Self::Go,
            "rust" => Self::Rust,
            "php" => Self::Php,
            "ruby" => Self::Ruby,
            "swift" => Self::Swift,
            "kotlin" => Self::Kotlin,
            "sql" => Self::Sql,
            "html" => Self::Html,
            "css" => Self::Css,
            "bash" | "shell" | "sh" => Self::Bash,
            _ => return None,
        };
        Some(tag)
    }
}

impl std::fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured interpretation of a query. Immutable once classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub query: String,
    pub decision_type: DecisionType,
    pub topic: String,
    pub subgoals: Vec<String>,
    pub uncertainty_hint: UncertaintyHint,
    pub language: LanguageTag,
    pub locale: Locale,
}

impl Intent {
    /// An intent with nothing to research
    pub fn is_degenerate(&self) -> bool {
        self.topic.trim().is_empty()
    }
}

// === Vocabulary ===

const SOCIAL_PHRASES: &[&str] = &[
    "hello", "hi", "hey", "merhaba", "selam", "thanks", "thank you", "thx", "teşekkürler",
    "teşekkür ederim", "sağol", "good morning", "good evening", "günaydın", "how are you",
    "nasılsın", "bye", "goodbye", "görüşürüz",
];

/// Social phrases only short-circuit short messages that open or close with one
const SOCIAL_MAX_WORDS: usize = 5;

const META_PHRASES: &[&str] = &[
    "who are you", "what are you", "what can you do", "what is your name", "your name",
    "are you a bot", "sen kimsin", "sen nesin", "ne yapabilirsin", "adın ne",
];

const GENERATIVE_VERBS: &[&str] = &[
    "write", "generate", "create", "implement", "build", "yaz", "yazar mısın", "oluştur", "üret",
];

const CODE_NOUNS: &[&str] = &[
    "code", "kod", "kodu", "script", "program", "function", "fonksiyon", "snippet", "class",
];

const COMPARATIVE_PHRASES: &[&str] = &[
    "difference between", "differences between", "which is better", "better than",
    "hangisi daha iyi", "comparison", "compare", "versus", "vs", "difference", "karşılaştır",
    "karşılaştırma", "farkı", "farkları", "fark",
];

/// Tokens that split the compared items of a COMPARATIVE query
const COMPARATIVE_SEPARATORS: &[&str] = &["vs", "versus", "and", "or", "than", "ile", "veya"];

const PREDICTIVE_PHRASES: &[&str] = &[
    "going to", "next year", "will", "predict", "prediction", "forecast", "future", "outlook",
    "gelecekte", "gelecek", "olacak", "tahmin",
];

const STRATEGIC_PHRASES: &[&str] = &[
    "should i", "should we", "best way", "which should", "strategy", "strategies", "recommend",
    "recommendation", "advice", "roadmap", "plan", "tavsiye", "öneri", "strateji", "yapmalıyım",
];

const ANALYTICAL_PHRASES: &[&str] = &[
    "why", "analyze", "analyse", "analysis", "explain", "cause", "causes", "impact", "effect",
    "effects", "reason", "neden", "niçin", "analiz", "açıkla", "sebep", "etkisi",
];

const PROCEDURAL_PHRASES: &[&str] = &[
    "how to", "how do i", "how can i", "how do you", "step by step", "steps", "install",
    "set up", "setup", "configure", "tutorial", "guide", "nasıl", "adımlar", "adım", "kurulum",
    "yapılır",
];

/// Question scaffolding stripped from every topic
const FACTUAL_PHRASES: &[&str] = &[
    "what is", "what are", "what was", "who is", "who was", "who are", "tell me about",
    "definition of", "meaning of", "define", "nedir", "kimdir", "ne demek",
];

const HEDGE_PHRASES: &[&str] = &[
    "maybe", "perhaps", "might", "possibly", "probably", "not sure", "unsure", "i think",
    "i guess", "could it be", "olabilir", "belki", "galiba", "sanırım", "muhtemelen",
    "emin değilim",
];

/// Filler trimmed from the edges of an extracted topic
const EDGE_FILLER: &[&str] = &[
    "a", "an", "the", "for", "of", "about", "in", "on", "to", "me", "please", "is", "are", "do",
    "does", "bir", "için", "lütfen", "hakkında", "bana", "mi", "mı", "mu", "mü",
];

const TURKISH_MARKERS: &[&str] = &[
    "nedir", "kimdir", "nasıl", "neden", "yaz", "kodu", "merhaba", "selam", "hangisi", "ile",
    "veya", "bir", "için", "olabilir", "belki", "mi", "mı", "nasılsın", "ne", "karşılaştır",
];

const TURKISH_LETTERS: &[char] = &['ç', 'ğ', 'ı', 'ö', 'ş', 'ü', 'Ç', 'Ğ', 'İ', 'Ö', 'Ş', 'Ü'];

// === Word matching ===

#[derive(Debug, Clone)]
struct Word {
    raw: String,
    lower: String,
}

fn split_words(text: &str) -> Vec<Word> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|w| !w.is_empty())
        .map(|w| Word {
            raw: w.to_string(),
            lower: w.to_lowercase(),
        })
        .collect()
}

/// Start index of the first unremoved occurrence of `phrase`
fn find_phrase(words: &[Word], removed: &[bool], phrase: &[String]) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > words.len() {
        return None;
    }
    (0..=words.len() - phrase.len()).find(|&start| {
        phrase
            .iter()
            .enumerate()
            .all(|(i, p)| !removed[start + i] && words[start + i].lower == *p)
    })
}

/// Whether the message opens or closes with one of `phrases`
fn at_edge(words: &[Word], phrases: &[&str]) -> bool {
    phrases.iter().any(|p| {
        let tokens = tokenize(p);
        let n = tokens.len();
        if n == 0 || n > words.len() {
            return false;
        }
        let matches = |slice: &[Word]| slice.iter().zip(&tokens).all(|(w, t)| w.lower == *t);
        matches(&words[..n]) || matches(&words[words.len() - n..])
    })
}

fn contains_any(words: &[Word], phrases: &[&str]) -> bool {
    let removed = vec![false; words.len()];
    phrases
        .iter()
        .any(|p| find_phrase(words, &removed, &tokenize(p)).is_some())
}

/// Mark every occurrence of every phrase as removed; true if any matched
fn remove_all(words: &[Word], removed: &mut [bool], phrases: &[&str]) -> bool {
    let mut matched = false;
    for phrase in phrases {
        let tokens = tokenize(phrase);
        while let Some(start) = find_phrase(words, removed, &tokens) {
            for flag in &mut removed[start..start + tokens.len()] {
                *flag = true;
            }
            matched = true;
        }
    }
    matched
}

fn trim_filler(words: Vec<&Word>) -> Vec<&Word> {
    let is_filler = |w: &&Word| EDGE_FILLER.contains(&w.lower.as_str());
    let start = words.iter().position(|w| !is_filler(w)).unwrap_or(words.len());
    let end = words
        .iter()
        .rposition(|w| !is_filler(w))
        .map_or(start, |i| i + 1);
    words[start..end].to_vec()
}

fn join(words: &[&Word]) -> String {
    words.iter().map(|w| w.raw.as_str()).collect::<Vec<_>>().join(" ")
}

fn detect_locale(query: &str, words: &[Word]) -> Locale {
    if query.chars().any(|c| TURKISH_LETTERS.contains(&c))
        || words.iter().any(|w| TURKISH_MARKERS.contains(&w.lower.as_str()))
    {
        Locale::Turkish
    } else {
        Locale::English
    }
}

fn is_generative(words: &[Word]) -> bool {
    let has_verb = contains_any(words, GENERATIVE_VERBS);
    let has_noun = contains_any(words, CODE_NOUNS);
    let has_language = words.iter().any(|w| LanguageTag::from_token(&w.lower).is_some());
    (has_verb && (has_noun || has_language)) || (has_noun && has_language)
}

fn classify_type(words: &[Word]) -> DecisionType {
    if words.len() <= SOCIAL_MAX_WORDS && at_edge(words, SOCIAL_PHRASES) {
        return DecisionType::Social;
    }
    if contains_any(words, META_PHRASES) {
        return DecisionType::Meta;
    }
    if is_generative(words) {
        return DecisionType::Generative;
    }
    let ordered: [(DecisionType, &[&str]); 5] = [
        (DecisionType::Comparative, COMPARATIVE_PHRASES),
        (DecisionType::Predictive, PREDICTIVE_PHRASES),
        (DecisionType::Strategic, STRATEGIC_PHRASES),
        (DecisionType::Analytical, ANALYTICAL_PHRASES),
        (DecisionType::Procedural, PROCEDURAL_PHRASES),
    ];
    ordered
        .iter()
        .find(|(_, phrases)| contains_any(words, phrases))
        .map(|(t, _)| *t)
        .unwrap_or(DecisionType::Factual)
}

fn trigger_phrases(decision_type: DecisionType) -> &'static [&'static str] {
    match decision_type {
        DecisionType::Social => SOCIAL_PHRASES,
        DecisionType::Meta => META_PHRASES,
        DecisionType::Comparative => &[
            "difference between", "differences between", "which is better", "hangisi daha iyi",
            "comparison", "compare", "difference", "karşılaştır", "karşılaştırma", "farkı",
            "farkları", "fark", "better", "worse", "daha iyi",
        ],
        DecisionType::Predictive => PREDICTIVE_PHRASES,
        DecisionType::Strategic => STRATEGIC_PHRASES,
        DecisionType::Analytical => ANALYTICAL_PHRASES,
        DecisionType::Procedural => PROCEDURAL_PHRASES,
        DecisionType::Generative | DecisionType::Factual => &[],
    }
}

/// Classify a query. Never fails.
pub fn classify(query: &str) -> Intent {
    let words = split_words(query);
    let decision_type = classify_type(&words);
    let locale = detect_locale(query, &words);

    let uncertainty_hint = match decision_type {
        DecisionType::Social | DecisionType::Meta => UncertaintyHint::Low,
        _ if contains_any(&words, HEDGE_PHRASES) => UncertaintyHint::High,
        _ => UncertaintyHint::Medium,
    };

    let mut removed = vec![false; words.len()];
    remove_all(&words, &mut removed, HEDGE_PHRASES);
    remove_all(&words, &mut removed, FACTUAL_PHRASES);
    remove_all(&words, &mut removed, trigger_phrases(decision_type));

    let mut language = LanguageTag::Unspecified;
    if decision_type == DecisionType::Generative {
        remove_all(&words, &mut removed, GENERATIVE_VERBS);
        remove_all(&words, &mut removed, CODE_NOUNS);
        for (i, word) in words.iter().enumerate() {
            if removed[i] {
                continue;
            }
            if let Some(tag) = LanguageTag::from_token(&word.lower) {
                if language == LanguageTag::Unspecified {
                    language = tag;
                }
                removed[i] = true;
            }
        }
    }

    let remaining: Vec<&Word> = words
        .iter()
        .zip(&removed)
        .filter(|(_, r)| !**r)
        .map(|(w, _)| w)
        .collect();

    let (topic, subgoals) = if decision_type == DecisionType::Comparative {
        comparative_topic(remaining)
    } else {
        let topic = join(&trim_filler(remaining));
        (topic.clone(), vec![topic])
    };

    let topic = if topic.is_empty() {
        query.trim().to_string()
    } else {
        topic
    };
    let subgoals = subgoals.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>();
    let subgoals = if subgoals.is_empty() && !topic.is_empty() {
        vec![topic.clone()]
    } else {
        subgoals
    };

    Intent {
        query: query.to_string(),
        decision_type,
        topic,
        subgoals,
        uncertainty_hint,
        language,
        locale,
    }
}

/// Split the remaining words of a comparison into the compared items
fn comparative_topic(remaining: Vec<&Word>) -> (String, Vec<String>) {
    let mut parts: Vec<Vec<&Word>> = vec![Vec::new()];
    for word in remaining {
        if COMPARATIVE_SEPARATORS.contains(&word.lower.as_str()) {
            parts.push(Vec::new());
        } else if let Some(last) = parts.last_mut() {
            last.push(word);
        }
    }
    let items: Vec<String> = parts
        .into_iter()
        .map(|p| join(&trim_filler(p)))
        .filter(|s| !s.is_empty())
        .collect();

    match items.len() {
        0 => (String::new(), Vec::new()),
        1 => (items[0].clone(), items),
        _ => (items.join(" vs "), items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factual_default() {
        let intent = classify("What is Rust?");
        assert_eq!(intent.decision_type, DecisionType::Factual);
        assert_eq!(intent.topic, "Rust");
        assert_eq!(intent.uncertainty_hint, UncertaintyHint::Medium);
        assert_eq!(intent.language, LanguageTag::Unspecified);
    }

    #[test]
    fn test_generative_resolves_language() {
        let intent = classify("write C code for fibonacci");
        assert_eq!(intent.decision_type, DecisionType::Generative);
        assert_eq!(intent.language.as_str(), "c");
        assert_eq!(intent.topic, "fibonacci");
    }

    #[test]
    fn test_turkish_generative() {
        let intent = classify("bir python kodu yaz");
        assert_eq!(intent.decision_type, DecisionType::Generative);
        assert_eq!(intent.language, LanguageTag::Python);
        assert_eq!(intent.locale, Locale::Turkish);
    }

    #[test]
    fn test_language_mention_alone_is_not_generative() {
        let intent = classify("python nedir");
        assert_eq!(intent.decision_type, DecisionType::Factual);
        assert_eq!(intent.topic, "python");
    }

    #[test]
    fn test_comparative_subgoals() {
        let intent = classify("What is the difference between TCP and UDP?");
        assert_eq!(intent.decision_type, DecisionType::Comparative);
        assert_eq!(intent.subgoals, vec!["TCP".to_string(), "UDP".to_string()]);
        assert_eq!(intent.topic, "TCP vs UDP");
    }

    #[test]
    fn test_social_short_circuit() {
        let intent = classify("hello there");
        assert_eq!(intent.decision_type, DecisionType::Social);
        assert_eq!(intent.uncertainty_hint, UncertaintyHint::Low);
        assert_eq!(classify("ok thanks").decision_type, DecisionType::Social);
    }

    #[test]
    fn test_greeting_inside_a_question_is_not_social() {
        let intent = classify("What is hi-fi?");
        assert_eq!(intent.decision_type, DecisionType::Factual);
        assert_eq!(intent.topic, "hi fi");
    }

    #[test]
    fn test_better_than_splits_cleanly() {
        let intent = classify("Is Python better than Java?");
        assert_eq!(intent.decision_type, DecisionType::Comparative);
        assert_eq!(intent.subgoals, vec!["Python".to_string(), "Java".to_string()]);
        assert_eq!(intent.topic, "Python vs Java");
    }

    #[test]
    fn test_hedge_raises_uncertainty() {
        let intent = classify("maybe quantum computing is overhyped");
        assert_eq!(intent.uncertainty_hint, UncertaintyHint::High);
        assert!(!intent.topic.to_lowercase().contains("maybe"));
    }

    #[test]
    fn test_empty_query_never_fails() {
        let intent = classify("   ");
        assert_eq!(intent.decision_type, DecisionType::Factual);
        assert!(intent.is_degenerate());
        assert!(intent.subgoals.is_empty());
    }
}
