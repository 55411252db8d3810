//! Text utilities: tokenization, cleaning of scraped content, sentence
//! segmentation and near-duplicate detection.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"https?://\S+|www\.\S+").ok());

static REFERENCE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\[\d+\]").ok());

static EMPTY_PARENS_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\(\s*\)").ok());

static WHITESPACE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Navigation and cookie-banner leftovers from HTML extraction
const BOILERPLATE_MARKERS: &[&str] = &[
    "cookie",
    "privacy policy",
    "subscribe",
    "newsletter",
    "advertisement",
    "all rights reserved",
    "sign in",
    "sign up",
    "skip to content",
    "toggle navigation",
    "read more",
    "click here",
];

/// Minimum characters for a sentence to be kept
pub const MIN_SENTENCE_CHARS: usize = 20;

/// Minimum words for a sentence to be kept
pub const MIN_SENTENCE_WORDS: usize = 4;

/// Token overlap above which two sentences count as duplicates
pub const DUPLICATE_OVERLAP: f64 = 0.6;

/// Lowercase word tokens. `+` and `#` stay inside tokens so that `c++` and
/// `c#` survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn token_set(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

/// Jaccard similarity of two sets, 0 when both are empty
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Fraction of `candidate`'s tokens already present in `existing`
pub fn containment(candidate: &BTreeSet<String>, existing: &BTreeSet<String>) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }
    candidate.intersection(existing).count() as f64 / candidate.len() as f64
}

fn replace(pattern: &LazyLock<Option<Regex>>, text: &str, with: &str) -> String {
    match pattern.as_ref() {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Strip URLs, reference markers and layout noise from scraped text
pub fn clean(text: &str) -> String {
    let text = replace(&URL_PATTERN, text, "");
    let text = replace(&REFERENCE_PATTERN, &text, "");
    let text = replace(&EMPTY_PARENS_PATTERN, &text, "");
    let text = text.replace(['•', '·', '|', '►', '▸'], ". ");

    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !BOILERPLATE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .collect();

    replace(&WHITESPACE_PATTERN, &kept.join(" "), " ")
        .trim()
        .to_string()
}

/// Split cleaned text into usable sentences.
///
/// Fragments shorter than [`MIN_SENTENCE_CHARS`] or with fewer than
/// [`MIN_SENTENCE_WORDS`] words are dropped; kept sentences start upper-case
/// and end with terminal punctuation.
pub fn segment_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            push_sentence(&mut sentences, &current);
            current.clear();
        }
    }
    push_sentence(&mut sentences, &current);
    sentences
}

fn push_sentence(out: &mut Vec<String>, raw: &str) {
    let s = raw.trim();
    if s.chars().count() < MIN_SENTENCE_CHARS || s.split_whitespace().count() < MIN_SENTENCE_WORDS {
        return;
    }
    let mut sentence = String::with_capacity(s.len() + 1);
    let mut chars = s.chars();
    if let Some(first) = chars.next() {
        sentence.extend(first.to_uppercase());
        sentence.push_str(chars.as_str());
    }
    if !sentence.ends_with(['.', '!', '?']) {
        sentence.push('.');
    }
    out.push(sentence);
}

/// Keep sentences in order, dropping any whose tokens mostly repeat an
/// earlier kept sentence.
pub fn dedup_sentences<I>(sentences: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut kept: Vec<(String, BTreeSet<String>)> = Vec::new();
    for sentence in sentences {
        let tokens = token_set(&sentence);
        let duplicate = kept
            .iter()
            .any(|(_, existing)| containment(&tokens, existing) > DUPLICATE_OVERLAP);
        if !duplicate {
            kept.push((sentence, tokens));
        }
    }
    kept.into_iter().map(|(s, _)| s).collect()
}
