//! Terminal rendering of results, intents and routes.

use owo_colors::OwoColorize;
use velocity_core::{ExecutionResult, Intent, SourceStrategy, Uncertainty};

const WRAP_WIDTH: usize = 80;

fn wrapped(text: &str, indent: &str) -> String {
    let options = textwrap::Options::new(WRAP_WIDTH)
        .initial_indent(indent)
        .subsequent_indent(indent);
    textwrap::fill(text, options)
}

fn confidence_line(result: &ExecutionResult) -> String {
    let value = format!("{:.2} ({})", result.confidence, result.confidence_label());
    if result.confidence >= 0.8 {
        value.bright_green().to_string()
    } else if result.confidence >= 0.55 {
        value.yellow().to_string()
    } else {
        value.bright_red().to_string()
    }
}

fn uncertainty_line(uncertainty: Uncertainty) -> String {
    match uncertainty {
        Uncertainty::Low => uncertainty.to_string().green().to_string(),
        Uncertainty::Medium => uncertainty.to_string().yellow().to_string(),
        _ => uncertainty.to_string().red().to_string(),
    }
}

pub fn print_result(result: &ExecutionResult, verbose: bool) {
    println!();
    println!("{}", wrapped(result.answer(), ""));
    println!();
    println!("{} {}", "Confidence: ".bold(), confidence_line(result));
    println!("{} {}", "Uncertainty:".bold(), uncertainty_line(result.uncertainty));

    if !result.source_breakdown.is_empty() {
        let breakdown: Vec<String> = result
            .source_breakdown
            .iter()
            .map(|(category, count)| format!("{} x{}", category, count))
            .collect();
        println!("{} {}", "Sources:    ".bold(), breakdown.join(", "));
    }

    if (result.natural_answer.is_some() || verbose) && !result.key_facts.is_empty() {
        println!();
        println!("{}", "[KEY FACTS]".bold());
        for fact in &result.key_facts {
            println!("{}", wrapped(fact, "  * "));
        }
    }

    if !result.evidence.is_empty() {
        println!();
        println!("{}", "[EVIDENCE]".bold());
        for e in &result.evidence {
            println!(
                "  * {} {}",
                e.source_id.cyan(),
                format!("(trust {:.2}, relevance {:.2})", e.trust_weight, e.relevance_score).dimmed()
            );
        }
    }

    if verbose {
        println!();
        println!("{}", "[TRACE]".bold());
        for step in &result.reasoning_trace {
            println!("  {}", step.to_string().dimmed());
        }
    }
    println!();
}

/// How a REPL answer was obtained, when it differs from a plain lookup
pub fn print_answer_notes(query: &str, effective_query: &str, cached: bool) {
    if effective_query != query {
        println!("{}", format!("(asked as: {})", effective_query).dimmed());
    }
    if cached {
        println!("{}", "(cached answer)".dimmed());
    }
}

pub fn print_intent(intent: &Intent) {
    println!("{} {}", "Decision type:".bold(), intent.decision_type);
    println!("{} {}", "Topic:        ".bold(), intent.topic);
    if !intent.subgoals.is_empty() {
        println!("{} {}", "Subgoals:     ".bold(), intent.subgoals.join(" | "));
    }
    println!("{} {:?}", "Uncertainty:  ".bold(), intent.uncertainty_hint);
    println!("{} {}", "Language:     ".bold(), intent.language);
    println!("{} {}", "Locale:       ".bold(), intent.locale.name());
}

pub fn print_route(strategies: &[SourceStrategy]) {
    if strategies.is_empty() {
        println!("{}", "No strategies: nothing to research".yellow());
        return;
    }
    for s in strategies {
        println!(
            "  {}. {:<16} trust {:.2}  cost {:.2} x {}",
            s.priority + 1,
            s.category.to_string().cyan(),
            s.trust_weight,
            s.cost_weight,
            s.max_queries
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_respects_width_and_indent() {
        let text = "word ".repeat(40);
        let out = wrapped(&text, "  * ");
        for line in out.lines() {
            assert!(line.chars().count() <= WRAP_WIDTH);
            assert!(line.starts_with("  * "));
        }
    }
}
