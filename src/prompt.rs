//! Prompt templates for the external text-generation service.
//!
//! Pure string building; the same inputs always produce the same prompt.

use std::fmt::Write as _;

use crate::metrics::Metrics;
use crate::rules::AnalysisKind;
use crate::scorer::Finding;

/// A backtick fence strictly longer than any backtick run in `text`, and at
/// least three characters long.
pub fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Wrap `code` in a language-tagged fence that cannot collide with it.
pub fn fenced(language: &str, code: &str) -> String {
    let fence = fence_for(code);
    let newline = if code.ends_with('\n') { "" } else { "\n" };
    format!("{fence}{language}\n{code}{newline}{fence}")
}

/// Build the instruction prompt for a code analysis.
pub fn build_code_prompt(
    kind: AnalysisKind,
    language: &str,
    code: &str,
    findings: &[Finding],
    metrics: &Metrics,
) -> String {
    let mut prompt = String::new();

    let _ = writeln!(prompt, "{}", intro(kind, language));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "{}", fenced(language, code));
    let _ = writeln!(prompt);

    if kind == AnalysisKind::Optimize {
        let _ = writeln!(
            prompt,
            "Code metrics: {} lines, {} functions, {} classes, max nesting depth {}.",
            metrics.line_count,
            metrics.function_count,
            metrics.class_count,
            metrics.max_nesting_depth
        );
        let _ = writeln!(prompt);
    }

    let _ = writeln!(prompt, "Patterns detected by static analysis:");
    if findings.is_empty() {
        let _ = writeln!(prompt, "- None detected.");
    } else {
        for finding in findings {
            let _ = writeln!(prompt, "- {}: {}", finding.name, finding.description);
        }
    }
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "Respond in Markdown using exactly these sections:");
    let _ = writeln!(prompt);
    prompt.push_str(sections(kind));

    prompt
}

fn intro(kind: AnalysisKind, language: &str) -> String {
    let upper = language.to_uppercase();
    match kind {
        AnalysisKind::Bugs => format!(
            "Analyze this {upper} code for bugs, anti-patterns and risky constructs. Be thorough and explain each issue to a student."
        ),
        AnalysisKind::Review => format!(
            "Review this {upper} code as a patient senior engineer mentoring a student. Cover correctness, readability and style."
        ),
        AnalysisKind::Optimize => format!(
            "As an expert software engineer, analyze and improve the performance and structure of this {upper} code."
        ),
    }
}

fn sections(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Bugs => {
            "## Critical Bug Analysis\n\n\
             ### High Severity Issues\n[Critical bugs with explanations]\n\n\
             ### Medium Severity Issues\n[Important issues with explanations]\n\n\
             ### Code Improvements\n[Suggestions and best practices]\n\n\
             ### Fixed Code Examples\n[Before/after code snippets]\n"
        }
        AnalysisKind::Review => {
            "## Summary\n[One paragraph overall impression]\n\n\
             ## Strengths\n[What the code does well]\n\n\
             ## Issues\n[Problems ordered by importance]\n\n\
             ## Suggestions\n[Concrete changes with short code examples]\n"
        }
        AnalysisKind::Optimize => {
            "## Deep Analysis\n[Time and space complexity, bottlenecks]\n\n\
             ## Optimization Strategies\n[Algorithm and data structure improvements]\n\n\
             ## Specific Improvements\n[Numbered list of changes]\n\n\
             ## Before/After Comparison\n[Optimized code and complexity comparison]\n"
        }
    }
}

/// Build the prompt for a concept explanation.
pub fn build_topic_prompt(language: &str, topic: &str, category: &str) -> String {
    format!(
        "Explain the {category} topic \"{topic}\" in {language} to a programming student.\n\n\
         Respond in Markdown with these sections:\n\n\
         ## Overview\n[What it is and why it matters]\n\n\
         ## Key Points\n[The essential ideas as a bulleted list]\n\n\
         ## Example\n[A short, runnable {language} example with comments]\n\n\
         ## Common Mistakes\n[Pitfalls beginners run into]\n\n\
         ## Practice\n[Two or three small exercises]\n"
    )
}
