//! Report assembly and the degradation ladder.
//!
//! Every request ends in a report. Which one depends on how far the pipeline
//! got:
//!
//! 1. `ai_success`: the gateway produced an acceptable completion.
//! 2. `heuristic_fallback`: the gateway failed or was skipped; the report is
//!    synthesized from the [`Assessment`].
//! 3. `basic_fallback`: the heuristic stage itself failed; only sizes are
//!    reported.
//!
//! All formatting is deterministic: the same inputs give the same bytes.

use std::fmt::Write as _;

use serde::Serialize;

use crate::metrics::Metrics;
use crate::prompt::fenced;
use crate::rules::{AnalysisKind, Severity};
use crate::scorer::{Assessment, Finding, QualityScores, RiskSummary};
use crate::topics::{self, TopicCategory};

/// Model reported for the basic fallback.
pub const FALLBACK_MODEL: &str = "fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    AiSuccess,
    HeuristicFallback,
    BasicFallback,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::AiSuccess => "ai_success",
            ReportStatus::HeuristicFallback => "heuristic_fallback",
            ReportStatus::BasicFallback => "basic_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Metrics block returned with every code report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMetrics {
    #[serde(flatten)]
    pub structure: Metrics,
    #[serde(flatten)]
    pub risk: RiskSummary,
    /// Only present on reviews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<QualityScores>,
}

impl ReportMetrics {
    fn from_assessment(kind: AnalysisKind, assessment: &Assessment) -> Self {
        Self {
            structure: assessment.metrics.clone(),
            risk: assessment.risk.clone(),
            scores: (kind == AnalysisKind::Review).then(|| assessment.scores.clone()),
        }
    }
}

/// A finished code report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub body: String,
    pub status: ReportStatus,
    pub model: String,
    pub confidence: Confidence,
    pub metrics: ReportMetrics,
    /// Rule IDs that matched, in catalog order. Empty for basic fallbacks.
    pub patterns_found: Vec<&'static str>,
}

/// Model name used when the report was synthesized from heuristics.
pub fn heuristic_model(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Optimize => "static_analyzer",
        AnalysisKind::Review | AnalysisKind::Bugs => "pattern_matcher",
    }
}

/// Wrap a successful completion with a provenance header and footer.
pub fn ai_report(
    kind: AnalysisKind,
    provider: &str,
    text: &str,
    assessment: &Assessment,
) -> Report {
    let body = format!(
        "## {title}\n\n*Analyzed with {provider}*\n\n{text}\n\n---\n*AI analysis completed. Static analysis found {total} pattern(s), overall risk {risk}.*\n",
        title = kind.title(),
        total = assessment.risk.total,
        risk = assessment.risk.overall_risk,
    );

    Report {
        body,
        status: ReportStatus::AiSuccess,
        model: provider.to_string(),
        confidence: Confidence::High,
        metrics: ReportMetrics::from_assessment(kind, assessment),
        patterns_found: assessment.pattern_ids(),
    }
}

/// Synthesize a report from heuristic findings alone.
pub fn heuristic_report(kind: AnalysisKind, language: &str, assessment: &Assessment) -> Report {
    let mut body = String::new();

    let _ = writeln!(body, "## {}: Heuristic Analysis\n", kind.title());
    let _ = writeln!(
        body,
        "*Generated by static pattern analysis for {language}. AI analysis was unavailable.*\n"
    );

    if assessment.findings.is_empty() {
        let _ = writeln!(body, "### No Issues Detected\n");
        let _ = writeln!(
            body,
            "No known problem patterns were found. That does not prove the code is correct: test edge cases and review the logic by hand.\n"
        );
    } else {
        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            write_severity_group(&mut body, language, severity, assessment);
        }
    }

    write_metrics_table(&mut body, kind, assessment);
    write_risk_summary(&mut body, &assessment.risk);

    if kind == AnalysisKind::Optimize {
        write_targeted_advice(&mut body, assessment);
    }

    let _ = writeln!(body, "### Recommendations\n");
    for line in recommendations(kind) {
        let _ = writeln!(body, "- {line}");
    }

    Report {
        body,
        status: ReportStatus::HeuristicFallback,
        model: heuristic_model(kind).to_string(),
        confidence: Confidence::Medium,
        metrics: ReportMetrics::from_assessment(kind, assessment),
        patterns_found: assessment.pattern_ids(),
    }
}

fn write_severity_group(
    body: &mut String,
    language: &str,
    severity: Severity,
    assessment: &Assessment,
) {
    let findings: Vec<&Finding> = assessment.findings_with(severity).collect();
    if findings.is_empty() {
        return;
    }

    let _ = writeln!(body, "### {severity} Severity Issues\n");
    for finding in findings {
        let _ = writeln!(body, "#### {} (`{}`)\n", finding.name, finding.rule_id);
        let _ = writeln!(body, "{}\n", finding.description);
        let _ = writeln!(body, "{}\n", finding.rationale);
        if let Some(example) = finding.example {
            let _ = writeln!(body, "{}\n", fenced(language, example));
        }
    }
}

fn write_metrics_table(body: &mut String, kind: AnalysisKind, assessment: &Assessment) {
    let m = &assessment.metrics;
    let _ = writeln!(body, "### Metrics\n");
    let _ = writeln!(body, "| Metric | Value |");
    let _ = writeln!(body, "|---|---|");
    let _ = writeln!(body, "| Lines | {} |", m.line_count);
    let _ = writeln!(body, "| Characters | {} |", m.char_count);
    let _ = writeln!(body, "| Functions | {} |", m.function_count);
    let _ = writeln!(body, "| Classes | {} |", m.class_count);
    let _ = writeln!(body, "| Max nesting depth | {} |", m.max_nesting_depth);
    let _ = writeln!(body, "| Longest function (lines) | {} |", m.longest_function_lines);
    let _ = writeln!(body, "| Lines over 100 chars | {} |", m.long_line_count);

    if kind == AnalysisKind::Review {
        let s = &assessment.scores;
        let _ = writeln!(body, "| Maintainability | {} |", s.maintainability);
        let _ = writeln!(body, "| Readability | {} |", s.readability);
        let _ = writeln!(body, "| Efficiency | {} |", s.efficiency);
        let _ = writeln!(body, "| Best practices | {} |", s.best_practices);
        let _ = writeln!(body, "| Overall | {} |", s.overall);
        let _ = writeln!(body, "| Grade | {} |", s.grade);
    }
    let _ = writeln!(body);
}

fn write_risk_summary(body: &mut String, risk: &RiskSummary) {
    let _ = writeln!(body, "### Risk Summary\n");
    let _ = writeln!(body, "- **Overall risk:** {}", risk.overall_risk);
    let _ = writeln!(body, "- **Critical issues:** {}", risk.critical);
    let _ = writeln!(body, "- **Warnings:** {}", risk.warnings);
    let _ = writeln!(body, "- **Total patterns:** {}\n", risk.total);
}

/// Rule ID, heading, and tips for the optimize-only advice section.
const TARGETED_ADVICE: &[(&str, &str, &[&str])] = &[
    (
        "recursion",
        "Recursion",
        &[
            "Memoize results that are computed more than once",
            "Consider an iterative version with an explicit stack",
            "Watch for stack overflow on large inputs",
        ],
    ),
    (
        "nested_loops",
        "Nested Loops",
        &[
            "Work out the time complexity; nested loops over the same data are usually O(n^2)",
            "Replace the inner search with a set or map lookup",
            "Move work that does not depend on the inner loop outside it",
        ],
    ),
    (
        "deep_conditionals",
        "Conditional Logic",
        &[
            "Return early with guard clauses",
            "Extract complex conditions into well-named functions",
            "Replace type-based branching with a lookup table or polymorphism",
        ],
    ),
];

fn write_targeted_advice(body: &mut String, assessment: &Assessment) {
    let mut matched = TARGETED_ADVICE
        .iter()
        .filter(|(id, _, _)| assessment.has_finding(id))
        .peekable();

    if matched.peek().is_none() {
        return;
    }

    let _ = writeln!(body, "### Targeted Advice\n");
    for (_, title, tips) in matched {
        let _ = writeln!(body, "**{title}:**");
        for tip in tips.iter() {
            let _ = writeln!(body, "- {tip}");
        }
        let _ = writeln!(body);
    }
}

fn recommendations(kind: AnalysisKind) -> &'static [&'static str] {
    match kind {
        AnalysisKind::Bugs => &[
            "Fix HIGH severity issues first; they are the most likely to cause incorrect behavior",
            "Add tests that reproduce each issue before fixing it",
            "Handle specific exceptions and log failures instead of ignoring them",
            "Run a linter for your language as part of every change",
        ],
        AnalysisKind::Review => &[
            "Address the lowest-scoring dimension first",
            "Keep functions short and give names to magic values",
            "Add comments where intent is not obvious from the code",
            "Write unit tests for the main paths and edge cases",
        ],
        AnalysisKind::Optimize => &[
            "Profile before optimizing to find the real bottleneck",
            "Choose data structures by the operations you perform most",
            "Avoid repeated work inside loops",
            "Benchmark before and after each change",
        ],
    }
}

/// Last-resort report when the heuristic stage failed.
pub fn basic_report(kind: AnalysisKind, code: &str) -> Report {
    let structure = Metrics {
        line_count: if code.is_empty() { 0 } else { code.split('\n').count() },
        char_count: code.chars().count(),
        ..Metrics::default()
    };

    let body = format!(
        "## {title}\n\nDetailed analysis is temporarily unavailable.\n\n- **Characters:** {chars}\n- **Lines:** {lines}\n\nPlease try again later.\n",
        title = kind.title(),
        chars = structure.char_count,
        lines = structure.line_count,
    );

    Report {
        body,
        status: ReportStatus::BasicFallback,
        model: FALLBACK_MODEL.to_string(),
        confidence: Confidence::Low,
        metrics: ReportMetrics {
            structure,
            risk: RiskSummary::unknown(),
            scores: None,
        },
        patterns_found: Vec::new(),
    }
}

/// A finished concept explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub body: String,
    pub status: ReportStatus,
    pub model: String,
    pub category: &'static str,
    pub confidence: Confidence,
}

/// Wrap a generated explanation.
pub fn ai_explanation(
    topic: &str,
    category: &TopicCategory,
    provider: &str,
    text: &str,
) -> Explanation {
    Explanation {
        body: format!(
            "## {topic}\n\n*Explained with {provider}*\n\n{text}\n\n---\n*Category: {}*\n",
            category.title
        ),
        status: ReportStatus::AiSuccess,
        model: provider.to_string(),
        category: category.slug,
        confidence: Confidence::High,
    }
}

/// Deterministic lesson built from the topic catalog.
pub fn lesson_explanation(language: &str, topic: &str, category: &TopicCategory) -> Explanation {
    let mut body = String::new();

    let _ = writeln!(body, "## {topic} in {language}\n");
    let _ = writeln!(body, "*Category: {}*\n", category.title);
    let _ = writeln!(body, "### Overview\n");
    let _ = writeln!(body, "{}\n", category.overview);

    let _ = writeln!(body, "### Key Points\n");
    for point in category.key_points {
        let _ = writeln!(body, "- {point}");
    }
    let _ = writeln!(body);

    if let Some(note) = topics::language_note(language) {
        let _ = writeln!(body, "### Notes for {language}\n");
        let _ = writeln!(body, "{note}\n");
    }

    let _ = writeln!(body, "### Practice\n");
    for (i, exercise) in category.practice.iter().enumerate() {
        let _ = writeln!(body, "{}. {exercise}", i + 1);
    }

    Explanation {
        body,
        status: ReportStatus::HeuristicFallback,
        model: heuristic_model(AnalysisKind::Review).to_string(),
        category: category.slug,
        confidence: Confidence::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::{RiskLevel, Scorer};

    fn assess(kind: AnalysisKind, code: &str, language: &str) -> Assessment {
        Scorer::new().assess(kind, code, language)
    }

    #[test]
    fn test_heuristic_report_is_deterministic() {
        let code = "def add(item, items=[]):\n    try:\n        items.append(item)\n    except:\n        pass\n";
        let a = assess(AnalysisKind::Bugs, code, "python");
        let first = heuristic_report(AnalysisKind::Bugs, "python", &a);
        let second = heuristic_report(AnalysisKind::Bugs, "python", &assess(AnalysisKind::Bugs, code, "python"));
        assert_eq!(first, second);
        assert_eq!(first.status, ReportStatus::HeuristicFallback);
        assert_eq!(first.model, "pattern_matcher");
        assert_eq!(first.confidence, Confidence::Medium);
    }

    #[test]
    fn test_heuristic_report_groups_by_severity() {
        let code = "def add(item, items=[]):\n    try:\n        items.append(item)\n    except:\n        pass\n";
        let report = heuristic_report(AnalysisKind::Bugs, "python", &assess(AnalysisKind::Bugs, code, "python"));

        let high = report.body.find("### HIGH Severity Issues").unwrap();
        let medium = report.body.find("### MEDIUM Severity Issues").unwrap();
        assert!(high < medium);
        assert!(report.body.contains("`mutable_default_argument`"));
        assert!(report.body.contains("```python\n# BAD:"));
        assert!(!report.body.contains("### LOW Severity Issues"));
        assert!(report.body.contains("- **Overall risk:** HIGH"));
    }

    #[test]
    fn test_clean_code_reports_no_issues() {
        let a = assess(AnalysisKind::Review, "x = 1\n", "python");
        let report = heuristic_report(AnalysisKind::Review, "python", &a);
        assert!(report.body.contains("### No Issues Detected"));
        assert!(report.body.contains("| Grade | A |"));
        assert!(report.metrics.scores.is_some());
    }

    #[test]
    fn test_optimize_targeted_advice() {
        let code = "for a in xs:\n    for b in xs:\n        total += a * b\n";
        let a = assess(AnalysisKind::Optimize, code, "python");
        let report = heuristic_report(AnalysisKind::Optimize, "python", &a);
        assert_eq!(report.model, "static_analyzer");
        assert!(report.body.contains("### Targeted Advice"));
        assert!(report.body.contains("**Nested Loops:**"));
        assert!(!report.body.contains("**Recursion:**"));
        assert!(report.metrics.scores.is_none());
    }

    #[test]
    fn test_ai_report_wraps_text() {
        let a = assess(AnalysisKind::Bugs, "x = 1\n", "python");
        let report = ai_report(AnalysisKind::Bugs, "codebert-base", "Looks fine.", &a);
        assert!(report.body.starts_with("## Bug Analysis\n\n*Analyzed with codebert-base*\n\nLooks fine."));
        assert_eq!(report.status, ReportStatus::AiSuccess);
        assert_eq!(report.model, "codebert-base");
        assert_eq!(report.confidence, Confidence::High);
    }

    #[test]
    fn test_basic_report() {
        let report = basic_report(AnalysisKind::Optimize, "a\nb\nc");
        assert_eq!(report.status, ReportStatus::BasicFallback);
        assert_eq!(report.model, FALLBACK_MODEL);
        assert_eq!(report.confidence, Confidence::Low);
        assert_eq!(report.metrics.risk.overall_risk, RiskLevel::Unknown);
        assert_eq!(report.metrics.structure.line_count, 3);
        assert!(report.body.contains("- **Characters:** 5"));
    }

    #[test]
    fn test_metrics_serialize_flat() {
        let a = assess(AnalysisKind::Bugs, "x = 1\n", "python");
        let report = heuristic_report(AnalysisKind::Bugs, "python", &a);
        let json = serde_json::to_value(&report.metrics).unwrap();
        assert_eq!(json["line_count"], 2);
        assert_eq!(json["overall_risk"], "LOW");
        assert_eq!(json["critical"], 0);
        assert!(json.get("scores").is_none());
    }

    #[test]
    fn test_lesson_explanation() {
        let category = topics::classify("goroutines");
        let lesson = lesson_explanation("go", "goroutines", category);
        assert_eq!(lesson.category, "concepts");
        assert_eq!(lesson.status, ReportStatus::HeuristicFallback);
        assert!(lesson.body.contains("### Notes for go"));
        assert!(lesson.body.contains("1. "));
    }
}
