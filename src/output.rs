//! Output formatters for offline analysis results.
//!
//! Human-readable colored output, JSON, compact one-line-per-finding, and
//! Markdown (the same body the service returns as a heuristic report).

use colored::Colorize;

use crate::report::heuristic_report;
use crate::rules::{AnalysisKind, Severity};
use crate::scorer::RiskLevel;
use crate::FileAnalysis;

/// Output format for analysis results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON output for tooling integration.
    Json,
    /// Compact one-line-per-finding.
    Compact,
    /// Markdown report.
    Markdown,
}

/// Format a single file's results. JSON output for many files goes through
/// [`format_json`] instead so the result is one document.
pub fn format_analysis(result: &FileAnalysis, kind: AnalysisKind, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => format_pretty(result, kind),
        OutputFormat::Json => format_json(std::slice::from_ref(result)),
        OutputFormat::Compact => format_compact(result),
        OutputFormat::Markdown => format_markdown(result, kind),
    }
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::High => "high".red().bold(),
        Severity::Medium => "medium".yellow().bold(),
        Severity::Low => "low".blue(),
    }
}

fn risk_label(risk: RiskLevel) -> colored::ColoredString {
    match risk {
        RiskLevel::High => "HIGH".red().bold(),
        RiskLevel::Medium => "MEDIUM".yellow().bold(),
        RiskLevel::Low => "LOW".green().bold(),
        RiskLevel::Unknown => "UNKNOWN".dimmed(),
    }
}

/// Format results in human-readable colored output.
fn format_pretty(result: &FileAnalysis, kind: AnalysisKind) -> String {
    let a = &result.assessment;
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} {}\n",
        result.path.display().to_string().bold().underline(),
        format!("({})", result.language).dimmed()
    ));

    for finding in &a.findings {
        let marker = match finding.severity {
            Severity::High => "✖".red(),
            Severity::Medium => "⚠".yellow(),
            Severity::Low => "ℹ".blue(),
        };
        output.push_str(&format!(
            "\n  {} {} [{}]\n",
            marker,
            severity_label(finding.severity),
            finding.rule_id.cyan()
        ));
        output.push_str(&format!("    {} {}\n", "→".dimmed(), finding.name.bold()));
        output.push_str(&format!("    {}\n", finding.description));
    }

    let m = &a.metrics;
    output.push_str(&format!(
        "\n  {} {} lines, {} functions, {} classes, nesting {}\n",
        "Metrics:".bold(),
        m.line_count,
        m.function_count,
        m.class_count,
        m.max_nesting_depth
    ));
    if kind == AnalysisKind::Review {
        let s = &a.scores;
        output.push_str(&format!(
            "  {} {} (overall {}, maintainability {}, readability {}, efficiency {}, best practices {})\n",
            "Grade:".bold(),
            s.grade.to_string().bold(),
            s.overall,
            s.maintainability,
            s.readability,
            s.efficiency,
            s.best_practices
        ));
    }
    output.push_str(&format!("  {} {}\n", "Risk:".bold(), risk_label(a.risk.overall_risk)));

    output
}

/// Format results for many files as one JSON array.
pub fn format_json(results: &[FileAnalysis]) -> String {
    let values: Vec<serde_json::Value> = results
        .iter()
        .map(|result| {
            serde_json::json!({
                "file": result.path.display().to_string(),
                "language": result.language,
                "metrics": result.assessment.metrics,
                "findings": result.assessment.findings,
                "scores": result.assessment.scores,
                "risk": result.assessment.risk,
            })
        })
        .collect();

    serde_json::to_string_pretty(&values).unwrap_or_default()
}

/// Format results in compact one-line format.
fn format_compact(result: &FileAnalysis) -> String {
    let mut output = String::new();

    for finding in &result.assessment.findings {
        let severity = match finding.severity {
            Severity::High => "H",
            Severity::Medium => "M",
            Severity::Low => "L",
        };
        output.push_str(&format!(
            "{}: {} [{}] {}\n",
            result.path.display(),
            severity,
            finding.rule_id,
            finding.description
        ));
    }

    output
}

/// Format results as the Markdown heuristic report.
fn format_markdown(result: &FileAnalysis, kind: AnalysisKind) -> String {
    let report = heuristic_report(kind, &result.language, &result.assessment);
    format!("<!-- {} -->\n{}", result.path.display(), report.body)
}

/// Summary statistics over many files.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub files_with_issues: usize,
    pub total_files: usize,
}

impl AnalysisSummary {
    /// Create a summary from per-file results.
    pub fn from_results(results: &[FileAnalysis]) -> Self {
        let mut summary = Self {
            total_files: results.len(),
            ..Self::default()
        };

        for result in results {
            let findings = &result.assessment.findings;
            if !findings.is_empty() {
                summary.files_with_issues += 1;
            }
            summary.total += findings.len();
            for finding in findings {
                match finding.severity {
                    Severity::High => summary.high += 1,
                    Severity::Medium => summary.medium += 1,
                    Severity::Low => summary.low += 1,
                }
            }
        }

        summary
    }

    /// Format the summary as a human-readable string.
    pub fn format_pretty(&self) -> String {
        format!(
            "{} in {} of {} {} ({} high, {} medium, {} low)",
            format!("{} issues", self.total).bold(),
            self.files_with_issues,
            self.total_files,
            if self.total_files == 1 { "file" } else { "files" },
            self.high.to_string().red().bold(),
            self.medium.to_string().yellow().bold(),
            self.low.to_string().blue()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Scorer;
    use std::path::PathBuf;

    fn analysis(code: &str, language: &str, kind: AnalysisKind) -> FileAnalysis {
        FileAnalysis {
            path: PathBuf::from(format!("sample.{language}")),
            language: language.to_string(),
            assessment: Scorer::new().assess(kind, code, language),
        }
    }

    #[test]
    fn test_format_compact() {
        let result = analysis("var a = eval(x);\n", "javascript", AnalysisKind::Bugs);
        let output = format_compact(&result);
        assert!(output.contains("sample.javascript: M [var_usage]"));
        assert!(output.contains("sample.javascript: H [eval_usage]"));
    }

    #[test]
    fn test_format_json_is_one_array() {
        let results = vec![
            analysis("x = 1\n", "python", AnalysisKind::Bugs),
            analysis("var a = 1;\n", "javascript", AnalysisKind::Bugs),
        ];
        let value: serde_json::Value = serde_json::from_str(&format_json(&results)).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["findings"][0]["rule_id"], "var_usage");
        assert_eq!(items[0]["risk"]["overall_risk"], "LOW");
    }

    #[test]
    fn test_format_markdown_matches_service_report() {
        let result = analysis("try:\n    f()\nexcept:\n    pass\n", "python", AnalysisKind::Bugs);
        let output = format_markdown(&result, AnalysisKind::Bugs);
        assert!(output.starts_with("<!-- sample.python -->\n## Bug Analysis: Heuristic Analysis"));
        assert!(output.contains("### MEDIUM Severity Issues"));
    }

    #[test]
    fn test_summary() {
        let results = vec![
            analysis("x = 1\n", "python", AnalysisKind::Bugs),
            analysis("var a = eval(x);\n", "javascript", AnalysisKind::Bugs),
        ];
        let summary = AnalysisSummary::from_results(&results);
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.files_with_issues, 1);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.total, 2);
    }
}
