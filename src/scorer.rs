//! Heuristic scorer: runs the rule catalog over a submission.

use serde::Serialize;
use tracing::warn;

use crate::metrics::{self, Metrics};
use crate::rules::{AnalysisKind, Dimension, Rule, RuleSet, Severity};

/// A matched rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Rule ID that produced this finding.
    pub rule_id: &'static str,

    /// Human-readable rule name.
    pub name: &'static str,

    /// Severity of the finding.
    pub severity: Severity,

    /// Dimension penalized by the finding.
    pub dimension: Dimension,

    pub description: &'static str,

    pub rationale: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<&'static str>,
}

impl From<&Rule> for Finding {
    fn from(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id,
            name: rule.name,
            severity: rule.severity,
            dimension: rule.dimension,
            description: rule.description,
            rationale: rule.rationale,
            example: rule.example,
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.rule_id, self.description)
    }
}

/// Per-dimension quality scores, each 0-100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityScores {
    pub maintainability: u32,
    pub readability: u32,
    pub efficiency: u32,
    pub best_practices: u32,
    pub overall: u32,
    pub grade: char,
}

impl QualityScores {
    fn from_findings(findings: &[Finding]) -> Self {
        let score = |dimension: Dimension| {
            let penalty: u32 = findings
                .iter()
                .filter(|f| f.dimension == dimension)
                .map(|f| f.severity.penalty())
                .sum();
            100u32.saturating_sub(penalty)
        };

        let maintainability = score(Dimension::Maintainability);
        let readability = score(Dimension::Readability);
        let efficiency = score(Dimension::Efficiency);
        let best_practices = score(Dimension::BestPractices);

        // Rounded mean, halves round up.
        let sum = maintainability + readability + efficiency + best_practices;
        let overall = (sum + 2) / 4;

        Self {
            maintainability,
            readability,
            efficiency,
            best_practices,
            overall,
            grade: grade_for(overall),
        }
    }

    /// Score for a single dimension.
    pub fn get(&self, dimension: Dimension) -> u32 {
        match dimension {
            Dimension::Maintainability => self.maintainability,
            Dimension::Readability => self.readability,
            Dimension::Efficiency => self.efficiency,
            Dimension::BestPractices => self.best_practices,
        }
    }
}

/// Letter grade for an overall score.
pub fn grade_for(overall: u32) -> char {
    match overall {
        90..=u32::MAX => 'A',
        80..=89 => 'B',
        70..=79 => 'C',
        60..=69 => 'D',
        _ => 'F',
    }
}

/// Overall risk level of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// The heuristic stage did not run.
    Unknown,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Unknown => "UNKNOWN",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Finding counts by severity and the derived risk level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    /// Number of HIGH findings.
    pub critical: usize,
    /// Number of MEDIUM and LOW findings.
    pub warnings: usize,
    pub total: usize,
    pub overall_risk: RiskLevel,
}

impl RiskSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let critical = findings
            .iter()
            .filter(|f| f.severity == Severity::High)
            .count();
        let total = findings.len();
        let overall_risk = if critical > 0 {
            RiskLevel::High
        } else if total > 0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Self {
            critical,
            warnings: total - critical,
            total,
            overall_risk,
        }
    }

    /// Summary used when no heuristics are available.
    pub fn unknown() -> Self {
        Self {
            critical: 0,
            warnings: 0,
            total: 0,
            overall_risk: RiskLevel::Unknown,
        }
    }
}

/// Everything the heuristic stage learned about a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub metrics: Metrics,
    pub findings: Vec<Finding>,
    pub scores: QualityScores,
    pub risk: RiskSummary,
}

impl Assessment {
    /// Findings with the given severity, in catalog order.
    pub fn findings_with(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    pub fn has_finding(&self, rule_id: &str) -> bool {
        self.findings.iter().any(|f| f.rule_id == rule_id)
    }

    /// IDs of all findings, in catalog order.
    pub fn pattern_ids(&self) -> Vec<&'static str> {
        self.findings.iter().map(|f| f.rule_id).collect()
    }
}

/// Heuristic scorer over the rule catalog.
pub struct Scorer {
    rule_set: RuleSet,
}

impl Scorer {
    /// Create a new scorer with the full catalog.
    pub fn new() -> Self {
        Self {
            rule_set: RuleSet::new(),
        }
    }

    /// Create a scorer that never evaluates the listed rules.
    pub fn with_disabled_rules(ids: &[String]) -> Self {
        let mut rule_set = RuleSet::new();
        for id in ids {
            if rule_set.get(id).is_none() {
                warn!(rule = %id, "Unknown rule in disabled list");
            }
        }
        rule_set.rules.retain(|rule| !ids.iter().any(|id| id == rule.id));
        Self { rule_set }
    }

    /// Create a scorer over a custom catalog.
    pub fn from_rule_set(rule_set: RuleSet) -> Self {
        Self { rule_set }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    /// Assess `code` for `kind`. `language` must already be canonical.
    ///
    /// Deterministic and total; the submission is only ever matched against,
    /// never executed.
    pub fn assess(&self, kind: AnalysisKind, code: &str, language: &str) -> Assessment {
        let metrics = metrics::extract(code);

        let findings: Vec<Finding> = self
            .rule_set
            .applicable(kind, language)
            .filter(|rule| rule.matcher.matches(code, &metrics))
            .map(Finding::from)
            .collect();

        let scores = QualityScores::from_findings(&findings);
        let risk = RiskSummary::from_findings(&findings);

        Assessment {
            metrics,
            findings,
            scores,
            risk,
        }
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}
