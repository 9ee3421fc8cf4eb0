//! Heuristic rule catalog for submitted snippets.
//!
//! Every check the service knows about lives in this module as data: a
//! [`Rule`] pairs a [`Matcher`] with severity, the quality dimension it
//! penalizes, and the explanatory text shown in fallback reports. Language
//! differences are expressed through each rule's `languages` scope, never
//! through branching in the scorer.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metrics::{indent_width, Metrics};

/// A heuristic check with associated metadata.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique identifier for the rule, reported as `patterns_found`.
    pub id: &'static str,

    /// Human-readable name.
    pub name: &'static str,

    /// Languages the rule applies to. Empty means every language.
    pub languages: &'static [&'static str],

    /// Analyses that evaluate this rule.
    pub kinds: &'static [AnalysisKind],

    /// Predicate deciding whether the rule matched.
    pub matcher: Matcher,

    /// Severity of a match.
    pub severity: Severity,

    /// Quality dimension a match is charged against.
    pub dimension: Dimension,

    /// One-line description of the problem.
    pub description: &'static str,

    /// Why the pattern is a problem.
    pub rationale: &'static str,

    /// Before/after example shown in fallback reports.
    pub example: Option<&'static str>,
}

impl Rule {
    /// Whether the rule is in scope for a canonical language identifier.
    pub fn applies_to(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }
}

/// How a rule decides that it matched.
///
/// The `regex` crate has no back-references or look-around, so checks that
/// need them are plain text predicates instead.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Regular expression searched over the whole submission.
    Pattern(Regex),
    /// Text predicate over the whole submission.
    Text(fn(&str) -> bool),
    /// Threshold check over the structural metrics.
    Metric(fn(&Metrics) -> bool),
}

impl Matcher {
    fn pattern(re: &str) -> Self {
        Matcher::Pattern(Regex::new(re).expect("catalog patterns are valid regexes"))
    }

    /// Evaluate the matcher. Presence only: the result never depends on how
    /// many times the pattern occurs.
    pub fn matches(&self, code: &str, metrics: &Metrics) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(code),
            Matcher::Text(predicate) => predicate(code),
            Matcher::Metric(predicate) => predicate(metrics),
        }
    }
}

/// Which report a request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// General code review with quality scores and a grade.
    Review,
    /// Bug and anti-pattern detection.
    Bugs,
    /// Performance and structure optimization.
    Optimize,
}

impl AnalysisKind {
    pub fn title(self) -> &'static str {
        match self {
            AnalysisKind::Review => "Code Review",
            AnalysisKind::Bugs => "Bug Analysis",
            AnalysisKind::Optimize => "Code Optimization",
        }
    }
}

/// Severity of a rule match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Style or minor maintainability concern.
    Low = 0,
    /// Likely to cause confusion or subtle defects.
    Medium = 1,
    /// Likely bug or security problem.
    High = 2,
}

impl Severity {
    /// Points subtracted from the rule's dimension score on a match.
    pub fn penalty(self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 10,
            Severity::High => 20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Quality dimensions scored by the heuristic scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Maintainability,
    Readability,
    Efficiency,
    BestPractices,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Maintainability,
        Dimension::Readability,
        Dimension::Efficiency,
        Dimension::BestPractices,
    ];
}

/// Collection of all heuristic rules, in report order.
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Create a new RuleSet with the full catalog.
    pub fn new() -> Self {
        Self {
            rules: create_all_rules(),
        }
    }

    /// Rules evaluated for `kind` on `language`, preserving catalog order.
    pub fn applicable<'a>(
        &'a self,
        kind: AnalysisKind,
        language: &'a str,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules
            .iter()
            .filter(move |r| r.kinds.contains(&kind) && r.applies_to(language))
    }

    /// Get a rule by ID.
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a user-supplied language name onto the identifier used by the catalog.
///
/// The browser UI sends display names ("JavaScript", "C++"), so matching is
/// case-insensitive and a handful of common aliases are folded together.
pub fn canonical_language(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let canonical = match lowered.as_str() {
        "js" | "node" | "nodejs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" | "python3" => "python",
        "golang" => "go",
        "c++" | "cxx" => "cpp",
        "c#" | "cs" => "csharp",
        "rs" => "rust",
        "rb" => "ruby",
        "kt" => "kotlin",
        other => other,
    };
    canonical.to_string()
}

/// Infer a canonical language from a file extension.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let lang = match ext.to_ascii_lowercase().as_str() {
        "py" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "rs" => "rust",
        "java" => "java",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "php" => "php",
        "kt" => "kotlin",
        "swift" => "swift",
        _ => return None,
    };
    Some(lang)
}

const ALL_KINDS: &[AnalysisKind] = &[
    AnalysisKind::Review,
    AnalysisKind::Bugs,
    AnalysisKind::Optimize,
];
const BUGS_AND_REVIEW: &[AnalysisKind] = &[AnalysisKind::Review, AnalysisKind::Bugs];
const OPTIMIZE_AND_REVIEW: &[AnalysisKind] = &[AnalysisKind::Review, AnalysisKind::Optimize];
const REVIEW_ONLY: &[AnalysisKind] = &[AnalysisKind::Review];
const OPTIMIZE_ONLY: &[AnalysisKind] = &[AnalysisKind::Optimize];

const JS_FAMILY: &[&str] = &["javascript", "typescript"];
const BRACE_CATCH: &[&str] = &["java", "javascript", "typescript", "csharp", "kotlin", "php", "cpp"];

/// Create the full heuristic catalog.
fn create_all_rules() -> Vec<Rule> {
    vec![
        // ==================== PYTHON ====================
        Rule {
            id: "mutable_default_argument",
            name: "Mutable Default Argument",
            languages: &["python"],
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"def\s+\w+\s*\([^)]*=\s*(?:\[|\{)[^)]*\)"),
            severity: Severity::High,
            dimension: Dimension::BestPractices,
            description: "Mutable default arguments are shared across all function calls",
            rationale: "Python evaluates default arguments once when the function is defined, not when it is called, so the same list or dict is reused by every call.",
            example: Some(
                "# BAD:\ndef add_item(item, items=[]):\n    items.append(item)\n    return items\n\n# GOOD:\ndef add_item(item, items=None):\n    if items is None:\n        items = []\n    items.append(item)\n    return items",
            ),
        },
        Rule {
            id: "bare_except",
            name: "Bare Except",
            languages: &["python"],
            kinds: ALL_KINDS,
            matcher: Matcher::pattern(r"(?m)^\s*except\s*:"),
            severity: Severity::Medium,
            dimension: Dimension::BestPractices,
            description: "Bare except catches all exceptions including KeyboardInterrupt and SystemExit",
            rationale: "Catching everything hides bugs and can stop the program from shutting down when asked to.",
            example: Some(
                "# BAD:\ntry:\n    risky_operation()\nexcept:\n    pass\n\n# GOOD:\ntry:\n    risky_operation()\nexcept ValueError as e:\n    logger.error(f\"Operation failed: {e}\")",
            ),
        },
        Rule {
            id: "global_variable_misuse",
            name: "Global Variable Mutation",
            languages: &["python"],
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"(?m)^\s*global\s+\w+"),
            severity: Severity::Medium,
            dimension: Dimension::Maintainability,
            description: "Global variables make code hard to test, debug, and maintain",
            rationale: "Mutating module state from inside functions creates hidden dependencies between otherwise unrelated calls.",
            example: Some(
                "# BAD:\ncounter = 0\n\ndef increment():\n    global counter\n    counter += 1\n\n# GOOD:\nclass Counter:\n    def __init__(self):\n        self.value = 0\n\n    def increment(self):\n        self.value += 1",
            ),
        },
        Rule {
            id: "wildcard_import",
            name: "Wildcard Import",
            languages: &["python"],
            kinds: ALL_KINDS,
            matcher: Matcher::pattern(r"(?m)^\s*from\s+[\w.]+\s+import\s+\*"),
            severity: Severity::Low,
            dimension: Dimension::Readability,
            description: "Wildcard imports pollute the namespace and can cause name conflicts",
            rationale: "Readers cannot tell where a name comes from, and later imports may silently shadow earlier ones.",
            example: Some(
                "# BAD:\nfrom module import *\n\n# GOOD:\nfrom module import specific_function, SpecificClass",
            ),
        },
        Rule {
            id: "print_debugging",
            name: "Print Debugging",
            languages: &["python"],
            kinds: REVIEW_ONLY,
            matcher: Matcher::pattern(r"(?m)^\s*print\s*\("),
            severity: Severity::Low,
            dimension: Dimension::BestPractices,
            description: "print() calls used for diagnostics",
            rationale: "Prints cannot be filtered or silenced; the logging module gives levels and destinations.",
            example: Some(
                "# BAD:\nprint(\"value is\", value)\n\n# GOOD:\nimport logging\nlogger = logging.getLogger(__name__)\nlogger.debug(\"value is %s\", value)",
            ),
        },
        // ==================== JAVASCRIPT / TYPESCRIPT ====================
        Rule {
            id: "var_usage",
            name: "var Declaration",
            languages: JS_FAMILY,
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"\bvar\s+[A-Za-z_$][\w$]*"),
            severity: Severity::Medium,
            dimension: Dimension::BestPractices,
            description: "var has function scope and hoisting issues, use let/const instead",
            rationale: "var declarations are hoisted to the top of the function, so a variable can be read before it is assigned and leaks out of blocks.",
            example: Some("// BAD:\nvar x = 10;\n\n// GOOD:\nlet x = 10;\nconst y = 20;"),
        },
        Rule {
            id: "loose_equality",
            name: "Loose Equality",
            languages: JS_FAMILY,
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"[^=!<>]==[^=]"),
            severity: Severity::Medium,
            dimension: Dimension::BestPractices,
            description: "== performs type coercion which can cause unexpected behavior",
            rationale: "Loose equality converts operands before comparing, so '0' == 0 and null == undefined are both true.",
            example: Some(
                "// BAD:\nif (x == null) {}\n\n// GOOD:\nif (x === null || x === undefined) {}",
            ),
        },
        Rule {
            id: "with_statement",
            name: "with Statement",
            languages: &["javascript"],
            kinds: ALL_KINDS,
            matcher: Matcher::pattern(r"\bwith\s*\("),
            severity: Severity::Medium,
            dimension: Dimension::Efficiency,
            description: "with makes scope resolution ambiguous and defeats engine optimizations",
            rationale: "Identifiers inside a with block may resolve to the object or the outer scope depending on runtime data.",
            example: Some("// BAD:\nwith (obj) { total = a + b; }\n\n// GOOD:\nconst total = obj.a + obj.b;"),
        },
        Rule {
            id: "no_strict_mode",
            name: "Missing Strict Mode",
            languages: &["javascript"],
            kinds: OPTIMIZE_AND_REVIEW,
            matcher: Matcher::Text(lacks_strict_mode),
            severity: Severity::Low,
            dimension: Dimension::BestPractices,
            description: "Script does not opt into strict mode",
            rationale: "Strict mode turns silent mistakes into errors and lets engines optimize more aggressively.",
            example: Some("'use strict';\n\nfunction main() {\n  // ...\n}"),
        },
        Rule {
            id: "console_log",
            name: "Leftover console.log",
            languages: JS_FAMILY,
            kinds: REVIEW_ONLY,
            matcher: Matcher::pattern(r"\bconsole\.log\s*\("),
            severity: Severity::Low,
            dimension: Dimension::BestPractices,
            description: "console.log calls left in the code",
            rationale: "Debug output leaks into production consoles and slows hot paths.",
            example: None,
        },
        // ==================== SHARED LANGUAGE RULES ====================
        Rule {
            id: "eval_usage",
            name: "Dynamic Code Evaluation",
            languages: &["python", "javascript", "typescript", "php", "ruby"],
            kinds: ALL_KINDS,
            matcher: Matcher::pattern(r"(?:^|[^\w.])(?:eval|exec)\s*\("),
            severity: Severity::High,
            dimension: Dimension::BestPractices,
            description: "eval/exec executes arbitrary strings as code",
            rationale: "Evaluating strings opens the door to code injection and prevents the runtime from optimizing the surrounding function.",
            example: Some(
                "// BAD:\nconst value = eval(\"obj.\" + key);\n\n// GOOD:\nconst value = obj[key];",
            ),
        },
        Rule {
            id: "empty_catch",
            name: "Empty Catch Block",
            languages: BRACE_CATCH,
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"catch\s*(?:\([^)]*\))?\s*\{\s*\}"),
            severity: Severity::Medium,
            dimension: Dimension::BestPractices,
            description: "Exceptions are caught and silently discarded",
            rationale: "An empty handler turns failures into wrong results with no trace of what went wrong.",
            example: Some(
                "// BAD:\ntry { save(); } catch (e) {}\n\n// GOOD:\ntry { save(); } catch (e) { logger.error(\"save failed\", e); throw e; }",
            ),
        },
        Rule {
            id: "unwrap_usage",
            name: "unwrap/expect in Non-Test Code",
            languages: &["rust"],
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"\.(?:unwrap|expect)\s*\("),
            severity: Severity::Medium,
            dimension: Dimension::BestPractices,
            description: "unwrap and expect panic on None/Err",
            rationale: "A panic aborts the current thread; propagating the error with ? lets the caller decide how to recover.",
            example: Some(
                "// BAD:\nlet port: u16 = value.parse().unwrap();\n\n// GOOD:\nlet port: u16 = value.parse()?;",
            ),
        },
        Rule {
            id: "unsafe_gets",
            name: "Unbounded gets()",
            languages: &["c", "cpp"],
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(r"\bgets\s*\("),
            severity: Severity::High,
            dimension: Dimension::BestPractices,
            description: "gets() cannot limit input length and overflows its buffer",
            rationale: "There is no way to call gets() safely; it was removed from C11 for this reason.",
            example: Some("// BAD:\ngets(buf);\n\n// GOOD:\nfgets(buf, sizeof buf, stdin);"),
        },
        Rule {
            id: "hardcoded_secret",
            name: "Hardcoded Secret",
            languages: &[],
            kinds: BUGS_AND_REVIEW,
            matcher: Matcher::pattern(
                r#"(?i)\b(?:api_?key|secret|password|passwd|token)\b\s*[:=]\s*["'][^"']{4,}["']"#,
            ),
            severity: Severity::High,
            dimension: Dimension::BestPractices,
            description: "Credentials appear to be hardcoded in source",
            rationale: "Secrets committed to source end up in version history and every copy of the code.",
            example: Some(
                "# BAD:\napi_key = \"sk-live-1234\"\n\n# GOOD:\napi_key = os.environ[\"API_KEY\"]",
            ),
        },
        Rule {
            id: "todo_comment",
            name: "Unresolved TODO",
            languages: &[],
            kinds: REVIEW_ONLY,
            matcher: Matcher::pattern(r"(?:(?://|#)\s*)(?:TODO|FIXME|HACK|XXX)\b"),
            severity: Severity::Low,
            dimension: Dimension::Maintainability,
            description: "Code contains unresolved TODO/FIXME markers",
            rationale: "Markers document known gaps; each one is unfinished work a reader has to keep in mind.",
            example: None,
        },
        // ==================== STRUCTURE ====================
        Rule {
            id: "recursion",
            name: "Recursion",
            languages: &[],
            kinds: OPTIMIZE_ONLY,
            matcher: Matcher::Text(has_recursion),
            severity: Severity::Low,
            dimension: Dimension::Efficiency,
            description: "A function calls itself",
            rationale: "Naive recursion can repeat work exponentially and overflow the stack on large inputs.",
            example: Some(
                "# BAD:\ndef fib(n):\n    return n if n < 2 else fib(n - 1) + fib(n - 2)\n\n# GOOD:\nfrom functools import lru_cache\n\n@lru_cache(maxsize=None)\ndef fib(n):\n    return n if n < 2 else fib(n - 1) + fib(n - 2)",
            ),
        },
        Rule {
            id: "nested_loops",
            name: "Nested Loops",
            languages: &[],
            kinds: OPTIMIZE_AND_REVIEW,
            matcher: Matcher::Text(has_nested_loops),
            severity: Severity::Medium,
            dimension: Dimension::Efficiency,
            description: "A loop runs inside another loop",
            rationale: "Nested iteration over the same data is usually O(n^2); a hash lookup often brings it back to O(n).",
            example: Some(
                "# BAD:\nfor a in items:\n    for b in items:\n        if a + b == target:\n            return a, b\n\n# GOOD:\nseen = set()\nfor a in items:\n    if target - a in seen:\n        return a, target - a\n    seen.add(a)",
            ),
        },
        Rule {
            id: "deep_conditionals",
            name: "Nested Conditionals",
            languages: &[],
            kinds: OPTIMIZE_ONLY,
            matcher: Matcher::Text(has_nested_conditionals),
            severity: Severity::Low,
            dimension: Dimension::Readability,
            description: "Conditionals are nested inside other conditionals",
            rationale: "Each nested branch multiplies the paths a reader has to follow; guard clauses flatten them.",
            example: Some(
                "// BAD:\nif (user) {\n  if (user.active) {\n    send(user);\n  }\n}\n\n// GOOD:\nif (!user || !user.active) return;\nsend(user);",
            ),
        },
        Rule {
            id: "magic_numbers",
            name: "Magic Numbers",
            languages: &[],
            kinds: OPTIMIZE_AND_REVIEW,
            matcher: Matcher::pattern(r"[^\w.\[]\d{3,}\b"),
            severity: Severity::Low,
            dimension: Dimension::Readability,
            description: "Unnamed numeric literals are embedded in logic",
            rationale: "A named constant documents intent and keeps repeated values in sync.",
            example: Some("// BAD:\nif (elapsed > 86400) {}\n\n// GOOD:\nconst SECONDS_PER_DAY = 86400;\nif (elapsed > SECONDS_PER_DAY) {}"),
        },
        Rule {
            id: "duplicated_code",
            name: "Duplicated Code",
            languages: &[],
            kinds: OPTIMIZE_AND_REVIEW,
            matcher: Matcher::Text(has_duplicated_lines),
            severity: Severity::Medium,
            dimension: Dimension::Maintainability,
            description: "The same non-trivial line appears more than once",
            rationale: "Copies drift apart over time; a fix applied to one is easily missed in the other.",
            example: None,
        },
        // ==================== METRIC THRESHOLDS ====================
        Rule {
            id: "deep_nesting",
            name: "Deep Nesting",
            languages: &[],
            kinds: ALL_KINDS,
            matcher: Matcher::Metric(|m| m.max_nesting_depth > MAX_NESTING_DEPTH),
            severity: Severity::Medium,
            dimension: Dimension::Maintainability,
            description: "Blocks are nested more than 3 levels deep",
            rationale: "Deeply nested code is hard to follow and test; extract helpers or return early.",
            example: None,
        },
        Rule {
            id: "long_method",
            name: "Long Function",
            languages: &[],
            kinds: OPTIMIZE_AND_REVIEW,
            matcher: Matcher::Metric(|m| m.longest_function_lines > MAX_FUNCTION_LINES),
            severity: Severity::Medium,
            dimension: Dimension::Maintainability,
            description: "A function spans more than 50 lines",
            rationale: "Long functions usually do several things; splitting them gives each piece a name and a test.",
            example: None,
        },
        Rule {
            id: "long_lines",
            name: "Long Lines",
            languages: &[],
            kinds: REVIEW_ONLY,
            matcher: Matcher::Metric(|m| m.long_line_count > 0),
            severity: Severity::Low,
            dimension: Dimension::Readability,
            description: "Lines exceed 100 characters",
            rationale: "Long lines force horizontal scrolling and hide the end of expressions in side-by-side diffs.",
            example: None,
        },
    ]
}

/// Nesting depth above which `deep_nesting` fires.
pub const MAX_NESTING_DEPTH: usize = 3;

/// Function length above which `long_method` fires.
pub const MAX_FUNCTION_LINES: usize = 50;

fn lacks_strict_mode(code: &str) -> bool {
    !code.contains("use strict")
}

fn definition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:def|function|fn|func)\s+([A-Za-z_$][\w$]*)\s*\(")
            .expect("definition pattern is valid")
    })
}

/// A function whose name is called inside its own body. The body is the
/// rest of the header line plus the lines indented deeper than the header.
fn has_recursion(code: &str) -> bool {
    let lines: Vec<&str> = code.lines().collect();
    lines.iter().enumerate().any(|(i, line)| {
        let Some(caps) = definition_pattern().captures(line) else {
            return false;
        };
        let (Some(header), Some(name)) = (caps.get(0), caps.get(1)) else {
            return false;
        };
        let name = name.as_str();
        if calls_name(&line[header.end()..], name) {
            return true;
        }
        let outer = indent_width(line);
        lines[i + 1..]
            .iter()
            .filter(|l| !l.trim().is_empty())
            .take_while(|l| indent_width(l) > outer)
            .any(|l| calls_name(l, name))
    })
}

fn calls_name(text: &str, name: &str) -> bool {
    text.match_indices(name).any(|(idx, _)| {
        let before_ok = text[..idx]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '.'));
        let rest = text[idx + name.len()..].trim_start_matches([' ', '\t']);
        before_ok && rest.starts_with('(')
    })
}

fn loop_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(?:for|while)\b").expect("loop pattern is valid"))
}

fn conditional_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:\}\s*)?(?:if|elif|else\s+if)\b").expect("conditional pattern is valid")
    })
}

fn has_nested_loops(code: &str) -> bool {
    has_nested_header(code, loop_header())
}

fn has_nested_conditionals(code: &str) -> bool {
    has_nested_header(code, conditional_header())
}

/// Whether a line matching `header` sits inside the indented body of an
/// earlier line matching `header`.
///
/// Indentation stands in for block structure so that brace languages and
/// Python are handled the same way.
fn has_nested_header(code: &str, header: &Regex) -> bool {
    let lines: Vec<&str> = code.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if !header.is_match(line) {
            continue;
        }
        let outer = indent_width(line);
        for inner in lines[i + 1..].iter().filter(|l| !l.trim().is_empty()) {
            if indent_width(inner) <= outer {
                break;
            }
            if header.is_match(inner) {
                return true;
            }
        }
    }
    false
}

/// Minimum trimmed length for a line to count toward duplication.
const DUPLICATE_MIN_CHARS: usize = 20;

fn has_duplicated_lines(code: &str) -> bool {
    let mut seen = std::collections::HashSet::new();
    code.lines()
        .map(str::trim)
        .filter(|l| l.chars().count() >= DUPLICATE_MIN_CHARS)
        .any(|l| !seen.insert(l))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(id: &str, code: &str) -> bool {
        let set = RuleSet::new();
        let rule = set.get(id).unwrap();
        let metrics = crate::metrics::extract(code);
        rule.matcher.matches(code, &metrics)
    }

    #[test]
    fn test_rule_ids_are_unique() {
        let set = RuleSet::new();
        let mut ids: Vec<_> = set.rules.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), set.rules.len());
    }

    #[test]
    fn test_every_rule_belongs_to_an_analysis() {
        for rule in RuleSet::new().rules {
            assert!(!rule.kinds.is_empty(), "{} has no analysis kind", rule.id);
        }
    }

    #[test]
    fn test_mutable_default_argument() {
        assert!(matches(
            "mutable_default_argument",
            "def add(item, items=[]):\n    items.append(item)\n    return items"
        ));
        assert!(matches("mutable_default_argument", "def f(x, opts={}):\n    pass"));
        assert!(!matches("mutable_default_argument", "def f(x, items=None):\n    pass"));
    }

    #[test]
    fn test_bare_except_multiline() {
        let code = "try:\n    run()\nexcept:\n    pass\n";
        assert!(matches("bare_except", code));
        assert!(!matches("bare_except", "try:\n    run()\nexcept ValueError:\n    pass\n"));
    }

    #[test]
    fn test_loose_equality_ignores_strict_and_assignment() {
        assert!(matches("loose_equality", "if (a == b) {}"));
        assert!(!matches("loose_equality", "if (a === b) {}"));
        assert!(!matches("loose_equality", "if (a !== b) {}"));
        assert!(!matches("loose_equality", "let x = 5;"));
    }

    #[test]
    fn test_eval_not_matched_on_method_names() {
        assert!(matches("eval_usage", "eval(userInput)"));
        assert!(matches("eval_usage", "x = exec(src)"));
        assert!(!matches("eval_usage", "model.eval()"));
        assert!(!matches("eval_usage", "retrieval(x)"));
    }

    #[test]
    fn test_recursion() {
        assert!(matches(
            "recursion",
            "def fact(n):\n    return 1 if n <= 1 else n * fact(n - 1)\n"
        ));
        assert!(matches(
            "recursion",
            "function walk(node) {\n  node.children.forEach(c => walk(c));\n}"
        ));
        assert!(!matches("recursion", "def fact(n):\n    return n\n\nprint(fact(3))\n"));
    }

    #[test]
    fn test_nested_loops_requires_nesting() {
        let nested = "for i in a:\n    for j in b:\n        print(i, j)\n";
        let sequential = "for i in a:\n    print(i)\nfor j in b:\n    print(j)\n";
        assert!(matches("nested_loops", nested));
        assert!(!matches("nested_loops", sequential));

        let js = "for (let i = 0; i < n; i++) {\n  while (ok()) {\n    step();\n  }\n}";
        assert!(matches("nested_loops", js));
    }

    #[test]
    fn test_nested_conditionals() {
        let js = "if (a) {\n  if (b) {\n    go();\n  }\n}";
        assert!(matches("deep_conditionals", js));
        assert!(!matches("deep_conditionals", "if (a) {\n  go();\n}\nif (b) {\n  stop();\n}"));
    }

    #[test]
    fn test_duplicated_lines() {
        let code = "total = total + price * qty\nx = 1\ntotal = total + price * qty\n";
        assert!(matches("duplicated_code", code));
        assert!(!matches("duplicated_code", "a = 1\na = 1\n"));
    }

    #[test]
    fn test_hardcoded_secret() {
        assert!(matches("hardcoded_secret", "API_KEY = \"abcd1234\""));
        assert!(matches("hardcoded_secret", "const password = 'hunter22';"));
        assert!(!matches("hardcoded_secret", "token = os.environ['TOKEN']"));
    }

    #[test]
    fn test_applicable_respects_language_and_kind() {
        let set = RuleSet::new();
        let python_bugs: Vec<_> = set.applicable(AnalysisKind::Bugs, "python").map(|r| r.id).collect();
        assert!(python_bugs.contains(&"mutable_default_argument"));
        assert!(!python_bugs.contains(&"var_usage"));
        assert!(!python_bugs.contains(&"recursion"));

        let unknown: Vec<_> = set.applicable(AnalysisKind::Optimize, "cobol").map(|r| r.id).collect();
        assert!(unknown.contains(&"nested_loops"));
        assert!(unknown.iter().all(|id| set.get(id).unwrap().languages.is_empty()));
    }

    #[test]
    fn test_canonical_language() {
        assert_eq!(canonical_language(" JavaScript "), "javascript");
        assert_eq!(canonical_language("C++"), "cpp");
        assert_eq!(canonical_language("golang"), "go");
        assert_eq!(canonical_language("Haskell"), "haskell");
    }

    #[test]
    fn test_severity_ordering_and_penalty() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::High.penalty(), 20);
        assert_eq!(Severity::Low.penalty(), 5);
    }

    #[test]
    fn test_long_method_threshold() {
        let function = |lines: usize| {
            let mut code = String::from("def f():\n");
            for i in 1..lines {
                code.push_str(&format!("    x{i} = {i}\n"));
            }
            code
        };
        assert!(!matches("long_method", &function(MAX_FUNCTION_LINES)));
        assert!(matches("long_method", &function(MAX_FUNCTION_LINES + 1)));
    }
}
