//! Structural metrics extracted from raw source text.
//!
//! Nothing here parses the language. The counters are tolerant scans that
//! accept any input, so extraction is total: garbage in, small numbers out.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Lines longer than this many characters count toward `long_line_count`.
pub const LONG_LINE_CHARS: usize = 100;

/// Size and shape counters for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub line_count: usize,
    pub char_count: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub max_nesting_depth: usize,
    pub long_line_count: usize,
    /// Span of the longest function, measured from its declaration to the
    /// next declaration or end of input.
    pub longest_function_lines: usize,
}

fn declaration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)\b(?:def|function|fn|func)\s+[A-Za-z_$][\w$]*|\b[A-Za-z_$][\w$]*\s*=\s*(?:async\s*)?\([^)\n]*\)\s*=>",
        )
        .expect("declaration pattern is valid")
    })
}

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(?:class|struct|interface)\s+[A-Za-z_]\w*").expect("type pattern is valid")
    })
}

/// Extract metrics from `code`.
pub fn extract(code: &str) -> Metrics {
    let line_count = if code.is_empty() {
        0
    } else {
        code.split('\n').count()
    };

    Metrics {
        line_count,
        char_count: code.chars().count(),
        function_count: declaration_pattern().find_iter(code).count(),
        class_count: type_pattern().find_iter(code).count(),
        max_nesting_depth: max_nesting_depth(code),
        long_line_count: code
            .lines()
            .filter(|l| l.chars().count() > LONG_LINE_CHARS)
            .count(),
        longest_function_lines: longest_function_lines(code),
    }
}

/// Leading whitespace width, counting a tab as four columns.
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn longest_function_lines(code: &str) -> usize {
    let lines: Vec<&str> = code.lines().collect();
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| declaration_pattern().is_match(line))
        .map(|(idx, _)| idx)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(lines.len());
            end.saturating_sub(start)
        })
        .max()
        .unwrap_or(0)
}

const PYTHON_BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "def", "class", "try", "except", "finally", "with",
    "async",
];

/// Maximum block nesting depth.
///
/// Braces open and close blocks. A line ending in `:` that starts with a
/// Python block keyword opens an indentation block that closes on dedent.
/// String literals and comments are skipped. Depth never drops below zero.
fn max_nesting_depth(code: &str) -> usize {
    let mut scanner = CodeScanner::default();
    let mut brace_depth: usize = 0;
    let mut indent_blocks: Vec<usize> = Vec::new();
    let mut max_depth = 0;

    for line in code.lines() {
        let stripped = scanner.strip_line(line);
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            continue;
        }

        let indent = indent_width(line);
        while indent_blocks.last().is_some_and(|&open| open >= indent) {
            indent_blocks.pop();
        }

        for c in trimmed.chars() {
            match c {
                '{' => {
                    brace_depth += 1;
                    max_depth = max_depth.max(brace_depth + indent_blocks.len());
                }
                '}' => brace_depth = brace_depth.saturating_sub(1),
                _ => {}
            }
        }

        if opens_indent_block(trimmed) {
            indent_blocks.push(indent);
            max_depth = max_depth.max(brace_depth + indent_blocks.len());
        }
    }

    max_depth
}

fn opens_indent_block(trimmed: &str) -> bool {
    if !trimmed.ends_with(':') {
        return false;
    }
    let first = trimmed
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("");
    PYTHON_BLOCK_KEYWORDS.contains(&first)
}

/// Removes string literal contents and comments line by line, carrying
/// block-comment state across lines.
#[derive(Default)]
struct CodeScanner {
    in_block_comment: bool,
}

impl CodeScanner {
    fn strip_line(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        let mut quote: Option<char> = None;
        let directive = is_preprocessor_directive(line);
        let mut prev: Option<char> = None;

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }

            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                    out.push(c);
                }
                continue;
            }

            match c {
                '"' | '\'' | '`' => {
                    quote = Some(c);
                    out.push(c);
                }
                '#' if !directive && hash_starts_comment(prev, chars.peek().copied()) => break,
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                _ => out.push(c),
            }
            if !c.is_whitespace() {
                prev = Some(c);
            }
        }

        out
    }
}

const PREPROCESSOR_DIRECTIVES: &[&str] = &[
    "define", "undef", "include", "if", "ifdef", "ifndef", "elif", "else", "endif", "pragma",
];

/// `#define M {` and friends. The `#` there is not a comment.
fn is_preprocessor_directive(line: &str) -> bool {
    let Some(rest) = line.trim_start().strip_prefix('#') else {
        return false;
    };
    let word: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    PREPROCESSOR_DIRECTIVES.contains(&word.as_str())
}

/// `#` is a comment except in Rust attributes (`#[..]`, `#![..]`) and
/// private member access (`this.#x`).
fn hash_starts_comment(prev: Option<char>, next: Option<char>) -> bool {
    !matches!(next, Some('[') | Some('!')) && prev != Some('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let m = extract("");
        assert_eq!(m, Metrics::default());
    }

    #[test]
    fn test_line_and_char_counts() {
        let m = extract("x = 1\ny = 2");
        assert_eq!(m.line_count, 2);
        assert_eq!(m.char_count, 11);

        let unicode = extract("s = 'héllo'");
        assert_eq!(unicode.char_count, 11);
        assert_eq!(unicode.line_count, 1);
    }

    #[test]
    fn test_function_and_class_counts() {
        let code = "class Cart:\n    def add(self):\n        pass\n\ndef total(items):\n    return 0\n";
        let m = extract(code);
        assert_eq!(m.function_count, 2);
        assert_eq!(m.class_count, 1);

        let js = "function a() {}\nconst b = (x) => x * 2;\nconst c = async () => 1;\n";
        assert_eq!(extract(js).function_count, 3);
    }

    #[test]
    fn test_brace_nesting() {
        let code = "function f() {\n  if (a) {\n    for (;;) {\n      while (b) {\n      }\n    }\n  }\n}";
        assert_eq!(extract(code).max_nesting_depth, 4);
    }

    #[test]
    fn test_braces_in_strings_and_comments_ignored() {
        let code = "let s = \"{{{{\";\n// {{{{\n/* {{{\n{{ */\nfunction f() { return '}'; }";
        assert_eq!(extract(code).max_nesting_depth, 1);
    }

    #[test]
    fn test_python_indent_nesting() {
        let code = "def f(x):\n    if x:\n        for i in x:\n            while i:\n                i -= 1\n    return x\n";
        assert_eq!(extract(code).max_nesting_depth, 4);

        let flat = "def f():\n    return 1\n\ndef g():\n    return 2\n";
        assert_eq!(extract(flat).max_nesting_depth, 1);
    }

    #[test]
    fn test_unbalanced_braces_never_negative() {
        let m = extract("}}}}\n{");
        assert_eq!(m.max_nesting_depth, 1);
    }

    #[test]
    fn test_long_lines() {
        let code = format!("short\n{}\n", "x".repeat(LONG_LINE_CHARS + 1));
        assert_eq!(extract(&code).long_line_count, 1);
        assert_eq!(extract(&"y".repeat(LONG_LINE_CHARS)).long_line_count, 0);
    }

    #[test]
    fn test_longest_function_lines() {
        let mut code = String::from("def short():\n    pass\n\ndef long():\n");
        for i in 0..60 {
            code.push_str(&format!("    x{i} = {i}\n"));
        }
        let m = extract(&code);
        assert!(m.longest_function_lines > 60);
        assert!(extract("x = 1").longest_function_lines == 0);
    }

    fn function_of(lines: usize) -> String {
        let mut code = String::from("def f():\n");
        for i in 1..lines {
            code.push_str(&format!("    x{i} = {i}\n"));
        }
        code
    }

    #[test]
    fn test_longest_function_ignores_trailing_newline() {
        let fifty = function_of(50);
        assert_eq!(extract(&fifty).longest_function_lines, 50);
        assert_eq!(extract(fifty.trim_end()).longest_function_lines, 50);
        assert_eq!(extract(&function_of(51)).longest_function_lines, 51);
    }

    #[test]
    fn test_hash_only_comments_outside_attributes_and_directives() {
        let rust = "#[derive(Debug)] struct A {\n    x: u8,\n}\n";
        assert_eq!(extract(rust).max_nesting_depth, 1);

        let c = "#define BLOCK {\nint x;\n";
        assert_eq!(extract(c).max_nesting_depth, 1);

        let js = "class A { m() { this.#x = { a: 1 }; } }";
        assert_eq!(extract(js).max_nesting_depth, 3);

        let py = "x = 1  # {{{\n#{ also a comment\n";
        assert_eq!(extract(py).max_nesting_depth, 0);
    }

    #[test]
    fn test_garbage_input_is_total() {
        let m = extract("\u{0}\u{FFFF}'\"`/*#{");
        assert_eq!(m.line_count, 1);
    }
}
