//! Code Sensei - educational code analysis.
//!
//! Heuristic review, bug and optimization reports for short code snippets,
//! with AI-generated explanations layered on top when a text-generation
//! provider is reachable. The heuristic engine works on plain text: no
//! parsing, no execution.
//!
//! # Usage
//!
//! ```rust,no_run
//! use code_sensei::{AnalysisKind, Analyzer};
//!
//! let analyzer = Analyzer::new();
//! let result = analyzer.analyze_file("src/app.py", AnalysisKind::Bugs, None).unwrap();
//!
//! for finding in &result.assessment.findings {
//!     println!("{}", finding);
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod output;
pub mod prompt;
pub mod report;
pub mod rules;
pub mod scorer;
pub mod server;
pub mod submission;
pub mod topics;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
pub use config::SenseiConfig;
pub use error::ApiError;
pub use gateway::{Gateway, GatewayOutcome, Gateways, TextGenerator};
pub use metrics::Metrics;
pub use report::{Report, ReportStatus};
pub use rules::{AnalysisKind, Rule, RuleSet, Severity};
pub use scorer::{Assessment, Finding, RiskLevel, Scorer};
pub use server::{router, AppState};

/// Heuristic analysis of one file.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub path: PathBuf,
    /// Canonical language the file was analyzed as.
    pub language: String,
    pub assessment: Assessment,
}

/// Offline analyzer used by the command-line interface.
pub struct Analyzer {
    scorer: Scorer,
}

impl Analyzer {
    /// Create an analyzer with the full catalog.
    pub fn new() -> Self {
        Self {
            scorer: Scorer::new(),
        }
    }

    pub fn with_scorer(scorer: Scorer) -> Self {
        Self { scorer }
    }

    /// Analyze a file. The language comes from `language` when given,
    /// otherwise from the file extension.
    pub fn analyze_file<P: AsRef<Path>>(
        &self,
        path: P,
        kind: AnalysisKind,
        language: Option<&str>,
    ) -> Result<FileAnalysis> {
        let path = path.as_ref();
        let language = match language {
            Some(lang) => rules::canonical_language(lang),
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(rules::language_for_extension)
                .with_context(|| format!("cannot infer language of {}", path.display()))?
                .to_string(),
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;

        Ok(FileAnalysis {
            path: path.to_path_buf(),
            assessment: self.scorer.assess(kind, &content, &language),
            language,
        })
    }

    /// Analyze a string of code.
    pub fn analyze_str(&self, code: &str, kind: AnalysisKind, language: &str) -> Assessment {
        self.scorer
            .assess(kind, code, &rules::canonical_language(language))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
