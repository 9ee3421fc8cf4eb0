//! HTTP handlers for the analysis endpoints.
//!
//! The three code endpoints share one pipeline: heuristics on the blocking
//! pool, then the gateway, then the report assembler (also on the blocking
//! pool). Only validation can fail a request; a panic in either blocking
//! stage yields the basic report.

pub mod bugs;
pub mod learn;
pub mod optimize;
pub mod review;

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info};

use crate::gateway::GatewayOutcome;
use crate::prompt::build_code_prompt;
use crate::report::{self, Confidence, Report, ReportMetrics, ReportStatus};
use crate::rules::AnalysisKind;
use crate::server::AppState;
use crate::submission::Submission;

/// Response body of the code endpoints.
#[derive(Debug, Serialize)]
pub struct CodeResponse {
    pub analysis: String,
    pub metrics: ReportMetrics,
    pub status: ReportStatus,
    pub model: String,
    pub confidence: Confidence,
    /// Only reported by the bug endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns_found: Option<Vec<&'static str>>,
}

impl CodeResponse {
    fn from_report(report: Report, with_patterns: bool) -> Self {
        Self {
            analysis: report.body,
            metrics: report.metrics,
            status: report.status,
            model: report.model,
            confidence: report.confidence,
            patterns_found: with_patterns.then_some(report.patterns_found),
        }
    }
}

/// Run the full analysis pipeline for a validated submission.
pub async fn analyze(state: &Arc<AppState>, kind: AnalysisKind, submission: Submission) -> Report {
    let started = Instant::now();
    let code_chars = submission.code.chars().count();

    let report = run_pipeline(state, kind, submission).await;

    info!(
        kind = ?kind,
        code_chars,
        status = report.status.as_str(),
        model = %report.model,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis complete"
    );
    report
}

async fn run_pipeline(state: &Arc<AppState>, kind: AnalysisKind, submission: Submission) -> Report {
    let code = Arc::new(submission.code);
    let language = Arc::new(submission.language);

    let heuristics = blocking(kind, "Heuristic analysis failed", {
        let state = Arc::clone(state);
        let code = Arc::clone(&code);
        let language = Arc::clone(&language);
        move || {
            let assessment = state.scorer.assess(kind, &code, &language);
            let prompt = build_code_prompt(
                kind,
                &language,
                &code,
                &assessment.findings,
                &assessment.metrics,
            );
            (assessment, prompt)
        }
    })
    .await;
    let Some((assessment, prompt)) = heuristics else {
        return report::basic_report(kind, &code);
    };

    let outcome = state.gateways.for_kind(kind).generate(&prompt).await;

    let assembled = blocking(kind, "Report assembly failed", {
        let language = Arc::clone(&language);
        move || match outcome {
            GatewayOutcome::Generated { text, provider } => {
                report::ai_report(kind, &provider, &text, &assessment)
            }
            GatewayOutcome::Exhausted { attempts } => {
                info!(kind = ?kind, attempts, "AI unavailable, using heuristic report");
                report::heuristic_report(kind, &language, &assessment)
            }
        }
    })
    .await;

    assembled.unwrap_or_else(|| report::basic_report(kind, &code))
}

/// Run a pipeline stage on the blocking pool. A panic in the stage is
/// logged and reported as `None` so the caller can drop down the ladder.
async fn blocking<T, F>(kind: AnalysisKind, failure: &'static str, stage: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(stage).await {
        Ok(value) => Some(value),
        Err(err) => {
            error!(kind = ?kind, error = %err, "{}", failure);
            None
        }
    }
}
