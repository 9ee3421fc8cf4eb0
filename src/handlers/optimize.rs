//! `POST /api/optimize`

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use super::{analyze, CodeResponse};
use crate::error::ApiError;
use crate::rules::AnalysisKind;
use crate::server::AppState;
use crate::submission::{CodeRequest, Submission};

pub async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    let submission = Submission::from_request(req, state.config.limits.max_code_chars)?;
    let report = analyze(&state, AnalysisKind::Optimize, submission).await;
    Ok(Json(CodeResponse::from_report(report, false)))
}
