//! `POST /api/learn`: concept explanations.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::error::ApiError;
use crate::gateway::GatewayOutcome;
use crate::prompt::build_topic_prompt;
use crate::report::{self, Confidence, ReportStatus};
use crate::server::AppState;
use crate::submission::{TopicRequest, TopicSubmission};
use crate::topics;

#[derive(Debug, Serialize)]
pub struct LearnResponse {
    pub explanation: String,
    pub status: ReportStatus,
    pub model: String,
    pub category: &'static str,
    pub confidence: Confidence,
}

pub async fn learn(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TopicRequest>,
) -> Result<Json<LearnResponse>, ApiError> {
    let started = Instant::now();
    let TopicSubmission { language, topic } = TopicSubmission::from_request(req)?;

    let category = topics::classify(&topic);
    let prompt = build_topic_prompt(&language, &topic, category.slug);

    let explanation = match state.gateways.learn.generate(&prompt).await {
        GatewayOutcome::Generated { text, provider } => {
            report::ai_explanation(&topic, category, &provider, &text)
        }
        GatewayOutcome::Exhausted { .. } => report::lesson_explanation(&language, &topic, category),
    };

    info!(
        category = category.slug,
        status = explanation.status.as_str(),
        model = %explanation.model,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Explanation complete"
    );

    Ok(Json(LearnResponse {
        explanation: explanation.body,
        status: explanation.status,
        model: explanation.model,
        category: explanation.category,
        confidence: explanation.confidence,
    }))
}
