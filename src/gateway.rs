//! External AI gateway.
//!
//! A [`Gateway`] walks an ordered chain of [`TextGenerator`]s and returns the
//! first acceptable completion. Providers are tried one at a time; a failure
//! is logged and the next provider is tried. The gateway itself never fails:
//! running out of providers is an ordinary [`GatewayOutcome::Exhausted`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ChainConfig;
use crate::rules::AnalysisKind;

/// Longest provider error body kept in logs.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    pub do_sample: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 1500,
            temperature: 0.1,
            top_p: 0.9,
            repetition_penalty: 1.1,
            top_k: None,
            do_sample: true,
        }
    }
}

/// Why a single provider attempt was rejected.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no API token configured")]
    MissingCredential,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("model is still loading")]
    Loading,

    #[error("empty completion")]
    Empty,

    #[error("completion too short ({0} chars)")]
    TooShort(usize),
}

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identifier reported as the report's `model`.
    fn id(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError>;
}

/// Hugging Face Inference API model endpoint.
pub struct HuggingFaceProvider {
    id: String,
    endpoint: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HuggingFaceProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            id: model_id(&endpoint).to_string(),
            endpoint,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout,
            client,
        }
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters<'a>,
}

#[derive(Serialize)]
struct InferenceParameters<'a> {
    #[serde(flatten)]
    options: &'a GenerationOptions,
    return_full_text: bool,
}

#[async_trait]
impl TextGenerator for HuggingFaceProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let token = self.token.as_deref().ok_or(ProviderError::MissingCredential)?;

        let body = InferenceRequest {
            inputs: prompt,
            parameters: InferenceParameters {
                options,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_transport_error(err, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| map_transport_error(err, self.timeout))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_chars(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        parse_generated_text(&text)
    }
}

fn map_transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Transport(err)
    }
}

/// Last path segment of an endpoint URL.
fn model_id(endpoint: &str) -> &str {
    endpoint
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(endpoint)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Pull the completion out of an inference response.
///
/// Accepts `[{"generated_text": ..}]` and `{"generated_text": ..}`; an
/// `{"error": ..}` payload is a failure.
fn parse_generated_text(body: &str) -> Result<String, ProviderError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let record = match &value {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(&value),
        _ => None,
    };
    let Some(record) = record else {
        return Err(ProviderError::Malformed("no completion in response".into()));
    };

    if let Some(text) = record.get("generated_text").and_then(Value::as_str) {
        return Ok(text.to_string());
    }

    match record.get("error").and_then(Value::as_str) {
        Some(err) if err.to_lowercase().contains("loading") => Err(ProviderError::Loading),
        Some(err) => Err(ProviderError::Malformed(truncate_chars(err, MAX_ERROR_BODY_CHARS))),
        None => Err(ProviderError::Malformed("missing generated_text".into())),
    }
}

/// Rules for accepting a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    /// A completion must be strictly longer than this many characters.
    pub min_chars: usize,
    /// Completions containing this text are placeholders, not answers.
    pub loading_sentinel: String,
}

impl Default for Acceptance {
    fn default() -> Self {
        Self {
            min_chars: 100,
            loading_sentinel: "Model is loading".to_string(),
        }
    }
}

impl Acceptance {
    /// Strip an echoed prompt and check the remainder.
    fn check(&self, prompt: &str, raw: &str) -> Result<String, ProviderError> {
        let text = raw.strip_prefix(prompt).unwrap_or(raw).trim();
        if text.is_empty() {
            return Err(ProviderError::Empty);
        }
        if !self.loading_sentinel.is_empty() && text.contains(&self.loading_sentinel) {
            return Err(ProviderError::Loading);
        }
        let chars = text.chars().count();
        if chars <= self.min_chars {
            return Err(ProviderError::TooShort(chars));
        }
        Ok(text.to_string())
    }
}

/// Result of walking a provider chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Generated { text: String, provider: String },
    Exhausted { attempts: usize },
}

/// Ordered provider chain with shared options and a per-attempt timeout.
pub struct Gateway {
    providers: Vec<Arc<dyn TextGenerator>>,
    options: GenerationOptions,
    timeout: Duration,
    acceptance: Acceptance,
}

impl Gateway {
    pub fn new(
        providers: Vec<Arc<dyn TextGenerator>>,
        options: GenerationOptions,
        timeout: Duration,
        acceptance: Acceptance,
    ) -> Self {
        Self {
            providers,
            options,
            timeout,
            acceptance,
        }
    }

    /// A gateway with no providers; every call is immediately exhausted.
    pub fn disabled() -> Self {
        Self::new(
            Vec::new(),
            GenerationOptions::default(),
            Duration::from_secs(1),
            Acceptance::default(),
        )
    }

    /// Build a Hugging Face chain from configuration.
    pub fn from_chain(
        client: &reqwest::Client,
        chain: &ChainConfig,
        token: Option<&str>,
        acceptance: Acceptance,
    ) -> Self {
        let timeout = Duration::from_secs(chain.timeout_secs);
        let providers = chain
            .providers
            .iter()
            .map(|endpoint| {
                Arc::new(HuggingFaceProvider::new(
                    client.clone(),
                    endpoint.clone(),
                    token.map(str::to_string),
                    timeout,
                )) as Arc<dyn TextGenerator>
            })
            .collect();

        Self::new(providers, chain.options.clone(), timeout, acceptance)
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Try each provider in order until one returns an acceptable completion.
    pub async fn generate(&self, prompt: &str) -> GatewayOutcome {
        let mut attempts = 0;

        for provider in &self.providers {
            attempts += 1;
            debug!(
                provider = provider.id(),
                attempt = attempts,
                prompt_chars = prompt.len(),
                "Trying AI provider"
            );

            let result =
                match tokio::time::timeout(self.timeout, provider.generate(prompt, &self.options))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(self.timeout)),
                };

            match result.and_then(|raw| self.acceptance.check(prompt, &raw)) {
                Ok(text) => {
                    info!(
                        provider = provider.id(),
                        attempts,
                        chars = text.len(),
                        "AI provider succeeded"
                    );
                    return GatewayOutcome::Generated {
                        text,
                        provider: provider.id().to_string(),
                    };
                }
                Err(err) => {
                    warn!(provider = provider.id(), error = %err, "AI provider failed");
                }
            }
        }

        GatewayOutcome::Exhausted { attempts }
    }
}

/// One gateway per endpoint.
pub struct Gateways {
    pub review: Gateway,
    pub bugs: Gateway,
    pub optimize: Gateway,
    pub learn: Gateway,
}

impl Gateways {
    pub fn disabled() -> Self {
        Self {
            review: Gateway::disabled(),
            bugs: Gateway::disabled(),
            optimize: Gateway::disabled(),
            learn: Gateway::disabled(),
        }
    }

    pub fn for_kind(&self, kind: AnalysisKind) -> &Gateway {
        match kind {
            AnalysisKind::Review => &self.review,
            AnalysisKind::Bugs => &self.bugs,
            AnalysisKind::Optimize => &self.optimize,
        }
    }
}
