//! Request bodies and their validation.

use serde::Deserialize;

use crate::error::ApiError;
use crate::rules::canonical_language;

/// Body of the review, bug and optimize endpoints.
///
/// Fields are optional so that a missing field becomes our own 400 rather
/// than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeRequest {
    pub code: Option<String>,
    pub language: Option<String>,
}

/// Body of the learn endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicRequest {
    pub language: Option<String>,
    pub topic: Option<String>,
}

/// A validated code submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub code: String,
    /// Canonical language identifier.
    pub language: String,
}

impl Submission {
    /// Validate a request. Code is kept verbatim; only emptiness is checked
    /// on the trimmed text. Length is counted in chars.
    pub fn from_request(req: CodeRequest, max_chars: usize) -> Result<Self, ApiError> {
        let (Some(code), Some(language)) = (non_blank(req.code), non_blank(req.language)) else {
            return Err(ApiError::MissingField("Code and language"));
        };

        let length = code.chars().count();
        if length > max_chars {
            return Err(ApiError::CodeTooLong {
                length,
                max: max_chars,
            });
        }

        Ok(Self {
            code,
            language: canonical_language(&language),
        })
    }
}

/// A validated explanation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSubmission {
    pub language: String,
    pub topic: String,
}

impl TopicSubmission {
    pub fn from_request(req: TopicRequest) -> Result<Self, ApiError> {
        let (Some(language), Some(topic)) = (non_blank(req.language), non_blank(req.topic)) else {
            return Err(ApiError::MissingField("Language and topic"));
        };

        Ok(Self {
            language: canonical_language(&language),
            topic: topic.trim().to_string(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
