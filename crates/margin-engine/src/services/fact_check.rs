use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotations::clamp_confidence;

/// Confidence assumed when a provider does not report one
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

pub const ALL_UNAVAILABLE: &str =
    "All AI services are temporarily unavailable. Please try again later.";

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum FactCheckError {
    #[error("Nothing to fact-check")]
    EmptyText,
    #[error("Fact-check service unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed fact-check response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResponse {
    pub result: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl FactCheckResponse {
    /// Interpret free-form model output.
    ///
    /// Accepts a JSON object, optionally wrapped in a markdown code fence,
    /// with `result`, `confidence` and `sources`. Anything that is not such an
    /// object is taken verbatim as the result. Missing fields default to
    /// [`DEFAULT_CONFIDENCE`] and `[source]`.
    pub fn from_model_output(raw: &str, source: &str) -> Self {
        let fallback_sources = || Some(vec![source.to_string()]);
        let parsed = serde_json::from_str::<Value>(strip_code_fence(raw));

        let Ok(Value::Object(object)) = parsed else {
            debug!("{source}: output is not a JSON object, using it verbatim");
            return Self {
                result: raw.trim().to_string(),
                confidence: DEFAULT_CONFIDENCE,
                sources: fallback_sources(),
            };
        };

        let result = match object.get("result") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => raw.trim().to_string(),
        };
        let confidence = object
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_CONFIDENCE);
        let sources = match object.get("sources").and_then(Value::as_array) {
            Some(items) => Some(
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            ),
            None => fallback_sources(),
        };

        Self {
            result,
            confidence: clamp_confidence(confidence),
            sources,
        }
    }

    fn all_unavailable() -> Self {
        Self {
            result: ALL_UNAVAILABLE.to_string(),
            confidence: 0.0,
            sources: Some(vec!["System Error".to_string()]),
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.split("```").next().unwrap_or(rest).trim()
}

/// An AI service that can judge a statement
pub trait FactChecker {
    /// Provider name, used as the default source
    fn name(&self) -> &str;
    fn fact_check(&self, text: &str) -> Result<FactCheckResponse, FactCheckError>;
}

/// Tries each provider in order, answering with an "unavailable" response
/// rather than an error when all of them fail
#[derive(Default)]
pub struct FallbackFactChecker {
    checkers: Vec<Box<dyn FactChecker>>,
}

impl FallbackFactChecker {
    pub fn new(checkers: Vec<Box<dyn FactChecker>>) -> Self {
        Self { checkers }
    }

    pub fn push(&mut self, checker: Box<dyn FactChecker>) {
        self.checkers.push(checker);
    }
}

impl FactChecker for FallbackFactChecker {
    fn name(&self) -> &str {
        "fallback"
    }

    fn fact_check(&self, text: &str) -> Result<FactCheckResponse, FactCheckError> {
        if text.trim().is_empty() {
            return Err(FactCheckError::EmptyText);
        }
        for checker in &self.checkers {
            match checker.fact_check(text) {
                Ok(response) => return Ok(response),
                Err(e) => warn!("fact check via {} failed: {e}", checker.name()),
            }
        }
        Ok(FactCheckResponse::all_unavailable())
    }
}
