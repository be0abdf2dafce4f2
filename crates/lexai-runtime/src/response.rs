//! Provider response shapes and text extraction.
//!
//! Providers and API versions put the generated text in different places.
//! [`RawResponse`] enumerates the shapes we know about and [`extract_text`]
//! is the only code that looks inside them.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A model reply exactly as the provider shaped it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// A flattened text accessor (`{"text": "..."}`)
    Text(String),

    /// `generateContent` shape: `candidates[].content.parts[]`
    Candidates(Vec<Candidate>),

    /// Anything else, kept verbatim
    Unrecognized(JsonValue),
}

/// One generated candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Content of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a candidate's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    /// `{"text": "..."}`
    Text { text: String },

    /// A bare string part
    Bare(String),

    /// Non-text parts (inline data, function calls, ...)
    Other(JsonValue),
}

impl RawResponse {
    /// Classify a provider JSON body.
    ///
    /// A string `text` field wins; then a decodable `candidates` array;
    /// everything else is [`RawResponse::Unrecognized`].
    pub fn from_json(value: JsonValue) -> Self {
        if let Some(text) = value.get("text").and_then(JsonValue::as_str) {
            return RawResponse::Text(text.to_string());
        }

        if let Some(candidates) = value.get("candidates") {
            if let Ok(candidates) = serde_json::from_value::<Vec<Candidate>>(candidates.clone()) {
                return RawResponse::Candidates(candidates);
            }
        }

        RawResponse::Unrecognized(value)
    }

    /// JSON rendering of the response.
    pub fn to_json(&self) -> JsonValue {
        match self {
            RawResponse::Text(text) => serde_json::json!({ "text": text }),
            RawResponse::Candidates(candidates) => {
                serde_json::json!({ "candidates": candidates })
            }
            RawResponse::Unrecognized(value) => value.clone(),
        }
    }
}

impl fmt::Display for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Locate the textual payload of a response.
///
/// Returns `None` when no shape yields text, which callers must treat
/// differently from an empty reply.
pub fn extract_text(response: &RawResponse) -> Option<String> {
    match response {
        RawResponse::Text(text) if !text.is_empty() => Some(text.clone()),
        RawResponse::Text(_) | RawResponse::Unrecognized(_) => None,
        RawResponse::Candidates(candidates) => candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| {
                content.parts.iter().find_map(|part| match part {
                    Part::Text { text } => Some(text.clone()),
                    Part::Bare(text) => Some(text.clone()),
                    Part::Other(_) => None,
                })
            }),
    }
}
