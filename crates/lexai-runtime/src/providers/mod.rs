//! Model provider abstractions for lexai-runtime.
//!
//! This module defines the [`ModelInvoker`] trait and the Gemini
//! implementation behind the `gemini` feature.
//!
//! ## Security
//!
//! Providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use lexai_core::ChatTurn;
use std::time::Duration;
use thiserror::Error;

use crate::response::RawResponse;

mod gemini;
pub mod secrets;

pub use gemini::{GeminiProvider, GEMINI_API_KEY_ENV};
pub use secrets::{ApiCredential, CredentialSource};

/// Errors from model providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Sampling settings sent with every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationConfig {
    /// Sampling temperature; provider default when unset
    pub temperature: Option<f32>,

    /// Cap on generated tokens; provider default when unset
    pub max_output_tokens: Option<u32>,
}

/// Calls a generative model.
///
/// Implementations make exactly one upstream request per call. They never
/// retry and never interpret the reply; fallback policy belongs to the
/// orchestrators.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Single-shot generation from one prompt.
    async fn generate(&self, model: &str, prompt: &str) -> Result<RawResponse, ProviderError>;

    /// Multi-turn generation.
    ///
    /// `prior_turns` is the whole conversation so far, oldest first; nothing
    /// is remembered between calls.
    async fn converse(
        &self,
        model: &str,
        prior_turns: &[ChatTurn],
        message: &str,
    ) -> Result<RawResponse, ProviderError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ProviderError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - overloaded");

        let err = ProviderError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "Timeout after 5s");
    }
}
