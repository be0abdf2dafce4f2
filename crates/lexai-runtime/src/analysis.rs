//! Contract analysis with a two-tier model fallback.
//!
//! Flow for one request:
//! 1. Build the prompt once
//! 2. Primary model: generate, extract text, parse
//! 3. On any failure, the fallback model with the same prompt
//! 4. On a second failure, a degraded result carrying the last error
//!
//! [`AnalysisOrchestrator::analyze`] therefore always returns a result.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use lexai_core::{parse_structured_result, AnalysisProfile, AnalysisResult, ResultError};

use crate::config::RuntimeConfig;
use crate::prompts::build_analysis_prompt;
use crate::providers::{ModelInvoker, ProviderError};
use crate::response::extract_text;

/// Why one model tier did not produce a result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    UpstreamUnavailable(#[from] ProviderError),

    #[error("No response text returned from model {model}")]
    NoTextInResponse { model: String },

    #[error(transparent)]
    MalformedResult(#[from] ResultError),
}

/// Models tried in order for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTiers {
    pub primary: String,
    pub fallback: String,
}

impl ModelTiers {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(&config.primary_model, &config.fallback_model)
    }
}

/// Runs analysis requests against a [`ModelInvoker`].
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct AnalysisOrchestrator {
    invoker: Arc<dyn ModelInvoker>,
    tiers: ModelTiers,
    call_timeout: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(invoker: Arc<dyn ModelInvoker>, tiers: ModelTiers, call_timeout: Duration) -> Self {
        Self {
            invoker,
            tiers,
            call_timeout,
        }
    }

    pub fn tiers(&self) -> &ModelTiers {
        &self.tiers
    }

    /// Analyse a contract for the given client profile.
    pub async fn analyze(&self, contract_text: &str, profile: &AnalysisProfile) -> AnalysisResult {
        let prompt = build_analysis_prompt(contract_text, profile);

        let primary_err = match self.attempt(&self.tiers.primary, &prompt).await {
            Ok(result) => return result,
            Err(e) => e,
        };
        tracing::warn!(
            model = %self.tiers.primary,
            error = %primary_err,
            "Primary model failed, trying fallback"
        );

        match self.attempt(&self.tiers.fallback, &prompt).await {
            Ok(result) => result,
            Err(fallback_err) => {
                tracing::warn!(
                    model = %self.tiers.fallback,
                    error = %fallback_err,
                    "Fallback model failed"
                );
                tracing::error!(
                    provider = self.invoker.name(),
                    "All model tiers failed, returning degraded analysis"
                );
                AnalysisResult::degraded(&fallback_err.to_string())
            }
        }
    }

    /// One tier: generate, extract, parse.
    async fn attempt(&self, model: &str, prompt: &str) -> Result<AnalysisResult, AnalysisError> {
        let response =
            match tokio::time::timeout(self.call_timeout, self.invoker.generate(model, prompt))
                .await
            {
                Ok(response) => response?,
                Err(_) => return Err(ProviderError::Timeout(self.call_timeout).into()),
            };

        let text = extract_text(&response).ok_or_else(|| AnalysisError::NoTextInResponse {
            model: model.to_string(),
        })?;

        let result = parse_structured_result(&text)?;
        tracing::debug!(
            model,
            score = result.overall_risk_score,
            clauses = result.clauses.len(),
            "Analysis parsed"
        );
        Ok(result)
    }
}
