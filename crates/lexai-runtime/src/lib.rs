//! # lexai-runtime
//!
//! Model orchestration for LexAI.
//!
//! This crate owns everything that talks to a generative model:
//! - [`providers`]: the [`ModelInvoker`] seam and the Gemini provider
//! - [`prompts`]: analysis and chat prompt construction
//! - [`response`]: provider reply shapes and text extraction
//! - [`analysis`]: two-tier analysis with a degraded fallback
//! - [`chat`]: stateless multi-turn chat
//!
//! Parsing and validating the structured result lives in `lexai-core` and
//! never makes a model call.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lexai_runtime::{LexAi, RuntimeConfig};
//! use lexai_core::AnalysisProfile;
//!
//! let config = RuntimeConfig::load(None)?;
//! let lexai = LexAi::from_config(&config)?;
//!
//! let result = lexai
//!     .analyze("This agreement renews automatically...", &AnalysisProfile::default())
//!     .await;
//! println!("risk {}: {}", result.overall_risk_score, result.summary);
//! ```

use std::sync::Arc;

use lexai_core::{AnalysisProfile, AnalysisResult, ChatTurn, UserProfileContext};

pub mod analysis;
pub mod chat;
pub mod config;
pub mod prompts;
pub mod providers;
pub mod response;

pub use analysis::{AnalysisError, AnalysisOrchestrator, ModelTiers};
pub use chat::{seed_conversation, ChatOrchestrator};
pub use config::{ConfigError, RuntimeConfig};
pub use providers::{GeminiProvider, ModelInvoker, ProviderError};
pub use response::{extract_text, RawResponse};

/// Analysis and chat over one shared model invoker.
pub struct LexAi {
    analysis: AnalysisOrchestrator,
    chat: ChatOrchestrator,
}

impl LexAi {
    /// Wire both orchestrators to `invoker` using the models and timeout in `config`.
    pub fn new(invoker: Arc<dyn ModelInvoker>, config: &RuntimeConfig) -> Self {
        Self {
            analysis: AnalysisOrchestrator::new(
                Arc::clone(&invoker),
                ModelTiers::from_config(config),
                config.request_timeout,
            ),
            chat: ChatOrchestrator::new(invoker, &config.chat_model, config.request_timeout),
        }
    }

    /// Build over a [`GeminiProvider`]; fails if no API key is available.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let provider = GeminiProvider::from_config(config)?;
        Ok(Self::new(Arc::new(provider), config))
    }

    pub async fn analyze(&self, contract_text: &str, profile: &AnalysisProfile) -> AnalysisResult {
        self.analysis.analyze(contract_text, profile).await
    }

    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        contract_context: &str,
        user_context: Option<&UserProfileContext>,
    ) -> String {
        self.chat
            .reply(message, history, contract_context, user_context)
            .await
    }

    pub fn analysis(&self) -> &AnalysisOrchestrator {
        &self.analysis
    }

    pub fn chat_orchestrator(&self) -> &ChatOrchestrator {
        &self.chat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers every call with the model name it was asked for.
    struct EchoModel;

    #[async_trait]
    impl ModelInvoker for EchoModel {
        async fn generate(&self, model: &str, _prompt: &str) -> Result<RawResponse, ProviderError> {
            Ok(RawResponse::Text(format!(
                r#"{{"summary":"{}","overall_risk_score":10,"clauses":[]}}"#,
                model
            )))
        }

        async fn converse(
            &self,
            model: &str,
            _prior_turns: &[ChatTurn],
            _message: &str,
        ) -> Result<RawResponse, ProviderError> {
            Ok(RawResponse::Text(model.to_string()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_facade_uses_configured_models() {
        let config = RuntimeConfig {
            primary_model: "analysis-model".to_string(),
            chat_model: "chat-model".to_string(),
            ..Default::default()
        };
        let lexai = LexAi::new(Arc::new(EchoModel), &config);

        let result = lexai.analyze("Term.", &AnalysisProfile::default()).await;
        assert_eq!(result.summary, "analysis-model");
        assert_eq!(result.overall_risk_score, 10);

        let reply = lexai.chat("hi", &[], "", None).await;
        assert_eq!(reply, "chat-model");
        assert_eq!(lexai.chat_orchestrator().model(), "chat-model");
        assert_eq!(lexai.analysis().tiers().fallback, config.fallback_model);
    }
}
