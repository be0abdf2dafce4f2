//! Google Gemini provider over the `generateContent` REST endpoint.
//!
//! ## Security
//!
//! The API key is held in an [`ApiCredential`] and only exposed when the
//! request header is set.

use super::{
    secrets::{ApiCredential, CredentialSource},
    GenerationConfig, ModelInvoker, ProviderError,
};
use crate::config::RuntimeConfig;
use crate::response::RawResponse;
use async_trait::async_trait;
use lexai_core::{ChatRole, ChatTurn};
#[cfg(feature = "gemini")]
use serde::Deserialize;
use serde::Serialize;
use std::time::Duration;

/// Environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini provider.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    generation: GenerationConfig,
    timeout: Duration,
    #[cfg(feature = "gemini")]
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider with default endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let defaults = RuntimeConfig::default();
        Self::build(
            ApiCredential::new(api_key, CredentialSource::Programmatic, "Gemini API key"),
            defaults.base_url,
            defaults.request_timeout,
        )
    }

    /// Create from runtime configuration, falling back to `GEMINI_API_KEY`.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        Self::from_config_with_env(config, |key| std::env::var(key).ok())
    }

    /// [`from_config`](Self::from_config) with the environment read through `lookup`.
    pub fn from_config_with_env<F>(config: &RuntimeConfig, lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = ApiCredential::resolve_with(
            config.api_key.as_deref(),
            GEMINI_API_KEY_ENV,
            "Gemini API key",
            lookup,
        )?;
        Self::configured(credential, config)
    }

    /// Like [`from_config`](Self::from_config), but a missing key is not an
    /// error: the provider is built anyway and every call fails with
    /// [`ProviderError::NotConfigured`].
    pub fn from_config_lenient(config: &RuntimeConfig) -> Result<Self, ProviderError> {
        Self::from_config_lenient_with_env(config, |key| std::env::var(key).ok())
    }

    fn from_config_lenient_with_env<F>(
        config: &RuntimeConfig,
        lookup: F,
    ) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match Self::from_config_with_env(config, lookup) {
            Err(ProviderError::NotConfigured(reason)) => {
                tracing::warn!(%reason, "Gemini API key missing, model calls will fail");
                Self::configured(
                    ApiCredential::new("", CredentialSource::Programmatic, "Gemini API key"),
                    config,
                )
            }
            other => other,
        }
    }

    fn configured(credential: ApiCredential, config: &RuntimeConfig) -> Result<Self, ProviderError> {
        let provider = Self::build(credential, config.base_url.clone(), config.request_timeout)?;
        Ok(provider.with_generation(GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }))
    }

    fn build(
        credential: ApiCredential,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            credential,
            base_url,
            generation: GenerationConfig::default(),
            timeout,
            #[cfg(feature = "gemini")]
            client: reqwest::Client::builder()
                .build()
                .map_err(|e| ProviderError::HttpError(e.to_string()))?,
        })
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set sampling parameters.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn request<'a>(&self, prior_turns: &'a [ChatTurn], message: &'a str) -> GenerateRequest<'a> {
        let contents = prior_turns
            .iter()
            .map(|turn| RequestContent::new(turn.role, &turn.content))
            .chain(std::iter::once(RequestContent::new(ChatRole::User, message)))
            .collect();

        let generation_config = (self.generation != GenerationConfig::default()).then(|| {
            RequestGenerationConfig {
                temperature: self.generation.temperature,
                max_output_tokens: self.generation.max_output_tokens,
            }
        });

        GenerateRequest {
            contents,
            generation_config,
        }
    }

    #[cfg(feature = "gemini")]
    async fn send(
        &self,
        model: &str,
        request: &GenerateRequest<'_>,
    ) -> Result<RawResponse, ProviderError> {
        if self.credential.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} not set",
                self.credential.name()
            )));
        }

        // Only expose the credential here, at the point of use
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.credential.expose())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(RawResponse::from_json(body))
    }

    #[cfg(not(feature = "gemini"))]
    async fn send(
        &self,
        _model: &str,
        _request: &GenerateRequest<'_>,
    ) -> Result<RawResponse, ProviderError> {
        Err(ProviderError::NotConfigured(
            "Gemini provider requires 'gemini' feature".to_string(),
        ))
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<RequestGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

impl<'a> RequestContent<'a> {
    fn new(role: ChatRole, text: &'a str) -> Self {
        Self {
            role: role.as_str(),
            parts: vec![RequestPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini error body: `{"error": {"code": 400, "message": "...", "status": "..."}}`
#[cfg(feature = "gemini")]
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[cfg(feature = "gemini")]
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[async_trait]
impl ModelInvoker for GeminiProvider {
    async fn generate(&self, model: &str, prompt: &str) -> Result<RawResponse, ProviderError> {
        let request = self.request(&[], prompt);
        self.send(model, &request).await
    }

    async fn converse(
        &self,
        model: &str,
        prior_turns: &[ChatTurn],
        message: &str,
    ) -> Result<RawResponse, ProviderError> {
        let request = self.request(prior_turns, message);
        self.send(model, &request).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
