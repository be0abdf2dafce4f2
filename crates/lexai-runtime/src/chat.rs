//! Stateless legal chat.
//!
//! Every reply replays the whole conversation: a seeded system context, the
//! model's acknowledgement, the caller's history, then the new message.
//! Nothing is kept between calls.

use std::sync::Arc;
use std::time::Duration;

use lexai_core::{ChatTurn, UserProfileContext};

use crate::prompts::{build_chat_system_context, CHAT_ACKNOWLEDGEMENT};
use crate::providers::{ModelInvoker, ProviderError};
use crate::response::{extract_text, RawResponse};

/// Answers chat messages against a [`ModelInvoker`].
pub struct ChatOrchestrator {
    invoker: Arc<dyn ModelInvoker>,
    model: String,
    call_timeout: Duration,
}

impl ChatOrchestrator {
    pub fn new(invoker: Arc<dyn ModelInvoker>, model: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            invoker,
            model: model.into(),
            call_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Reply to `message`.
    ///
    /// Failures come back as the reply text itself
    /// (`"Error processing chat: ..."`), so this never errors.
    pub async fn reply(
        &self,
        message: &str,
        history: &[ChatTurn],
        contract_context: &str,
        user_context: Option<&UserProfileContext>,
    ) -> String {
        let turns = seed_conversation(history, contract_context, user_context);

        match self.converse(&turns, message).await {
            Ok(response) => extract_text(&response).unwrap_or_else(|| {
                tracing::debug!(model = %self.model, "No text in chat reply, returning raw response");
                response.to_string()
            }),
            Err(e) => {
                tracing::warn!(model = %self.model, error = %e, "Chat request failed");
                format!("Error processing chat: {}", e)
            }
        }
    }

    async fn converse(&self, turns: &[ChatTurn], message: &str) -> Result<RawResponse, ProviderError> {
        tokio::time::timeout(
            self.call_timeout,
            self.invoker.converse(&self.model, turns, message),
        )
        .await
        .unwrap_or(Err(ProviderError::Timeout(self.call_timeout)))
    }
}

/// Prior turns sent ahead of a new message.
///
/// Always starts with the system context as a user turn and the fixed
/// acknowledgement as a model turn, followed by `history` in order.
pub fn seed_conversation(
    history: &[ChatTurn],
    contract_context: &str,
    user_context: Option<&UserProfileContext>,
) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(history.len() + 2);
    turns.push(ChatTurn::user(build_chat_system_context(
        contract_context,
        user_context,
    )));
    turns.push(ChatTurn::model(CHAT_ACKNOWLEDGEMENT));
    turns.extend_from_slice(history);
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lexai_core::ChatRole;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns one canned reply and records what it was sent.
    struct RecordingInvoker {
        reply: Mutex<Option<Result<RawResponse, ProviderError>>>,
        seen: Mutex<Option<(String, Vec<ChatTurn>, String)>>,
    }

    impl RecordingInvoker {
        fn new(reply: Result<RawResponse, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(None),
            })
        }

        fn seen(&self) -> (String, Vec<ChatTurn>, String) {
            self.seen.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl ModelInvoker for RecordingInvoker {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<RawResponse, ProviderError> {
            unreachable!("chat never calls generate")
        }

        async fn converse(
            &self,
            model: &str,
            prior_turns: &[ChatTurn],
            message: &str,
        ) -> Result<RawResponse, ProviderError> {
            *self.seen.lock().unwrap() =
                Some((model.to_string(), prior_turns.to_vec(), message.to_string()));
            self.reply.lock().unwrap().take().unwrap()
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn chat(invoker: Arc<RecordingInvoker>) -> ChatOrchestrator {
        ChatOrchestrator::new(invoker, "chat-model", Duration::from_secs(5))
    }

    #[test]
    fn test_empty_history_still_seeds_two_turns() {
        let turns = seed_conversation(&[], "Clause 7. Non-compete.", None);

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert!(turns[0].content.contains("Clause 7. Non-compete."));
        assert_eq!(turns[1], ChatTurn::model(CHAT_ACKNOWLEDGEMENT));
    }

    #[tokio::test]
    async fn test_history_follows_seed_in_order() {
        let invoker = RecordingInvoker::new(Ok(RawResponse::Text("It is narrow.".to_string())));
        let history = vec![
            ChatTurn::user("What does clause 7 say?"),
            ChatTurn::model("It restricts competition for 12 months."),
        ];

        let reply = chat(invoker.clone())
            .reply("Is that enforceable?", &history, "Clause 7.", None)
            .await;
        assert_eq!(reply, "It is narrow.");

        let (model, turns, message) = invoker.seen();
        assert_eq!(model, "chat-model");
        assert_eq!(message, "Is that enforceable?");
        assert_eq!(turns.len(), 4);
        assert_eq!(&turns[2..], &history[..]);
    }

    #[tokio::test]
    async fn test_user_profile_reaches_system_context() {
        let invoker = RecordingInvoker::new(Ok(RawResponse::Text("ok".to_string())));
        let user = UserProfileContext {
            industry: Some("Construction".to_string()),
            ..Default::default()
        };

        chat(invoker.clone())
            .reply("hi", &[], "", Some(&user))
            .await;

        let (_, turns, _) = invoker.seen();
        assert!(turns[0].content.contains("USER PROFILE:\nIndustry: Construction"));
    }

    #[tokio::test]
    async fn test_failure_is_returned_inline() {
        let invoker = RecordingInvoker::new(Err(ProviderError::RateLimited { retry_after: None }));
        let reply = chat(invoker).reply("hi", &[], "", None).await;

        assert_eq!(
            reply,
            "Error processing chat: Rate limit exceeded, retry after None"
        );
    }

    #[tokio::test]
    async fn test_absent_text_returns_raw_rendering() {
        let blocked = RawResponse::from_json(json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        let invoker = RecordingInvoker::new(Ok(blocked));
        let reply = chat(invoker).reply("hi", &[], "", None).await;

        assert_eq!(reply, r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
    }

    #[tokio::test]
    async fn test_empty_text_part_is_an_empty_reply() {
        let reply = RawResponse::from_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "" }] } }]
        }));
        let invoker = RecordingInvoker::new(Ok(reply));
        assert_eq!(chat(invoker).reply("hi", &[], "", None).await, "");
    }
}
