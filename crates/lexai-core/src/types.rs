//! Request-side types shared by analysis and chat.

use serde::{Deserialize, Serialize};

/// Who the analysis is performed for.
///
/// Supplied by the caller and used only to parameterise the prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisProfile {
    /// Client industry (e.g., "SaaS", "Construction")
    pub industry: String,

    /// Appetite for risk (e.g., "Low", "Moderate", "High")
    pub risk_tolerance: String,

    /// Client's side of the contract (e.g., "Vendor", "Client")
    pub role: String,
}

impl AnalysisProfile {
    pub const DEFAULT_INDUSTRY: &'static str = "General";
    pub const DEFAULT_RISK_TOLERANCE: &'static str = "Moderate";
    pub const DEFAULT_ROLE: &'static str = "Client";

    pub fn new(
        industry: impl Into<String>,
        risk_tolerance: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            industry: industry.into(),
            risk_tolerance: risk_tolerance.into(),
            role: role.into(),
        }
    }
}

impl Default for AnalysisProfile {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_INDUSTRY,
            Self::DEFAULT_RISK_TOLERANCE,
            Self::DEFAULT_ROLE,
        )
    }
}

/// Speaker of a chat turn.
///
/// Anything other than `"user"` is read as the model's side, so histories
/// written with `"assistant"` replay correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

impl From<String> for ChatRole {
    fn from(role: String) -> Self {
        Self::from(role.as_str())
    }
}

impl From<&str> for ChatRole {
    fn from(role: &str) -> Self {
        if role == "user" {
            ChatRole::User
        } else {
            ChatRole::Model
        }
    }
}

/// One message in a conversation. Conversations are ordered oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// Optional details about the person chatting, used to personalise replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfileContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tolerance: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserProfileContext {
    /// Labelled, non-empty profile fields in display order.
    ///
    /// Email is not part of this list and never reaches a prompt.
    pub fn prompt_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Name", &self.name),
            ("Industry", &self.industry),
            ("Role", &self.role),
            ("Risk Tolerance", &self.risk_tolerance),
        ]
        .into_iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (label, v))
        })
        .collect()
    }
}
