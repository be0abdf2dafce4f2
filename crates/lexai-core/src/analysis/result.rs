//! Structured analysis output.

use serde::{Deserialize, Serialize};

/// Highest allowed `overall_risk_score`.
pub const MAX_RISK_SCORE: u8 = 100;

/// Longest slice of a failure message embedded in a degraded summary.
pub const DEGRADED_MESSAGE_CHARS: usize = 100;

/// Coarse risk classification of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

/// A single clause the model flagged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClauseFinding {
    /// Kind of clause (e.g., "Indemnification")
    pub clause_type: String,

    /// "High", "Medium" or "Low" as written by the model
    pub risk_level: String,

    /// Quote from the contract. Not checked against the source text.
    pub text_snippet: String,

    /// Why the clause matters for this profile
    pub reasoning: String,

    /// Suggested change, if any
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl ClauseFinding {
    /// Interpret the free-text risk level.
    pub fn risk_level_kind(&self) -> Option<RiskLevel> {
        match self.risk_level.trim().to_ascii_lowercase().as_str() {
            "high" => Some(RiskLevel::High),
            "medium" => Some(RiskLevel::Medium),
            "low" => Some(RiskLevel::Low),
            _ => None,
        }
    }
}

/// Result of one contract analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisResult {
    /// Short executive summary
    pub summary: String,

    /// Overall risk, 0 (none) to 100
    pub overall_risk_score: u8,

    /// Flagged clauses in the order the model listed them
    pub clauses: Vec<ClauseFinding>,

    /// The analysed text, echoed back by the HTTP layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_text: Option<String>,
}

impl AnalysisResult {
    /// Zero-information result returned when no model produced a usable answer.
    pub fn degraded(failure: &str) -> Self {
        Self {
            summary: format!(
                "Error analyzing contract: {}... Please try again.",
                truncate_chars(failure, DEGRADED_MESSAGE_CHARS)
            ),
            overall_risk_score: 0,
            clauses: Vec::new(),
            contract_text: None,
        }
    }

    /// Attach the analysed text.
    pub fn with_contract_text(mut self, text: impl Into<String>) -> Self {
        self.contract_text = Some(text.into());
        self
    }

    /// Count of clauses at a given risk level.
    pub fn count_at(&self, level: RiskLevel) -> usize {
        self.clauses
            .iter()
            .filter(|c| c.risk_level_kind() == Some(level))
            .count()
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
///
/// Never splits a multi-byte character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(level: &str) -> ClauseFinding {
        ClauseFinding {
            clause_type: "Termination".to_string(),
            risk_level: level.to_string(),
            text_snippet: "either party may terminate".to_string(),
            reasoning: "short notice".to_string(),
            recommendation: None,
        }
    }

    #[test]
    fn test_degraded_result_shape() {
        let result = AnalysisResult::degraded("upstream timed out");
        assert_eq!(result.overall_risk_score, 0);
        assert!(result.clauses.is_empty());
        assert_eq!(
            result.summary,
            "Error analyzing contract: upstream timed out... Please try again."
        );
    }

    #[test]
    fn test_degraded_truncates_long_failures() {
        let failure = "x".repeat(500);
        let result = AnalysisResult::degraded(&failure);
        let embedded = result
            .summary
            .trim_start_matches("Error analyzing contract: ")
            .trim_end_matches("... Please try again.");
        assert_eq!(embedded.chars().count(), DEGRADED_MESSAGE_CHARS);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_risk_level_kind() {
        assert_eq!(clause("High").risk_level_kind(), Some(RiskLevel::High));
        assert_eq!(clause(" medium ").risk_level_kind(), Some(RiskLevel::Medium));
        assert_eq!(clause("LOW").risk_level_kind(), Some(RiskLevel::Low));
        assert_eq!(clause("Critical").risk_level_kind(), None);
    }

    #[test]
    fn test_count_at() {
        let result = AnalysisResult {
            summary: "s".to_string(),
            overall_risk_score: 40,
            clauses: vec![clause("High"), clause("Low"), clause("high")],
            contract_text: None,
        };
        assert_eq!(result.count_at(RiskLevel::High), 2);
        assert_eq!(result.count_at(RiskLevel::Medium), 0);
    }

    #[test]
    fn test_contract_text_omitted_when_absent() {
        let json = serde_json::to_value(AnalysisResult::degraded("e")).unwrap();
        assert!(json.get("contract_text").is_none());

        let json =
            serde_json::to_value(AnalysisResult::degraded("e").with_contract_text("body")).unwrap();
        assert_eq!(json["contract_text"], "body");
    }
}
