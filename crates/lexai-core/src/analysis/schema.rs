//! JSON Schema validation for model output.
//!
//! Decoded model replies are checked against `schema/analysis_result.schema.json`
//! before they are turned into an [`AnalysisResult`](super::AnalysisResult).

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded result schema (loaded at compile time).
const ANALYSIS_RESULT_SCHEMA_JSON: &str = include_str!("../../schema/analysis_result.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value =
            serde_json::from_str(ANALYSIS_RESULT_SCHEMA_JSON)
                .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a decoded reply against the result schema.
///
/// Returns every violation as `"<message> at <path>"`.
pub fn validate_result_schema(value: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_result_passes() {
        let value = serde_json::json!({
            "summary": "Low risk.",
            "overall_risk_score": 10,
            "clauses": []
        });
        assert!(validate_result_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let value = serde_json::json!({
            "summary": "No score"
        });
        let errors = validate_result_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_score_out_of_range_fails() {
        for score in [-1, 101, 250] {
            let value = serde_json::json!({
                "summary": "s",
                "overall_risk_score": score,
                "clauses": []
            });
            assert!(validate_result_schema(&value).is_err(), "score {score}");
        }
    }

    #[test]
    fn test_score_must_be_integer() {
        let value = serde_json::json!({
            "summary": "s",
            "overall_risk_score": "72",
            "clauses": []
        });
        assert!(validate_result_schema(&value).is_err());
    }

    #[test]
    fn test_clause_requires_reasoning() {
        let value = serde_json::json!({
            "summary": "s",
            "overall_risk_score": 50,
            "clauses": [{
                "clause_type": "Indemnity",
                "risk_level": "High",
                "text_snippet": "shall indemnify"
            }]
        });
        let errors = validate_result_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("reasoning")));
    }

    #[test]
    fn test_null_recommendation_allowed() {
        let value = serde_json::json!({
            "summary": "s",
            "overall_risk_score": 50,
            "clauses": [{
                "clause_type": "Indemnity",
                "risk_level": "High",
                "text_snippet": "shall indemnify",
                "reasoning": "uncapped",
                "recommendation": null
            }]
        });
        assert!(validate_result_schema(&value).is_ok());
    }
}
