//! Recovering an [`AnalysisResult`] from model text.
//!
//! Models are told to answer with bare JSON but often wrap it in prose or
//! Markdown fences. Parsing first tries the whole text, then the span from
//! the first `{` to the last `}`.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::result::AnalysisResult;
use super::schema::validate_result_schema;

lazy_static! {
    /// Greedy: first `{` through the last `}` in the text, across lines.
    static ref JSON_OBJECT_SPAN: Regex = Regex::new(r"(?s)\{.*\}").expect("Invalid regex");
}

/// Errors from parsing model output.
#[derive(Error, Debug)]
pub enum ResultError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result does not match schema: {}", .0.join("; "))]
    Schema(Vec<String>),
}

/// Parse model text into a validated [`AnalysisResult`].
///
/// If the text as a whole is not JSON, the first-`{`-to-last-`}` span is
/// decoded instead. Text that is JSON but fails validation is not retried.
pub fn parse_structured_result(raw_text: &str) -> Result<AnalysisResult, ResultError> {
    let value = match serde_json::from_str::<JsonValue>(raw_text) {
        Ok(value) => value,
        Err(direct_err) => {
            let Some(span) = JSON_OBJECT_SPAN.find(raw_text) else {
                return Err(direct_err.into());
            };
            tracing::debug!(
                error = %direct_err,
                start = span.start(),
                end = span.end(),
                "Direct parse failed, retrying on brace-delimited span"
            );
            serde_json::from_str(span.as_str())?
        }
    };
    validate(value)
}

/// Coerce, check against the schema, then build the typed result.
fn validate(mut value: JsonValue) -> Result<AnalysisResult, ResultError> {
    normalize_score(&mut value);
    validate_result_schema(&value).map_err(ResultError::Schema)?;
    Ok(serde_json::from_value(value)?)
}

/// Rewrite a whole-valued score given as a float (`72.0`) or a numeric
/// string (`"72"`) as an integer. Anything else is left for the schema.
fn normalize_score(value: &mut JsonValue) {
    let Some(score) = value.get_mut("overall_risk_score") else {
        return;
    };
    let whole = match score {
        JsonValue::Number(n) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if let Some(whole) = whole {
        *score = JsonValue::from(whole);
    }
}
