//! Structured contract analysis results.
//!
//! A model reply is trusted only after it decodes as JSON and validates
//! against `schema/analysis_result.schema.json`.

mod parser;
mod result;
mod schema;

pub use parser::{parse_structured_result, ResultError};
pub use result::{
    truncate_chars, AnalysisResult, ClauseFinding, RiskLevel, DEGRADED_MESSAGE_CHARS,
    MAX_RISK_SCORE,
};
pub use schema::{validate_result_schema, SchemaError};
