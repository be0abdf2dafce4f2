//! # lexai-core
//!
//! Deterministic domain model for LexAI contract analysis.
//!
//! This crate holds everything that does not talk to a model:
//! - Request types: [`AnalysisProfile`], [`ChatTurn`], [`UserProfileContext`]
//! - The structured result: [`AnalysisResult`] and [`ClauseFinding`]
//! - Recovery of a result from model text: [`parse_structured_result`]
//! - Contract text from uploads, PDFs included: [`decode_contract`]
//!
//! ## Example
//!
//! ```rust
//! use lexai_core::parse_structured_result;
//!
//! let reply = r#"Sure! {"summary":"Low risk.","overall_risk_score":12,"clauses":[]}"#;
//! let result = parse_structured_result(reply).unwrap();
//! assert_eq!(result.overall_risk_score, 12);
//! ```

pub mod analysis;
pub mod document;
pub mod types;

// Re-export main types at crate root
pub use analysis::{
    parse_structured_result, truncate_chars, AnalysisResult, ClauseFinding, ResultError,
    RiskLevel,
};
pub use document::{decode_contract, extract_pdf_text, DocumentError};
pub use types::{AnalysisProfile, ChatRole, ChatTurn, UserProfileContext};
