//! # lexai-server
//!
//! HTTP API over [`LexAi`], with user accounts and saved chat sessions.
//!
//! | Route | Body | Reply |
//! |-------|------|-------|
//! | `GET /` | | `{"status": "LexAI API is running"}` |
//! | `GET /health` | | `ok` |
//! | `POST /analyze` | multipart `file` (text or PDF) + profile fields | analysis JSON |
//! | `POST /analyze-text` | urlencoded `text` + profile fields | analysis JSON |
//! | `POST /chat` | JSON chat request, optional `session_id` | `{"response", "session_id"}` |
//! | `POST /signup` | JSON `{email, password, full_name}` | token |
//! | `POST /login` | urlencoded `username` + `password` | token |
//! | `GET /me` | bearer | `{id, email, full_name}` |
//! | `GET`/`POST /chat-sessions` | bearer | session list / new session |
//! | `GET /chat-sessions/{id}/messages` | bearer | stored messages |
//! | `DELETE /chat-sessions/{id}` | bearer | `{"status": "deleted"}` |
//!
//! Errors are `{"detail": "..."}`: 400 for bad input, 401 for missing or
//! invalid credentials, 404 for another user's or a missing session. Model
//! failures never surface as errors: analysis degrades and chat answers with
//! the error text.

pub mod auth;
pub mod config;
pub mod error;
mod sessions;
pub mod store;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{
        rejection::{FormRejection, JsonRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use lexai_core::{decode_contract, AnalysisProfile, AnalysisResult, ChatTurn, UserProfileContext};
use lexai_runtime::LexAi;

pub use auth::{Accounts, TokenKeys};
pub use config::{ServerConfig, ServerConfigError};
pub use error::ApiError;
pub use store::{Store, StoreError};

/// Largest accepted request body.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    lexai: Arc<LexAi>,
    accounts: Accounts,
}

/// Build the application router.
///
/// CORS accepts any origin with credentials, echoing the caller's origin.
pub fn router(lexai: Arc<LexAi>, accounts: Accounts) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .route("/analyze", post(analyze_upload))
        .route("/analyze-text", post(analyze_text))
        .route("/chat", post(chat))
        .merge(auth::routes())
        .merge(sessions::routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(trace_request))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState { lexai, accounts })
}

async fn trace_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let route = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        route = %route,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );
    response
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "status": "LexAI API is running" }))
}

fn default_industry() -> String {
    AnalysisProfile::DEFAULT_INDUSTRY.to_string()
}

fn default_risk_tolerance() -> String {
    AnalysisProfile::DEFAULT_RISK_TOLERANCE.to_string()
}

fn default_role() -> String {
    AnalysisProfile::DEFAULT_ROLE.to_string()
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextForm {
    text: String,
    #[serde(default = "default_industry")]
    industry: String,
    #[serde(default = "default_risk_tolerance")]
    risk_tolerance: String,
    #[serde(default = "default_role")]
    role: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
    contract_context: String,
    #[serde(default)]
    user_details: Option<UserProfileContext>,
    /// Saved session to continue; requires a bearer token.
    #[serde(default)]
    session_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    session_id: Option<i64>,
}

async fn analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let mut profile = AnalysisProfile::default();
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                upload = Some((file_name, bytes.to_vec()));
            }
            "industry" => profile.industry = field.text().await?,
            "risk_tolerance" => profile.risk_tolerance = field.text().await?,
            "role" => profile.role = field.text().await?,
            _ => {}
        }
    }

    let (file_name, bytes) = upload.ok_or(ApiError::MissingFile)?;
    let contract_text = {
        let file_name = file_name.clone();
        tokio::task::spawn_blocking(move || decode_contract(file_name.as_deref(), bytes))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??
    };
    tracing::debug!(
        file = file_name.as_deref().unwrap_or("<unnamed>"),
        chars = contract_text.chars().count(),
        "Contract uploaded"
    );

    let result = state.lexai.analyze(&contract_text, &profile).await;
    Ok(Json(result.with_contract_text(contract_text)))
}

async fn analyze_text(
    State(state): State<AppState>,
    form: Result<Form<AnalyzeTextForm>, FormRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Form(form) = form?;
    let profile = AnalysisProfile::new(form.industry, form.risk_tolerance, form.role);

    let result = state.lexai.analyze(&form.text, &profile).await;
    Ok(Json(result.with_contract_text(form.text)))
}

/// Stateless unless `session_id` is given. With a session, an empty
/// `history` is filled from the stored messages and the exchange is saved.
async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = request?;

    let Some(session_id) = request.session_id else {
        let response = state
            .lexai
            .chat(
                &request.message,
                &request.history,
                &request.contract_context,
                request.user_details.as_ref(),
            )
            .await;
        return Ok(Json(ChatResponse {
            response,
            session_id: None,
        }));
    };

    let user = state.accounts.authenticate(&headers).await?;
    let store = state.accounts.store();
    store
        .session(user.id, session_id)
        .await?
        .ok_or(ApiError::SessionNotFound)?;

    let history = if request.history.is_empty() {
        store
            .messages(session_id)
            .await?
            .iter()
            .map(ChatTurn::from)
            .collect()
    } else {
        request.history
    };

    let response = state
        .lexai
        .chat(
            &request.message,
            &history,
            &request.contract_context,
            request.user_details.as_ref(),
        )
        .await;
    store
        .append_exchange(session_id, request.message, response.clone())
        .await?;

    Ok(Json(ChatResponse {
        response,
        session_id: Some(session_id),
    }))
}
