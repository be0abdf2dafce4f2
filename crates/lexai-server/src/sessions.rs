//! Saved chat sessions, private to the signed-in user.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::store::{ChatSessionSummary, StoredMessage};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    title: String,
}

#[derive(Debug, Serialize)]
struct SessionList {
    sessions: Vec<ChatSessionSummary>,
}

#[derive(Debug, Serialize)]
struct SessionMessages {
    session_id: i64,
    title: String,
    messages: Vec<StoredMessage>,
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat-sessions", get(list_sessions).post(create_session))
        .route("/chat-sessions/:session_id", delete(delete_session))
        .route("/chat-sessions/:session_id/messages", get(session_messages))
}

async fn create_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    request: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<Json<ChatSessionSummary>, ApiError> {
    let Json(request) = request?;
    let session = state
        .accounts
        .store()
        .create_session(user.id, request.title)
        .await?;
    tracing::debug!(user_id = user.id, session_id = session.id, "Chat session created");
    Ok(Json(session))
}

async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SessionList>, ApiError> {
    let sessions = state.accounts.store().sessions_for(user.id).await?;
    Ok(Json(SessionList { sessions }))
}

async fn session_messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SessionMessages>, ApiError> {
    let Path(session_id) = session_id?;
    let store = state.accounts.store();

    let session = store
        .session(user.id, session_id)
        .await?
        .ok_or(ApiError::SessionNotFound)?;
    let messages = store.messages(session_id).await?;

    Ok(Json(SessionMessages {
        session_id,
        title: session.title,
        messages,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    session_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(session_id) = session_id?;
    if !state
        .accounts
        .store()
        .delete_session(user.id, session_id)
        .await?
    {
        return Err(ApiError::SessionNotFound);
    }
    tracing::debug!(user_id = user.id, session_id, "Chat session deleted");
    Ok(Json(json!({ "status": "deleted" })))
}
