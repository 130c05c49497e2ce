use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use nudge_types::api::{
    Claims, InboxResponse, SendMessageRequest, SendMessageResponse, ThreadMessagesResponse,
};

use crate::auth::AppState;
use crate::blocking;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let from = claims.username.clone();
    let sent = blocking(move || {
        engine.send_message(&from, &req.to_user, &req.body, req.reply_to_message_id)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            thread_id: sent.thread_id,
            message_id: sent.message_id,
            message_index: sent.message_index,
            created_at: sent.created_at,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    /// Username of the other participant.
    pub with: String,
}

/// The viewer's copy of the conversation: soft-deleted messages are
/// filtered out and the read cursor advances to the newest message.
pub async fn get_thread(
    State(state): State<AppState>,
    Query(query): Query<ThreadQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let viewer_id = claims.sub.to_string();
    let me = claims.username.clone();
    let (thread_id, messages) =
        blocking(move || engine.get_thread_messages(&me, &query.with, Some(&viewer_id))).await?;

    Ok(Json(ThreadMessagesResponse {
        thread_id,
        messages,
    }))
}

pub async fn inbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let viewer_id = claims.sub.to_string();
    let threads = blocking(move || engine.list_inbox(&viewer_id)).await?;
    Ok(Json(InboxResponse { threads }))
}

pub async fn soft_delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let viewer_id = claims.sub.to_string();
    blocking(move || engine.soft_delete_message(message_id, &viewer_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn hide_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let viewer_id = claims.sub.to_string();
    blocking(move || engine.hide_thread(thread_id, &viewer_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
