use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use nudge_core::notifications;
use nudge_types::api::{Claims, MarkNotificationsRead, NotificationsResponse, UnreadCountResponse};

use crate::auth::AppState;
use crate::blocking;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub unread_only: bool,
}

fn default_limit() -> u32 {
    20
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let limit = query.limit.min(100);
    let notifications =
        blocking(move || notifications::list(&engine, &user_id, limit, query.unread_only))
            .await?;
    Ok(Json(NotificationsResponse {
        count: notifications.len(),
        notifications,
    }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let unread_count = blocking(move || notifications::unread_count(&engine, &user_id)).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkNotificationsRead>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let updated =
        blocking(move || notifications::mark_read(&engine, &user_id, &req.notification_ids))
            .await?;
    Ok(Json(serde_json::json!({ "marked": updated })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let updated = blocking(move || notifications::mark_all_read(&engine, &user_id)).await?;
    Ok(Json(serde_json::json!({ "marked": updated })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(notification_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    blocking(move || notifications::delete(&engine, &user_id, notification_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
