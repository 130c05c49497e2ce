use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use nudge_core::friends;
use nudge_types::api::{
    Claims, FriendRequestRespond, FriendRequestSend, FriendStatusResponse,
    PendingRequestsResponse,
};

use crate::auth::AppState;
use crate::blocking;

pub async fn send_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequestSend>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let from = claims.username.clone();
    let request_id =
        blocking(move || friends::send_request(&engine, &from, &req.to_user)).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "request_id": request_id }))))
}

pub async fn respond(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FriendRequestRespond>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let responder = claims.sub.to_string();
    let status =
        blocking(move || friends::respond(&engine, &responder, req.request_id, req.accept))
            .await?;
    Ok(Json(FriendStatusResponse {
        status,
        request_id: Some(req.request_id),
    }))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub with: String,
}

pub async fn relationship_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let me = claims.username.clone();
    let (status, request_id) =
        blocking(move || friends::relationship_status(&engine, &me, &query.with)).await?;
    Ok(Json(FriendStatusResponse { status, request_id }))
}

pub async fn pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let (received, sent) = blocking(move || friends::pending_requests(&engine, &user_id)).await?;
    Ok(Json(PendingRequestsResponse { received, sent }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    let friends = blocking(move || friends::friends_list(&engine, &user_id)).await?;
    Ok(Json(friends))
}

#[derive(Debug, Deserialize)]
pub struct RemoveQuery {
    pub username: String,
}

pub async fn remove(
    State(state): State<AppState>,
    Query(query): Query<RemoveQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let engine = state.engine.clone();
    let user_id = claims.sub.to_string();
    blocking(move || friends::remove_friend(&engine, &user_id, &query.username)).await?;
    Ok(StatusCode::NO_CONTENT)
}
